//! Forum provider over a chat transport.
//!
//! A [`Forum`] owns one transport session per activation, turns inbound chat
//! lines into [`Notification`]s on an [`EventBus`], hands them to a
//! [`CommandProcessor`], and runs the lifecycle of registered [`Plugin`]s.
//! The transport itself sits behind [`TransportConnector`] /
//! [`TransportSession`]; `sockbot-irc` provides the IRC one.

pub mod capability;
pub mod commands;
pub mod domain;
pub mod error;
pub mod events;
pub mod format;
pub mod forum;
pub mod notification;
pub mod pipeline;
pub mod plugin;
pub mod transport;

pub use {
    capability::{Capability, SupportQuery, supports},
    commands::{
        CommandBatch, CommandContext, CommandHandler, CommandInvocation, CommandProcessor,
        CommandRegistry, ParsedCommand, ReplyHandle,
    },
    domain::{Category, Chat, ChatMessage, Post, PrivateMessage, Topic, User},
    error::{Error, PluginContractError, Result},
    events::{EventBus, NotificationHandler, NotificationTopic, SubscriptionId},
    forum::{DEFAULT_NICK_SERV, Forum, ForumSettings, USER_AGENT},
    notification::{MessagePayload, Notification, NotificationKind},
    pipeline::NotificationPipeline,
    plugin::{Plugin, PluginFactory, PluginHooks, PluginInstance, PluginModule, PluginSource},
    transport::{
        ErrorClass, IdentityInfo, ListenerId, ListenerSet, SessionSettings, TransportConnector,
        TransportError, TransportEvent, TransportEventKind, TransportListener, TransportSession,
    },
};
