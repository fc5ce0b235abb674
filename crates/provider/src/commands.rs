//! Command processor contract and the default prefix-based registry.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, RwLock, Weak},
};

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    notification::Notification,
    transport::TransportSession,
};

/// Addressing record handed to the command processor for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Always `None`: chat lines are not addressable posts.
    pub post_id: Option<u64>,
    pub topic_id: String,
    pub user_id: String,
    /// Not supported by this transport.
    pub pm_id: Option<u64>,
    /// Not supported by this transport.
    pub chat_id: Option<u64>,
}

impl CommandContext {
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            post_id: notification.post_id(),
            topic_id: notification.topic_id().to_string(),
            user_id: notification.user_id().to_string(),
            pm_id: None,
            chat_id: None,
        }
    }
}

/// Sends replies for one notification back through the transport.
///
/// Holds the session weakly; once the connector tears the session down,
/// replies fail with [`Error::Unavailable`].
#[derive(Clone)]
pub struct ReplyHandle {
    transport: Option<Weak<dyn TransportSession>>,
    target: String,
}

impl ReplyHandle {
    pub fn new(transport: Weak<dyn TransportSession>, target: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            target: target.into(),
        }
    }

    /// A handle with no session behind it; every send fails.
    pub fn detached(target: impl Into<String>) -> Self {
        Self {
            transport: None,
            target: target.into(),
        }
    }

    /// Destination replies are sent to.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        let transport = self
            .transport
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::unavailable("transport session is closed"))?;
        transport.send(&self.target, text).await
    }
}

impl fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("target", &self.target)
            .field(
                "connected",
                &self
                    .transport
                    .as_ref()
                    .is_some_and(|t| t.strong_count() > 0),
            )
            .finish()
    }
}

/// Matched commands for one notification, ready to run.
#[async_trait]
pub trait CommandBatch: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every matched command in order.
    async fn execute(self: Box<Self>) -> anyhow::Result<()>;
}

/// Parses a notification body against a command grammar.
#[async_trait]
pub trait CommandProcessor: Send + Sync {
    async fn match_commands(
        &self,
        context: CommandContext,
        body: &str,
        reply: ReplyHandle,
    ) -> anyhow::Result<Box<dyn CommandBatch>>;
}

/// One command occurrence parsed out of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command name, without prefix.
    pub name: String,
    pub args: Vec<String>,
    /// The full source line the command was found on.
    pub line: String,
}

/// Everything a handler gets to see for one invocation.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub command: ParsedCommand,
    pub context: CommandContext,
    pub reply: ReplyHandle,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// One-line help text.
    fn help(&self) -> &str {
        ""
    }

    async fn handle(&self, invocation: &CommandInvocation) -> anyhow::Result<()>;
}

/// Default [`CommandProcessor`]: `!name arg arg` anywhere on a line.
pub struct CommandRegistry {
    prefix: String,
    handlers: RwLock<BTreeMap<String, Arc<dyn CommandHandler>>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new("!")
    }
}

impl CommandRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            handlers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register `handler` under `name` (case-insensitive). Replaces any
    /// previous handler and returns it.
    pub fn register(
        &self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> Option<Arc<dyn CommandHandler>> {
        let name = name.to_lowercase();
        info!(command = %name, "command registered");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, handler)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn handler(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Find commands in `body`: at most one per line, the first token that
    /// starts with the prefix followed by a valid name.
    pub fn parse(&self, body: &str) -> Vec<ParsedCommand> {
        if self.prefix.is_empty() {
            return Vec::new();
        }
        body.lines()
            .filter_map(|line| {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                tokens.iter().enumerate().find_map(|(i, token)| {
                    let name = token.strip_prefix(self.prefix.as_str())?;
                    if !is_command_name(name) {
                        return None;
                    }
                    Some(ParsedCommand {
                        name: name.to_lowercase(),
                        args: tokens[i + 1..].iter().map(|s| s.to_string()).collect(),
                        line: line.trim().to_string(),
                    })
                })
            })
            .collect()
    }

    fn help_text(&self) -> String {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        if handlers.is_empty() {
            return "no commands registered".to_string();
        }
        handlers
            .iter()
            .map(|(name, handler)| match handler.help() {
                "" => format!("{}{name}", self.prefix),
                help => format!("{}{name}: {help}", self.prefix),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_command_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

enum QueuedCommand {
    Handler {
        handler: Arc<dyn CommandHandler>,
        invocation: CommandInvocation,
    },
    Help {
        text: String,
        reply: ReplyHandle,
    },
}

struct RegistryBatch {
    queued: Vec<QueuedCommand>,
}

#[async_trait]
impl CommandBatch for RegistryBatch {
    fn len(&self) -> usize {
        self.queued.len()
    }

    async fn execute(self: Box<Self>) -> anyhow::Result<()> {
        for queued in self.queued {
            match queued {
                QueuedCommand::Handler {
                    handler,
                    invocation,
                } => {
                    debug!(
                        command = %invocation.command.name,
                        user = %invocation.context.user_id,
                        "executing command"
                    );
                    handler.handle(&invocation).await.map_err(|e| {
                        anyhow::anyhow!("command {} failed: {e:#}", invocation.command.name)
                    })?;
                },
                QueuedCommand::Help { text, reply } => reply.send(&text).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CommandProcessor for CommandRegistry {
    async fn match_commands(
        &self,
        context: CommandContext,
        body: &str,
        reply: ReplyHandle,
    ) -> anyhow::Result<Box<dyn CommandBatch>> {
        let mut queued = Vec::new();
        for command in self.parse(body) {
            if let Some(handler) = self.handler(&command.name) {
                queued.push(QueuedCommand::Handler {
                    handler,
                    invocation: CommandInvocation {
                        command,
                        context: context.clone(),
                        reply: reply.clone(),
                    },
                });
            } else if command.name == "help" {
                queued.push(QueuedCommand::Help {
                    text: self.help_text(),
                    reply: reply.clone(),
                });
            } else {
                debug!(command = %command.name, "ignoring unknown command");
            }
        }
        Ok(Box::new(RegistryBatch { queued }))
    }
}
