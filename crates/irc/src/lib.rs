//! IRC transport for the sockbot forum provider.
//!
//! [`IrcConnector`] plugs into [`sockbot_provider::Forum`]; each activation
//! opens an [`IrcSession`] that registers, joins the configured channels and
//! turns `PRIVMSG` traffic into transport events.

pub mod connector;
pub mod error;
pub mod message;
pub mod session;

pub use {
    connector::IrcConnector,
    error::{Error, Result},
    message::{Message, Prefix},
    session::{DEFAULT_PORT, IrcOptions, IrcSession, classify_numeric},
};
