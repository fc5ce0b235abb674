//! Transport contract consumed by the provider.
//!
//! A transport session owns the live connection to the chat network. The
//! forum connector creates one through a [`TransportConnector`] on every
//! activation and is its only owner; everything else holds a `Weak`.

use std::{
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {async_trait::async_trait, tracing::debug};

use crate::error::Result;

/// Parameters handed to [`TransportConnector::connect`]. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Server address, `host` or `host:port`.
    pub server: String,
    /// Identity (nickname) to register as.
    pub nickname: String,
    /// Channels to join once registered.
    pub channels: Vec<String>,
    pub display_name: String,
    pub flood_protection: bool,
    pub flood_protection_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            nickname: String::new(),
            channels: Vec::new(),
            display_name: crate::forum::USER_AGENT.to_string(),
            flood_protection: true,
            flood_protection_delay: Duration::from_millis(500),
        }
    }
}

/// How a transport-level error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The identity we are using is not registered / identified.
    UnregisteredIdentity,
    NicknameInUse,
    NoSuchTarget,
    Other,
}

/// Structured transport error carried by [`TransportEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub classification: ErrorClass,
    /// Protocol command or numeric that produced the error.
    pub command: String,
    pub message: String,
}

/// Raw events a session emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound chat line.
    Message {
        source: String,
        destination: String,
        text: String,
        raw: String,
    },
    Error(TransportError),
}

impl TransportEvent {
    pub fn kind(&self) -> TransportEventKind {
        match self {
            Self::Message { .. } => TransportEventKind::Message,
            Self::Error(_) => TransportEventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEventKind {
    Message,
    Error,
}

/// Result of an identity (whois) lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityInfo {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
    pub real_name: Option<String>,
    pub channels: Vec<String>,
}

/// Receives transport events. Sessions await each listener in turn, so two
/// events are never processed concurrently.
#[async_trait]
pub trait TransportListener: Send + Sync {
    async fn on_event(&self, event: &TransportEvent);
}

/// Handle returned by [`TransportSession::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A live connection to the chat network.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Send `text` to a channel or user.
    async fn send(&self, destination: &str, text: &str) -> Result<()>;

    fn add_listener(
        &self,
        kind: TransportEventKind,
        listener: Arc<dyn TransportListener>,
    ) -> ListenerId;

    /// Returns false when the listener was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Whois-style query. `Ok(None)` when the name is unknown.
    async fn lookup_identity(&self, name: &str) -> Result<Option<IdentityInfo>>;

    /// Close the connection. Listeners stop receiving events.
    async fn disconnect(&self) -> Result<()>;
}

/// Opens transport sessions.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, settings: &SessionSettings) -> Result<Arc<dyn TransportSession>>;
}

struct ListenerEntry {
    id: ListenerId,
    kind: TransportEventKind,
    listener: Arc<dyn TransportListener>,
}

/// Listener bookkeeping shared by transport implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    entries: RwLock<Vec<ListenerEntry>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: TransportEventKind, listener: Arc<dyn TransportListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(ListenerEntry { id, kind, listener });
        debug!(?kind, listeners = entries.len(), "transport listener added");
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn count(&self, kind: TransportEventKind) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Deliver `event` to every listener of its kind, one after another.
    ///
    /// The listener list is snapshotted first so a listener may add or remove
    /// listeners without deadlocking.
    pub async fn deliver(&self, event: &TransportEvent) -> usize {
        let kind = event.kind();
        let listeners: Vec<Arc<dyn TransportListener>> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        for listener in &listeners {
            listener.on_event(event).await;
        }
        listeners.len()
    }
}
