#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use sockbot_provider::{
    Error, IdentityInfo, ListenerId, ListenerSet, Result, SessionSettings, TransportConnector,
    TransportEvent, TransportEventKind, TransportListener, TransportSession,
};

/// In-memory session: records what is sent and lets tests inject events.
#[derive(Default)]
pub struct MockSession {
    pub listeners: ListenerSet,
    pub sent: Mutex<Vec<(String, String)>>,
    pub identities: Mutex<HashMap<String, IdentityInfo>>,
    pub disconnected: AtomicBool,
}

impl MockSession {
    /// Push an inbound chat line through the registered listeners.
    pub async fn inject_message(&self, source: &str, destination: &str, text: &str) -> usize {
        self.listeners
            .deliver(&TransportEvent::Message {
                source: source.to_string(),
                destination: destination.to_string(),
                text: text.to_string(),
                raw: format!(":{source}!{source}@test PRIVMSG {destination} :{text}"),
            })
            .await
    }

    pub async fn inject(&self, event: TransportEvent) -> usize {
        self.listeners.deliver(&event).await
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn message_listeners(&self) -> usize {
        self.listeners.count(TransportEventKind::Message)
    }

    pub fn error_listeners(&self) -> usize {
        self.listeners.count(TransportEventKind::Error)
    }
}

#[async_trait]
impl TransportSession for MockSession {
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(Error::unavailable("session closed"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    fn add_listener(
        &self,
        kind: TransportEventKind,
        listener: Arc<dyn TransportListener>,
    ) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    async fn lookup_identity(&self, name: &str) -> Result<Option<IdentityInfo>> {
        Ok(self.identities.lock().unwrap().get(name).cloned())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        self.listeners.clear();
        Ok(())
    }
}

/// Hands out a fresh [`MockSession`] per connect and keeps them all.
#[derive(Default)]
pub struct MockConnector {
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
    pub settings: Mutex<Vec<SessionSettings>>,
    pub fail: AtomicBool,
    pub connects: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Most recent session.
    pub fn session(&self) -> Arc<MockSession> {
        self.sessions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no session connected yet")
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(&self, settings: &SessionSettings) -> Result<Arc<dyn TransportSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::unavailable("connection refused"));
        }
        self.settings.lock().unwrap().push(settings.clone());
        let session = Arc::new(MockSession::default());
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}
