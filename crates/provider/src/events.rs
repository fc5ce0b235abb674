//! Notification event bus.
//!
//! Owned by a [`Forum`](crate::Forum) instance. Topics are a closed enum so a
//! misspelled topic is a compile error rather than a silently dead
//! subscription.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{debug, trace};

use crate::notification::{Notification, NotificationKind};

/// Bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationTopic {
    /// `notification:message`
    Message,
    /// `notification:mention`
    Mention,
    /// `notification`, every notification regardless of kind.
    Any,
}

impl NotificationTopic {
    pub const ALL: &'static [NotificationTopic] = &[Self::Message, Self::Mention, Self::Any];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "notification:message",
            Self::Mention => "notification:mention",
            Self::Any => "notification",
        }
    }

    /// Kind-specific topic for a notification kind.
    pub fn for_kind(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Message => Self::Message,
            NotificationKind::Mention => Self::Mention,
        }
    }
}

impl fmt::Display for NotificationTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus subscriber. Called synchronously from inside the pipeline; must not
/// block. Spawn a task for anything that needs to await.
pub trait NotificationHandler: Send + Sync {
    fn handle(&self, topic: NotificationTopic, notification: &Arc<Notification>);
}

impl<F> NotificationHandler for F
where
    F: Fn(NotificationTopic, &Arc<Notification>) + Send + Sync,
{
    fn handle(&self, topic: NotificationTopic, notification: &Arc<Notification>) {
        self(topic, notification)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: Arc<dyn NotificationHandler>,
}

/// Publish/subscribe bus for notifications.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<NotificationTopic, Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        topic: NotificationTopic,
        handler: Arc<dyn NotificationHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers
            .entry(topic)
            .or_default()
            .push(Subscriber { id, handler });
        debug!(%topic, "notification subscriber added");
        id
    }

    /// Returns false when `id` is not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = false;
        for list in subscribers.values_mut() {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
        }
        removed
    }

    pub fn subscriber_count(&self, topic: NotificationTopic) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Deliver to every current subscriber of `topic`, in subscription order,
    /// before returning. Returns the number of subscribers reached.
    pub fn emit(&self, topic: NotificationTopic, notification: &Arc<Notification>) -> usize {
        // Snapshot so handlers may (un)subscribe while being called.
        let handlers: Vec<Arc<dyn NotificationHandler>> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&topic)
            .map(|list| list.iter().map(|s| Arc::clone(&s.handler)).collect())
            .unwrap_or_default();

        trace!(%topic, id = notification.id(), count = handlers.len(), "emitting notification");
        for handler in &handlers {
            handler.handle(topic, notification);
        }
        handlers.len()
    }
}
