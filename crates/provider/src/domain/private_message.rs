use chrono::{DateTime, Utc};

use crate::{error::Result, forum::Forum, notification::Notification};

/// A line sent straight to the bot instead of to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessage {
    from: String,
    to: String,
    content: String,
    received_at: DateTime<Utc>,
}

impl PrivateMessage {
    /// `None` when the notification was addressed to a channel.
    pub fn from_notification(notification: &Notification) -> Option<Self> {
        notification.is_direct().then(|| Self {
            from: notification.source_user_id().to_string(),
            to: notification.channel_id().to_string(),
            content: notification.body().to_string(),
            received_at: notification.received_at(),
        })
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Answer the sender directly.
    pub async fn reply(&self, forum: &Forum, content: &str) -> Result<()> {
        forum.send_private_message(&self.from, content).await
    }
}
