//! Notification data model.

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
};

use crate::{
    domain::{Post, PrivateMessage, Topic, User},
    error::{Error, Result},
};

/// Notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
    Mention,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Mention => "mention",
        }
    }
}

/// Fields of one inbound chat line, as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub source_user_id: String,
    pub channel_id: String,
    pub body: String,
    pub raw: String,
}

/// One inbound chat line, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    id: u64,
    source_user_id: String,
    channel_id: String,
    body: String,
    raw: String,
    received_at: DateTime<Utc>,
    kind: NotificationKind,
}

impl Notification {
    /// Build a notification. Fails when the sender or destination is blank.
    pub fn new(id: u64, payload: MessagePayload, received_at: DateTime<Utc>) -> Result<Self> {
        if payload.source_user_id.trim().is_empty() {
            return Err(Error::malformed("notification has no source user"));
        }
        if payload.channel_id.trim().is_empty() {
            return Err(Error::malformed("notification has no channel"));
        }
        Ok(Self {
            id,
            source_user_id: payload.source_user_id,
            channel_id: payload.channel_id,
            body: payload.body,
            raw: payload.raw,
            received_at,
            kind: NotificationKind::Message,
        })
    }

    /// Process-unique sequence number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Chat lines have no addressable post.
    pub fn post_id(&self) -> Option<u64> {
        None
    }

    pub fn topic_id(&self) -> &str {
        &self.channel_id
    }

    pub fn user_id(&self) -> &str {
        &self.source_user_id
    }

    pub fn source_user_id(&self) -> &str {
        &self.source_user_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn subtype(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn read(&self) -> bool {
        false
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn label(&self) -> String {
        format!(
            "new message from {} in {}",
            self.source_user_id, self.channel_id
        )
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Raw markup of the body. Chat lines carry no markup.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Original transport line.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> Option<String> {
        None
    }

    /// Case-sensitive substring match against `username`. Not word-boundary
    /// aware: `"bot"` matches `"robot"`. An empty username never matches.
    pub fn mentions(&self, username: &str) -> bool {
        !username.is_empty() && self.body.contains(username)
    }

    /// The kind this notification derives to for a given bot username.
    pub fn classify(&self, username: &str) -> NotificationKind {
        if self.mentions(username) {
            NotificationKind::Mention
        } else {
            self.kind
        }
    }

    /// True when the line was sent straight to us rather than to a channel.
    pub fn is_direct(&self) -> bool {
        !crate::domain::is_channel_name(&self.channel_id)
    }

    /// Where a reply to this notification should go.
    pub fn reply_target(&self) -> &str {
        if self.is_direct() {
            &self.source_user_id
        } else {
            &self.channel_id
        }
    }

    pub fn get_post(&self) -> Post {
        Post::from_notification(self)
    }

    pub fn get_topic(&self) -> Result<Topic> {
        if self.is_direct() {
            return Err(Error::unsupported("Notification::get_topic (direct message)"));
        }
        Topic::get(&self.channel_id)
    }

    pub fn get_user(&self) -> User {
        User::from_nick(&self.source_user_id)
    }

    /// The private message this notification represents, if it was direct.
    pub fn private_message(&self) -> Option<PrivateMessage> {
        PrivateMessage::from_notification(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn payload(source: &str, channel: &str, body: &str) -> MessagePayload {
        MessagePayload {
            source_user_id: source.into(),
            channel_id: channel.into(),
            body: body.into(),
            raw: format!(":{source}!u@h PRIVMSG {channel} :{body}"),
        }
    }

    #[test]
    fn projections_follow_payload() {
        let now = Utc::now();
        let n = Notification::new(7, payload("alice", "#room", "hello"), now).unwrap();

        assert_eq!(n.id(), 7);
        assert_eq!(n.user_id(), "alice");
        assert_eq!(n.topic_id(), "#room");
        assert_eq!(n.post_id(), None);
        assert_eq!(n.body(), "hello");
        assert_eq!(n.text(), "hello");
        assert_eq!(n.kind(), NotificationKind::Message);
        assert_eq!(n.subtype(), "message");
        assert!(!n.read());
        assert_eq!(n.date(), now);
        assert_eq!(n.label(), "new message from alice in #room");
        assert!(n.raw().contains("PRIVMSG #room"));
    }

    #[test]
    fn blank_source_or_channel_is_malformed() {
        let err = Notification::new(1, payload("", "#room", "x"), Utc::now()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
        let err = Notification::new(1, payload("alice", " ", "x"), Utc::now()).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn empty_body_is_allowed() {
        let n = Notification::new(1, payload("alice", "#room", ""), Utc::now()).unwrap();
        assert_eq!(n.body(), "");
    }

    #[test]
    fn mention_is_plain_substring() {
        let n = Notification::new(1, payload("a", "#r", "hey sockbot are you there"), Utc::now())
            .unwrap();
        assert!(n.mentions("sockbot"));
        assert_eq!(n.classify("sockbot"), NotificationKind::Mention);

        let n = Notification::new(1, payload("a", "#r", "hey bot are you there"), Utc::now())
            .unwrap();
        assert!(!n.mentions("sockbot"));
        assert_eq!(n.classify("sockbot"), NotificationKind::Message);

        let n = Notification::new(1, payload("a", "#r", "i am a robot"), Utc::now()).unwrap();
        assert!(n.mentions("bot"));
        assert!(!n.mentions("Bot"));
        assert!(!n.mentions(""));
    }

    #[test]
    fn direct_messages_reply_to_sender() {
        let n = Notification::new(1, payload("alice", "sockbot", "hi"), Utc::now()).unwrap();
        assert!(n.is_direct());
        assert_eq!(n.reply_target(), "alice");
        assert!(n.private_message().is_some());
        assert!(n.get_topic().unwrap_err().is_unsupported());

        let n = Notification::new(1, payload("alice", "#room", "hi"), Utc::now()).unwrap();
        assert!(!n.is_direct());
        assert_eq!(n.reply_target(), "#room");
        assert!(n.private_message().is_none());
        assert_eq!(n.get_topic().unwrap().id(), "#room");
    }

    #[test]
    fn derived_post_and_user() {
        let now = Utc::now();
        let n = Notification::new(3, payload("alice", "#room", "content"), now).unwrap();
        let post = n.get_post();
        assert_eq!(post.author_id(), "alice");
        assert_eq!(post.topic_id(), "#room");
        assert_eq!(post.content(), "content");
        assert_eq!(post.posted(), now);
        assert_eq!(n.get_user().username(), "alice");
    }
}
