use chrono::{DateTime, Utc};

use crate::{
    domain::{Post, is_channel_name},
    error::{Error, Result},
    forum::Forum,
};

/// A channel seen as a topic. Id and title are both the channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    channel: String,
}

impl Topic {
    /// Look up a topic by channel name. Any syntactically valid channel
    /// name resolves; the server is not consulted.
    pub fn get(id: &str) -> Result<Topic> {
        if !is_channel_name(id) {
            return Err(Error::malformed(format!("not a channel name: {id:?}")));
        }
        Ok(Self {
            channel: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.channel
    }

    pub fn title(&self) -> &str {
        &self.channel
    }

    pub async fn reply(&self, forum: &Forum, content: &str) -> Result<()> {
        forum.send(&self.channel, content).await
    }

    pub fn author_id(&self) -> Result<String> {
        Err(Error::unsupported("Topic::author_id"))
    }

    pub fn posted(&self) -> Result<DateTime<Utc>> {
        Err(Error::unsupported("Topic::posted"))
    }

    pub fn last_posted(&self) -> Result<DateTime<Utc>> {
        Err(Error::unsupported("Topic::last_posted"))
    }

    pub fn main_post_id(&self) -> Result<u64> {
        Err(Error::unsupported("Topic::main_post_id"))
    }

    pub fn post_count(&self) -> Result<u64> {
        Err(Error::unsupported("Topic::post_count"))
    }

    pub fn url(&self) -> Result<String> {
        Err(Error::unsupported("Topic::url"))
    }

    pub async fn get_all_posts(&self) -> Result<Vec<Post>> {
        Err(Error::unsupported("Topic::get_all_posts"))
    }

    pub async fn get_latest_posts(&self) -> Result<Vec<Post>> {
        Err(Error::unsupported("Topic::get_latest_posts"))
    }

    pub async fn mark_read(&self) -> Result<()> {
        Err(Error::unsupported("Topic::mark_read"))
    }

    pub async fn get_unread_topics(_forum: &Forum) -> Result<Vec<Topic>> {
        Err(Error::unsupported("Topic::get_unread_topics"))
    }

    pub async fn get_recent_topics(_forum: &Forum) -> Result<Vec<Topic>> {
        Err(Error::unsupported("Topic::get_recent_topics"))
    }

    // TODO: map watch/unwatch onto JOIN/PART once sessions expose them.
    pub async fn watch(&self) -> Result<()> {
        Err(Error::not_implemented("Topic::watch"))
    }

    pub async fn unwatch(&self) -> Result<()> {
        Err(Error::not_implemented("Topic::unwatch"))
    }

    pub async fn mute(&self) -> Result<()> {
        self.unwatch().await
    }

    pub async fn unmute(&self) -> Result<()> {
        self.watch().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn get_validates_channel_name() {
        let topic = Topic::get("#room").unwrap();
        assert_eq!(topic.id(), "#room");
        assert_eq!(topic.title(), "#room");
        assert!(matches!(
            Topic::get("room").unwrap_err(),
            Error::MalformedPayload { .. }
        ));
    }

    #[tokio::test]
    async fn watch_is_not_implemented_but_counts_are_unsupported() {
        let topic = Topic::get("#room").unwrap();
        assert!(topic.watch().await.unwrap_err().is_not_implemented());
        assert!(topic.mute().await.unwrap_err().is_not_implemented());
        assert!(topic.unmute().await.unwrap_err().is_not_implemented());
        assert!(topic.post_count().unwrap_err().is_unsupported());
        assert!(topic.get_all_posts().await.unwrap_err().is_unsupported());
        assert!(topic.mark_read().await.unwrap_err().is_unsupported());
    }
}
