use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    forum::Forum,
    notification::Notification,
};

/// One chat line seen as a post in the channel's topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    author_id: String,
    topic_id: String,
    content: String,
    posted: DateTime<Utc>,
}

impl Post {
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            author_id: notification.user_id().to_string(),
            topic_id: notification.topic_id().to_string(),
            content: notification.body().to_string(),
            posted: notification.received_at(),
        }
    }

    /// Lines are not addressable.
    pub fn id(&self) -> u64 {
        0
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn markup(&self) -> &str {
        &self.content
    }

    pub fn posted(&self) -> DateTime<Utc> {
        self.posted
    }

    pub fn url(&self) -> Result<String> {
        Err(Error::unsupported("Post::url"))
    }

    /// Send `content` to the topic this post was made in.
    pub async fn reply(&self, forum: &Forum, content: &str) -> Result<()> {
        forum.send(&self.topic_id, content).await
    }

    pub async fn get(_forum: &Forum, _id: u64) -> Result<Post> {
        Err(Error::unsupported("Post::get"))
    }

    pub async fn preview(_forum: &Forum, _content: &str) -> Result<String> {
        Err(Error::unsupported("Post::preview"))
    }

    pub async fn edit(&self, _content: &str) -> Result<()> {
        Err(Error::unsupported("Post::edit"))
    }

    pub async fn append(&self, _content: &str) -> Result<()> {
        Err(Error::unsupported("Post::append"))
    }

    pub async fn delete(&self) -> Result<()> {
        Err(Error::unsupported("Post::delete"))
    }

    pub async fn undelete(&self) -> Result<()> {
        Err(Error::unsupported("Post::undelete"))
    }

    pub async fn upvote(&self) -> Result<()> {
        Err(Error::unsupported("Post::upvote"))
    }

    pub async fn downvote(&self) -> Result<()> {
        Err(Error::unsupported("Post::downvote"))
    }

    pub async fn unvote(&self) -> Result<()> {
        Err(Error::unsupported("Post::unvote"))
    }

    pub async fn bookmark(&self) -> Result<()> {
        Err(Error::unsupported("Post::bookmark"))
    }

    pub async fn unbookmark(&self) -> Result<()> {
        Err(Error::unsupported("Post::unbookmark"))
    }
}
