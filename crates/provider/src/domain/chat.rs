use crate::{
    domain::User,
    error::{Error, Result},
    forum::Forum,
};

/// Multi-user chat rooms are not part of the capability table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chat;

impl Chat {
    pub async fn get(_forum: &Forum, _id: &str) -> Result<Chat> {
        Err(Error::unsupported("Chat::get"))
    }

    pub async fn create(_forum: &Forum, _users: &[User], _title: &str) -> Result<Chat> {
        Err(Error::unsupported("Chat::create"))
    }

    pub async fn send(&self, _content: &str) -> Result<()> {
        Err(Error::unsupported("Chat::send"))
    }

    pub async fn add_participant(&self, _user: &User) -> Result<()> {
        Err(Error::unsupported("Chat::add_participant"))
    }

    pub async fn remove_participant(&self, _user: &User) -> Result<()> {
        Err(Error::unsupported("Chat::remove_participant"))
    }

    pub async fn leave(&self) -> Result<()> {
        Err(Error::unsupported("Chat::leave"))
    }

    pub async fn rename(&self, _title: &str) -> Result<()> {
        Err(Error::unsupported("Chat::rename"))
    }
}

/// A message inside a [`Chat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatMessage;

impl ChatMessage {
    pub async fn reply(&self, _content: &str) -> Result<()> {
        Err(Error::unsupported("ChatMessage::reply"))
    }
}
