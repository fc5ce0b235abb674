use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    transport::IdentityInfo,
};

/// A nick on the network. Id, name and username are all the nick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    nick: String,
    user: Option<String>,
    host: Option<String>,
    real_name: Option<String>,
    channels: Vec<String>,
}

impl User {
    pub fn from_nick(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: None,
            host: None,
            real_name: None,
            channels: Vec::new(),
        }
    }

    /// Build from a whois reply.
    pub fn from_identity(info: IdentityInfo) -> Self {
        Self {
            nick: info.nick,
            user: info.user,
            host: info.host,
            real_name: info.real_name,
            channels: info.channels,
        }
    }

    pub fn id(&self) -> &str {
        &self.nick
    }

    pub fn name(&self) -> &str {
        &self.nick
    }

    pub fn username(&self) -> &str {
        &self.nick
    }

    /// Ident reported by whois.
    pub fn ident(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn real_name(&self) -> Option<&str> {
        self.real_name.as_deref()
    }

    /// Channels whois listed, prefixes (`@`, `+`) included.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn email(&self) -> Result<String> {
        Err(Error::unsupported("User::email"))
    }

    pub fn avatar(&self) -> Result<String> {
        Err(Error::unsupported("User::avatar"))
    }

    pub fn post_count(&self) -> Result<u64> {
        Err(Error::unsupported("User::post_count"))
    }

    pub fn topic_count(&self) -> Result<u64> {
        Err(Error::unsupported("User::topic_count"))
    }

    pub fn reputation(&self) -> Result<i64> {
        Err(Error::unsupported("User::reputation"))
    }

    pub fn last_posted(&self) -> Result<DateTime<Utc>> {
        Err(Error::unsupported("User::last_posted"))
    }

    pub fn last_seen(&self) -> Result<DateTime<Utc>> {
        Err(Error::unsupported("User::last_seen"))
    }

    pub fn url(&self) -> Result<String> {
        Err(Error::unsupported("User::url"))
    }

    pub async fn follow(&self) -> Result<()> {
        Err(Error::unsupported("User::follow"))
    }

    pub async fn unfollow(&self) -> Result<()> {
        Err(Error::unsupported("User::unfollow"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_fields() {
        let user = User::from_identity(IdentityInfo {
            nick: "alice".into(),
            user: Some("~alice".into()),
            host: Some("example.org".into()),
            real_name: Some("Alice".into()),
            channels: vec!["@#room".into()],
        });
        assert_eq!(user.id(), "alice");
        assert_eq!(user.name(), "alice");
        assert_eq!(user.ident(), Some("~alice"));
        assert_eq!(user.host(), Some("example.org"));
        assert_eq!(user.real_name(), Some("Alice"));
        assert_eq!(user.channels(), ["@#room".to_string()]);
    }

    #[tokio::test]
    async fn forum_only_fields_are_unsupported() {
        let user = User::from_nick("alice");
        assert!(user.email().unwrap_err().is_unsupported());
        assert!(user.avatar().unwrap_err().is_unsupported());
        assert!(user.post_count().unwrap_err().is_unsupported());
        assert!(user.reputation().unwrap_err().is_unsupported());
        assert!(user.last_seen().unwrap_err().is_unsupported());
        assert!(user.follow().await.unwrap_err().is_unsupported());
        assert!(user.unfollow().await.unwrap_err().is_unsupported());
    }
}
