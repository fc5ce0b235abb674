//! Config schema types (core connection, commands, plugins).
use std::{collections::BTreeMap, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use sockbot_provider::{ForumSettings, SessionSettings, USER_AGENT};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SockbotConfig {
    pub core: CoreConfig,
    pub commands: CommandsConfig,
    /// Per-plugin settings keyed by plugin name. Only plugins listed here
    /// are loaded.
    pub plugins: BTreeMap<String, PluginEntry>,
}

/// Connection and identity settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// `host` or `host:port`.
    pub server: String,
    /// Nickname the bot registers and is mentioned by.
    pub username: String,
    pub owner: String,
    /// NickServ password. Prefer `${ENV_VAR}` over a literal.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Secret<String>>,
    /// Service that receives `IDENTIFY` (defaults to `NickServ`).
    pub nick_serv: Option<String>,
    pub channels: Vec<String>,
    /// Real name sent with `USER`.
    pub real_name: Option<String>,
    pub flood_protection: bool,
    pub flood_protection_delay_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            username: String::new(),
            owner: String::new(),
            password: None,
            nick_serv: None,
            channels: Vec::new(),
            real_name: None,
            flood_protection: true,
            flood_protection_delay_ms: 500,
        }
    }
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("owner", &self.owner)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("nick_serv", &self.nick_serv)
            .field("channels", &self.channels)
            .field("real_name", &self.real_name)
            .field("flood_protection", &self.flood_protection)
            .field("flood_protection_delay_ms", &self.flood_protection_delay_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Marker that starts a command word, e.g. `!ping`.
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
        }
    }
}

/// One `[plugins.<name>]` table. Everything except `enabled` is handed to the
/// plugin as its config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl Default for PluginEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: serde_json::Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl SockbotConfig {
    /// Settings for the forum connector and its transport session.
    pub fn forum_settings(&self) -> ForumSettings {
        let core = &self.core;
        let mut settings = ForumSettings::new(core.username.clone(), core.server.clone());
        settings.owner = core.owner.clone();
        settings.password = core.password.clone();
        settings.nick_serv = core.nick_serv.clone();
        let session: &mut SessionSettings = &mut settings.session;
        session.channels = core.channels.clone();
        session.display_name = core
            .real_name
            .clone()
            .unwrap_or_else(|| USER_AGENT.to_string());
        session.flood_protection = core.flood_protection;
        session.flood_protection_delay = Duration::from_millis(core.flood_protection_delay_ms);
        settings
    }

    /// Names of the plugins that are listed and not disabled.
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.as_str())
    }

    /// The config object handed to a plugin's generator.
    pub fn plugin_config(&self, name: &str) -> serde_json::Value {
        self.plugins
            .get(name)
            .map(|entry| serde_json::Value::Object(entry.settings.clone()))
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[core]
server = "irc.example.net:6697"
username = "sockbot"
owner = "alice"
password = "hunter2"
channels = ["#room", "#other"]
real_name = "Friendly Bot"
flood_protection_delay_ms = 250

[commands]
prefix = "."

[plugins.ping]
response = "pong!"

[plugins.notification-logger]
enabled = false
path = "notifications.jsonl"
"##;

    #[test]
    fn defaults() {
        let cfg = SockbotConfig::default();
        assert!(cfg.core.flood_protection);
        assert_eq!(cfg.core.flood_protection_delay_ms, 500);
        assert_eq!(cfg.commands.prefix, "!");
        assert!(cfg.plugins.is_empty());
    }

    #[test]
    fn parses_full_toml() {
        let cfg: SockbotConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.core.server, "irc.example.net:6697");
        assert_eq!(cfg.core.password.as_ref().unwrap().expose_secret(), "hunter2");
        assert_eq!(cfg.commands.prefix, ".");
        assert!(cfg.plugins["ping"].enabled);
        assert!(!cfg.plugins["notification-logger"].enabled);
        assert_eq!(
            cfg.enabled_plugins().collect::<Vec<_>>(),
            vec!["ping"]
        );
        assert_eq!(
            cfg.plugin_config("ping"),
            serde_json::json!({ "response": "pong!" })
        );
        assert_eq!(cfg.plugin_config("missing"), serde_json::json!({}));
    }

    #[test]
    fn forum_settings_carry_core_values() {
        let cfg: SockbotConfig = toml::from_str(SAMPLE).unwrap();
        let settings = cfg.forum_settings();
        assert_eq!(settings.username, "sockbot");
        assert_eq!(settings.owner, "alice");
        assert_eq!(settings.nick_serv(), "NickServ");
        assert_eq!(settings.session.server, "irc.example.net:6697");
        assert_eq!(settings.session.nickname, "sockbot");
        assert_eq!(settings.session.channels, vec!["#room", "#other"]);
        assert_eq!(settings.session.display_name, "Friendly Bot");
        assert_eq!(
            settings.session.flood_protection_delay,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn real_name_defaults_to_user_agent() {
        let cfg = SockbotConfig::default();
        assert_eq!(cfg.forum_settings().session.display_name, USER_AGENT);
    }

    #[test]
    fn debug_redacts_password() {
        let cfg: SockbotConfig = toml::from_str(SAMPLE).unwrap();
        let debug = format!("{:?}", cfg.core);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
