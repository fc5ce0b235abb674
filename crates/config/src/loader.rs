use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::SockbotConfig,
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &[
    "sockbot.toml",
    "sockbot.yaml",
    "sockbot.yml",
    "sockbot.json",
];

/// Supported config file syntaxes, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }

    /// Parse into any deserializable shape.
    pub(crate) fn parse<T: serde::de::DeserializeOwned>(
        self,
        raw: &str,
    ) -> std::result::Result<T, String> {
        match self {
            Self::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }
}

/// A parsed config together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SockbotConfig,
    pub path: PathBuf,
}

/// Load the config at `path`, or discover one when `path` is `None`.
///
/// Search order for discovery:
/// 1. `./sockbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/sockbot/sockbot.{toml,yaml,yml,json}` (user-global)
pub fn load(path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => find_config_file().ok_or(Error::NotFound)?,
    };
    debug!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    Ok(LoadedConfig { config, path })
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SockbotConfig> {
    let raw = read_raw(path)?;
    parse_config(&substitute_env(&raw), path)
}

/// Parse already-substituted config text, picking the format from `path`.
pub fn parse_config(raw: &str, path: &Path) -> Result<SockbotConfig> {
    ConfigFormat::from_path(path)?
        .parse(raw)
        .map_err(|message| Error::parse(path, message))
}

pub(crate) fn read_raw(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/sockbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sockbot").map(|d| d.config_dir().to_path_buf())
}
