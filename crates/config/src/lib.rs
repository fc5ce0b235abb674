//! Configuration loading, validation and env substitution.
//!
//! Config files: `sockbot.toml`, `sockbot.yaml`, `sockbot.yml` or
//! `sockbot.json`. Searched in `./` then the user config dir
//! (`~/.config/sockbot/` on Linux).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file before it is parsed.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{CONFIG_FILENAMES, ConfigFormat, LoadedConfig, config_dir, find_config_file, load},
    schema::{CommandsConfig, CoreConfig, PluginEntry, SockbotConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
