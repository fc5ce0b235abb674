//! Plugins shipped with the bot.
//!
//! Each bundled plugin is exposed as a named [`PluginSource`] so the binary
//! can admit it through [`Forum::add_plugin`](sockbot_provider::Forum::add_plugin)
//! with the `[plugins.<name>]` table from the config file.

pub mod bundled;

use std::sync::Arc;

use sockbot_provider::{CommandRegistry, PluginSource};

/// Names of every bundled plugin, sorted.
pub const BUNDLED: &[&str] = &[
    bundled::notification_logger::NAME,
    bundled::ping::NAME,
];

/// Look up a bundled plugin by name. Plugins that add commands register them
/// on `registry`.
pub fn bundled_source(name: &str, registry: &Arc<CommandRegistry>) -> Option<PluginSource> {
    match name {
        bundled::notification_logger::NAME => Some(bundled::notification_logger::source()),
        bundled::ping::NAME => Some(bundled::ping::source(Arc::clone(registry))),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn every_bundled_name_resolves() {
        let registry = Arc::new(CommandRegistry::default());
        for name in BUNDLED {
            let source = bundled_source(name, &registry).unwrap();
            assert_eq!(source.name(), Some(*name));
        }
        assert!(bundled_source("weather", &registry).is_none());
    }

    #[test]
    fn bundled_names_are_sorted() {
        let mut sorted = BUNDLED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, BUNDLED);
    }
}
