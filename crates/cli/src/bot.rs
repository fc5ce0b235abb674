//! `sockbot run`: wire config, transport, commands and plugins together.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    tracing::{debug, error, info, warn},
};

use {
    sockbot_config::{LoadedConfig, Severity},
    sockbot_irc::IrcConnector,
    sockbot_plugins::bundled_source,
    sockbot_provider::{CommandRegistry, Forum},
};

use crate::config_commands;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let LoadedConfig { config, path } = sockbot_config::load(config_path)?;
    info!(path = %path.display(), "config loaded");

    let report = config_commands::diagnose(Some(&path));
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Info => debug!(path = %d.path, category = d.category, "{}", d.message),
        }
    }
    if report.has_errors() {
        bail!("invalid config at {}; run `sockbot check` for details", path.display());
    }

    let registry = Arc::new(CommandRegistry::new(config.commands.prefix.clone()));
    let forum = Forum::new(config.forum_settings(), Arc::new(IrcConnector::default()));
    forum.set_commands(registry.clone())?;

    for name in config.enabled_plugins() {
        let Some(source) = bundled_source(name, &registry) else {
            warn!(plugin = name, "unknown plugin, skipping");
            continue;
        };
        forum
            .add_plugin(source, &config.plugin_config(name))
            .await
            .with_context(|| format!("failed to load plugin {name}"))?;
        info!(plugin = name, "plugin loaded");
    }

    forum
        .activate()
        .await
        .with_context(|| format!("failed to connect to {}", config.core.server))?;
    info!(
        server = %config.core.server,
        nick = %forum.username(),
        channels = ?config.core.channels,
        plugins = forum.plugin_count(),
        "sockbot running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutting down");

    forum.deactivate().await?;
    info!("disconnected");
    Ok(())
}
