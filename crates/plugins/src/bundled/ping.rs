//! `ping` plugin: answers `!ping` with a configurable response.

use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, serde::Deserialize, tracing::info};

use sockbot_provider::{
    CommandHandler, CommandInvocation, CommandRegistry, Plugin, PluginInstance, PluginSource,
};

pub const NAME: &str = "ping";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Command word, without prefix.
    pub command: String,
    pub response: String,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            command: "ping".into(),
            response: "pong".into(),
        }
    }
}

/// Plugin source for the config-driven loader.
pub fn source(registry: Arc<CommandRegistry>) -> PluginSource {
    PluginSource::module(NAME, move |_forum, config| {
        let config: PingConfig = super::plugin_config(config)?;
        Ok(PluginInstance::object(PingPlugin::new(
            Arc::clone(&registry),
            config,
        )))
    })
}

/// Registers its command on activate and removes it on deactivate.
pub struct PingPlugin {
    registry: Arc<CommandRegistry>,
    config: PingConfig,
}

impl PingPlugin {
    pub fn new(registry: Arc<CommandRegistry>, config: PingConfig) -> Self {
        Self { registry, config }
    }
}

#[async_trait]
impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn activate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.config.command.trim().is_empty(),
            "ping: command name must not be empty"
        );
        self.registry.register(
            &self.config.command,
            Arc::new(PingHandler {
                response: self.config.response.clone(),
            }),
        );
        info!(command = %self.config.command, "ping: activated");
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        self.registry.unregister(&self.config.command);
        Ok(())
    }
}

struct PingHandler {
    response: String,
}

#[async_trait]
impl CommandHandler for PingHandler {
    fn help(&self) -> &str {
        "check that the bot is alive"
    }

    async fn handle(&self, invocation: &CommandInvocation) -> Result<()> {
        invocation.reply.send(&self.response).await?;
        Ok(())
    }
}
