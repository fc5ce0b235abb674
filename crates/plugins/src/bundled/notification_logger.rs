//! `notification-logger` plugin: appends every notification to a JSONL file.

use std::{
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::Deserialize,
    tracing::{info, warn},
};

use sockbot_provider::{
    EventBus, Notification, NotificationHandler, NotificationTopic, Plugin, PluginInstance,
    PluginSource, SubscriptionId,
};

pub const NAME: &str = "notification-logger";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Log file; defaults to [`default_path`].
    pub path: Option<PathBuf>,
}

/// `<data dir>/logs/notifications.jsonl`, e.g.
/// `~/.local/share/sockbot/logs/notifications.jsonl` on Linux.
pub fn default_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "sockbot")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
        .join("notifications.jsonl")
}

pub fn source() -> PluginSource {
    PluginSource::module(NAME, |forum, config| {
        let config: LoggerConfig = super::plugin_config(config)?;
        let path = config.path.unwrap_or_else(default_path);
        Ok(PluginInstance::object(NotificationLogger::new(
            Arc::clone(forum.bus()),
            path,
        )))
    })
}

/// Subscribes a [`JsonlSink`] to the generic notification topic while active.
pub struct NotificationLogger {
    bus: Arc<EventBus>,
    sink: Arc<JsonlSink>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl NotificationLogger {
    pub fn new(bus: Arc<EventBus>, log_path: PathBuf) -> Self {
        Self {
            bus,
            sink: Arc::new(JsonlSink::new(log_path)),
            subscription: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Plugin for NotificationLogger {
    fn name(&self) -> &str {
        NAME
    }

    async fn activate(&self) -> Result<()> {
        let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if subscription.is_some() {
            return Ok(());
        }
        self.sink.open()?;
        let handler: Arc<dyn NotificationHandler> = self.sink.clone();
        *subscription = Some(self.bus.subscribe(NotificationTopic::Any, handler));
        info!(path = %self.sink.log_path.display(), "notification-logger: activated");
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        let id = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(id) = id {
            self.bus.unsubscribe(id);
        }
        self.sink.close();
        Ok(())
    }
}

/// Appends one JSON object per notification.
pub struct JsonlSink {
    log_path: PathBuf,
    /// Writes go through a mutex so lines never interleave.
    file: Mutex<Option<std::fs::File>>,
}

impl JsonlSink {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            file: Mutex::new(None),
        }
    }

    fn open(&self) -> Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            if let Some(parent) = self.log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)?;
            *guard = Some(file);
        }
        Ok(())
    }

    fn close(&self) {
        self.file.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

impl NotificationHandler for JsonlSink {
    fn handle(&self, topic: NotificationTopic, notification: &Arc<Notification>) {
        let entry = serde_json::json!({
            "ts": notification.received_at().to_rfc3339(),
            "topic": topic.as_str(),
            "id": notification.id(),
            "kind": notification.kind().as_str(),
            "user": notification.source_user_id(),
            "channel": notification.channel_id(),
            "body": notification.body(),
        });

        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref mut f) = *guard
            && let Err(e) = writeln!(f, "{entry}")
        {
            warn!(error = %e, "notification-logger: failed to write log entry");
        }
    }
}
