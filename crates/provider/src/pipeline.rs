//! Notification pipeline: transport `message` events in, notifications and
//! command executions out.

use std::sync::{
    Arc, Mutex, RwLock, Weak,
    atomic::{AtomicU64, Ordering},
};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    tracing::{debug, info, warn},
};

use crate::{
    commands::{CommandContext, CommandProcessor, ReplyHandle},
    error::{Error, Result},
    events::{EventBus, NotificationTopic},
    notification::{MessagePayload, Notification, NotificationKind},
    transport::{ListenerId, TransportEvent, TransportEventKind, TransportListener, TransportSession},
};

/// Shared slot for the command processor. The connector owns the write side.
pub type CommandsSlot = RwLock<Option<Arc<dyn CommandProcessor>>>;

struct Registration {
    transport: Weak<dyn TransportSession>,
    listener: ListenerId,
}

struct PipelineInner {
    username: String,
    bus: Arc<EventBus>,
    commands: Arc<CommandsSlot>,
    transport: RwLock<Option<Weak<dyn TransportSession>>>,
    registration: Mutex<Option<Registration>>,
    next_id: AtomicU64,
    last_received: Mutex<Option<DateTime<Utc>>>,
}

/// Bridges raw transport messages into [`Notification`]s.
#[derive(Clone)]
pub struct NotificationPipeline {
    inner: Arc<PipelineInner>,
}

impl NotificationPipeline {
    pub fn new(username: impl Into<String>, bus: Arc<EventBus>, commands: Arc<CommandsSlot>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                username: username.into(),
                bus,
                commands,
                transport: RwLock::new(None),
                registration: Mutex::new(None),
                next_id: AtomicU64::new(1),
                last_received: Mutex::new(None),
            }),
        }
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .registration
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Start listening for `message` events on `transport`.
    ///
    /// Idempotent: while already listening on the same session this does
    /// nothing. Activating against a different session moves the listener.
    pub async fn activate(&self, transport: &Arc<dyn TransportSession>) -> Result<()> {
        let mut registration = self
            .inner
            .registration
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(current) = registration.as_ref() {
            match current.transport.upgrade() {
                Some(existing) if Arc::ptr_eq(&existing, transport) => {
                    debug!("notification pipeline already active");
                    return Ok(());
                },
                Some(existing) => {
                    existing.remove_listener(current.listener);
                },
                None => {},
            }
        }

        let listener = Arc::new(PipelineListener {
            pipeline: Arc::downgrade(&self.inner),
        });
        let id = transport.add_listener(TransportEventKind::Message, listener);
        let weak = Arc::downgrade(transport);
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(weak.clone());
        *registration = Some(Registration {
            transport: weak,
            listener: id,
        });
        info!(username = %self.inner.username, "notification pipeline activated");
        Ok(())
    }

    /// Stop listening. No-op when not active.
    pub async fn deactivate(&self) -> Result<()> {
        let registration = self
            .inner
            .registration
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;

        match registration {
            Some(registration) => {
                if let Some(transport) = registration.transport.upgrade() {
                    transport.remove_listener(registration.listener);
                }
                info!("notification pipeline deactivated");
            },
            None => debug!("notification pipeline was not active"),
        }
        Ok(())
    }

    /// Handle one inbound chat line.
    ///
    /// Emits on `notification:message` then `notification` (and
    /// `notification:mention` when the body names the bot) before any command
    /// runs, then offers the body to the command processor. A processor error
    /// is returned for this message only.
    pub async fn receive_message(
        &self,
        source_user_id: &str,
        channel_id: &str,
        body: &str,
        raw: &str,
    ) -> Result<Arc<Notification>> {
        self.inner
            .receive(MessagePayload {
                source_user_id: source_user_id.to_string(),
                channel_id: channel_id.to_string(),
                body: body.to_string(),
                raw: raw.to_string(),
            })
            .await
    }
}

impl PipelineInner {
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_received.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        // Wall clock may step backwards; never hand out an earlier time.
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    async fn receive(&self, payload: MessagePayload) -> Result<Arc<Notification>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Arc::new(Notification::new(id, payload, self.next_timestamp())?);

        self.bus.emit(NotificationTopic::Message, &notification);
        self.bus.emit(NotificationTopic::Any, &notification);
        let derived = notification.classify(&self.username);
        if derived == NotificationKind::Mention {
            self.bus.emit(NotificationTopic::for_kind(derived), &notification);
        }

        self.dispatch_commands(&notification).await?;
        Ok(notification)
    }

    async fn dispatch_commands(&self, notification: &Notification) -> Result<()> {
        let processor = self
            .commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(processor) = processor else {
            debug!(id = notification.id(), "no command processor set, skipping dispatch");
            return Ok(());
        };

        let transport = self
            .transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let reply = match transport {
            Some(transport) => ReplyHandle::new(transport, notification.reply_target()),
            None => ReplyHandle::detached(notification.reply_target()),
        };
        let context = CommandContext::from_notification(notification);

        let batch = processor
            .match_commands(context, notification.body(), reply)
            .await
            .map_err(|e| Error::command_processing(format!("{e:#}")))?;
        if batch.is_empty() {
            return Ok(());
        }

        debug!(id = notification.id(), commands = batch.len(), "executing matched commands");
        batch
            .execute()
            .await
            .map_err(|e| Error::command_processing(format!("{e:#}")))
    }
}

/// Registered on the transport; forwards `message` events into the pipeline.
struct PipelineListener {
    pipeline: Weak<PipelineInner>,
}

#[async_trait]
impl TransportListener for PipelineListener {
    async fn on_event(&self, event: &TransportEvent) {
        let TransportEvent::Message {
            source,
            destination,
            text,
            raw,
        } = event
        else {
            return;
        };
        let Some(pipeline) = self.pipeline.upgrade() else {
            return;
        };

        let payload = MessagePayload {
            source_user_id: source.clone(),
            channel_id: destination.clone(),
            body: text.clone(),
            raw: raw.clone(),
        };
        // One bad line must not take the listener down.
        if let Err(e) = pipeline.receive(payload).await {
            warn!(source = %source, channel = %destination, error = %e, "failed to process message");
        }
    }
}
