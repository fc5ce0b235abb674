//! Forum connector: owns the transport session, the notification pipeline,
//! the command handle and the plugin list, and drives their lifecycle.

use std::{
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    async_trait::async_trait,
    futures::future::join_all,
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Mutex as AsyncMutex,
    tracing::{debug, info, warn},
};

use crate::{
    capability::{self, Capability, SupportQuery},
    commands::CommandProcessor,
    domain::User,
    error::{Error, Result},
    events::{EventBus, NotificationHandler, NotificationTopic, SubscriptionId},
    pipeline::{CommandsSlot, NotificationPipeline},
    plugin::{Plugin, PluginSource},
    transport::{
        ErrorClass, ListenerId, SessionSettings, TransportConnector, TransportEvent,
        TransportEventKind, TransportListener, TransportSession,
    },
};

/// Display name presented to the network.
pub const USER_AGENT: &str = "Sockbot IRC Edition";

/// Identity service that receives `IDENTIFY` when none is configured.
pub const DEFAULT_NICK_SERV: &str = "NickServ";

/// Everything the connector needs to know about the bot's account.
#[derive(Clone)]
pub struct ForumSettings {
    /// The bot's nickname; also what mentions are matched against.
    pub username: String,
    pub owner: String,
    pub password: Option<Secret<String>>,
    pub nick_serv: Option<String>,
    pub session: SessionSettings,
}

impl ForumSettings {
    pub fn new(username: impl Into<String>, server: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            session: SessionSettings {
                server: server.into(),
                nickname: username.clone(),
                ..SessionSettings::default()
            },
            username,
            owner: String::new(),
            password: None,
            nick_serv: None,
        }
    }

    pub fn nick_serv(&self) -> &str {
        self.nick_serv.as_deref().unwrap_or(DEFAULT_NICK_SERV)
    }
}

impl fmt::Debug for ForumSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForumSettings")
            .field("username", &self.username)
            .field("owner", &self.owner)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("nick_serv", &self.nick_serv())
            .field("session", &self.session)
            .finish()
    }
}

#[derive(Default)]
struct LifecycleState {
    error_listener: Option<ListenerId>,
}

struct ForumInner {
    settings: ForumSettings,
    connector: Arc<dyn TransportConnector>,
    bus: Arc<EventBus>,
    commands: Arc<CommandsSlot>,
    commands_set: AtomicBool,
    pipeline: NotificationPipeline,
    /// Serializes activate / deactivate / add_plugin.
    lifecycle: AsyncMutex<LifecycleState>,
    session: RwLock<Option<Arc<dyn TransportSession>>>,
    activated: AtomicBool,
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    identity_warned: Arc<AtomicBool>,
}

/// Connects the bot to a chat network and exposes it through the forum
/// abstraction. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Forum {
    inner: Arc<ForumInner>,
}

impl Forum {
    pub fn new(settings: ForumSettings, connector: Arc<dyn TransportConnector>) -> Self {
        let bus = Arc::new(EventBus::new());
        let commands: Arc<CommandsSlot> = Arc::new(RwLock::new(None));
        let pipeline = NotificationPipeline::new(
            settings.username.clone(),
            Arc::clone(&bus),
            Arc::clone(&commands),
        );
        Self {
            inner: Arc::new(ForumInner {
                settings,
                connector,
                bus,
                commands,
                commands_set: AtomicBool::new(false),
                pipeline,
                lifecycle: AsyncMutex::new(LifecycleState::default()),
                session: RwLock::new(None),
                activated: AtomicBool::new(false),
                plugins: RwLock::new(Vec::new()),
                identity_warned: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn settings(&self) -> &ForumSettings {
        &self.inner.settings
    }

    pub fn useragent(&self) -> &'static str {
        USER_AGENT
    }

    /// Chat networks have no base URL.
    pub fn url(&self) -> Result<String> {
        Err(Error::unsupported("Forum::url"))
    }

    pub fn username(&self) -> &str {
        &self.inner.settings.username
    }

    pub fn owner(&self) -> &str {
        &self.inner.settings.owner
    }

    /// The bot's own user.
    pub fn user(&self) -> User {
        User::from_nick(&self.inner.settings.username)
    }

    pub fn is_activated(&self) -> bool {
        self.inner.activated.load(Ordering::SeqCst)
    }

    pub fn plugin_count(&self) -> usize {
        self.inner
            .plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    pub fn pipeline(&self) -> &NotificationPipeline {
        &self.inner.pipeline
    }

    /// Live transport session, if activated.
    pub fn session(&self) -> Option<Arc<dyn TransportSession>> {
        self.inner
            .session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe(
        &self,
        topic: NotificationTopic,
        handler: Arc<dyn NotificationHandler>,
    ) -> SubscriptionId {
        self.inner.bus.subscribe(topic, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    pub fn commands(&self) -> Option<Arc<dyn CommandProcessor>> {
        self.inner
            .commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install the command processor. Allowed once until the next
    /// `deactivate()`; a second call fails with [`Error::CommandsAlreadySet`].
    pub fn set_commands(&self, processor: Arc<dyn CommandProcessor>) -> Result<()> {
        if self.inner.commands_set.swap(true, Ordering::SeqCst) {
            return Err(Error::CommandsAlreadySet);
        }
        *self
            .inner
            .commands
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(processor);
        debug!("command processor installed");
        Ok(())
    }

    /// Answer whether a capability (or every capability in a list) is
    /// available. Names are exact and case-sensitive.
    pub fn supports<Q: SupportQuery + ?Sized>(&self, query: &Q) -> bool {
        query.is_supported()
    }

    /// Bring the connector up: connect, watch for identity errors, identify,
    /// start the pipeline, then activate every plugin concurrently. Any
    /// failure tears down what was started and returns
    /// [`Error::Activation`]. No-op when already activated.
    pub async fn activate(&self) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if self.is_activated() {
            debug!("forum already activated");
            return Ok(());
        }

        let settings = &self.inner.settings;
        info!(
            server = %settings.session.server,
            nick = %settings.session.nickname,
            channels = settings.session.channels.len(),
            "activating forum"
        );
        let session = self
            .inner
            .connector
            .connect(&settings.session)
            .await
            .map_err(|e| Error::activation(format!("connect failed: {e}")))?;

        let advisory = Arc::new(IdentityAdvisory {
            username: settings.username.clone(),
            warned: Arc::clone(&self.inner.identity_warned),
        });
        lifecycle.error_listener = Some(session.add_listener(TransportEventKind::Error, advisory));
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&session));
        self.inner.activated.store(true, Ordering::SeqCst);

        if let Err(e) = self.identify(&session).await {
            self.roll_back(&mut lifecycle, &[]).await;
            return Err(Error::activation(format!("login failed: {e}")));
        }
        if let Err(e) = self.inner.pipeline.activate(&session).await {
            self.roll_back(&mut lifecycle, &[]).await;
            return Err(Error::activation(format!("pipeline failed: {e}")));
        }

        let plugins = self.plugin_snapshot();
        let results = join_all(plugins.iter().map(|plugin| plugin.activate())).await;
        let mut started = Vec::new();
        let mut failures = Vec::new();
        for (plugin, result) in plugins.iter().zip(results) {
            match result {
                Ok(()) => started.push(Arc::clone(plugin)),
                Err(e) => failures.push(format!("{}: {e:#}", plugin.name())),
            }
        }
        if !failures.is_empty() {
            self.roll_back(&mut lifecycle, &started).await;
            return Err(Error::activation(format!(
                "plugin activation failed: {}",
                failures.join("; ")
            )));
        }

        info!(plugins = plugins.len(), "forum activated");
        Ok(())
    }

    /// Tear everything down: plugins (concurrently), the pipeline, the error
    /// listener, then the session. Teardown always runs to completion; plugin
    /// or disconnect failures are reported afterwards as
    /// [`Error::Deactivation`]. No-op when not activated.
    pub async fn deactivate(&self) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if !self.is_activated() {
            debug!("forum not activated");
            return Ok(());
        }

        let plugins = self.plugin_snapshot();
        let mut failures = deactivate_plugins(&plugins).await;

        if let Err(e) = self.inner.pipeline.deactivate().await {
            failures.push(format!("pipeline: {e}"));
        }

        let session = self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(id) = lifecycle.error_listener.take()
            && let Some(session) = session.as_ref()
        {
            session.remove_listener(id);
        }
        self.inner.activated.store(false, Ordering::SeqCst);
        self.inner.commands_set.store(false, Ordering::SeqCst);

        if let Some(session) = session
            && let Err(e) = session.disconnect().await
        {
            failures.push(format!("disconnect: {e}"));
        }

        if failures.is_empty() {
            info!("forum deactivated");
            Ok(())
        } else {
            warn!(failures = failures.len(), "forum deactivated with errors");
            Err(Error::deactivation(failures.join("; ")))
        }
    }

    /// Identify with the identity service when a password is configured.
    /// Does nothing unless activated.
    pub async fn login(&self) -> Result<()> {
        if !self.is_activated() {
            debug!("login skipped, forum not activated");
            return Ok(());
        }
        let session = self.session().ok_or(Error::NotActivated)?;
        self.identify(&session).await
    }

    async fn identify(&self, session: &Arc<dyn TransportSession>) -> Result<()> {
        let Some(password) = self.inner.settings.password.as_ref() else {
            debug!("no password configured, skipping identify");
            return Ok(());
        };
        let service = self.inner.settings.nick_serv();
        session
            .send(service, &format!("IDENTIFY {}", password.expose_secret()))
            .await?;
        info!(service, "sent identify");
        Ok(())
    }

    /// Run a plugin generator and admit what it returns.
    ///
    /// Rejected plugins are not added. When the forum is already activated
    /// the plugin is activated before it is added; if that fails it is not
    /// added either.
    pub async fn add_plugin(&self, source: PluginSource, config: &serde_json::Value) -> Result<()> {
        let label = source.name().unwrap_or("anonymous").to_string();
        let instance = (source.generator())(self, config).map_err(|e| {
            warn!(plugin = %label, error = %e, "plugin generator failed");
            Error::plugin(format!("{e:#}"))
        })?;
        let plugin = instance.into_plugin().map_err(|e| {
            warn!(plugin = %label, error = %e, "plugin rejected");
            Error::from(e)
        })?;

        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.is_activated() {
            plugin.activate().await.map_err(|e| {
                Error::activation(format!("plugin {}: {e:#}", plugin.name()))
            })?;
        }
        self.inner
            .plugins
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&plugin));
        info!(plugin = %plugin.name(), "plugin added");
        Ok(())
    }

    /// Send text to a channel or nick over the live session.
    pub async fn send(&self, destination: &str, text: &str) -> Result<()> {
        let session = self.session().ok_or(Error::NotActivated)?;
        session.send(destination, text).await
    }

    /// Resolve a nick through the transport's identity lookup.
    pub async fn lookup_user(&self, name: &str) -> Result<User> {
        capability::require(Capability::Users, "Forum::lookup_user")?;
        let session = self.session().ok_or(Error::NotActivated)?;
        match session.lookup_identity(name).await? {
            Some(info) => Ok(User::from_identity(info)),
            None => Err(Error::UnknownUser {
                name: name.to_string(),
            }),
        }
    }

    pub async fn send_private_message(&self, user: &str, content: &str) -> Result<()> {
        capability::require(Capability::PrivateMessage, "Forum::send_private_message")?;
        self.send(user, content).await
    }

    fn plugin_snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.inner
            .plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn roll_back(&self, lifecycle: &mut LifecycleState, started: &[Arc<dyn Plugin>]) {
        for failure in deactivate_plugins(started).await {
            warn!(failure = %failure, "plugin deactivation failed during rollback");
        }
        if let Err(e) = self.inner.pipeline.deactivate().await {
            warn!(error = %e, "pipeline deactivation failed during rollback");
        }
        let session = self
            .inner
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = session {
            if let Some(id) = lifecycle.error_listener.take() {
                session.remove_listener(id);
            }
            if let Err(e) = session.disconnect().await {
                warn!(error = %e, "disconnect failed during rollback");
            }
        }
        lifecycle.error_listener = None;
        self.inner.activated.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for Forum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forum")
            .field("username", &self.username())
            .field("activated", &self.is_activated())
            .field("plugins", &self.plugin_count())
            .finish()
    }
}

async fn deactivate_plugins(plugins: &[Arc<dyn Plugin>]) -> Vec<String> {
    let results = join_all(plugins.iter().map(|plugin| plugin.deactivate())).await;
    plugins
        .iter()
        .zip(results)
        .filter_map(|(plugin, result)| {
            result
                .err()
                .map(|e| format!("{}: {e:#}", plugin.name()))
        })
        .collect()
}

/// Logs, once per connector, that the bot's nick is not registered with the
/// identity service.
struct IdentityAdvisory {
    username: String,
    warned: Arc<AtomicBool>,
}

#[async_trait]
impl TransportListener for IdentityAdvisory {
    async fn on_event(&self, event: &TransportEvent) {
        let TransportEvent::Error(error) = event else {
            return;
        };
        if error.classification == ErrorClass::UnregisteredIdentity {
            if !self.warned.swap(true, Ordering::SeqCst) {
                warn!(
                    nick = %self.username,
                    command = %error.command,
                    "nick is not registered with the identity service; some channels may refuse messages until it is"
                );
            }
        } else {
            debug!(
                class = ?error.classification,
                command = %error.command,
                message = %error.message,
                "transport error"
            );
        }
    }
}
