//! Plugin contract and admission.
//!
//! A plugin is anything with an async `activate` and `deactivate`. Plugins
//! are produced by a generator that receives the forum and the plugin's
//! config; [`Forum::add_plugin`](crate::Forum::add_plugin) is the only way in.

use std::{fmt, sync::Arc};

use {
    async_trait::async_trait,
    futures::future::{BoxFuture, FutureExt},
};

use crate::{error::PluginContractError, forum::Forum};

/// Lifecycle contract every admitted plugin satisfies.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str {
        "plugin"
    }

    async fn activate(&self) -> anyhow::Result<()>;

    async fn deactivate(&self) -> anyhow::Result<()>;
}

/// Zero-argument async lifecycle step.
pub type LifecycleHook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A plugin assembled from loose lifecycle closures. Either half may be
/// missing; admission rejects incomplete bundles.
#[derive(Clone, Default)]
pub struct PluginHooks {
    name: String,
    activate: Option<LifecycleHook>,
    deactivate: Option<LifecycleHook>,
}

impl PluginHooks {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activate: None,
            deactivate: None,
        }
    }

    pub fn on_activate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.activate = Some(Arc::new(move || hook().boxed()));
        self
    }

    pub fn on_deactivate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.deactivate = Some(Arc::new(move || hook().boxed()));
        self
    }

    fn validate(self) -> Result<HookPlugin, PluginContractError> {
        let activate = self.activate.ok_or(PluginContractError::MissingActivate)?;
        let deactivate = self
            .deactivate
            .ok_or(PluginContractError::MissingDeactivate)?;
        Ok(HookPlugin {
            name: self.name,
            activate,
            deactivate,
        })
    }
}

impl fmt::Debug for PluginHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHooks")
            .field("name", &self.name)
            .field("activate", &self.activate.is_some())
            .field("deactivate", &self.deactivate.is_some())
            .finish()
    }
}

struct HookPlugin {
    name: String,
    activate: LifecycleHook,
    deactivate: LifecycleHook,
}

#[async_trait]
impl Plugin for HookPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn activate(&self) -> anyhow::Result<()> {
        (self.activate)().await
    }

    async fn deactivate(&self) -> anyhow::Result<()> {
        (self.deactivate)().await
    }
}

/// What a generator hands back.
pub enum PluginInstance {
    /// A complete plugin object.
    Object(Arc<dyn Plugin>),
    /// Loose lifecycle closures, validated on admission.
    Hooks(PluginHooks),
    /// The generator produced no plugin.
    Empty,
}

impl PluginInstance {
    pub fn object(plugin: impl Plugin + 'static) -> Self {
        Self::Object(Arc::new(plugin))
    }

    /// Check the contract and produce an admissible plugin.
    pub fn into_plugin(self) -> Result<Arc<dyn Plugin>, PluginContractError> {
        match self {
            Self::Object(plugin) => Ok(plugin),
            Self::Hooks(hooks) => Ok(Arc::new(hooks.validate()?)),
            Self::Empty => Err(PluginContractError::NoPluginObject),
        }
    }
}

/// Plugin generator: `(forum, config) -> plugin`.
pub type PluginFactory =
    Arc<dyn Fn(&Forum, &serde_json::Value) -> anyhow::Result<PluginInstance> + Send + Sync>;

/// A generator wrapped with a name, the shape plugin modules export.
#[derive(Clone)]
pub struct PluginModule {
    pub name: String,
    pub plugin: PluginFactory,
}

/// Where a plugin comes from: a bare generator, or a module exposing one.
#[derive(Clone)]
pub enum PluginSource {
    Factory(PluginFactory),
    Module(PluginModule),
}

impl PluginSource {
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Forum, &serde_json::Value) -> anyhow::Result<PluginInstance> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    pub fn module<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Forum, &serde_json::Value) -> anyhow::Result<PluginInstance> + Send + Sync + 'static,
    {
        Self::Module(PluginModule {
            name: name.into(),
            plugin: Arc::new(factory),
        })
    }

    /// The generator to invoke.
    pub fn generator(&self) -> &PluginFactory {
        match self {
            Self::Factory(factory) => factory,
            Self::Module(module) => &module.plugin,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Factory(_) => None,
            Self::Module(module) => Some(&module.name),
        }
    }
}

impl fmt::Debug for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("PluginSource::Factory"),
            Self::Module(module) => write!(f, "PluginSource::Module({})", module.name),
        }
    }
}
