use std::sync::Arc;

use {async_trait::async_trait, tracing::warn};

use sockbot_provider::{SessionSettings, TransportConnector, TransportSession};

use crate::session::{IrcOptions, IrcSession};

/// Opens a fresh [`IrcSession`] on every forum activation.
#[derive(Debug, Clone, Default)]
pub struct IrcConnector {
    options: IrcOptions,
}

impl IrcConnector {
    pub fn new(options: IrcOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IrcOptions {
        &self.options
    }
}

#[async_trait]
impl TransportConnector for IrcConnector {
    async fn connect(
        &self,
        settings: &SessionSettings,
    ) -> sockbot_provider::Result<Arc<dyn TransportSession>> {
        let session: Arc<dyn TransportSession> = IrcSession::connect(settings, &self.options)
            .await
            .inspect_err(|e| warn!(server = %settings.server, error = %e, "irc connect failed"))?;
        Ok(session)
    }
}
