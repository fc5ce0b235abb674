use std::error::Error as StdError;

/// Crate-wide result type for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a generated plugin was refused by [`crate::Forum::add_plugin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PluginContractError {
    /// The generator produced nothing that looks like a plugin.
    #[error("invalid plugin: generator returned no plugin object")]
    NoPluginObject,

    #[error("invalid plugin: no activate function")]
    MissingActivate,

    #[error("invalid plugin: no deactivate function")]
    MissingDeactivate,
}

/// Typed provider errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not be brought up, or a later activation step
    /// failed and the connector rolled back.
    #[error("activation failed: {reason}")]
    Activation { reason: String },

    /// The transport could not be torn down cleanly.
    #[error("deactivation failed: {reason}")]
    Deactivation { reason: String },

    #[error(transparent)]
    PluginContract(#[from] PluginContractError),

    /// A plugin generator failed before producing a plugin.
    #[error("plugin generator failed: {reason}")]
    Plugin { reason: String },

    /// The command processor rejected or failed one inbound message.
    #[error("command processing failed: {reason}")]
    CommandProcessing { reason: String },

    /// The transport can never perform this operation.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// The operation could exist for this transport but has not been built.
    #[error("not implemented: {operation}")]
    NotImplemented { operation: &'static str },

    /// A transport payload could not be turned into a domain object.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("forum is not activated")]
    NotActivated,

    #[error("commands handle was already set during this activation")]
    CommandsAlreadySet,

    #[error("unknown user: {name}")]
    UnknownUser { name: String },

    /// Operation is currently unavailable (session gone, not configured).
    #[error("provider operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from the transport.
    #[error("transport operation failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn activation(reason: impl std::fmt::Display) -> Self {
        Self::Activation {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn deactivation(reason: impl std::fmt::Display) -> Self {
        Self::Deactivation {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn plugin(reason: impl std::fmt::Display) -> Self {
        Self::Plugin {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn command_processing(reason: impl std::fmt::Display) -> Self {
        Self::CommandProcessing {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    #[must_use]
    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True when the operation can never succeed on this transport.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// True when the operation is possible in principle but missing.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_and_not_implemented_are_distinct() {
        let unsupported = Error::unsupported("Post::edit");
        let missing = Error::not_implemented("Topic::watch");

        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_not_implemented());
        assert!(missing.is_not_implemented());
        assert!(!missing.is_unsupported());
    }

    #[test]
    fn plugin_contract_converts() {
        let err: Error = PluginContractError::MissingDeactivate.into();
        assert!(matches!(
            err,
            Error::PluginContract(PluginContractError::MissingDeactivate)
        ));
        assert_eq!(err.to_string(), "invalid plugin: no deactivate function");
    }
}
