use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("timed out waiting for {what}")]
    Timeout { what: &'static str },

    /// The server refused registration (`432`, `433`, `ERROR`, ...).
    #[error("registration rejected ({code}): {message}")]
    Registration { code: String, message: String },

    #[error("invalid message target: {target:?}")]
    InvalidTarget { target: String },

    #[error("invalid server address: {address:?}")]
    InvalidAddress { address: String },

    #[error("connection closed")]
    Closed,
}

impl Error {
    #[must_use]
    pub fn registration(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registration {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_target(target: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
        }
    }
}

impl From<Error> for sockbot_provider::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidTarget { target } => {
                sockbot_provider::Error::malformed(format!("invalid message target: {target:?}"))
            },
            Error::Closed => sockbot_provider::Error::unavailable("irc connection closed"),
            other => sockbot_provider::Error::transport("irc", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
