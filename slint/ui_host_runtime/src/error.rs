use thiserror::Error;

/// An inbound payload that cannot be turned into a [`crate::protocol::BackendPacket`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

/// Why an outbound payload did not reach the transport.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("channel is not connected")]
    NotConnected,
    #[error("channel writer has shut down")]
    Closed,
    #[error("failed to encode client event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A widget interaction that cannot be forwarded as entered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectedInput {
    #[error("'{value}' is not a valid {format} date")]
    InvalidDate { value: String, format: &'static str },
    #[error("input '{input_id}' is required")]
    MissingRequired { input_id: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint url '{value}': {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported endpoint scheme '{scheme}', expected ws")]
    UnsupportedScheme { scheme: String },
    #[error("invalid clear scope '{0}', expected 'global' or 'container'")]
    InvalidClearScope(String),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Platform(#[from] slint::PlatformError),
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a widget interaction did not reach the agent.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Rejected(#[from] RejectedInput),
    #[error(transparent)]
    Send(#[from] SendError),
}
