/// Failures that reach the caller through `SkillEventHandler::on_error`.
///
/// Only these three kinds are ever surfaced. Malformed frames and cleanup
/// failures are absorbed inside the client (see [`FrameError`] and
/// [`ReleaseError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum InvokeError {
    /// The invocation endpoint answered with a non-success status, or the
    /// request could not be sent. Terminal; no events were processed.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The byte source failed after streaming had started.
    #[error("{message}")]
    Read { message: String },
    /// The caller's cancellation token fired.
    #[error("Request was aborted")]
    Cancelled,
}

impl InvokeError {
    /// Creates a transport error for a response with the given status.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Creates a mid-stream read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Returns true when the error comes from caller-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the HTTP status for transport errors that carry one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Top-level error type for client construction and the convenience APIs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid invocation request.
    #[error("validation error: {0}")]
    Validation(String),
    /// The invocation itself failed.
    #[error(transparent)]
    Invoke(InvokeError),
    /// Internal channel or task misuse.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<InvokeError> for ClientError {
    fn from(value: InvokeError) -> Self {
        ClientError::Invoke(value)
    }
}

/// A single frame that could not be turned into a `SkillEvent`.
///
/// Recovered locally: the frame is dropped and the stream continues.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FrameError {
    #[error("line is not a data frame")]
    MissingPrefix,
    #[error("malformed skill event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Releasing a byte source failed. Logged, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to release byte source: {0}")]
pub struct ReleaseError(pub String);
