use crate::handshake::ErrorReason;

/// Crate-wide result alias.
pub type MotionResult<T> = Result<T, MotionError>;

/// Every failure the animation and export core can surface.
///
/// The first five variants are the fixed export failure taxonomy reported across the host
/// boundary; see [`MotionError::reason`].
#[derive(thiserror::Error, Debug)]
pub enum MotionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("capture not ready: {0}")]
    CaptureNotReady(String),

    #[error("truncated export: {0}")]
    TruncatedExport(String),

    #[error("delivery failed: {0}")]
    DownstreamDelivery(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MotionError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn capture_not_ready(msg: impl Into<String>) -> Self {
        Self::CaptureNotReady(msg.into())
    }

    pub fn truncated(msg: impl Into<String>) -> Self {
        Self::TruncatedExport(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::DownstreamDelivery(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Handshake reason tag for this error.
    ///
    /// Validation problems are configuration problems from the host's point of view; encoder
    /// and internal failures surface as capture failures since no asset was produced.
    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::Configuration(_) | Self::Validation(_) => ErrorReason::Configuration,
            Self::Timeout(_) => ErrorReason::Timeout,
            Self::CaptureNotReady(_) | Self::Encode(_) | Self::InvalidState(_) | Self::Other(_) => {
                ErrorReason::CaptureNotReady
            }
            Self::TruncatedExport(_) => ErrorReason::TruncatedExport,
            Self::DownstreamDelivery(_) => ErrorReason::DownstreamDelivery,
        }
    }

    /// Human readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(m)
            | Self::Timeout(m)
            | Self::CaptureNotReady(m)
            | Self::TruncatedExport(m)
            | Self::DownstreamDelivery(m)
            | Self::InvalidState(m)
            | Self::Validation(m)
            | Self::Encode(m) => m.clone(),
            Self::Other(e) => format!("{e:#}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
