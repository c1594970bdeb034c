//! Error Types
//!
//! Every failure the core can surface, grouped into the four kinds the
//! front-end distinguishes when deciding what (if anything) to show the user.
//!
//! Alerts describe an error as `"{name}: {message}"`, where `name` comes from
//! [`AgentError::name`] and `message` from its `Display` impl.

use std::fmt;

use thiserror::Error;

use crate::room::{RoomError, TrackSource};

/// Coarse classification of an [`AgentError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required setting is missing or malformed
    Configuration,
    /// Non-2xx response or transport failure talking to a remote service
    Network,
    /// Microphone/camera/screen capture denied or failed
    Device,
    /// A failure that arrived after its operation was torn down
    StaleOperation,
}

impl ErrorKind {
    /// Stable name used in alert descriptions
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Network => "NetworkError",
            Self::Device => "DeviceError",
            Self::StaleOperation => "StaleOperationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced by the agent core
#[derive(Debug, Error)]
pub enum AgentError {
    /// A required environment value is absent
    #[error("{0} is not defined")]
    MissingSetting(&'static str),

    /// A setting is present but unusable
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Participant token could not be signed or verified
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Remote endpoint answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// HTTP request could not be completed or its body decoded
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The real-time transport refused or dropped the connection
    #[error("connection failed: {0}")]
    Connection(String),

    /// A capture device failed or permission was denied
    #[error("{device}: {message}")]
    Device {
        /// Which device failed
        device: TrackSource,
        /// Underlying reason
        message: String,
    },

    /// The operation was cancelled by a session teardown
    #[error("operation superseded by session teardown")]
    Stale,
}

impl AgentError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSetting(_) | Self::InvalidSetting { .. } | Self::Signing(_) => {
                ErrorKind::Configuration
            }
            Self::HttpStatus(_) | Self::Request(_) | Self::Connection(_) => ErrorKind::Network,
            Self::Device { .. } => ErrorKind::Device,
            Self::Stale => ErrorKind::StaleOperation,
        }
    }

    /// Error name shown in alerts (e.g. `NetworkError`)
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// `"{name}: {message}"` as shown in alert descriptions
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}: {}", self.name(), self)
    }

    /// Whether this error should be dropped instead of surfaced
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

impl From<RoomError> for AgentError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::PermissionDenied { device, message }
            | RoomError::DeviceUnavailable { device, message } => {
                Self::Device { device, message }
            }
            RoomError::ConnectionFailed(message) => Self::Connection(message),
            RoomError::InvalidState(message) => Self::Connection(message),
        }
    }
}

/// Convenience alias for core results
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_names() {
        assert_eq!(AgentError::HttpStatus(500).name(), "NetworkError");
        assert_eq!(
            AgentError::MissingSetting("LIVEKIT_URL").name(),
            "ConfigurationError"
        );
        assert_eq!(AgentError::Stale.name(), "StaleOperationError");
    }

    #[test]
    fn test_describe_includes_name_and_message() {
        let err = AgentError::HttpStatus(500);
        assert_eq!(err.describe(), "NetworkError: HTTP error! status: 500");

        let err = AgentError::MissingSetting("LIVEKIT_API_KEY");
        assert_eq!(
            err.describe(),
            "ConfigurationError: LIVEKIT_API_KEY is not defined"
        );
    }

    #[test]
    fn test_room_error_mapping() {
        let err: AgentError = RoomError::PermissionDenied {
            device: TrackSource::Microphone,
            message: "NotAllowedError".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(err.to_string(), "microphone: NotAllowedError");

        let err: AgentError = RoomError::ConnectionFailed("signal closed".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.is_stale());
    }
}
