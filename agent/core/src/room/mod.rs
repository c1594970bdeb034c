//! Real-Time Room Transport
//!
//! Trait seam between the session controller and the real-time media
//! backend. The controller never talks to a media SDK directly; it holds an
//! `Arc<R: RoomTransport>` and reacts to the [`RoomEvent`] broadcast.
//!
//! # Design Philosophy
//!
//! The trait covers only what the front-end needs:
//! - Connecting with a server URL and participant token
//! - Enabling/disabling the three local capture sources
//! - Sending chat and observing remote participants
//!
//! Media encoding, signalling and the wire protocol stay inside the
//! implementation. [`InProcessRoom`] is a loopback implementation with an
//! echo agent, used for offline mode and tests.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::transcript::ChatMessage;

pub mod in_process;

pub use in_process::{InProcessRoom, InProcessRoomBuilder};

/// Local capture source that can be published to the room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Local microphone
    Microphone,
    /// Local camera
    Camera,
    /// Screen capture
    ScreenShare,
}

impl TrackSource {
    /// All sources in control-bar order
    pub const ALL: [TrackSource; 3] = [Self::Microphone, Self::Camera, Self::ScreenShare];
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Microphone => "microphone",
            Self::Camera => "camera",
            Self::ScreenShare => "screen share",
        };
        f.write_str(label)
    }
}

/// Connection state reported by the transport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    #[default]
    Disconnected,
    /// Signalling in progress
    Connecting,
    /// Joined the room
    Connected,
    /// Lost the connection and trying to resume
    Reconnecting,
}

/// Options for enabling the microphone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MicrophoneOptions {
    /// Buffer audio captured before the room connects and flush it once joined
    pub pre_connect_buffer: bool,
}

/// A remote participant in the room
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantInfo {
    /// Unique identity within the room
    pub identity: String,
    /// Display name
    pub name: String,
    /// Whether this participant is an agent worker
    pub is_agent: bool,
}

impl ParticipantInfo {
    /// Create an agent participant
    pub fn agent(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            is_agent: true,
        }
    }
}

/// Publish/subscribe permissions of the local participant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantPermissions {
    /// May publish tracks at all
    pub can_publish: bool,
    /// May publish data (chat)
    pub can_publish_data: bool,
    /// May subscribe to remote tracks
    pub can_subscribe: bool,
    /// Sources the participant may publish; empty means all
    pub can_publish_sources: Vec<TrackSource>,
}

impl Default for ParticipantPermissions {
    fn default() -> Self {
        Self {
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
            can_publish_sources: Vec::new(),
        }
    }
}

/// A capture failure reported by the media layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceFailure {
    /// Device involved, when known
    pub device: Option<TrackSource>,
    /// Error name (e.g. `NotAllowedError`)
    pub name: String,
    /// Human-readable reason
    pub message: String,
}

impl DeviceFailure {
    /// `"{name}: {message}"` as shown in alert descriptions
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}: {}", self.name, self.message)
    }
}

/// Why the room connection ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The local client asked to leave
    ClientInitiated,
    /// The server is shutting down
    ServerShutdown,
    /// The local participant was removed
    ParticipantRemoved,
    /// The room was closed
    RoomDeleted,
    /// Signalling connection dropped
    SignalClosed,
}

/// Events broadcast by a room transport
#[derive(Clone, Debug)]
pub enum RoomEvent {
    /// Connection state changed
    ConnectionStateChanged(ConnectionState),
    /// The room connection ended
    Disconnected {
        /// Why it ended
        reason: DisconnectReason,
    },
    /// A capture device failed mid-session
    MediaDevicesError(DeviceFailure),
    /// Chat or transcription message (local echo included)
    ChatMessage(ChatMessage),
    /// A remote participant joined
    ParticipantConnected(ParticipantInfo),
    /// A remote participant left
    ParticipantDisconnected {
        /// Identity of the participant that left
        identity: String,
    },
    /// Local participant permissions were updated by the server
    PermissionsChanged(ParticipantPermissions),
}

/// Errors from room operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    /// The user or OS refused access to a capture device
    #[error("{device} permission denied: {message}")]
    PermissionDenied {
        /// Device refused
        device: TrackSource,
        /// Underlying reason
        message: String,
    },

    /// The capture device is missing or busy
    #[error("{device} unavailable: {message}")]
    DeviceUnavailable {
        /// Device that failed
        device: TrackSource,
        /// Underlying reason
        message: String,
    },

    /// Signalling or media connection failed
    #[error("{0}")]
    ConnectionFailed(String),

    /// Operation not valid in the current connection state
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl RoomError {
    /// Device failure carried by this error, if any
    #[must_use]
    pub fn device_failure(&self) -> Option<DeviceFailure> {
        match self {
            Self::PermissionDenied { device, message } => Some(DeviceFailure {
                device: Some(*device),
                name: "NotAllowedError".to_string(),
                message: message.clone(),
            }),
            Self::DeviceUnavailable { device, message } => Some(DeviceFailure {
                device: Some(*device),
                name: "NotReadableError".to_string(),
                message: message.clone(),
            }),
            Self::ConnectionFailed(_) | Self::InvalidState(_) => None,
        }
    }
}

/// Real-time room transport
///
/// Implementations use interior mutability; the controller shares one
/// instance through an `Arc` across its spawned tasks.
#[async_trait]
pub trait RoomTransport: Send + Sync + 'static {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Subscribe to room events
    fn subscribe(&self) -> broadcast::Receiver<RoomEvent>;

    /// Join the room at `url` with a participant `token`
    async fn connect(&self, url: &str, token: &str) -> Result<(), RoomError>;

    /// Leave the room; a no-op when already disconnected
    async fn disconnect(&self);

    /// Enable or disable the microphone, returning the resulting state
    async fn set_microphone_enabled(
        &self,
        enabled: bool,
        options: MicrophoneOptions,
    ) -> Result<bool, RoomError>;

    /// Enable or disable the camera, returning the resulting state
    async fn set_camera_enabled(&self, enabled: bool) -> Result<bool, RoomError>;

    /// Enable or disable screen share, returning the resulting state
    async fn set_screen_share_enabled(&self, enabled: bool) -> Result<bool, RoomError>;

    /// Send a chat message, returning the local copy
    async fn send_chat(&self, text: &str) -> Result<ChatMessage, RoomError>;

    /// Remote participants currently in the room
    fn remote_participants(&self) -> Vec<ParticipantInfo>;

    /// Permissions granted to the local participant
    fn local_permissions(&self) -> ParticipantPermissions;

    /// Toggle any source by key
    async fn set_source_enabled(&self, source: TrackSource, enabled: bool) -> Result<bool, RoomError> {
        match source {
            TrackSource::Microphone => {
                self.set_microphone_enabled(enabled, MicrophoneOptions::default())
                    .await
            }
            TrackSource::Camera => self.set_camera_enabled(enabled).await,
            TrackSource::ScreenShare => self.set_screen_share_enabled(enabled).await,
        }
    }

    /// Whether the room is a local loopback rather than a media server
    fn is_loopback(&self) -> bool {
        false
    }

    /// Whether an agent participant is present
    fn has_agent(&self) -> bool {
        self.remote_participants().iter().any(|p| p.is_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_track_source_labels() {
        assert_eq!(TrackSource::Microphone.to_string(), "microphone");
        assert_eq!(TrackSource::ScreenShare.to_string(), "screen share");
    }

    #[test]
    fn test_device_failure_from_denial() {
        let err = RoomError::PermissionDenied {
            device: TrackSource::Camera,
            message: "Permission denied by system".to_string(),
        };
        let failure = err.device_failure().unwrap();
        assert_eq!(failure.device, Some(TrackSource::Camera));
        assert_eq!(
            failure.describe(),
            "NotAllowedError: Permission denied by system"
        );

        assert!(RoomError::ConnectionFailed("x".into())
            .device_failure()
            .is_none());
    }

    #[test]
    fn test_default_permissions_allow_everything() {
        let perms = ParticipantPermissions::default();
        assert!(perms.can_publish);
        assert!(perms.can_publish_sources.is_empty());
    }
}
