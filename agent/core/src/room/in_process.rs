//! In-Process Room
//!
//! Loopback [`RoomTransport`] with no network underneath. A scripted agent
//! joins on connect and echoes chat back, which is enough to drive the
//! terminal surface offline and to exercise the session controller in tests.
//!
//! # Usage
//!
//! ```ignore
//! let gate = Arc::new(Notify::new());
//! let room = Arc::new(
//!     InProcessRoom::builder()
//!         .connect_gate(gate.clone())
//!         .deny(TrackSource::Camera)
//!         .build(),
//! );
//!
//! // connect() now parks until gate.notify_one()
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tracing::debug;

use super::{
    ConnectionState, DeviceFailure, DisconnectReason, MicrophoneOptions, ParticipantInfo,
    ParticipantPermissions, RoomError, RoomEvent, RoomTransport, TrackSource,
};
use crate::transcript::ChatMessage;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct RoomState {
    connection: ConnectionState,
    microphone: bool,
    camera: bool,
    screen_share: bool,
    pre_connect_buffer: bool,
    participants: Vec<ParticipantInfo>,
    permissions: ParticipantPermissions,
}

/// Builder for [`InProcessRoom`]
#[derive(Debug)]
pub struct InProcessRoomBuilder {
    agent: Option<ParticipantInfo>,
    echo: bool,
    fail_connect: Option<String>,
    denied: Vec<TrackSource>,
    connect_gate: Option<Arc<Notify>>,
    permissions: ParticipantPermissions,
}

impl Default for InProcessRoomBuilder {
    fn default() -> Self {
        Self {
            agent: Some(ParticipantInfo::agent("agent-loopback", "Agent")),
            echo: true,
            fail_connect: None,
            denied: Vec::new(),
            connect_gate: None,
            permissions: ParticipantPermissions::default(),
        }
    }
}

impl InProcessRoomBuilder {
    /// Agent that joins as soon as the room connects
    #[must_use]
    pub fn agent(mut self, agent: ParticipantInfo) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Connect without any agent present
    #[must_use]
    pub fn without_agent(mut self) -> Self {
        self.agent = None;
        self
    }

    /// Whether the agent replies to chat
    #[must_use]
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Make every connect fail with this reason
    #[must_use]
    pub fn fail_connect(mut self, reason: impl Into<String>) -> Self {
        self.fail_connect = Some(reason.into());
        self
    }

    /// Refuse to enable this capture source
    #[must_use]
    pub fn deny(mut self, source: TrackSource) -> Self {
        self.denied.push(source);
        self
    }

    /// Park every connect until the gate is notified
    #[must_use]
    pub fn connect_gate(mut self, gate: Arc<Notify>) -> Self {
        self.connect_gate = Some(gate);
        self
    }

    /// Local participant permissions
    #[must_use]
    pub fn permissions(mut self, permissions: ParticipantPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Build the room
    #[must_use]
    pub fn build(self) -> InProcessRoom {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        InProcessRoom {
            state: Mutex::new(RoomState {
                permissions: self.permissions,
                ..RoomState::default()
            }),
            events,
            agent: self.agent,
            echo: self.echo,
            fail_connect: Mutex::new(self.fail_connect),
            denied: Mutex::new(self.denied),
            connect_gate: self.connect_gate,
            connect_calls: AtomicUsize::new(0),
            overlapping_connects: AtomicUsize::new(0),
        }
    }
}

/// Loopback room transport
#[derive(Debug)]
pub struct InProcessRoom {
    state: Mutex<RoomState>,
    events: broadcast::Sender<RoomEvent>,
    agent: Option<ParticipantInfo>,
    echo: bool,
    fail_connect: Mutex<Option<String>>,
    denied: Mutex<Vec<TrackSource>>,
    connect_gate: Option<Arc<Notify>>,
    connect_calls: AtomicUsize,
    overlapping_connects: AtomicUsize,
}

impl Default for InProcessRoom {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InProcessRoom {
    /// Start building a room
    #[must_use]
    pub fn builder() -> InProcessRoomBuilder {
        InProcessRoomBuilder::default()
    }

    fn emit(&self, event: RoomEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn is_denied(&self, source: TrackSource) -> bool {
        self.denied.lock().contains(&source)
    }

    fn set_source(&self, source: TrackSource, enabled: bool) -> Result<bool, RoomError> {
        if enabled && self.is_denied(source) {
            return Err(RoomError::PermissionDenied {
                device: source,
                message: "Permission denied".to_string(),
            });
        }
        let mut state = self.state.lock();
        match source {
            TrackSource::Microphone => state.microphone = enabled,
            TrackSource::Camera => state.camera = enabled,
            TrackSource::ScreenShare => state.screen_share = enabled,
        }
        Ok(enabled)
    }

    // ------------------------------------------------------------------------
    // Scripting hooks
    // ------------------------------------------------------------------------

    /// A remote participant joins
    pub fn join_participant(&self, participant: ParticipantInfo) {
        self.state.lock().participants.push(participant.clone());
        self.emit(RoomEvent::ParticipantConnected(participant));
    }

    /// A remote participant leaves
    pub fn leave_participant(&self, identity: &str) {
        self.state
            .lock()
            .participants
            .retain(|p| p.identity != identity);
        self.emit(RoomEvent::ParticipantDisconnected {
            identity: identity.to_string(),
        });
    }

    /// The server drops the connection
    pub fn drop_connection(&self, reason: DisconnectReason) {
        if !self.reset() {
            return;
        }
        self.emit(RoomEvent::ConnectionStateChanged(ConnectionState::Disconnected));
        self.emit(RoomEvent::Disconnected { reason });
    }

    /// A capture device fails mid-session
    pub fn report_device_error(&self, failure: DeviceFailure) {
        self.emit(RoomEvent::MediaDevicesError(failure));
    }

    /// The server updates local permissions
    pub fn update_permissions(&self, permissions: ParticipantPermissions) {
        self.state.lock().permissions = permissions.clone();
        self.emit(RoomEvent::PermissionsChanged(permissions));
    }

    /// Deliver a message as if it came from the agent
    pub fn deliver_message(&self, message: ChatMessage) {
        self.emit(RoomEvent::ChatMessage(message));
    }

    /// Change the connect failure for subsequent connects
    pub fn set_fail_connect(&self, reason: Option<String>) {
        *self.fail_connect.lock() = reason;
    }

    /// Allow a previously denied source
    pub fn allow(&self, source: TrackSource) {
        self.denied.lock().retain(|s| *s != source);
    }

    /// Number of connect calls so far
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of connects issued while another was in progress or established
    #[must_use]
    pub fn overlapping_connects(&self) -> usize {
        self.overlapping_connects.load(Ordering::SeqCst)
    }

    /// Whether a source is currently enabled
    #[must_use]
    pub fn is_source_enabled(&self, source: TrackSource) -> bool {
        let state = self.state.lock();
        match source {
            TrackSource::Microphone => state.microphone,
            TrackSource::Camera => state.camera,
            TrackSource::ScreenShare => state.screen_share,
        }
    }

    /// Whether the last microphone enable asked for pre-connect buffering
    #[must_use]
    pub fn pre_connect_buffer_used(&self) -> bool {
        self.state.lock().pre_connect_buffer
    }

    /// Release every local track; returns whether a connection was open
    fn reset(&self) -> bool {
        let mut state = self.state.lock();
        state.microphone = false;
        state.camera = false;
        state.screen_share = false;
        state.participants.clear();
        if state.connection == ConnectionState::Disconnected {
            return false;
        }
        state.connection = ConnectionState::Disconnected;
        true
    }
}

/// Resets a half-open connect when its future is dropped
struct ConnectingGuard<'a> {
    room: &'a InProcessRoom,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.room.state.lock();
        if state.connection == ConnectionState::Connecting {
            debug!("Connect abandoned, resetting loopback room");
            state.connection = ConnectionState::Disconnected;
        }
    }
}

#[async_trait]
impl RoomTransport for InProcessRoom {
    fn name(&self) -> &str {
        "in-process"
    }

    fn is_loopback(&self) -> bool {
        true
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().connection
    }

    fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    async fn connect(&self, url: &str, token: &str) -> Result<(), RoomError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if url.is_empty() || token.is_empty() {
            return Err(RoomError::ConnectionFailed(
                "server url and token are required".to_string(),
            ));
        }

        {
            let mut state = self.state.lock();
            if state.connection != ConnectionState::Disconnected {
                self.overlapping_connects.fetch_add(1, Ordering::SeqCst);
                return Err(RoomError::InvalidState(format!(
                    "cannot connect while {:?}",
                    state.connection
                )));
            }
            state.connection = ConnectionState::Connecting;
        }
        self.emit(RoomEvent::ConnectionStateChanged(ConnectionState::Connecting));

        let mut guard = ConnectingGuard {
            room: self,
            armed: true,
        };

        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }

        let failure = self.fail_connect.lock().clone();
        if let Some(reason) = failure {
            // guard resets the state
            return Err(RoomError::ConnectionFailed(reason));
        }

        let agent = {
            let mut state = self.state.lock();
            if state.connection != ConnectionState::Connecting {
                guard.armed = false;
                return Err(RoomError::ConnectionFailed(
                    "Client initiated disconnect".to_string(),
                ));
            }
            state.connection = ConnectionState::Connected;
            if let Some(agent) = &self.agent {
                state.participants.push(agent.clone());
            }
            self.agent.clone()
        };
        guard.armed = false;

        debug!(url = %url, "Loopback room connected");
        self.emit(RoomEvent::ConnectionStateChanged(ConnectionState::Connected));
        if let Some(agent) = agent {
            self.emit(RoomEvent::ParticipantConnected(agent));
        }
        Ok(())
    }

    async fn disconnect(&self) {
        if !self.reset() {
            return;
        }
        debug!("Loopback room disconnected");
        self.emit(RoomEvent::ConnectionStateChanged(ConnectionState::Disconnected));
        self.emit(RoomEvent::Disconnected {
            reason: DisconnectReason::ClientInitiated,
        });
    }

    async fn set_microphone_enabled(
        &self,
        enabled: bool,
        options: MicrophoneOptions,
    ) -> Result<bool, RoomError> {
        let result = self.set_source(TrackSource::Microphone, enabled)?;
        if enabled {
            self.state.lock().pre_connect_buffer = options.pre_connect_buffer;
        }
        Ok(result)
    }

    async fn set_camera_enabled(&self, enabled: bool) -> Result<bool, RoomError> {
        self.set_source(TrackSource::Camera, enabled)
    }

    async fn set_screen_share_enabled(&self, enabled: bool) -> Result<bool, RoomError> {
        self.set_source(TrackSource::ScreenShare, enabled)
    }

    async fn send_chat(&self, text: &str) -> Result<ChatMessage, RoomError> {
        let has_agent = {
            let state = self.state.lock();
            if state.connection != ConnectionState::Connected {
                return Err(RoomError::InvalidState("not connected".to_string()));
            }
            if !state.permissions.can_publish_data {
                return Err(RoomError::InvalidState(
                    "not allowed to publish data".to_string(),
                ));
            }
            state.participants.iter().any(|p| p.is_agent)
        };

        let local = ChatMessage::local(text);
        self.emit(RoomEvent::ChatMessage(local.clone()));
        if self.echo && has_agent {
            self.emit(RoomEvent::ChatMessage(ChatMessage::remote(format!(
                "You said: {text}"
            ))));
        }
        Ok(local)
    }

    fn remote_participants(&self) -> Vec<ParticipantInfo> {
        self.state.lock().participants.clone()
    }

    fn local_permissions(&self) -> ParticipantPermissions {
        self.state.lock().permissions.clone()
    }
}
