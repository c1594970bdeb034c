//! Session Lifecycle Controller
//!
//! Owns the single room connection of the front-end and drives it through
//! `Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected`.
//!
//! # Design Philosophy
//!
//! The controller is headless. The surface calls [`SessionController::start`],
//! [`SessionController::end`] and friends from its event loop; everything
//! network-bound runs in spawned tasks that report back as [`SessionMessage`]s
//! over the mpsc channel handed in at construction.
//!
//! Every start launches one *attempt* owning a child [`CancellationToken`] of
//! the controller scope. Ending the session (or dropping the controller)
//! cancels the token; the attempt's in-flight futures are dropped and any
//! failure they would have produced is discarded instead of alerted.
//! A generation counter guards every transition so a stale task can never
//! move a newer session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::alerts::Alert;
use crate::config::AppConfig;
use crate::controls::PublishPermissions;
use crate::error::{AgentError, AgentResult};
use crate::room::{
    ConnectionState, DisconnectReason, MicrophoneOptions, RoomError, RoomEvent, RoomTransport,
    TrackSource,
};
use crate::token::{TokenRequest, TokenSource};
use crate::transcript::ChatMessage;

/// How long a connected session waits for an agent before giving up
pub const DEFAULT_AGENT_JOIN_TIMEOUT: Duration = Duration::from_secs(200);

/// Lifecycle state of the session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session
    #[default]
    Disconnected,
    /// Attempt in flight
    Connecting,
    /// Joined the room
    Connected,
    /// Teardown in flight
    Disconnecting,
}

impl SessionState {
    /// Whether the session counts as active (connecting or connected)
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Human-readable label for status lines
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
        }
    }
}

/// Messages from the controller to the surface
#[derive(Clone, Debug)]
pub enum SessionMessage {
    /// The lifecycle state changed
    ///
    /// `revision` increases with every transition; a surface should ignore a
    /// state whose revision is older than one it has already applied.
    State {
        /// New state
        state: SessionState,
        /// Transition counter
        revision: u64,
    },
    /// Show a toast
    Alert(Alert),
    /// Chat or transcription message from the room
    Chat(ChatMessage),
    /// An agent joined or left
    AgentAvailability {
        /// Whether an agent is present
        available: bool,
    },
    /// Local publish permissions changed
    Permissions(PublishPermissions),
    /// A capture toggle finished
    TrackToggled {
        /// Source that was toggled
        source: TrackSource,
        /// Resulting state, or why it was refused
        result: Result<bool, RoomError>,
    },
}

/// Controller tuning
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// How long to wait for an agent after connecting
    pub agent_join_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            agent_join_timeout: DEFAULT_AGENT_JOIN_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: SessionState,
    generation: u64,
    revision: u64,
    attempt: Option<CancellationToken>,
    /// Generation whose connect last succeeded
    room_owner: Option<u64>,
    closed: bool,
}

struct Inner<R> {
    room: Arc<R>,
    tokens: Arc<dyn TokenSource>,
    config: Arc<AppConfig>,
    options: SessionOptions,
    tx: mpsc::Sender<SessionMessage>,
    lifecycle: Mutex<Lifecycle>,
    /// Held across `connect` and stale-attempt cleanup
    room_guard: tokio::sync::Mutex<()>,
    scope: CancellationToken,
    agent_present: watch::Sender<bool>,
}

impl<R: RoomTransport> Inner<R> {
    /// Send a message to the surface
    async fn send(&self, msg: SessionMessage) {
        if let Err(e) = self.tx.send(msg).await {
            warn!("Failed to send message to surface: {}", e);
        }
    }

    /// Publish a state change without blocking the caller
    fn publish_state(&self, state: SessionState, revision: u64) {
        match self.tx.try_send(SessionMessage::State { state, revision }) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = tx.send(msg).await {
                        debug!("Surface channel closed, dropping state update: {}", e);
                    }
                });
            }
            Err(TrySendError::Closed(_)) => debug!("Surface channel closed, dropping state update"),
        }
    }

    fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Apply `from -> to` only if `generation` is still current
    fn transition(&self, generation: u64, from: SessionState, to: SessionState) -> bool {
        let revision = {
            let mut lc = self.lifecycle.lock();
            if lc.generation != generation || lc.state != from {
                return false;
            }
            lc.state = to;
            lc.revision += 1;
            if to == SessionState::Disconnected {
                lc.attempt = None;
            }
            lc.revision
        };
        debug!(?from, ?to, generation, "Session transition");
        self.publish_state(to, revision);
        true
    }

    /// Returns whether the value changed
    fn set_agent_present(&self, present: bool) -> bool {
        self.agent_present.send_if_modified(|current| {
            if *current == present {
                false
            } else {
                *current = present;
                true
            }
        })
    }

    /// Move an active session to `Disconnecting` and cancel its attempt
    ///
    /// Returns the generation the teardown belongs to, or `None` if there was
    /// nothing to end (or `expected` is no longer current).
    fn begin_end(&self, expected: Option<u64>) -> Option<u64> {
        let (generation, revision, attempt) = {
            let mut lc = self.lifecycle.lock();
            if !lc.state.is_active() || expected.is_some_and(|g| g != lc.generation) {
                return None;
            }
            lc.generation += 1;
            lc.revision += 1;
            lc.state = SessionState::Disconnecting;
            (lc.generation, lc.revision, lc.attempt.take())
        };
        if let Some(token) = attempt {
            token.cancel();
        }
        self.set_agent_present(false);
        self.publish_state(SessionState::Disconnecting, revision);
        Some(generation)
    }

    async fn finish_end(&self, generation: u64) {
        self.room.disconnect().await;
        if self.transition(
            generation,
            SessionState::Disconnecting,
            SessionState::Disconnected,
        ) {
            info!("Session ended");
        }
    }

    // ------------------------------------------------------------------------
    // Attempt
    // ------------------------------------------------------------------------

    /// Microphone and fetch+connect, concurrently
    async fn connect_session(&self, generation: u64) -> AgentResult<()> {
        let options = MicrophoneOptions {
            pre_connect_buffer: self.config.is_pre_connect_buffer_enabled,
        };
        let microphone = async {
            self.room
                .set_microphone_enabled(true, options)
                .await
                .map_err(AgentError::from)
        };
        let connect = async {
            let details = self
                .tokens
                .fetch(&TokenRequest::from_config(&self.config))
                .await?;
            debug!(room = %details.room_name, source = self.tokens.name(), "Connecting to room");
            let _room = self.room_guard.lock().await;
            self.room
                .connect(&details.server_url, &details.participant_token)
                .await?;
            self.lifecycle.lock().room_owner = Some(generation);
            Ok::<_, AgentError>(())
        };
        tokio::try_join!(microphone, connect)?;
        Ok(())
    }

    async fn run_attempt(self: Arc<Self>, generation: u64, token: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => Err(AgentError::Stale),
            result = self.connect_session(generation) => result,
        };

        let outcome = match outcome {
            Ok(()) if token.is_cancelled() => {
                self.release_stale_room(generation).await;
                Err(AgentError::Stale)
            }
            other => other,
        };

        match outcome {
            Ok(()) => {
                if !self.transition(generation, SessionState::Connecting, SessionState::Connected) {
                    debug!(generation, "Connected attempt was superseded");
                    return;
                }
                info!(transport = self.room.name(), "Session connected");

                let permissions = PublishPermissions::from_participant(&self.room.local_permissions());
                self.send(SessionMessage::Permissions(permissions)).await;
                let available = self.room.has_agent();
                if self.set_agent_present(available) {
                    self.send(SessionMessage::AgentAvailability { available }).await;
                }

                self.await_agent(generation, &token).await;
            }
            Err(e) if e.is_stale() || token.is_cancelled() => {
                debug!(error = %e, "Dropping failure from a cancelled session attempt");
            }
            Err(e) => {
                error!(error = %e, kind = %e.kind(), "Session attempt failed");
                self.send(SessionMessage::Alert(Alert::connection_error(&e))).await;
                self.room.disconnect().await;
                self.transition(generation, SessionState::Connecting, SessionState::Disconnected);
            }
        }
    }

    /// Leave a room joined by an attempt that was cancelled meanwhile
    ///
    /// A newer attempt cannot connect while the guard is held, and one that
    /// already connected owns the room.
    async fn release_stale_room(&self, generation: u64) {
        let _room = self.room_guard.lock().await;
        if self.lifecycle.lock().room_owner != Some(generation) {
            debug!(generation, "Room belongs to a newer session, leaving it");
            return;
        }
        self.room.disconnect().await;
    }

    /// End the session if no agent shows up in time
    async fn await_agent(&self, generation: u64, token: &CancellationToken) {
        let mut present = self.agent_present.subscribe();
        let timeout = self.options.agent_join_timeout;
        let joined = async { present.wait_for(|p| *p).await.is_ok() };

        let timed_out = tokio::select! {
            () = token.cancelled() => return,
            result = tokio::time::timeout(timeout, joined) => result.is_err(),
        };
        if !timed_out {
            debug!("Agent present");
            return;
        }

        if let Some(teardown) = self.begin_end(Some(generation)) {
            warn!(timeout_secs = timeout.as_secs(), "Agent did not join the room");
            self.send(SessionMessage::Alert(Alert::agent_did_not_join())).await;
            self.finish_end(teardown).await;
        }
    }

    // ------------------------------------------------------------------------
    // Room events
    // ------------------------------------------------------------------------

    async fn react(self: Arc<Self>, mut events: broadcast::Receiver<RoomEvent>) {
        loop {
            let event = tokio::select! {
                () = self.scope.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(event) => self.handle_room_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Room event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Room event reactor stopped");
    }

    async fn handle_room_event(&self, event: RoomEvent) {
        match event {
            RoomEvent::Disconnected { reason } => self.on_room_disconnected(reason),
            RoomEvent::MediaDevicesError(failure) => {
                warn!(device = ?failure.device, name = %failure.name, "Media device error");
                self.send(SessionMessage::Alert(Alert::media_devices_error(&failure)))
                    .await;
            }
            RoomEvent::ChatMessage(message) => self.send(SessionMessage::Chat(message)).await,
            RoomEvent::ParticipantConnected(participant) => {
                if participant.is_agent && self.state().is_active() && self.set_agent_present(true) {
                    info!(identity = %participant.identity, "Agent joined");
                    self.send(SessionMessage::AgentAvailability { available: true })
                        .await;
                }
            }
            RoomEvent::ParticipantDisconnected { identity } => {
                let available = self.room.has_agent();
                if self.state().is_active() && self.set_agent_present(available) {
                    info!(identity = %identity, "Agent left");
                    self.send(SessionMessage::AgentAvailability { available })
                        .await;
                }
            }
            RoomEvent::PermissionsChanged(permissions) => {
                let permissions = PublishPermissions::from_participant(&permissions);
                self.send(SessionMessage::Permissions(permissions)).await;
            }
            RoomEvent::ConnectionStateChanged(state) => trace!(?state, "Room connection state"),
        }
    }

    /// The room went away under an active session
    fn on_room_disconnected(&self, reason: DisconnectReason) {
        // A client-initiated disconnect of an earlier session can arrive late
        if self.room.connection_state() == ConnectionState::Connected {
            return;
        }
        let revision = {
            let mut lc = self.lifecycle.lock();
            match lc.state {
                SessionState::Connected => {}
                // Our own teardown while connecting goes through the attempt
                SessionState::Connecting if reason != DisconnectReason::ClientInitiated => {}
                _ => return,
            }
            lc.generation += 1;
            lc.revision += 1;
            lc.state = SessionState::Disconnected;
            if let Some(token) = lc.attempt.take() {
                token.cancel();
            }
            lc.revision
        };
        info!(?reason, "Room disconnected");
        self.set_agent_present(false);
        self.publish_state(SessionState::Disconnected, revision);
    }
}

/// Owns the session and its room
///
/// Not `Clone`: dropping the controller cancels every in-flight operation and
/// disconnects the room.
pub struct SessionController<R: RoomTransport> {
    inner: Arc<Inner<R>>,
}

impl<R: RoomTransport> SessionController<R> {
    /// Create a controller with default options
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        room: Arc<R>,
        tokens: Arc<dyn TokenSource>,
        config: Arc<AppConfig>,
        tx: mpsc::Sender<SessionMessage>,
    ) -> Self {
        Self::with_options(room, tokens, config, tx, SessionOptions::default())
    }

    /// Create a controller with explicit options
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_options(
        room: Arc<R>,
        tokens: Arc<dyn TokenSource>,
        config: Arc<AppConfig>,
        tx: mpsc::Sender<SessionMessage>,
        options: SessionOptions,
    ) -> Self {
        let events = room.subscribe();
        let (agent_present, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            room,
            tokens,
            config,
            options,
            tx,
            lifecycle: Mutex::new(Lifecycle::default()),
            room_guard: tokio::sync::Mutex::new(()),
            scope: CancellationToken::new(),
            agent_present,
        });
        tokio::spawn(Arc::clone(&inner).react(events));
        Self { inner }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Whether the session is connecting or connected
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Whether an agent participant is present
    #[must_use]
    pub fn agent_available(&self) -> bool {
        *self.inner.agent_present.borrow()
    }

    /// The room this controller drives
    #[must_use]
    pub fn room(&self) -> &Arc<R> {
        &self.inner.room
    }

    /// Configuration the controller was built with
    #[must_use]
    pub fn config(&self) -> &Arc<AppConfig> {
        &self.inner.config
    }

    /// Start a session if none is running
    ///
    /// The state becomes `Connecting` before this returns. Returns `false`
    /// (and does nothing) unless the state was `Disconnected`.
    pub fn start(&self) -> bool {
        let (generation, revision, token) = {
            let mut lc = self.inner.lifecycle.lock();
            if lc.closed || lc.state != SessionState::Disconnected {
                debug!(state = ?lc.state, "Start ignored");
                return false;
            }
            lc.generation += 1;
            lc.revision += 1;
            lc.state = SessionState::Connecting;
            let token = self.inner.scope.child_token();
            lc.attempt = Some(token.clone());
            (lc.generation, lc.revision, token)
        };

        info!(generation, "Starting session");
        self.inner.set_agent_present(false);
        self.inner.publish_state(SessionState::Connecting, revision);
        tokio::spawn(Arc::clone(&self.inner).run_attempt(generation, token));
        true
    }

    /// End the session; a no-op when nothing is running
    pub fn end(&self) {
        if let Some(generation) = self.inner.begin_end(None) {
            info!("Ending session");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.finish_end(generation).await });
        }
    }

    /// Enable or disable a capture source
    ///
    /// Reports [`SessionMessage::TrackToggled`]; a refusal also raises a
    /// device alert.
    pub fn toggle_track(&self, source: TrackSource, enabled: bool) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = inner.scope.cancelled() => return,
                result = inner.room.set_source_enabled(source, enabled) => result,
            };
            if let Err(err) = &result {
                warn!(%source, error = %err, "Track toggle failed");
                if let Some(failure) = err.device_failure() {
                    inner
                        .send(SessionMessage::Alert(Alert::device_error(source, &failure)))
                        .await;
                }
            }
            inner
                .send(SessionMessage::TrackToggled { source, result })
                .await;
        });
    }

    /// Send a chat message; returns `false` if not connected or blank
    pub fn send_chat(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() || self.state() != SessionState::Connected {
            return false;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner.room.send_chat(&text).await {
                warn!(error = %e, "Failed to send chat message");
                inner
                    .send(SessionMessage::Alert(Alert::new(
                        "Message not sent",
                        e.to_string(),
                    )))
                    .await;
            }
        });
        true
    }

    /// Cancel everything and wait for the room to disconnect
    pub async fn shutdown(&self) {
        let (previous, revision) = {
            let mut lc = self.inner.lifecycle.lock();
            lc.closed = true;
            lc.generation += 1;
            lc.revision += 1;
            lc.attempt = None;
            (
                std::mem::replace(&mut lc.state, SessionState::Disconnected),
                lc.revision,
            )
        };
        self.inner.scope.cancel();
        self.inner.set_agent_present(false);
        self.inner.room.disconnect().await;
        if previous != SessionState::Disconnected {
            self.inner
                .publish_state(SessionState::Disconnected, revision);
        }
        info!("Session controller shut down");
    }
}

impl<R: RoomTransport> Drop for SessionController<R> {
    fn drop(&mut self) {
        let already_closed = std::mem::replace(&mut self.inner.lifecycle.lock().closed, true);
        self.inner.scope.cancel();
        if already_closed {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let room = Arc::clone(&self.inner.room);
                handle.spawn(async move { room.disconnect().await });
            }
            Err(_) => debug!("No runtime at drop, skipping final disconnect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::InProcessRoom;
    use crate::token::ConnectionDetails;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct StaticTokens;

    #[async_trait]
    impl TokenSource for StaticTokens {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, _request: &TokenRequest) -> AgentResult<ConnectionDetails> {
            Ok(ConnectionDetails {
                server_url: "wss://loopback".into(),
                room_name: "room".into(),
                participant_name: "user".into(),
                participant_token: "token".into(),
            })
        }
    }

    fn controller(
        room: InProcessRoom,
    ) -> (SessionController<InProcessRoom>, mpsc::Receiver<SessionMessage>) {
        let (tx, rx) = mpsc::channel(100);
        let controller = SessionController::new(
            Arc::new(room),
            Arc::new(StaticTokens),
            Arc::new(AppConfig::default()),
            tx,
        );
        (controller, rx)
    }

    async fn wait_for_state(rx: &mut mpsc::Receiver<SessionMessage>, wanted: SessionState) {
        while let Some(msg) = rx.recv().await {
            if matches!(msg, SessionMessage::State { state, .. } if state == wanted) {
                return;
            }
        }
        panic!("channel closed before {wanted:?}");
    }

    #[test]
    fn test_active_states() {
        assert!(!SessionState::Disconnected.is_active());
        assert!(SessionState::Connecting.is_active());
        assert!(SessionState::Connected.is_active());
        assert!(!SessionState::Disconnecting.is_active());
    }

    #[tokio::test]
    async fn test_start_is_optimistic() {
        let (controller, _rx) = controller(InProcessRoom::default());

        assert!(controller.start());
        assert_eq!(controller.state(), SessionState::Connecting);
        assert!(controller.is_active());

        // Second start while connecting is a no-op
        assert!(!controller.start());
    }

    #[tokio::test]
    async fn test_start_connects_with_pre_connect_buffer() {
        let (controller, mut rx) = controller(InProcessRoom::default());

        controller.start();
        wait_for_state(&mut rx, SessionState::Connected).await;

        let room = controller.room();
        assert_eq!(room.connection_state(), ConnectionState::Connected);
        assert!(room.is_source_enabled(TrackSource::Microphone));
        assert!(room.pre_connect_buffer_used());
    }

    #[tokio::test]
    async fn test_end_when_disconnected_is_noop() {
        let (controller, mut rx) = controller(InProcessRoom::default());
        controller.end();
        assert_eq!(controller.state(), SessionState::Disconnected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_rejected_unless_connected() {
        let (controller, _rx) = controller(InProcessRoom::default());
        assert!(!controller.send_chat("hello"));
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_room() {
        let (controller, mut rx) = controller(InProcessRoom::default());
        controller.start();
        wait_for_state(&mut rx, SessionState::Connected).await;

        controller.shutdown().await;

        assert_eq!(controller.state(), SessionState::Disconnected);
        assert_eq!(
            controller.room().connection_state(),
            ConnectionState::Disconnected
        );
        assert!(!controller.start());
    }

    #[tokio::test]
    async fn test_stale_attempt_leaves_newer_room_alone() {
        let (controller, mut rx) = controller(InProcessRoom::default());

        controller.start();
        wait_for_state(&mut rx, SessionState::Connected).await;
        let first = controller.inner.lifecycle.lock().generation;
        controller.end();
        wait_for_state(&mut rx, SessionState::Disconnected).await;
        controller.start();
        wait_for_state(&mut rx, SessionState::Connected).await;
        let second = controller.inner.lifecycle.lock().generation;

        // Cleanup from the first attempt must not touch the second's room
        controller.inner.release_stale_room(first).await;
        assert_eq!(
            controller.room().connection_state(),
            ConnectionState::Connected
        );

        controller.inner.release_stale_room(second).await;
        assert_eq!(
            controller.room().connection_state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_state_publish_with_full_channel_and_closed_surface() {
        let (tx, rx) = mpsc::channel(1);
        let controller = SessionController::new(
            Arc::new(InProcessRoom::builder().without_agent().build()),
            Arc::new(StaticTokens),
            Arc::new(AppConfig::default()),
            tx,
        );
        controller.inner.publish_state(SessionState::Disconnected, 1);
        // Channel is full; the next update goes through the spawned fallback
        controller.inner.publish_state(SessionState::Disconnected, 2);
        drop(rx);
        tokio::task::yield_now().await;

        assert_eq!(controller.state(), SessionState::Disconnected);
        assert!(controller.start());
    }
}
