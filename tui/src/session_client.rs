//! Session Client
//!
//! Thin wrapper around the [`SessionController`] for TUI integration.
//! The controller runs in-process; this client owns its message channel and
//! gives the render loop a non-blocking way to drain it.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any session logic.
//! Its job is:
//! 1. Convert key presses to controller calls
//! 2. Receive [`SessionMessage`]s
//! 3. Fold them into the display state and render

use std::sync::Arc;

use tokio::sync::mpsc;

use agent_core::room::{InProcessRoom, RoomTransport, TrackSource};
use agent_core::{
    AppConfig, SessionController, SessionMessage, SessionOptions, SessionState, TokenSource,
};

/// Controller-to-surface channel depth
const CHANNEL_CAPACITY: usize = 100;

/// Client for driving the embedded session controller
pub struct SessionClient<R: RoomTransport = InProcessRoom> {
    controller: SessionController<R>,
    rx: mpsc::Receiver<SessionMessage>,
}

impl<R: RoomTransport> SessionClient<R> {
    /// Create a client with default session options
    pub fn new(room: Arc<R>, tokens: Arc<dyn TokenSource>, config: Arc<AppConfig>) -> Self {
        Self::with_options(room, tokens, config, SessionOptions::default())
    }

    /// Create a client with explicit session options
    pub fn with_options(
        room: Arc<R>,
        tokens: Arc<dyn TokenSource>,
        config: Arc<AppConfig>,
        options: SessionOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let controller = SessionController::with_options(room, tokens, config, tx, options);
        Self { controller, rx }
    }

    /// Start a session; `false` if one is already running
    pub fn start(&self) -> bool {
        self.controller.start()
    }

    /// End the session
    pub fn end(&self) {
        self.controller.end();
    }

    /// Request a capture source change
    pub fn toggle(&self, source: TrackSource, enabled: bool) {
        self.controller.toggle_track(source, enabled);
    }

    /// Send a chat message; `false` if not connected or blank
    pub fn send_chat(&self, text: impl Into<String>) -> bool {
        self.controller.send_chat(text)
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<SessionMessage> {
        self.rx.recv().await
    }

    /// Receive all pending messages (non-blocking)
    pub fn recv_all(&mut self) -> Vec<SessionMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// The room the controller drives
    pub fn room(&self) -> &Arc<R> {
        self.controller.room()
    }

    /// Disconnect and stop all session tasks
    pub async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
