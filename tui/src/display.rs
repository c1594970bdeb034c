//! Display State
//!
//! Everything the surface renders, derived from [`SessionMessage`]s.
//!
//! # Design Philosophy
//!
//! The TUI is a thin client: the session controller owns behavior, this
//! module only folds its messages into something drawable. State updates
//! carry a revision; an update older than the last applied one is dropped so
//! out-of-order delivery from concurrent tasks cannot roll the view back.

use std::time::Instant;

use agent_core::controls::{ControlBarControls, InputControls, PublishPermissions, VisibleControls};
use agent_core::room::{ParticipantPermissions, TrackSource};
use agent_core::transcript::{show_pre_connect_hint, Transcript, TranscriptChange};
use agent_core::{AlertQueue, AppConfig, SessionMessage, SessionState};

/// Which part of the screen takes key input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    /// Single-key commands
    #[default]
    Controls,
    /// Typing into the chat input
    Chat,
}

/// What applying a message changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    /// Transcript content changed
    pub transcript: bool,
    /// The session became inactive
    pub session_ended: bool,
}

/// Render state of the surface
#[derive(Debug)]
pub struct DisplayState {
    /// Lifecycle state
    pub session_state: SessionState,
    /// Revision of the last applied state
    pub revision: u64,
    /// A remote agent is present
    pub agent_available: bool,
    /// What the local participant may publish
    pub permissions: PublishPermissions,
    /// Capture toggles
    pub controls: InputControls,
    /// Chat and transcription
    pub transcript: Transcript,
    /// Toast stack
    pub alerts: AlertQueue,
    /// Transcript overlay shown
    pub transcript_open: bool,
    /// Key focus
    pub focus: Focus,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            session_state: SessionState::Disconnected,
            revision: 0,
            agent_available: false,
            permissions: PublishPermissions::from_participant(&ParticipantPermissions::default()),
            controls: InputControls::default(),
            transcript: Transcript::new(),
            alerts: AlertQueue::default(),
            transcript_open: false,
            focus: Focus::Controls,
        }
    }
}

impl DisplayState {
    /// Create the initial display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a session message into the display
    pub fn apply_message(&mut self, msg: SessionMessage, now: Instant) -> Applied {
        let mut applied = Applied::default();
        match msg {
            SessionMessage::State { state, revision } => {
                if revision < self.revision {
                    tracing::trace!(revision, current = self.revision, "Dropping stale state");
                    return applied;
                }
                let was_active = self.session_state.is_active();
                self.revision = revision;
                self.session_state = state;
                applied.session_ended = self.apply_state(state, was_active);
                applied.transcript = applied.session_ended;
            }
            SessionMessage::Alert(alert) => self.alerts.push(alert, now),
            SessionMessage::Chat(message) => {
                if let TranscriptChange::Replaced(index) = self.transcript.push(message) {
                    tracing::trace!(index, "Transcript entry edited");
                }
                applied.transcript = true;
            }
            SessionMessage::AgentAvailability { available } => {
                self.agent_available = available && self.session_state.is_active();
                if !self.agent_available && self.focus == Focus::Chat {
                    self.focus = Focus::Controls;
                }
            }
            SessionMessage::Permissions(permissions) => self.permissions = permissions,
            SessionMessage::TrackToggled { source, result } => {
                // The controller already raised an alert for a denial
                let _ = self.controls.get_mut(source).resolve(&result);
            }
        }
        applied
    }

    /// Returns whether an active session just ended
    fn apply_state(&mut self, state: SessionState, was_active: bool) -> bool {
        match state {
            SessionState::Connecting => {
                if !was_active {
                    self.transcript.clear();
                }
                self.controls.microphone.enabled = true;
            }
            SessionState::Connected => self.controls.microphone.enabled = true,
            SessionState::Disconnecting | SessionState::Disconnected => {
                self.agent_available = false;
                self.focus = Focus::Controls;
                if state == SessionState::Disconnected {
                    self.controls.reset();
                }
            }
        }
        was_active && !state.is_active()
    }

    /// Controls shown for the current permissions
    pub fn visible_controls(&self, config: &AppConfig) -> VisibleControls {
        VisibleControls::resolve(&ControlBarControls::from_config(config), &self.permissions)
            .restrict_to_features(config)
    }

    /// Whether the chat input can take focus
    pub fn chat_available(&self, config: &AppConfig) -> bool {
        self.session_state == SessionState::Connected
            && self
                .visible_controls(config)
                .chat_input_enabled(self.agent_available)
    }

    /// Whether the capture toggle for `source` can be used now
    pub fn toggle_available(&self, source: TrackSource, config: &AppConfig) -> bool {
        self.session_state == SessionState::Connected
            && self.visible_controls(config).shows(source)
            && !self.controls.get(source).pending
    }

    /// Whether the empty-transcript listening hint is shown
    pub fn shows_pre_connect_hint(&self, config: &AppConfig) -> bool {
        show_pre_connect_hint(
            config.is_pre_connect_buffer_enabled,
            self.session_state.is_active(),
            &self.transcript,
        )
    }

    /// Whether the welcome view is shown instead of the session view
    pub fn shows_welcome(&self) -> bool {
        self.session_state == SessionState::Disconnected
    }

    /// Drop expired toasts; returns whether anything changed
    pub fn update(&mut self, now: Instant) -> bool {
        self.alerts.expire(now)
    }
}
