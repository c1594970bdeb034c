//! Transcript and Follow Mode
//!
//! Chat/transcription messages in receipt order, plus the auto-scroll latch
//! that keeps the view pinned to the newest message until the user scrolls
//! away from the bottom.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default distance from the bottom that still counts as "at the bottom"
pub const DEFAULT_FOLLOW_THRESHOLD: usize = 48;

/// Hint shown in an empty transcript while pre-connect buffering is on
pub const PRE_CONNECT_HINT: &str = "Agent is listening, ask it a question";

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    /// The local participant
    Local,
    /// The agent or another remote participant
    Remote,
}

/// A chat or transcription message delivered by the room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id; a re-delivery with the same id is an edit
    pub id: String,
    /// When the message was first received
    pub timestamp: DateTime<Utc>,
    /// Sender side
    pub origin: MessageOrigin,
    /// Message body
    pub text: String,
    /// Whether the message has been edited since first delivery
    #[serde(default)]
    pub edited: bool,
}

impl ChatMessage {
    /// New message with a fresh id
    pub fn new(origin: MessageOrigin, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            origin,
            text: text.into(),
            edited: false,
        }
    }

    /// New local message
    pub fn local(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Local, text)
    }

    /// New remote message
    pub fn remote(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Remote, text)
    }

    /// Override the id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the local participant sent this
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.origin == MessageOrigin::Local
    }
}

/// Result of adding a message to the transcript
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptChange {
    /// New message appended at the end
    Appended,
    /// Existing entry at this index replaced in place
    Replaced(usize),
}

/// Messages in receipt order
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message; a known id replaces the entry without moving it
    pub fn push(&mut self, message: ChatMessage) -> TranscriptChange {
        if let Some(index) = self.messages.iter().position(|m| m.id == message.id) {
            let entry = &mut self.messages[index];
            let timestamp = entry.timestamp;
            *entry = ChatMessage {
                timestamp,
                edited: true,
                ..message
            };
            return TranscriptChange::Replaced(index);
        }
        self.messages.push(message);
        TranscriptChange::Appended
    }

    /// Messages in receipt order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no message has arrived yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message (new session)
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Whether the pre-connect hint should be shown
#[must_use]
pub fn show_pre_connect_hint(
    pre_connect_buffer_enabled: bool,
    session_active: bool,
    transcript: &Transcript,
) -> bool {
    pre_connect_buffer_enabled && session_active && transcript.is_empty()
}

/// Scroll position of the transcript container
///
/// Units are whatever the hosting surface scrolls in (rows in a terminal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    /// Offset of the first visible unit
    pub scroll_top: usize,
    /// Visible height
    pub client_height: usize,
    /// Total content height
    pub scroll_height: usize,
}

impl ScrollMetrics {
    /// Largest valid `scroll_top`
    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.scroll_height.saturating_sub(self.client_height)
    }
}

/// Follow-mode latch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FollowMode {
    /// Pinned to the newest content
    #[default]
    Following,
    /// The user scrolled away; content changes leave the offset alone
    Free,
}

/// Auto-scroll controller for the transcript
#[derive(Clone, Copy, Debug)]
pub struct AutoScroll {
    mode: FollowMode,
    threshold: usize,
}

impl Default for AutoScroll {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_THRESHOLD)
    }
}

impl AutoScroll {
    /// Controller starting in follow mode with the given threshold
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            mode: FollowMode::Following,
            threshold,
        }
    }

    /// Current latch state
    #[must_use]
    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Whether new content will move the view
    #[must_use]
    pub fn is_following(&self) -> bool {
        self.mode == FollowMode::Following
    }

    /// Re-evaluate the latch after a user scroll
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> FollowMode {
        let bottom = metrics.scroll_top + metrics.client_height;
        self.mode = if bottom >= metrics.scroll_height.saturating_sub(self.threshold) {
            FollowMode::Following
        } else {
            FollowMode::Free
        };
        self.mode
    }

    /// New offset after content changed, or `None` to leave it unchanged
    #[must_use]
    pub fn on_content_changed(&self, metrics: ScrollMetrics, visible: bool) -> Option<usize> {
        (visible && self.is_following()).then(|| metrics.max_offset())
    }

    /// Re-latch to follow mode (new session, explicit jump to bottom)
    pub fn reset(&mut self) {
        self.mode = FollowMode::Following;
    }
}
