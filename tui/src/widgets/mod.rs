//! TUI Widgets
//!
//! Borderless widgets drawn straight into the frame buffer.

pub mod chrome;
pub mod control_bar;
pub mod toasts;
pub mod transcript;

pub use chrome::{AgentPanel, ChatInput, Header, StatusLine, Welcome};
pub use control_bar::{ControlBar, ControlItem};
pub use toasts::Toasts;
pub use transcript::{TranscriptView, TranscriptViewState};
