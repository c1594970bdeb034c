//! Agent TUI - Terminal surface for the voice-agent front-end
//!
//! This crate renders the session driven by `agent-core` in a full-screen
//! terminal UI: a welcome view, the agent panel, a transcript with follow
//! mode, the control bar and a toast stack for alerts.
//!
//! # Architecture
//!
//! - **SessionClient**: Embedded session controller plus its message channel
//! - **Display**: Folds session messages into render state
//! - **Keys**: Key events to surface actions
//! - **Widgets**: Borderless widgets drawn straight into the frame
//! - **Theme**: Palettes for the applied theme class

pub mod app;
pub mod display;
pub mod keys;
pub mod session_client;
pub mod theme;
pub mod widgets;

pub use app::App;
