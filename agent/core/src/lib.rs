//! Agent Core - Headless Session Logic for the Voice-Agent Front-End
//!
//! This crate holds everything the front-end does that is not drawing:
//! loading branding/config, obtaining connection credentials, driving the
//! real-time room session, and the pure state behind the control bar,
//! transcript and theme. A surface (the terminal UI, or a test) renders it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Surface (agent-tui)                      │
//! │     start / end / toggle / chat          SessionMessage       │
//! └───────────────┬───────────────────────────────▲──────────────┘
//!                 │                               │ mpsc
//! ┌───────────────▼───────────────────────────────┴──────────────┐
//! │                       SessionController                       │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────────┐ │
//! │  │ TokenSource │   │ RoomTransport│   │ AppConfig (Arc)    │ │
//! │  │ endpoint /  │   │ in-process / │   │ defaults, file,    │ │
//! │  │ local mint  │   │ SDK-backed   │   │ remote, env        │ │
//! │  └─────────────┘   └──────────────┘   └────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: owns the room and the session lifecycle
//! - [`SessionMessage`]: what the controller reports to the surface
//! - [`TokenSource`]: where connection credentials come from
//! - [`RoomTransport`]: the seam to the real-time media backend
//! - [`AppConfig`]: branding and feature flags, loaded once
//! - [`ThemeController`]: persisted dark/light/system preference
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use agent_core::{
//!     config::{ConfigLoader, EnvSettings},
//!     room::InProcessRoom,
//!     token::token_source_from_settings,
//!     SessionController,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = EnvSettings::from_env();
//!     let loaded = ConfigLoader::new(settings.clone()).load().await;
//!     let tokens = token_source_from_settings(&settings, &loaded.config)?;
//!
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let session = SessionController::new(
//!         Arc::new(InProcessRoom::default()),
//!         tokens,
//!         loaded.config,
//!         tx,
//!     );
//!
//!     session.start();
//!     while let Some(msg) = rx.recv().await {
//!         // Render message
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alerts;
pub mod config;
pub mod controls;
pub mod error;
pub mod room;
pub mod session;
pub mod theme;
pub mod token;
pub mod transcript;

pub use alerts::{Alert, AlertLevel, AlertQueue};
pub use config::{AppConfig, ConfigLoader, ConfigSource, EnvSettings, LoadedConfig};
pub use controls::{
    ControlBarControls, InputControls, PublishPermissions, TrackToggle, VisibleControls,
};
pub use error::{AgentError, AgentResult, ErrorKind};
pub use room::{RoomEvent, RoomTransport, TrackSource};
pub use session::{SessionController, SessionMessage, SessionOptions, SessionState};
pub use theme::{ThemeClass, ThemeController, ThemePreference, ThemeStore};
pub use token::{ConnectionDetails, TokenRequest, TokenSource};
pub use transcript::{AutoScroll, ChatMessage, ScrollMetrics, Transcript};
