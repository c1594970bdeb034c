//! Alerts
//!
//! Transient, dismissible notices shown as a toast stack. Every user-facing
//! failure ends up here; nothing else is surfaced.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::AgentError;
use crate::room::{DeviceFailure, TrackSource};

/// Title of the alert raised when a session fails to start
pub const CONNECT_ERROR_TITLE: &str = "There was an error connecting to the agent";

/// Title of the alert raised on a mid-session device failure
pub const MEDIA_DEVICES_ERROR_TITLE: &str = "Encountered an error with your media devices";

/// How long a toast stays up without being dismissed
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_secs(8);

const MAX_VISIBLE: usize = 4;

/// Severity of an alert
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertLevel {
    /// Something failed
    #[default]
    Error,
    /// Something ended unexpectedly
    Warning,
    /// Informational
    Info,
}

/// A toast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Headline
    pub title: String,
    /// Detail line
    pub description: String,
    /// Severity
    pub level: AlertLevel,
}

impl Alert {
    /// Alert with the default level
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: AlertLevel::Error,
        }
    }

    /// Override the level
    #[must_use]
    pub fn with_level(mut self, level: AlertLevel) -> Self {
        self.level = level;
        self
    }

    /// A session start failed
    #[must_use]
    pub fn connection_error(err: &AgentError) -> Self {
        Self::new(CONNECT_ERROR_TITLE, err.describe())
    }

    /// A capture device failed mid-session
    #[must_use]
    pub fn media_devices_error(failure: &DeviceFailure) -> Self {
        Self::new(MEDIA_DEVICES_ERROR_TITLE, failure.describe())
    }

    /// A toggle for `source` was refused
    #[must_use]
    pub fn device_error(source: TrackSource, failure: &DeviceFailure) -> Self {
        Self::new(
            format!("Encountered an error with your {source}"),
            failure.describe(),
        )
    }

    /// No agent joined in time
    #[must_use]
    pub fn agent_did_not_join() -> Self {
        Self::new("Session ended", "The agent did not join the room").with_level(AlertLevel::Warning)
    }
}

/// Toast stack with expiry
#[derive(Debug)]
pub struct AlertQueue {
    alerts: VecDeque<(Alert, Instant)>,
    ttl: Duration,
}

impl Default for AlertQueue {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_TTL)
    }
}

impl AlertQueue {
    /// Empty stack whose toasts live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            alerts: VecDeque::new(),
            ttl,
        }
    }

    /// Show an alert; the oldest is dropped when the stack is full
    pub fn push(&mut self, alert: Alert, now: Instant) {
        if self.alerts.len() == MAX_VISIBLE {
            self.alerts.pop_front();
        }
        self.alerts.push_back((alert, now + self.ttl));
    }

    /// Dismiss the newest alert
    pub fn dismiss_latest(&mut self) -> Option<Alert> {
        self.alerts.pop_back().map(|(alert, _)| alert)
    }

    /// Drop expired alerts; returns whether anything changed
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|(_, deadline)| *deadline > now);
        self.alerts.len() != before
    }

    /// Visible alerts, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().map(|(alert, _)| alert)
    }

    /// Number of visible alerts
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether no alert is visible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
