//! Control Bar State
//!
//! Pure state composition for the control bar: which controls are shown and
//! the `{pending, enabled}` state of each capture toggle. Nothing here does
//! I/O; the surface feeds in room permissions and toggle results.

use crate::config::AppConfig;
use crate::room::{DeviceFailure, ParticipantPermissions, RoomError, TrackSource};

/// Label of the transcript toggle
#[must_use]
pub fn transcript_toggle_label(open: bool) -> &'static str {
    if open {
        "HIDE TRANSCRIPT"
    } else {
        "SHOW TRANSCRIPT"
    }
}

/// Explicit per-control visibility overrides
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlBarControls {
    /// End-call control
    pub leave: Option<bool>,
    /// Microphone toggle
    pub microphone: Option<bool>,
    /// Camera toggle
    pub camera: Option<bool>,
    /// Screen share toggle
    pub screen_share: Option<bool>,
    /// Chat input
    pub chat: Option<bool>,
}

impl ControlBarControls {
    /// Overrides derived from the app configuration
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            leave: Some(true),
            microphone: Some(true),
            camera: Some(config.supports_video_input),
            screen_share: Some(config.supports_video_input),
            chat: Some(config.supports_chat_input),
        }
    }
}

/// What the local participant may publish
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishPermissions {
    /// May publish the microphone
    pub microphone: bool,
    /// May publish the camera
    pub camera: bool,
    /// May publish a screen share
    pub screen_share: bool,
    /// May publish data (chat)
    pub data: bool,
}

impl PublishPermissions {
    /// Derive from the participant's permissions
    ///
    /// An empty allowed-source list means every source is allowed.
    #[must_use]
    pub fn from_participant(permissions: &ParticipantPermissions) -> Self {
        let can = |source: TrackSource| {
            permissions.can_publish
                && (permissions.can_publish_sources.is_empty()
                    || permissions.can_publish_sources.contains(&source))
        };
        Self {
            microphone: can(TrackSource::Microphone),
            camera: can(TrackSource::Camera),
            screen_share: can(TrackSource::ScreenShare),
            data: permissions.can_publish_data,
        }
    }
}

/// Resolved visibility of every control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleControls {
    /// End-call control
    pub leave: bool,
    /// Microphone toggle
    pub microphone: bool,
    /// Camera toggle
    pub camera: bool,
    /// Screen share toggle
    pub screen_share: bool,
    /// Chat input
    pub chat: bool,
}

impl VisibleControls {
    /// Each control is shown when its override or its permission is set
    ///
    /// An absent override counts as `false`; leave has an implicit
    /// permission of `true`.
    #[must_use]
    pub fn resolve(controls: &ControlBarControls, permissions: &PublishPermissions) -> Self {
        let or = |over: Option<bool>, permitted: bool| over.unwrap_or(false) || permitted;
        Self {
            leave: or(controls.leave, true),
            microphone: or(controls.microphone, permissions.microphone),
            camera: or(controls.camera, permissions.camera),
            screen_share: or(controls.screen_share, permissions.screen_share),
            chat: or(controls.chat, permissions.data),
        }
    }

    /// Hide features the deployment does not support at all
    #[must_use]
    pub fn restrict_to_features(mut self, config: &AppConfig) -> Self {
        self.camera &= config.supports_video_input;
        self.screen_share &= config.supports_video_input;
        self.chat &= config.supports_chat_input;
        self
    }

    /// Whether the toggle for `source` is shown
    #[must_use]
    pub fn shows(&self, source: TrackSource) -> bool {
        match source {
            TrackSource::Microphone => self.microphone,
            TrackSource::Camera => self.camera,
            TrackSource::ScreenShare => self.screen_share,
        }
    }

    /// Whether the chat input accepts text
    #[must_use]
    pub fn chat_input_enabled(&self, agent_available: bool) -> bool {
        self.chat && agent_available
    }
}

/// `{pending, enabled}` state of one capture toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackToggle {
    /// Source this toggle controls
    pub source: TrackSource,
    /// Last confirmed state
    pub enabled: bool,
    /// A request is in flight
    pub pending: bool,
}

impl TrackToggle {
    /// Idle toggle
    #[must_use]
    pub fn new(source: TrackSource, enabled: bool) -> Self {
        Self {
            source,
            enabled,
            pending: false,
        }
    }

    /// Begin flipping the toggle
    ///
    /// Returns the requested state, or `None` if a request is already pending.
    pub fn request(&mut self) -> Option<bool> {
        if self.pending {
            return None;
        }
        self.pending = true;
        Some(!self.enabled)
    }

    /// Apply the result of a request
    ///
    /// A grant updates `enabled`; a denial keeps the prior value and returns
    /// the failure for the device-error callback.
    pub fn resolve(&mut self, result: &Result<bool, RoomError>) -> Option<DeviceFailure> {
        self.pending = false;
        match result {
            Ok(enabled) => {
                self.enabled = *enabled;
                None
            }
            Err(err) => Some(err.device_failure().unwrap_or_else(|| DeviceFailure {
                device: Some(self.source),
                name: "Error".to_string(),
                message: err.to_string(),
            })),
        }
    }
}

/// The three capture toggles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputControls {
    /// Microphone toggle
    pub microphone: TrackToggle,
    /// Camera toggle
    pub camera: TrackToggle,
    /// Screen share toggle
    pub screen_share: TrackToggle,
}

impl Default for InputControls {
    fn default() -> Self {
        Self {
            microphone: TrackToggle::new(TrackSource::Microphone, false),
            camera: TrackToggle::new(TrackSource::Camera, false),
            screen_share: TrackToggle::new(TrackSource::ScreenShare, false),
        }
    }
}

impl InputControls {
    /// Toggle for `source`
    #[must_use]
    pub fn get(&self, source: TrackSource) -> &TrackToggle {
        match source {
            TrackSource::Microphone => &self.microphone,
            TrackSource::Camera => &self.camera,
            TrackSource::ScreenShare => &self.screen_share,
        }
    }

    /// Mutable toggle for `source`
    pub fn get_mut(&mut self, source: TrackSource) -> &mut TrackToggle {
        match source {
            TrackSource::Microphone => &mut self.microphone,
            TrackSource::Camera => &mut self.camera,
            TrackSource::ScreenShare => &mut self.screen_share,
        }
    }

    /// Everything off, nothing pending
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn all_permitted() -> PublishPermissions {
        PublishPermissions::from_participant(&ParticipantPermissions::default())
    }

    // ============================================================================
    // Visibility
    // ============================================================================

    #[test]
    fn test_override_or_permission() {
        let controls = ControlBarControls {
            microphone: Some(true),
            camera: Some(false),
            ..ControlBarControls::default()
        };
        let permissions = PublishPermissions {
            microphone: false,
            camera: true,
            screen_share: false,
            data: false,
        };

        let visible = VisibleControls::resolve(&controls, &permissions);

        assert!(visible.leave);
        assert!(visible.microphone);
        assert!(visible.camera);
        assert!(!visible.screen_share);
        assert!(!visible.chat);
    }

    #[test]
    fn test_allowed_sources_restrict_permissions() {
        let perms = ParticipantPermissions {
            can_publish_sources: vec![TrackSource::Microphone],
            ..ParticipantPermissions::default()
        };
        let publish = PublishPermissions::from_participant(&perms);
        assert!(publish.microphone);
        assert!(!publish.camera);
        assert!(!publish.screen_share);
        assert!(publish.data);

        let perms = ParticipantPermissions {
            can_publish: false,
            ..ParticipantPermissions::default()
        };
        assert!(!PublishPermissions::from_participant(&perms).microphone);
    }

    #[test]
    fn test_unsupported_features_hidden() {
        let config = AppConfig {
            supports_video_input: false,
            supports_chat_input: false,
            ..AppConfig::default()
        };
        let controls = ControlBarControls::from_config(&config);

        let visible =
            VisibleControls::resolve(&controls, &all_permitted()).restrict_to_features(&config);

        assert!(visible.microphone);
        assert!(!visible.camera);
        assert!(!visible.screen_share);
        assert!(!visible.chat);
        assert!(!visible.chat_input_enabled(true));
    }

    #[test]
    fn test_chat_needs_agent() {
        let controls = ControlBarControls::from_config(&AppConfig::default());
        let visible = VisibleControls::resolve(&controls, &all_permitted());
        assert!(visible.chat);
        assert!(!visible.chat_input_enabled(false));
        assert!(visible.chat_input_enabled(true));
    }

    #[test]
    fn test_transcript_label() {
        assert_eq!(transcript_toggle_label(false), "SHOW TRANSCRIPT");
        assert_eq!(transcript_toggle_label(true), "HIDE TRANSCRIPT");
    }

    // ============================================================================
    // Toggles
    // ============================================================================

    #[test]
    fn test_toggle_grant() {
        let mut toggle = TrackToggle::new(TrackSource::Camera, false);
        assert_eq!(toggle.request(), Some(true));
        assert!(toggle.pending);
        assert_eq!(toggle.request(), None);

        assert_eq!(toggle.resolve(&Ok(true)), None);
        assert!(toggle.enabled);
        assert!(!toggle.pending);
    }

    #[test]
    fn test_toggle_denial_keeps_prior_value() {
        let mut toggle = TrackToggle::new(TrackSource::Camera, false);
        toggle.request();

        let failure = toggle
            .resolve(&Err(RoomError::PermissionDenied {
                device: TrackSource::Camera,
                message: "Permission denied".into(),
            }))
            .unwrap();

        assert!(!toggle.enabled);
        assert!(!toggle.pending);
        assert_eq!(failure.device, Some(TrackSource::Camera));
        assert_eq!(failure.name, "NotAllowedError");
    }

    #[test]
    fn test_non_device_error_still_reports_source() {
        let mut toggle = TrackToggle::new(TrackSource::ScreenShare, true);
        toggle.request();
        let failure = toggle
            .resolve(&Err(RoomError::InvalidState("not connected".into())))
            .unwrap();
        assert!(toggle.enabled);
        assert_eq!(failure.device, Some(TrackSource::ScreenShare));
    }

    #[test]
    fn test_input_controls_reset() {
        let mut inputs = InputControls::default();
        inputs.get_mut(TrackSource::Microphone).enabled = true;
        inputs.get_mut(TrackSource::Camera).pending = true;

        inputs.reset();

        assert_eq!(inputs, InputControls::default());
        assert!(!inputs.get(TrackSource::Microphone).enabled);
    }
}
