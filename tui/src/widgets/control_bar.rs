//! Control Bar Widget
//!
//! One row of key-labelled controls. Hidden controls are skipped entirely;
//! controls that exist but cannot be used right now are drawn dimmed.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;

use agent_core::controls::{transcript_toggle_label, InputControls, TrackToggle, VisibleControls};
use agent_core::{SessionState, TrackSource};

use crate::theme::{Palette, SUCCESS_GREEN};

/// One drawn control
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlItem {
    /// Key that triggers it
    pub key: &'static str,
    /// Label text
    pub label: String,
    /// Usable right now
    pub enabled: bool,
    /// Currently on
    pub active: bool,
}

/// Control bar
pub struct ControlBar<'a> {
    visible: VisibleControls,
    controls: &'a InputControls,
    session_state: SessionState,
    transcript_open: bool,
    chat_enabled: bool,
    palette: &'a Palette,
}

impl<'a> ControlBar<'a> {
    pub fn new(
        visible: VisibleControls,
        controls: &'a InputControls,
        session_state: SessionState,
        palette: &'a Palette,
    ) -> Self {
        Self {
            visible,
            controls,
            session_state,
            transcript_open: false,
            chat_enabled: false,
            palette,
        }
    }

    pub fn transcript_open(mut self, open: bool) -> Self {
        self.transcript_open = open;
        self
    }

    pub fn chat_enabled(mut self, enabled: bool) -> Self {
        self.chat_enabled = enabled;
        self
    }

    fn toggle_item(&self, key: &'static str, toggle: &TrackToggle) -> ControlItem {
        let name = match toggle.source {
            TrackSource::Microphone => "MIC",
            TrackSource::Camera => "CAMERA",
            TrackSource::ScreenShare => "SCREEN",
        };
        let state = if toggle.pending {
            "..."
        } else if toggle.enabled {
            "ON"
        } else {
            "OFF"
        };
        ControlItem {
            key,
            label: format!("{name} {state}"),
            enabled: self.session_state == SessionState::Connected && !toggle.pending,
            active: toggle.enabled,
        }
    }

    /// Controls in display order
    pub fn items(&self) -> Vec<ControlItem> {
        let mut items = Vec::new();
        let toggles = [
            ("m", &self.controls.microphone),
            ("c", &self.controls.camera),
            ("x", &self.controls.screen_share),
        ];
        for (key, toggle) in toggles {
            if self.visible.shows(toggle.source) {
                items.push(self.toggle_item(key, toggle));
            }
        }
        if self.visible.chat {
            items.push(ControlItem {
                key: "i",
                label: "CHAT".to_string(),
                enabled: self.chat_enabled,
                active: false,
            });
        }
        items.push(ControlItem {
            key: "t",
            label: transcript_toggle_label(self.transcript_open).to_string(),
            enabled: true,
            active: self.transcript_open,
        });
        if self.visible.leave {
            items.push(ControlItem {
                key: "e",
                label: "END CALL".to_string(),
                enabled: self.session_state.is_active(),
                active: false,
            });
        }
        items
    }
}

impl Widget for ControlBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let mut x = area.x + 1;
        let right = area.x + area.width;
        for item in self.items() {
            let style = if !item.enabled {
                self.palette.dim()
            } else if item.active {
                Style::default()
                    .fg(SUCCESS_GREEN)
                    .bg(self.palette.background)
                    .add_modifier(Modifier::BOLD)
            } else {
                self.palette.base()
            };
            let text = format!("[{}] {}", item.key, item.label);
            if x >= right {
                break;
            }
            let (end, _) = buf.set_stringn(x, area.y, &text, (right - x) as usize, style);
            x = end + 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{AppConfig, ThemeClass};
    use pretty_assertions::assert_eq;

    fn all_visible() -> VisibleControls {
        VisibleControls {
            leave: true,
            microphone: true,
            camera: true,
            screen_share: true,
            chat: true,
        }
    }

    #[test]
    fn test_items_follow_visibility() {
        let palette = Palette::new(ThemeClass::Dark, &AppConfig::default());
        let controls = InputControls::default();
        let visible = VisibleControls {
            camera: false,
            screen_share: false,
            ..all_visible()
        };

        let keys: Vec<_> = ControlBar::new(visible, &controls, SessionState::Connected, &palette)
            .items()
            .into_iter()
            .map(|i| i.key)
            .collect();
        assert_eq!(keys, vec!["m", "i", "t", "e"]);
    }

    #[test]
    fn test_toggle_labels_and_enablement() {
        let palette = Palette::new(ThemeClass::Dark, &AppConfig::default());
        let mut controls = InputControls::default();
        controls.microphone.enabled = true;
        controls.camera.pending = true;

        let items = ControlBar::new(all_visible(), &controls, SessionState::Connected, &palette)
            .transcript_open(true)
            .items();
        assert_eq!(items[0].label, "MIC ON");
        assert!(items[0].enabled);
        assert_eq!(items[1].label, "CAMERA ...");
        assert!(!items[1].enabled);
        assert_eq!(items[2].label, "SCREEN OFF");
        assert!(!items[3].enabled, "chat disabled without an agent");
        assert_eq!(items[4].label, "HIDE TRANSCRIPT");
    }

    #[test]
    fn test_end_call_disabled_when_inactive() {
        let palette = Palette::new(ThemeClass::Light, &AppConfig::default());
        let controls = InputControls::default();
        let items =
            ControlBar::new(all_visible(), &controls, SessionState::Disconnecting, &palette).items();
        let end = items.last().map(|i| (i.key, i.enabled));
        assert_eq!(end, Some(("e", false)));
        assert!(items.iter().take(3).all(|i| !i.enabled));
    }
}
