//! Theme and Colors
//!
//! Terminal palettes for the two theme classes. The accent comes from the
//! branding config (`accent` for light, `accent_dark` for dark) and falls
//! back to the built-in accent when the hex string does not parse.

use ratatui::style::{Color, Modifier, Style};

use agent_core::{AlertLevel, AppConfig, ThemeClass};

// ============================================================================
// Built-in Colors
// ============================================================================

/// Default light-theme accent (`#002cf2`)
pub const ACCENT_LIGHT: Color = Color::Rgb(0x00, 0x2c, 0xf2);

/// Default dark-theme accent (`#1fd5f9`)
pub const ACCENT_DARK: Color = Color::Rgb(0x1f, 0xd5, 0xf9);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Warning amber
pub const WARNING_AMBER: Color = Color::Rgb(255, 191, 0);

/// Success green
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

/// Parse `#rrggbb` (or `rrggbb`)
pub fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Colors for one theme class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Class this palette renders
    pub class: ThemeClass,
    /// Background
    pub background: Color,
    /// Body text
    pub foreground: Color,
    /// Secondary text, separators
    pub muted: Color,
    /// Branding accent
    pub accent: Color,
    /// Local (user) messages
    pub local: Color,
    /// Remote (agent) messages
    pub remote: Color,
    /// Toast background
    pub surface: Color,
}

impl Palette {
    /// Palette for `class`, with the branding accent applied
    pub fn new(class: ThemeClass, config: &AppConfig) -> Self {
        match class {
            ThemeClass::Dark => Self {
                class,
                background: Color::Rgb(0x0b, 0x0b, 0x0c),
                foreground: Color::Rgb(0xe6, 0xe6, 0xe6),
                muted: Color::Rgb(0x8a, 0x8a, 0x8a),
                accent: parse_hex(&config.accent_dark).unwrap_or(ACCENT_DARK),
                local: Color::Rgb(0xb4, 0xb4, 0xb4),
                remote: Color::Rgb(0xf2, 0xf2, 0xf2),
                surface: Color::Rgb(0x1c, 0x1c, 0x1f),
            },
            ThemeClass::Light => Self {
                class,
                background: Color::Rgb(0xff, 0xff, 0xff),
                foreground: Color::Rgb(0x14, 0x14, 0x14),
                muted: Color::Rgb(0x6b, 0x6b, 0x6b),
                accent: parse_hex(&config.accent).unwrap_or(ACCENT_LIGHT),
                local: Color::Rgb(0x3d, 0x3d, 0x3d),
                remote: Color::Rgb(0x0a, 0x0a, 0x0a),
                surface: Color::Rgb(0xf1, 0xf1, 0xf1),
            },
        }
    }

    /// Base style for the whole frame
    pub fn base(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    /// Secondary text
    pub fn dim(&self) -> Style {
        Style::default().fg(self.muted).bg(self.background)
    }

    /// Accent text
    pub fn accent(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .bg(self.background)
            .add_modifier(Modifier::BOLD)
    }

    /// Color for a toast of this level
    pub fn alert(&self, level: AlertLevel) -> Color {
        match level {
            AlertLevel::Error => ERROR_RED,
            AlertLevel::Warning => WARNING_AMBER,
            AlertLevel::Info => self.accent,
        }
    }
}
