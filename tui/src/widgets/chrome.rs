//! Header, welcome view, agent panel, chat input and status line

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::widgets::Widget;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use agent_core::{AppConfig, SessionState, ThemePreference};

use crate::theme::Palette;

/// Keep the tail of `text` that fits in `width` columns
pub fn tail_to_width(text: &str, width: usize) -> &str {
    if text.width() <= width {
        return text;
    }
    let mut used = 0;
    for (idx, ch) in text.char_indices().rev() {
        used += ch.width().unwrap_or(0);
        if used > width {
            return &text[idx + ch.len_utf8()..];
        }
    }
    text
}

fn centered(buf: &mut Buffer, area: Rect, y: u16, text: &str, style: ratatui::style::Style) {
    if y >= area.y + area.height {
        return;
    }
    let width = (text.width() as u16).min(area.width);
    let x = area.x + (area.width - width) / 2;
    buf.set_stringn(x, y, text, area.width as usize, style);
}

/// Company name and description
pub struct Header<'a> {
    config: &'a AppConfig,
    palette: &'a Palette,
}

impl<'a> Header<'a> {
    pub fn new(config: &'a AppConfig, palette: &'a Palette) -> Self {
        Self { config, palette }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let (end, _) = buf.set_stringn(
            area.x + 1,
            area.y,
            &self.config.company_name,
            area.width.saturating_sub(1) as usize,
            self.palette.accent(),
        );
        let remaining = (area.x + area.width).saturating_sub(end + 3);
        if remaining > 0 {
            buf.set_stringn(
                end + 3,
                area.y,
                &self.config.page_description,
                remaining as usize,
                self.palette.dim(),
            );
        }
    }
}

/// Shown while no session is running
pub struct Welcome<'a> {
    config: &'a AppConfig,
    palette: &'a Palette,
}

impl<'a> Welcome<'a> {
    pub fn new(config: &'a AppConfig, palette: &'a Palette) -> Self {
        Self { config, palette }
    }
}

impl Widget for Welcome<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mid = area.y + area.height / 2;
        centered(
            buf,
            area,
            mid.saturating_sub(2),
            &self.config.page_title,
            self.palette.base().add_modifier(Modifier::BOLD),
        );
        centered(
            buf,
            area,
            mid.saturating_sub(1),
            &self.config.page_description,
            self.palette.dim(),
        );
        let start = format!(
            "[ {} ]  press Enter",
            self.config.start_button_text.to_uppercase()
        );
        centered(buf, area, mid + 1, &start, self.palette.accent());
    }
}

/// Session view while the transcript is hidden
pub struct AgentPanel<'a> {
    state: SessionState,
    agent_available: bool,
    hint: Option<&'a str>,
    palette: &'a Palette,
}

impl<'a> AgentPanel<'a> {
    pub fn new(state: SessionState, agent_available: bool, palette: &'a Palette) -> Self {
        Self {
            state,
            agent_available,
            hint: None,
            palette,
        }
    }

    pub fn hint(mut self, hint: Option<&'a str>) -> Self {
        self.hint = hint;
        self
    }

    fn headline(&self) -> &'static str {
        match self.state {
            SessionState::Connecting => "Connecting...",
            SessionState::Connected if self.agent_available => "(o) Agent is here",
            SessionState::Connected => "Waiting for the agent to join...",
            SessionState::Disconnecting => "Ending call...",
            SessionState::Disconnected => "Call ended",
        }
    }
}

impl Widget for AgentPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mid = area.y + area.height / 2;
        let style = if self.agent_available {
            self.palette.accent()
        } else {
            self.palette.base()
        };
        centered(buf, area, mid.saturating_sub(1), self.headline(), style);
        if let Some(hint) = self.hint {
            centered(
                buf,
                area,
                mid + 1,
                hint,
                self.palette.dim().add_modifier(Modifier::ITALIC),
            );
        }
    }
}

/// Single-line chat input
pub struct ChatInput<'a> {
    buffer: &'a str,
    focused: bool,
    palette: &'a Palette,
}

impl<'a> ChatInput<'a> {
    pub fn new(buffer: &'a str, focused: bool, palette: &'a Palette) -> Self {
        Self {
            buffer,
            focused,
            palette,
        }
    }
}

impl Widget for ChatInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width < 4 {
            return;
        }
        let (prompt, style) = if self.focused {
            ("> ", self.palette.base())
        } else {
            ("  ", self.palette.dim())
        };
        let available = (area.width as usize).saturating_sub(prompt.len() + 2);
        let cursor = if self.focused { "_" } else { "" };
        let shown = if self.focused || !self.buffer.is_empty() {
            format!("{prompt}{}{cursor}", tail_to_width(self.buffer, available))
        } else {
            "  Type something... (i)".to_string()
        };
        buf.set_stringn(area.x + 1, area.y, &shown, area.width as usize - 1, style);
    }
}

/// Bottom status line
pub struct StatusLine<'a> {
    state: SessionState,
    theme: ThemePreference,
    agent_available: bool,
    rows_below: usize,
    offline: bool,
    palette: &'a Palette,
}

impl<'a> StatusLine<'a> {
    pub fn new(state: SessionState, theme: ThemePreference, palette: &'a Palette) -> Self {
        Self {
            state,
            theme,
            agent_available: false,
            rows_below: 0,
            offline: false,
            palette,
        }
    }

    pub fn agent_available(mut self, available: bool) -> Self {
        self.agent_available = available;
        self
    }

    pub fn rows_below(mut self, rows: usize) -> Self {
        self.rows_below = rows;
        self
    }

    /// Mark the session as running against the local loopback room
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Status text
    pub fn text(&self) -> String {
        let mut status = if self.offline {
            format!(" [offline loopback] {}", self.state.label())
        } else {
            format!(" {}", self.state.label())
        };
        if self.state == SessionState::Connected {
            status.push_str(if self.agent_available {
                " | agent present"
            } else {
                " | waiting for agent"
            });
        }
        if self.rows_below > 0 {
            status.push_str(&format!(" | {} more below (Ctrl+End)", self.rows_below));
        }
        status.push_str(&format!(" | theme: {} (d) | q quit", self.theme));
        status
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let style = match self.state {
            SessionState::Connecting | SessionState::Disconnecting => self.palette.accent(),
            _ => self.palette.dim(),
        };
        buf.set_stringn(area.x, area.y, self.text(), area.width as usize, style);
    }
}
