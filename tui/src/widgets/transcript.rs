//! Transcript Widget
//!
//! A borderless, scrollable view of the chat transcript that stays pinned to
//! the newest message while the user is at (or near) the bottom.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;

use agent_core::transcript::{AutoScroll, MessageOrigin, ScrollMetrics, Transcript};

use crate::theme::Palette;

/// Rows from the bottom that still count as "at the bottom"
///
/// Row-unit equivalent of the 48 px `DEFAULT_FOLLOW_THRESHOLD`.
pub const FOLLOW_THRESHOLD_ROWS: usize = 2;

/// Scroll state for the transcript view
#[derive(Debug)]
pub struct TranscriptViewState {
    /// First visible row
    pub scroll_top: usize,
    /// Total wrapped rows at the last render
    pub total_lines: usize,
    /// Visible rows at the last render
    pub client_height: usize,
    follow: AutoScroll,
    content_changed: bool,
}

impl Default for TranscriptViewState {
    fn default() -> Self {
        Self {
            scroll_top: 0,
            total_lines: 0,
            client_height: 0,
            follow: AutoScroll::new(FOLLOW_THRESHOLD_ROWS),
            content_changed: false,
        }
    }
}

impl TranscriptViewState {
    /// Current scroll position
    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.scroll_top,
            client_height: self.client_height,
            scroll_height: self.total_lines,
        }
    }

    /// Scroll by delta rows (positive = down) and re-evaluate follow mode
    pub fn scroll(&mut self, delta: isize) {
        let max = self.metrics().max_offset();
        self.scroll_top = self.scroll_top.saturating_add_signed(delta).min(max);
        self.follow.on_scroll(self.metrics());
    }

    /// Jump to the newest message and follow again
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.metrics().max_offset();
        self.follow.reset();
    }

    /// New or edited content arrived, or the view became visible
    pub fn mark_changed(&mut self) {
        self.content_changed = true;
    }

    /// Back to the top of an empty transcript, following
    pub fn reset(&mut self) {
        self.scroll_top = 0;
        self.total_lines = 0;
        self.follow.reset();
        self.content_changed = true;
    }

    /// Whether new content moves the view
    pub fn is_following(&self) -> bool {
        self.follow.is_following()
    }

    /// Rows above the view
    pub fn rows_above(&self) -> usize {
        self.scroll_top
    }

    /// Rows below the view
    pub fn rows_below(&self) -> usize {
        self.metrics().max_offset().saturating_sub(self.scroll_top)
    }

    fn layout(&mut self, total_lines: usize, client_height: usize) {
        self.total_lines = total_lines;
        self.client_height = client_height;
        if std::mem::take(&mut self.content_changed) {
            if let Some(offset) = self.follow.on_content_changed(self.metrics(), true) {
                self.scroll_top = offset;
            }
        }
        self.scroll_top = self.scroll_top.min(self.metrics().max_offset());
    }
}

/// The transcript view
pub struct TranscriptView<'a> {
    transcript: &'a Transcript,
    palette: &'a Palette,
    hint: Option<&'a str>,
}

impl<'a> TranscriptView<'a> {
    pub fn new(transcript: &'a Transcript, palette: &'a Palette) -> Self {
        Self {
            transcript,
            palette,
            hint: None,
        }
    }

    /// Text shown while the transcript is empty
    pub fn hint(mut self, hint: Option<&'a str>) -> Self {
        self.hint = hint;
        self
    }

    fn lines(&self, width: usize) -> Vec<(String, Style)> {
        let mut lines = Vec::new();
        for message in self.transcript.messages() {
            let (prefix, style) = match message.origin {
                MessageOrigin::Local => ("You: ", Style::default().fg(self.palette.local)),
                MessageOrigin::Remote => ("Agent: ", Style::default().fg(self.palette.remote)),
            };
            let mut content = format!("{prefix}{}", message.text);
            if message.edited {
                content.push_str(" (edited)");
            }
            for line in wrap(&content, width) {
                lines.push((line.into_owned(), style));
            }
            lines.push((String::new(), Style::default()));
        }
        lines
    }
}

impl StatefulWidget for TranscriptView<'_> {
    type State = TranscriptViewState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width < 4 || area.height == 0 {
            return;
        }

        if self.transcript.is_empty() {
            state.layout(0, area.height as usize);
            if let Some(hint) = self.hint {
                let style = self.palette.dim().add_modifier(Modifier::ITALIC);
                let y = area.y + area.height / 2;
                let x = area.x + area.width.saturating_sub(hint.len() as u16) / 2;
                buf.set_stringn(x, y, hint, area.width as usize, style);
            }
            return;
        }

        let lines = self.lines(area.width as usize);
        state.layout(lines.len(), area.height as usize);

        for (i, (line, style)) in lines
            .iter()
            .skip(state.scroll_top)
            .take(area.height as usize)
            .enumerate()
        {
            let y = area.y + i as u16;
            buf.set_stringn(area.x, y, line, area.width as usize, style.bg(self.palette.background));
        }
    }
}
