//! Toast Stack
//!
//! Alerts drawn top-right over everything else, newest at the bottom.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

use agent_core::AlertQueue;

use crate::theme::Palette;

const TOAST_WIDTH: u16 = 44;
const TOAST_HEIGHT: u16 = 4;

/// Toast stack widget
pub struct Toasts<'a> {
    alerts: &'a AlertQueue,
    palette: &'a Palette,
}

impl<'a> Toasts<'a> {
    pub fn new(alerts: &'a AlertQueue, palette: &'a Palette) -> Self {
        Self { alerts, palette }
    }

    /// Rectangles the toasts occupy within `area`
    pub fn slots(count: usize, area: Rect) -> Vec<Rect> {
        let width = TOAST_WIDTH.min(area.width);
        let x = area.x + area.width - width;
        (0..count)
            .map(|i| Rect::new(x, area.y + i as u16 * TOAST_HEIGHT, width, TOAST_HEIGHT))
            .take_while(|slot| slot.y + slot.height <= area.y + area.height)
            .collect()
    }
}

impl Widget for Toasts<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let slots = Self::slots(self.alerts.len(), area);
        for (alert, slot) in self.alerts.iter().zip(slots) {
            let color = self.palette.alert(alert.level);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(alert.title.as_str())
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .style(Style::default().fg(self.palette.foreground).bg(self.palette.surface));

            Clear.render(slot, buf);
            Paragraph::new(alert.description.as_str())
                .wrap(Wrap { trim: true })
                .block(block)
                .render(slot, buf);
        }
    }
}
