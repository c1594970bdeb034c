//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - SessionClient for the call itself
//! - DisplayState for rendering
//!
//! Key presses become [`Action`]s, actions become controller calls, and
//! controller messages are folded into the display state before each frame.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEventKind, MouseEvent, MouseEventKind};
use futures::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::widgets::Block;
use ratatui::{Frame, Terminal};

use agent_core::transcript::PRE_CONNECT_HINT;
use agent_core::{Alert, AlertLevel, AppConfig, RoomTransport, SessionMessage, ThemeController};

use crate::display::{DisplayState, Focus};
use crate::keys::{map_key, Action};
use crate::session_client::SessionClient;
use crate::theme::Palette;
use crate::widgets::{
    AgentPanel, ChatInput, ControlBar, Header, StatusLine, Toasts, TranscriptView,
    TranscriptViewState, Welcome,
};

/// Rows scrolled per mouse wheel notch
const MOUSE_SCROLL_ROWS: isize = 3;

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Branding and feature flags
    config: Arc<AppConfig>,

    // === Session Integration ===
    /// Client for the embedded session controller
    client: SessionClient,
    /// Display state derived from SessionMessages
    display: DisplayState,

    // === Theme ===
    theme: ThemeController,
    palette: Palette,

    // === Input State ===
    /// Chat input buffer
    input_buffer: String,
    /// Transcript scroll and follow mode
    transcript_view: TranscriptViewState,
}

impl App {
    /// Create the app; the palette is resolved before the first frame
    pub fn new(client: SessionClient, config: Arc<AppConfig>, theme: ThemeController) -> Self {
        let palette = Palette::new(theme.class(), &config);
        Self {
            running: true,
            config,
            client,
            display: DisplayState::new(),
            theme,
            palette,
            input_buffer: String::new(),
            transcript_view: TranscriptViewState::default(),
        }
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~20 FPS is plenty for a control surface
        let frame_duration = Duration::from_millis(50);

        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event).await,
                        Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                        None => self.running = false,
                    }
                }

                Some(msg) = self.client.recv() => self.apply_session_message(msg),

                // Frame tick so toasts expire without input
                () = tokio::time::sleep(frame_duration) => {}
            }

            // Drain whatever else arrived this frame
            for msg in self.client.recv_all() {
                self.apply_session_message(msg);
            }
            self.display.update(Instant::now());

            self.render(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Disconnect the session before the terminal is restored
    pub async fn shutdown(&self) {
        self.client.shutdown().await;
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Current chat input
    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    /// Active palette
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The session client
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Receive pending session messages (non-blocking)
    pub fn process_session_messages(&mut self) {
        for msg in self.client.recv_all() {
            self.apply_session_message(msg);
        }
    }

    fn apply_session_message(&mut self, msg: SessionMessage) {
        let applied = self.display.apply_message(msg, Instant::now());
        if applied.transcript {
            if self.display.transcript.is_empty() {
                self.transcript_view.reset();
            } else {
                self.transcript_view.mark_changed();
            }
        }
        if applied.session_ended {
            self.input_buffer.clear();
        }
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = map_key(key, self.display.focus) {
                    self.handle_action(action).await;
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            // Resize is picked up by the next draw
            _ => {}
        }
    }

    /// Perform a user action
    pub async fn handle_action(&mut self, action: Action) {
        tracing::trace!(?action, "Action");
        match action {
            Action::StartCall => {
                if !self.client.start() {
                    tracing::debug!("Start ignored, a session is already running");
                }
            }
            Action::EndCall => self.client.end(),
            Action::Toggle(source) => {
                if !self.display.toggle_available(source, &self.config) {
                    return;
                }
                if let Some(enabled) = self.display.controls.get_mut(source).request() {
                    self.client.toggle(source, enabled);
                }
            }
            Action::ToggleTranscript => {
                self.display.transcript_open = !self.display.transcript_open;
                if self.display.transcript_open {
                    self.transcript_view.mark_changed();
                }
            }
            Action::FocusChat => {
                if self.display.chat_available(&self.config) {
                    self.display.focus = Focus::Chat;
                }
            }
            Action::FocusControls => self.display.focus = Focus::Controls,
            Action::CycleTheme => self.cycle_theme().await,
            Action::PageUp => self.transcript_view.scroll(-self.page_rows()),
            Action::PageDown => self.transcript_view.scroll(self.page_rows()),
            Action::ScrollToBottom => self.transcript_view.scroll_to_bottom(),
            Action::DismissAlert => {
                self.display.alerts.dismiss_latest();
            }
            Action::Input(c) => self.input_buffer.push(c),
            Action::Backspace => {
                self.input_buffer.pop();
            }
            Action::Submit => {
                if self.client.send_chat(self.input_buffer.trim()) {
                    self.input_buffer.clear();
                }
            }
            Action::Quit => self.running = false,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.transcript_view.scroll(-MOUSE_SCROLL_ROWS),
            MouseEventKind::ScrollDown => self.transcript_view.scroll(MOUSE_SCROLL_ROWS),
            _ => {}
        }
    }

    async fn cycle_theme(&mut self) {
        let class = match self.theme.cycle().await {
            Ok(class) => class,
            Err(e) => {
                tracing::warn!(error = %e, "Theme preference not saved");
                self.display.alerts.push(
                    Alert::new("Theme preference not saved", e.to_string())
                        .with_level(AlertLevel::Warning),
                    Instant::now(),
                );
                self.theme.class()
            }
        };
        tracing::debug!(
            preference = %self.theme.preference(),
            class = class.as_str(),
            "Theme changed"
        );
        self.palette = Palette::new(class, &self.config);
    }

    fn page_rows(&self) -> isize {
        let rows = self.transcript_view.client_height.saturating_sub(1).max(1);
        isize::try_from(rows).unwrap_or(isize::MAX)
    }

    /// Draw one frame
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let palette = self.palette;
        frame.render_widget(Block::default().style(palette.base()), area);

        let show_chat = !self.display.shows_welcome()
            && self.display.visible_controls(&self.config).chat;
        let [header, main, controls, chat, status] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(u16::from(show_chat)),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(Header::new(&self.config, &palette), header);
        self.draw_main(frame, main);

        let visible = self.display.visible_controls(&self.config);
        frame.render_widget(
            ControlBar::new(
                visible,
                &self.display.controls,
                self.display.session_state,
                &palette,
            )
            .transcript_open(self.display.transcript_open)
            .chat_enabled(self.display.chat_available(&self.config)),
            controls,
        );

        if show_chat {
            frame.render_widget(
                ChatInput::new(
                    &self.input_buffer,
                    self.display.focus == Focus::Chat,
                    &palette,
                ),
                chat,
            );
        }

        let rows_below = if self.display.transcript_open {
            self.transcript_view.rows_below()
        } else {
            0
        };
        frame.render_widget(
            StatusLine::new(self.display.session_state, self.theme.preference(), &palette)
                .agent_available(self.display.agent_available)
                .rows_below(rows_below)
                .offline(self.client.room().is_loopback()),
            status,
        );

        // Toasts sit above everything
        frame.render_widget(Toasts::new(&self.display.alerts, &palette), area);
    }

    fn draw_main(&mut self, frame: &mut Frame, area: Rect) {
        let palette = self.palette;
        let hint = self
            .display
            .shows_pre_connect_hint(&self.config)
            .then_some(PRE_CONNECT_HINT);

        if self.display.transcript_open {
            frame.render_stateful_widget(
                TranscriptView::new(&self.display.transcript, &palette).hint(hint),
                area,
                &mut self.transcript_view,
            );
        } else if self.display.shows_welcome() {
            frame.render_widget(Welcome::new(&self.config, &palette), area);
        } else {
            frame.render_widget(
                AgentPanel::new(
                    self.display.session_state,
                    self.display.agent_available,
                    &palette,
                )
                .hint(hint),
                area,
            );
        }
    }
}
