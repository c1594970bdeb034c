//! Key Bindings
//!
//! Maps terminal key events to surface actions. Control mode uses single
//! keys; chat mode sends everything printable to the input buffer.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use agent_core::TrackSource;

use crate::display::Focus;

/// Something the user asked for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Start a session
    StartCall,
    /// End the session
    EndCall,
    /// Flip a capture toggle
    Toggle(TrackSource),
    /// Show or hide the transcript
    ToggleTranscript,
    /// Move focus to the chat input
    FocusChat,
    /// Move focus back to the controls
    FocusControls,
    /// Advance the theme preference
    CycleTheme,
    /// Scroll the transcript up by a page
    PageUp,
    /// Scroll the transcript down by a page
    PageDown,
    /// Jump to the newest message
    ScrollToBottom,
    /// Dismiss the newest toast
    DismissAlert,
    /// Append a character to the chat input
    Input(char),
    /// Delete the last character of the chat input
    Backspace,
    /// Send the chat input
    Submit,
    /// Leave the application
    Quit,
}

/// Translate a key press for the given focus
pub fn map_key(key: KeyEvent, focus: Focus) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match key.code {
        KeyCode::PageUp => return Some(Action::PageUp),
        KeyCode::PageDown => return Some(Action::PageDown),
        KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(Action::ScrollToBottom)
        }
        _ => {}
    }

    match focus {
        Focus::Chat => match key.code {
            KeyCode::Esc => Some(Action::FocusControls),
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        },
        Focus::Controls => match key.code {
            KeyCode::Enter | KeyCode::Char('s') => Some(Action::StartCall),
            KeyCode::Char('e') => Some(Action::EndCall),
            KeyCode::Char('m') => Some(Action::Toggle(TrackSource::Microphone)),
            KeyCode::Char('c') => Some(Action::Toggle(TrackSource::Camera)),
            KeyCode::Char('x') => Some(Action::Toggle(TrackSource::ScreenShare)),
            KeyCode::Char('t') => Some(Action::ToggleTranscript),
            KeyCode::Char('i') => Some(Action::FocusChat),
            KeyCode::Char('d') => Some(Action::CycleTheme),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Esc => Some(Action::DismissAlert),
            _ => None,
        },
    }
}
