//! Key binding dispatch for the picker.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{Mode, NavState};
use super::event::Action;

/// Resolve a key press into an action for the current mode.
///
/// While the list is filtering every key except enter edits the filter.
/// Lowercase shortcuts only work on the contexts list, uppercase ones only
/// in the submenus.
pub fn action_for(state: &NavState, key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if state.list().is_filtering() {
        return match key.code {
            KeyCode::Enter => Some(Action::Confirm),
            KeyCode::Char('c') if ctrl => Some(Action::Quit),
            KeyCode::Esc => Some(Action::CancelFilter),
            KeyCode::Backspace => Some(Action::FilterBackspace),
            KeyCode::Up => Some(Action::MoveUp),
            KeyCode::Down => Some(Action::MoveDown),
            KeyCode::Char(c) if !ctrl => Some(Action::FilterChar(c)),
            _ => None,
        };
    }

    let main = state.mode == Mode::Contexts;
    match key.code {
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        KeyCode::Char('s') if ctrl => Some(Action::Commit),
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Commit),
        KeyCode::Enter | KeyCode::Right => Some(Action::Confirm),
        KeyCode::Char(' ') => Some(Action::Stage),
        KeyCode::Backspace | KeyCode::Delete => Some(Action::Back),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::Char('/') => Some(Action::StartFilter),
        KeyCode::Char('u') => Some(Action::ToggleCompact),
        KeyCode::Char('r') if main => Some(Action::OpenRegions),
        KeyCode::Char('c') if main => Some(Action::OpenCompartments),
        KeyCode::Char('t') if main => Some(Action::OpenTenancies),
        KeyCode::Char('p') if main => Some(Action::OpenContexts),
        KeyCode::Char('R') if !main => Some(Action::OpenRegions),
        KeyCode::Char('C') if !main => Some(Action::OpenCompartments),
        KeyCode::Char('T') if !main => Some(Action::OpenTenancies),
        KeyCode::Char('P') if !main => Some(Action::OpenContexts),
        _ => None,
    }
}
