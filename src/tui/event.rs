use crossterm::event::{KeyCode, KeyEvent};

use super::app::{App, Mode};

/// Handle a key press. Returns true if the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.mode == Mode::Search {
        match key.code {
            KeyCode::Esc => app.cancel_search(),
            KeyCode::Enter => app.commit_search(),
            KeyCode::Backspace => app.backspace(),
            KeyCode::Char(c) => app.push_char(c),
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('f') => app.cycle_filter(),
        KeyCode::Char('p') => app.cycle_priority(),
        KeyCode::Char('n') => app.load_more(),
        KeyCode::Char('c') => app.complete_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
    false
}
