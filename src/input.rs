//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Each screen has its own
//! key map; adding a binding is a single match arm.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a match arm in the screen's handler that calls it.
//! 3. Update the help text in [`crate::ui`] and the key table in `README.md`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Screen};

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match app.screen {
        Screen::Login => handle_login_key(app, key),
        Screen::Products => handle_list_key(app, key),
        Screen::Detail(_) => handle_detail_key(app, key),
    }
}

fn handle_list_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter => app.open_detail(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('c') => app.next_category(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('x') => app.banner.dismiss(),
        _ => {}
    }
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit = true,
        KeyCode::Esc | KeyCode::Backspace => app.back(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('x') => app.banner.dismiss(),
        _ => {}
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('s') => app.toggle_password_visibility(),
            KeyCode::Char('g') => app.submit_google_login(),
            KeyCode::Char('c') => app.quit = true,
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.quit = true,
        KeyCode::Tab | KeyCode::BackTab => app.login_switch_field(),
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => app.login_backspace(),
        KeyCode::Char(c) => app.login_input(c),
        _ => {}
    }
}
