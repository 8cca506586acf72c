use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::action::Action;

/// Map a crossterm terminal event to a TUI action. While a panel is being
/// edited, printable keys become text input.
pub fn map_event(event: &Event, editing: bool) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if editing {
                map_edit_key(key)
            } else {
                map_key(key)
            }
        }
        Event::Resize(w, h) => Action::Resize(*w, *h),
        _ => Action::None,
    }
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

fn map_key(key: &KeyEvent) -> Action {
    // Ctrl+C always quits
    if ctrl(key, 'c') {
        return Action::Quit;
    }
    if ctrl(key, 'd') {
        return Action::PageDown;
    }
    if ctrl(key, 'u') {
        return Action::PageUp;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('c') => Action::CancelJob,
        KeyCode::Tab => Action::SwitchPanel,
        KeyCode::Char('e') => Action::BeginEdit,
        KeyCode::Char('p') => Action::ExportPdf,
        KeyCode::Char('w') => Action::ExportDoc,
        KeyCode::Char('s') => Action::ToggleWhitespace,
        KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
        KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Char('?') => Action::ToggleHelp,
        _ => Action::None,
    }
}

fn map_edit_key(key: &KeyEvent) -> Action {
    if ctrl(key, 'c') {
        return Action::Quit;
    }
    if ctrl(key, 's') {
        return Action::CommitEdit;
    }

    match key.code {
        KeyCode::Esc => Action::CancelEdit,
        KeyCode::Enter => Action::Input('\n'),
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Action::Input(c),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn letters_are_commands_outside_edit_mode() {
        let e = press(KeyCode::Char('e'), KeyModifiers::NONE);
        assert_eq!(map_event(&e, false), Action::BeginEdit);
        assert_eq!(map_event(&e, true), Action::Input('e'));

        let q = press(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_event(&q, true), Action::Input('q'));
    }

    #[test]
    fn edit_mode_keys() {
        assert_eq!(
            map_event(&press(KeyCode::Char('s'), KeyModifiers::CONTROL), true),
            Action::CommitEdit
        );
        assert_eq!(
            map_event(&press(KeyCode::Esc, KeyModifiers::NONE), true),
            Action::CancelEdit
        );
        assert_eq!(
            map_event(&press(KeyCode::Enter, KeyModifiers::NONE), true),
            Action::Input('\n')
        );
        assert_eq!(
            map_event(&press(KeyCode::Backspace, KeyModifiers::NONE), true),
            Action::Backspace
        );
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let e = press(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_event(&e, false), Action::Quit);
        assert_eq!(map_event(&e, true), Action::Quit);
        assert_eq!(
            map_event(&press(KeyCode::Char('c'), KeyModifiers::NONE), false),
            Action::CancelJob
        );
    }

    #[test]
    fn resize_is_forwarded() {
        assert_eq!(map_event(&Event::Resize(80, 24), false), Action::Resize(80, 24));
    }
}
