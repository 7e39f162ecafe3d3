use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use trashcal_core::TownSession;

use crate::app::{App, Field, Screen};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Open the planner for the highlighted town
    OpenTown,
    /// Cancel outstanding requests and return to the town list
    LeaveTown,
    /// Preview with the weekday and color as entered
    SubmitDirect,
    /// Resolve the address fields first
    SubmitResolve,
    /// Resolve again using a suggested street
    AcceptSuggestion(String),
    /// Copy the subscription URL to the clipboard
    CopyUrl,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{BackTab, Char, Down, Enter, Esc, Tab, Up};

    // Global quit shortcut
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match app.screen {
        Screen::TownSelect => match key.code {
            Char('q') | Esc => Action::Quit,
            Up | Char('k') => {
                app.town_list_index = app.town_list_index.saturating_sub(1);
                Action::None
            }
            Down | Char('j') => {
                if app.town_list_index + 1 < app.towns.towns().len() {
                    app.town_list_index += 1;
                }
                Action::None
            }
            Enter | Char(' ') => Action::OpenTown,
            _ => Action::None,
        },

        Screen::Planner => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return match key.code {
                    Char('y') => Action::CopyUrl,
                    Char('d') => {
                        app.show_debug_link = !app.show_debug_link;
                        Action::None
                    }
                    Char('n') => {
                        if app.focus == Field::Street
                            && let Some(session) = app.session.as_mut()
                        {
                            session.complete_street();
                        }
                        Action::None
                    }
                    _ => Action::None,
                };
            }

            match key.code {
                Esc => Action::LeaveTown,
                Tab => {
                    app.focus_next();
                    Action::None
                }
                BackTab => {
                    app.focus_prev();
                    Action::None
                }
                Up if app.focus == Field::Suggestions => {
                    app.suggestion_index = app.suggestion_index.saturating_sub(1);
                    Action::None
                }
                Down if app.focus == Field::Suggestions => {
                    if app.suggestion_index + 1 < app.suggestions().len() {
                        app.suggestion_index += 1;
                    }
                    Action::None
                }
                Up => {
                    app.focus_prev();
                    Action::None
                }
                Down => {
                    app.focus_next();
                    Action::None
                }
                Enter => submit_for_focus(app),
                code => {
                    if let Some(session) = app.session.as_mut() {
                        edit_field(session, app.focus, code);
                    }
                    Action::None
                }
            }
        }
    }
}

fn submit_for_focus(app: &App) -> Action {
    match app.focus {
        Field::Suggestions => app
            .current_suggestion()
            .map_or(Action::None, Action::AcceptSuggestion),
        field if field.is_resolve_field() => Action::SubmitResolve,
        _ => Action::SubmitDirect,
    }
}

fn edit_field(session: &mut TownSession, focus: Field, code: KeyCode) {
    match (focus, code) {
        (Field::Weekday, KeyCode::Left | KeyCode::Right) => {
            let values = session.town().weekday_values().to_vec();
            let current = session.selection().weekday;
            if let Some(next) = cycle(&values, &current, code == KeyCode::Right) {
                session.set_weekday(next);
            }
        }
        (Field::Color, KeyCode::Left | KeyCode::Right) => {
            let values = session.town().color_values().to_vec();
            let current = session.selection().color;
            if let Some(next) = cycle(&values, &current, code == KeyCode::Right) {
                session.set_color(next);
            }
        }
        (Field::Trash | Field::Recycling, KeyCode::Char(' ')) => {
            if let Some(collection_type) = focus.collection_type() {
                session.toggle_type(collection_type);
            }
        }
        (Field::Days, KeyCode::Char(character)) => {
            let mut raw = session.days_input().to_owned();
            raw.push(character);
            session.set_days_input(raw);
        }
        (Field::Days, KeyCode::Backspace) => {
            let mut raw = session.days_input().to_owned();
            raw.pop();
            session.set_days_input(raw);
        }
        (Field::Address | Field::Street | Field::Number, KeyCode::Char(character)) => {
            let mut text = text_field(session, focus);
            text.push(character);
            set_text_field(session, focus, text);
        }
        (Field::Address | Field::Street | Field::Number, KeyCode::Backspace) => {
            let mut text = text_field(session, focus);
            text.pop();
            set_text_field(session, focus, text);
        }
        _ => {}
    }
}

fn text_field(session: &TownSession, focus: Field) -> String {
    match focus {
        Field::Address => session.address().to_owned(),
        Field::Street => session.street().to_owned(),
        Field::Number => session.number().to_owned(),
        _ => String::new(),
    }
}

fn set_text_field(session: &mut TownSession, focus: Field, text: String) {
    match focus {
        Field::Address => session.set_address(text),
        Field::Street => session.set_street(text),
        Field::Number => session.set_number(text),
        _ => {}
    }
}

/// Step to the neighbouring value, wrapping around.
fn cycle<T: Copy + PartialEq>(values: &[T], current: &T, forward: bool) -> Option<T> {
    let position = values.iter().position(|value| value == current).unwrap_or(0);
    let count = values.len();
    if count == 0 {
        return None;
    }
    let next = if forward {
        (position + 1) % count
    } else {
        (position + count - 1) % count
    };
    values.get(next).copied()
}
