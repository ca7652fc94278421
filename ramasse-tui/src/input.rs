use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Load civic numbers for the street under the cursor
    ChooseStreet,
    /// Run the schedule pipeline for the chosen address
    FetchSchedule,
    /// Re-run the pipeline for the address already on screen
    Refresh,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Down, Enter, Esc, Left, Up};

    // Ctrl-C always quits. A bare `q` only quits on the schedule view, where
    // keys are not text input.
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.screen {
        Screen::StreetSelect => match key.code {
            Up => {
                if app.street_list_index > 0 {
                    app.street_list_index -= 1;
                }
            }
            Down => {
                if app.street_list_index + 1 < app.filtered_streets().len() {
                    app.street_list_index += 1;
                }
            }
            Char(character) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    app.street_input.push(character);
                    app.street_list_index = 0;
                }
            }
            Backspace => {
                app.street_input.pop();
                app.clamp_street_index();
            }
            Enter => {
                action = Action::ChooseStreet;
            }
            Esc => {
                action = Action::Quit;
            }
            _ => {}
        },

        Screen::CivicSelect => match key.code {
            Up => {
                if app.civic_list_index > 0 {
                    app.civic_list_index -= 1;
                }
            }
            Down => {
                if app.civic_list_index + 1 < app.filtered_civic_numbers().len() {
                    app.civic_list_index += 1;
                }
            }
            Char(character) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    app.civic_input.push(character);
                    app.civic_list_index = 0;
                }
            }
            Backspace => {
                app.civic_input.pop();
                app.clamp_civic_index();
            }
            Enter => {
                action = Action::FetchSchedule;
            }
            Left | Esc => {
                app.screen = Screen::StreetSelect;
                app.civic_numbers.clear();
                app.civic_input.clear();
                app.civic_list_index = 0;
                app.selected_street = None;
                app.error_message = None;
            }
            _ => {}
        },

        Screen::ScheduleView => match key.code {
            Left | Esc | Char('b') => {
                app.screen = Screen::CivicSelect;
                app.error_message = None;
            }
            Char('r') => {
                action = Action::Refresh;
            }
            Char('q') => {
                action = Action::Quit;
            }
            _ => {}
        },
    }
    action
}
