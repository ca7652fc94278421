//! Terminal UI that walks users through the portal's street and civic-number
//! pickers, then shows the collection schedule for the chosen address.

mod app;
mod input;
mod ui;

use std::{env, io, sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ramasse_core::{AddressQuery, ports::PortError, service::RamasseService};
use ramasse_provider_rouyn_noranda::{RouynNorandaDirectory, RouynNorandaFeedSource};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::input::Action;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // HTTP + service setup
    let client = Client::builder().user_agent("ramasse/0.1").build()?;

    let directory = Arc::new(RouynNorandaDirectory::new(client.clone()));
    let source = Arc::new(RouynNorandaFeedSource::new(client));
    let service = Arc::new(RamasseService::new(directory, source));

    // App state
    let app = App::new(service);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// Log to stderr only when `RUST_LOG` is set; the alternate screen stays
/// clean otherwise.
fn init_tracing() {
    if env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
    }
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    // The street list loads once up front; when the lookup degrades to an
    // empty list the picker falls back to free-text entry.
    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, &app))?;
    app.streets = app.service.streets().await;
    app.is_loading = false;
    if app.streets.is_empty() {
        app.error_message = Some("Street list unavailable; type the street name manually.".into());
    }

    loop {
        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::ChooseStreet => {
                    let Some(street) = app.current_street() else {
                        app.error_message = Some("Type or pick a street first".into());
                        continue;
                    };

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let numbers = app.service.civic_numbers(&street).await;

                    app.is_loading = false;
                    app.enter_civic_select(street, numbers);
                }
                Action::FetchSchedule => {
                    let Some(street) = app.selected_street.clone() else {
                        app.error_message = Some("Pick a street first".into());
                        continue;
                    };
                    let Some(civic_number) = app.current_civic_number() else {
                        app.error_message =
                            Some("Type or pick a civic number, then press Enter".into());
                        continue;
                    };

                    let query = AddressQuery::new(street, civic_number);

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.service.get_schedule(&query).await;

                    app.is_loading = false;
                    match res {
                        Ok(snapshot) if snapshot.is_empty() => {
                            app.error_message = Some(
                                "No schedule published for this address. Check the street and number."
                                    .into(),
                            );
                        }
                        Ok(snapshot) => {
                            app.show_snapshot(query, snapshot);
                        }
                        Err(err) => {
                            app.error_message = Some(describe_error(&err));
                        }
                    }
                }
                Action::Refresh => {
                    let Some(query) = app.selected_address.clone() else {
                        continue;
                    };

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.service.get_schedule(&query).await;

                    app.is_loading = false;
                    match res {
                        Ok(snapshot) => {
                            app.snapshot = Some(snapshot);
                        }
                        Err(err) => {
                            // Keep the last good snapshot on screen.
                            app.error_message = Some(describe_error(&err));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn describe_error(err: &PortError) -> String {
    match err {
        PortError::Network(_) => "Cannot reach the portal. Check your connection and retry.".into(),
        PortError::InvalidAddress => {
            "The portal does not recognize this address. Pick the street from the list and check the number."
                .into()
        }
        PortError::Parse(_) => format!("The portal sent an unreadable calendar: {err}"),
        PortError::Internal(_) => format!("Unexpected failure: {err}"),
    }
}
