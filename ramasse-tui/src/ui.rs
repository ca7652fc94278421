use chrono::NaiveDate;
use ramasse_core::model::{Category, civic_now};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    // Title / header
    let header = Paragraph::new("ramasse – Rouyn-Noranda collection schedules")
        .block(Block::default().borders(Borders::ALL).title("Ramasse"));
    frame.render_widget(header, *header_area);

    // Main screen
    match app.screen {
        Screen::StreetSelect => draw_street_select(frame, app, *content_area),
        Screen::CivicSelect => draw_civic_select(frame, app, *content_area),
        Screen::ScheduleView => draw_schedule_view(frame, app, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::StreetSelect => "Type to filter · ↑/↓ move · Enter select street · Esc/Ctrl-C quit",
        Screen::CivicSelect => {
            "Type to filter · ↑/↓ move · Enter fetch schedule · ←/Esc back · Ctrl-C quit"
        }
        Screen::ScheduleView => "r refresh · Esc/←/b back · q/Ctrl-C quit",
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_street_select(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // filter input
            Constraint::Min(0),    // street list
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [input_area, list_area] = chunks else {
        return;
    };

    let input_title = if app.streets.is_empty() {
        "Street (list unavailable – type the full name)"
    } else {
        "Street filter (type to narrow, Enter to select)"
    };

    let input = Paragraph::new(app.street_input.as_str())
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: true });
    frame.render_widget(input, *input_area);

    let filtered = app.filtered_streets();
    let items = if filtered.is_empty() {
        let hint = if app.streets.is_empty() {
            "No street list; Enter uses the typed name."
        } else {
            "No street matches the filter; Enter uses the typed text as-is."
        };
        vec![ListItem::new(hint)]
    } else {
        filtered
            .iter()
            .enumerate()
            .map(|(idx, street)| {
                let prefix = if idx == app.street_list_index {
                    "> "
                } else {
                    "  "
                };
                ListItem::new(format!("{prefix}{street}"))
            })
            .collect()
    };

    let shown = filtered.len();
    let total = app.streets.len();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Streets ({shown}/{total})")),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !filtered.is_empty() {
        state.select(Some(app.street_list_index));
    }
    frame.render_stateful_widget(list, *list_area, &mut state);
}

fn draw_civic_select(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // civic input
            Constraint::Min(0),    // number list
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [input_area, list_area] = chunks else {
        return;
    };

    let street = app.selected_street.as_deref().unwrap_or("<street>");

    let input = Paragraph::new(app.civic_input.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Civic number for {street}")),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(input, *input_area);

    let filtered = app.filtered_civic_numbers();
    let items = if filtered.is_empty() {
        vec![ListItem::new(
            "No numbers listed for this street; type the civic number.",
        )]
    } else {
        filtered
            .iter()
            .enumerate()
            .map(|(idx, number)| {
                let prefix = if idx == app.civic_list_index {
                    "> "
                } else {
                    "  "
                };
                ListItem::new(format!("{prefix}{number}"))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Civic numbers (↑/↓, Enter fetches the schedule)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !filtered.is_empty() {
        state.select(Some(app.civic_list_index));
    }
    frame.render_stateful_widget(list, *list_area, &mut state);
}

fn draw_schedule_view(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let address = app.selected_address.as_ref().map_or_else(
        || "<address>".to_owned(),
        |query| format!("{} {}", query.civic_number, query.street),
    );
    let title = format!("Collections at {address} (r to refresh)");

    if app.is_loading {
        let paragraph = Paragraph::new("Loading schedule…")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let Some(snapshot) = &app.snapshot else {
        let paragraph = Paragraph::new("No schedule loaded yet.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    if snapshot.is_empty() {
        let paragraph = Paragraph::new("The portal publishes no pickups for this address.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let now = civic_now();
    let today = now.date_naive();

    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // six categories plus borders
            Constraint::Min(0),    // occurrence table
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [summary_area, table_area] = chunks else {
        return;
    };

    let lines: Vec<Line<'_>> = Category::ALL
        .into_iter()
        .map(|category| {
            let next = snapshot
                .next_for(category, now)
                .map_or("none scheduled".to_owned(), |occurrence| {
                    let date = occurrence.date.date_naive();
                    format!(
                        "{} · {}",
                        date.format("%a %d %b %Y"),
                        relative_day_label(date, today)
                    )
                });
            let label = category.label();
            Line::from(vec![
                Span::styled(
                    format!("{label:<16}"),
                    Style::default()
                        .fg(category_color(category))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(next),
            ])
        })
        .collect();

    let summary = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(summary, *summary_area);

    let rows = snapshot
        .all_occurrences
        .iter()
        .filter(|occurrence| occurrence.date >= now)
        .map(|occurrence| {
            let date = occurrence.date.date_naive();
            let category = Category::classify(&occurrence.title);

            let mut style = Style::default().fg(category.map_or(Color::White, category_color));
            if date == today {
                style = style.add_modifier(Modifier::BOLD);
            }

            Row::new(vec![
                Cell::from(date.format("%d.%m.%Y").to_string()),
                Cell::from(date.format("%a").to_string()),
                Cell::from(relative_day_label(date, today)),
                Cell::from(occurrence.title.clone()),
            ])
            .style(style)
        });

    let column_widths = [
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Date", "Day", "In", "Collection"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Upcoming pickups"))
        .column_spacing(1);

    frame.render_widget(table, *table_area);
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Waste => Color::Gray,
        Category::Recycling => Color::Blue,
        Category::Compost => Color::Green,
        Category::Bulky => Color::Magenta,
        Category::GreenWaste => Color::LightGreen,
        Category::ChristmasTree => Color::Cyan,
    }
}

fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
    let delta = (date - today).num_days();
    match delta {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days > 1 => format!("in {days} days"),
        -1 => "yesterday".to_owned(),
        days => format!("{} days ago", days.abs()),
    }
}
