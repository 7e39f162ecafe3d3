use chrono::{Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};
use trashcal_core::{CollectionType, Phase, PreviewEvent, TownSession, to_webcal};

use crate::app::{App, Field, Screen};

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

    let title = match (&app.screen, app.session.as_ref()) {
        (Screen::Planner, Some(session)) => format!("Trashcal · {}", session.town().name),
        _ => "Trashcal".to_owned(),
    };
    let version = app
        .session
        .as_ref()
        .and_then(TownSession::version_label)
        .unwrap_or("trash & recycling calendar subscriptions");
    let header = Paragraph::new(version.to_owned())
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(header, *header_area);

    match (&app.screen, app.session.as_ref()) {
        (Screen::Planner, Some(session)) => draw_planner(frame, app, session, *content_area),
        _ => draw_town_select(frame, app, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::TownSelect => "↑/↓ move · Enter open town · q/Ctrl-C quit",
        Screen::Planner => {
            "Tab move · ←/→ change · Space toggle · Enter submit · Ctrl-N complete street · Ctrl-Y copy · Ctrl-D debug link · Esc back"
        }
    };

    let is_loading = app.session.as_ref().is_some_and(TownSession::is_loading);
    let status_text = if is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if is_loading {
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

fn draw_town_select(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = app
        .towns
        .towns()
        .iter()
        .enumerate()
        .map(|(idx, town)| {
            let prefix = if idx == app.town_list_index {
                "> "
            } else {
                "  "
            };
            ListItem::new(format!("{prefix}{}", town.name))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Select town (↑/↓, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.towns.towns().is_empty() {
        state.select(Some(app.town_list_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_planner(frame: &mut Frame<'_>, app: &App, session: &TownSession, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let [form_area, result_area] = columns.as_ref() else {
        return;
    };

    let suggestion_rows = if app.suggestions().is_empty() { 0 } else { 6 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(suggestion_rows),
            Constraint::Min(0),
        ])
        .split(*form_area);
    let [direct_area, resolve_area, suggestions_area, _] = rows.as_ref() else {
        return;
    };

    draw_direct_form(frame, app, session, *direct_area);
    draw_resolve_form(frame, app, session, *resolve_area);
    if suggestion_rows > 0 {
        draw_suggestions(frame, app, *suggestions_area);
    }
    draw_result(frame, app, session, *result_area);
}

fn field_line(app: &App, field: Field, label: &str, value: String) -> Line<'static> {
    let focused = app.focus == field;
    let marker = if focused { "> " } else { "  " };
    let style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{marker}{label:<10}"), style),
        Span::raw(value),
    ])
}

fn checkbox(checked: bool) -> String {
    let mark = if checked { "[x]" } else { "[ ]" };
    mark.to_owned()
}

fn draw_direct_form(frame: &mut Frame<'_>, app: &App, session: &TownSession, area: Rect) {
    let selection = session.selection();
    let has = |value: CollectionType| selection.types.contains(&value);

    let mut lines = vec![
        field_line(app, Field::Weekday, "Weekday", format!("◀ {} ▶", selection.weekday)),
        field_line(app, Field::Color, "Color", format!("◀ {} ▶", selection.color)),
        field_line(app, Field::Trash, "Trash", checkbox(has(CollectionType::Trash))),
        field_line(
            app,
            Field::Recycling,
            "Recycling",
            checkbox(has(CollectionType::Recycling)),
        ),
        field_line(app, Field::Days, "Days", session.days_input().to_owned()),
    ];
    if let Err(err) = session.days_validation() {
        lines.push(Line::styled(
            format!("  {err}"),
            Style::default().fg(Color::Red),
        ));
    }

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("I know my pickup day"),
    );
    frame.render_widget(form, area);
}

fn draw_resolve_form(frame: &mut Frame<'_>, app: &App, session: &TownSession, area: Rect) {
    let lines = vec![
        field_line(app, Field::Address, "Address", session.address().to_owned()),
        field_line(app, Field::Street, "Street", session.street().to_owned()),
        field_line(app, Field::Number, "Number", session.number().to_owned()),
    ];

    let title = match session.known_streets().len() {
        0 => "Find my route".to_owned(),
        count => format!("Find my route ({count} streets)"),
    };
    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(form, area);
}

fn draw_suggestions(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = app
        .suggestions()
        .iter()
        .map(|street| ListItem::new(street.clone()))
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Did you mean? (Enter to use)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if app.focus == Field::Suggestions {
        state.select(Some(app.suggestion_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_result(frame: &mut Frame<'_>, app: &App, session: &TownSession, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Subscription");

    let generated = match session.phase() {
        Phase::Idle => {
            let paragraph = Paragraph::new("Fill in a form and press Enter.")
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }
        Phase::Loading => {
            let paragraph = Paragraph::new("Loading…")
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }
        Phase::Failure(failure) => {
            let paragraph = Paragraph::new(failure.message.clone())
                .style(Style::default().fg(Color::Red))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }
        Phase::Success(generated) => generated,
    };

    let mut lines = Vec::new();
    if let Some(summary) = &generated.summary {
        lines.push(Line::styled(
            summary.clone(),
            Style::default().fg(Color::Green),
        ));
    }
    lines.push(Line::from(generated.subscription_url.clone()));
    lines.push(Line::styled(
        to_webcal(&generated.subscription_url),
        Style::default().fg(Color::Cyan),
    ));
    if app.show_debug_link {
        lines.push(Line::styled(
            format!("debug: {}", generated.debug_url),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(notice) = session.notice() {
        lines.push(Line::styled(
            notice.to_owned(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let link_rows = u16::try_from(lines.len() * 2 + 2).unwrap_or(u16::MAX);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(link_rows), Constraint::Min(0)])
        .split(area);
    let [links_area, events_area] = rows.as_ref() else {
        return;
    };

    let links = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(links, *links_area);
    draw_events(frame, &generated.events, *events_area);
}

fn draw_events(frame: &mut Frame<'_>, events: &[PreviewEvent], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Upcoming pickups");

    if events.is_empty() {
        let paragraph = Paragraph::new("No pickups in the preview range.")
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let today = Local::now().date_naive();
    let rows = events.iter().map(|event| {
        let date = event.date.format("%Y-%m-%d").to_string();
        let weekday = event.date.format("%a").to_string();
        let relative = relative_day_label(event.date, today);
        let types = event
            .types
            .iter()
            .map(|value| value.as_str())
            .collect::<Vec<_>>()
            .join(" + ");

        let mut style = Style::default().fg(types_color(&event.types));
        if event.date <= today {
            style = style.add_modifier(Modifier::BOLD);
        }

        Row::new(vec![
            Cell::from(date),
            Cell::from(weekday),
            Cell::from(relative),
            Cell::from(types),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Length(12),
        Constraint::Length(5),
        Constraint::Length(12),
        Constraint::Min(16),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Date", "Day", "In", "Types"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block)
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn types_color(types: &[CollectionType]) -> Color {
    match types {
        [CollectionType::Trash] => Color::Gray,
        [CollectionType::Recycling] => Color::Blue,
        _ => Color::Green,
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
