//! TUI rendering.
//!
//! Draws the "Add Place" form (title, location preview, actions, picked
//! address, saved places), the map selection screen and the permission
//! dialog using the `ratatui` crate.

use crate::api::AddressLookup;
use crate::app::{App, FormField, Screen};
use crate::models::Coordinate;
use crate::picker::PickerView;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *},
};

use ratatui::text::Line;

/// Renders one frame based on current application state.
///
/// The permission dialog, when pending, is drawn on top of whichever screen
/// is active.
pub fn render<L: AddressLookup>(f: &mut Frame, app: &App<L>) {
    match app.screen {
        Screen::AddPlace => render_form(f, app),
        Screen::Map => render_map_screen(f, app),
    }

    if app.permission_prompt.is_some() {
        render_permission_dialog(f);
    }
}

fn render_form<L: AddressLookup>(f: &mut Frame, app: &App<L>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Header
            Constraint::Length(3),  // Title input
            Constraint::Length(14), // Location preview
            Constraint::Length(3),  // Actions
            Constraint::Length(4),  // Picked address
            Constraint::Min(3),     // Saved places
            Constraint::Length(1),  // Status
            Constraint::Length(1),  // Help
        ])
        .split(f.size());

    let header = Paragraph::new(" Add Place ")
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    let title_style = focus_style(app.focus == FormField::Title);
    let cursor = if app.focus == FormField::Title { "_" } else { "" };
    let title = Paragraph::new(format!("{}{}", app.title, cursor)).block(
        Block::default()
            .title(" Title ")
            .borders(Borders::ALL)
            .border_style(title_style),
    );
    f.render_widget(title, chunks[1]);

    render_preview(f, app.picker.view(), chunks[2]);
    render_actions(f, app, chunks[3]);

    let picked = match &app.picked {
        Some(loc) => vec![
            Line::from(vec![
                Span::styled("Address: ", Style::default().fg(Color::DarkGray)),
                Span::raw(loc.address.as_deref().unwrap_or("-")),
            ]),
            Line::from(vec![
                Span::styled("Coords:  ", Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{:.5}, {:.5}", loc.lat, loc.lng)),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "Waiting for an address...",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let picked = Paragraph::new(picked)
        .block(Block::bordered().title(" Picked Location "))
        .wrap(Wrap { trim: true });
    f.render_widget(picked, chunks[4]);

    let items: Vec<ListItem> = app
        .places
        .iter()
        .rev()
        .map(|p| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {} ", p.title),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(p.location.address.clone().unwrap_or_default()),
                Span::styled(
                    format!("  {}", p.created_at.format("%H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let places = List::new(items).block(Block::bordered().title(" Saved Places "));
    f.render_widget(places, chunks[5]);

    if let Some(ref msg) = app.status {
        let p = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(p, chunks[6]);
    } else if app.locating {
        let p = Paragraph::new("Locating...")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(p, chunks[6]);
    }

    let help = Paragraph::new(" Tab/Shift-Tab move   Enter activate   Esc quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[7]);
}

/// Location preview: a small map around the coordinate plus the static map
/// URL, or the placeholder text while nothing is picked.
fn render_preview(f: &mut Frame, view: PickerView, area: Rect) {
    let block = Block::default()
        .title(" Location ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);

    match view {
        PickerView::Placeholder(text) => {
            let inner = block.inner(area);
            f.render_widget(block, area);
            let v = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(inner);
            let p = Paragraph::new(text)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center);
            f.render_widget(p, v[1]);
        }
        PickerView::Preview { coordinate, url } => {
            let inner = block.inner(area);
            f.render_widget(block, area);
            let v = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(2)])
                .split(inner);

            f.render_widget(map_canvas(coordinate, 2.0, None), v[0]);
            let url = Paragraph::new(url)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: false });
            f.render_widget(url, v[1]);
        }
    }
}

fn render_actions<L: AddressLookup>(f: &mut Frame, app: &App<L>, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    let buttons = [
        (FormField::Locate, "⌖ Locate User"),
        (FormField::PickOnMap, "▦ Pick on Map"),
        (FormField::Save, "✔ Save"),
    ];
    for (i, (field, label)) in buttons.iter().enumerate() {
        let focused = app.focus == *field;
        let b = Paragraph::new(*label)
            .alignment(Alignment::Center)
            .style(focus_style(focused))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(focus_style(focused)),
            );
        f.render_widget(b, cols[i]);
    }
}

/// Map selection screen: world map with a crosshair at the cursor.
fn render_map_screen<L: AddressLookup>(f: &mut Frame, app: &App<L>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1), Constraint::Length(1)])
        .split(f.size());

    f.render_widget(
        map_canvas(app.map_cursor, 0.0, Some(" Pick a Location ")),
        chunks[0],
    );

    let info = Paragraph::new(format!(
        " Cursor {:.4}, {:.4}   step {}°",
        app.map_cursor.lat, app.map_cursor.lng, app.map_step
    ))
    .style(Style::default().fg(Color::Cyan))
    .alignment(Alignment::Center);
    f.render_widget(info, chunks[1]);

    let help = Paragraph::new(" ←↑↓→ move   +/- step   Enter select   Esc cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}

/// Canvas centered on `center`. A `radius` of zero shows the whole world.
fn map_canvas(center: Coordinate, radius: f64, title: Option<&'static str>) -> Canvas<'static, impl Fn(&mut Context)> {
    let (x_bounds, y_bounds) = if radius > 0.0 {
        (
            [center.lng - radius, center.lng + radius],
            [center.lat - radius, center.lat + radius],
        )
    } else {
        ([-180.0, 180.0], [-90.0, 90.0])
    };

    let mut block = Block::default();
    if let Some(title) = title {
        block = block.title(title).borders(Borders::ALL);
    }

    Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(70, 70, 70),
                resolution: MapResolution::High,
            });
            ctx.layer();
            ctx.print(
                center.lng,
                center.lat,
                Line::from(Span::styled(
                    "●",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
            );
        })
}

fn render_permission_dialog(f: &mut Frame) {
    let area = centered_rect(50, 7, f.size());
    f.render_widget(Clear, area);

    let text = vec![
        Line::from("Allow this app to use your location?"),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y] ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("Allow    "),
            Span::styled("[n] ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw("Don't allow"),
        ]),
    ];
    let dialog = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .title(" Location Permission ")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .padding(Padding::new(1, 1, 1, 0)),
    );
    f.render_widget(dialog, area);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Cyan)
            .bg(Color::Rgb(30, 30, 60))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// A `width`% wide, `height` rows tall rect centered in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Min(0),
        ])
        .split(v[1])[1]
}
