use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::{Popup, PopupState};

use crate::config::{RgbColor, UiColors};
use crate::listing::format_timestamp;
use crate::meta::MetaRow;

use super::app::{App, FieldRow, MetaColumn};
use super::edit::EditTarget;
use super::panes::Pane;

const NAV_HELP: &str =
    "Tab/1-3: pane  j/k: move  Enter: edit  Space: toggle  s: save  r: reload  d: delete file  q: quit";
const EDIT_HELP: &str = "Enter: commit  Esc: cancel";

/// Draw one frame and hand back what ended up on screen, so blocking
/// dialogs can be layered over it.
pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<Buffer> {
    let completed = terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(completed.buffer.clone())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.colors();
    let post = app.page.post();
    let mut spans = vec![
        Span::styled(format!("POST://{}", post.slug), header_text_style(colors)),
        Span::raw("   "),
        Span::styled(
            format!("created {}", format_timestamp(post.creation)),
            header_text_style(colors),
        ),
        Span::raw("   "),
    ];
    if app.page.is_dirty() {
        spans.push(Span::styled(
            "UNSAVED",
            Style::default()
                .fg(color(colors.dirty))
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::styled("SAVED", header_text_style(colors)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let field_rows = FieldRow::all().len() as u16;
    let files_height = (app.page.files().len() as u16).clamp(1, 8) + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(field_rows + 2),
            Constraint::Min(3),
            Constraint::Length(files_height),
        ])
        .split(area);

    draw_fields(frame, chunks[0], app);
    draw_meta(frame, chunks[1], app);
    draw_files(frame, chunks[2], app);
}

fn pane_block(pane: Pane, app: &App) -> Block<'static> {
    let colors = app.colors();
    let active = app.focus == pane;
    let title = format!(" {} {} ", pane.digit(), pane.title());
    let title_style = if active {
        selection_style(colors)
    } else {
        header_text_style(colors)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(colors, active))
        .title(Span::styled(title, title_style))
}

fn draw_fields(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.colors();
    let rows: Vec<Row> = FieldRow::all()
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let (label, value) = match row {
                FieldRow::Text(field) => (field.label(), app.page.field(field).replace('\n', " ")),
                FieldRow::Flag(flag) => (
                    flag.label(),
                    if app.page.flag(flag) { "[x]" } else { "[ ]" }.to_string(),
                ),
            };
            let style = if app.focus == Pane::Fields && idx == app.field_cursor {
                selection_style(colors)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(Span::styled(label, separator_style(colors))),
                Cell::from(value),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(0)])
        .block(pane_block(Pane::Fields, app));
    frame.render_widget(table, area);
}

fn meta_cells(row: &MetaRow) -> (String, String) {
    let key = if row.key.is_empty() && row.is_active() {
        "(new key)".to_string()
    } else {
        row.key.clone()
    };
    (key, row.value.clone())
}

fn draw_meta(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.colors();
    let focused = app.focus == Pane::Meta;
    let rows: Vec<Row> = app
        .page
        .meta()
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let (key, value) = meta_cells(row);
            let selected = focused && idx == app.meta_cursor;
            let cell_style = |column: MetaColumn| {
                if selected && app.meta_column == column {
                    selection_style(colors)
                } else if row.is_active() {
                    separator_style(colors)
                } else {
                    Style::default()
                }
            };
            Row::new(vec![
                Cell::from(Span::styled(key, cell_style(MetaColumn::Key))),
                Cell::from(Span::styled(value, cell_style(MetaColumn::Value))),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(35), Constraint::Percentage(65)])
        .header(Row::new(vec!["KEY", "VALUE"]).style(header_text_style(colors)))
        .block(pane_block(Pane::Meta, app));
    frame.render_widget(table, area);
}

fn draw_files(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.colors();
    let items: Vec<ListItem> = if app.page.files().is_empty() {
        vec![ListItem::new(Span::styled("No files", separator_style(colors)))]
    } else {
        app.page
            .files()
            .iter()
            .map(|name| ListItem::new(name.clone()))
            .collect()
    };

    let list = List::new(items)
        .block(pane_block(Pane::Files, app))
        .highlight_style(selection_style(colors));
    let mut state = ListState::default();
    if app.focus == Pane::Files && !app.page.files().is_empty() {
        state.select(Some(app.file_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));
    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    if let Some(target) = app.editor.target() {
        let label = match target {
            EditTarget::Field(field) => field.label().to_string(),
            EditTarget::MetaKey(row) => format!("KEY {}", row + 1),
            EditTarget::MetaValue(row) => format!("VALUE {}", row + 1),
        };
        let prefix = format!("{}: ", label);
        let cursor_x = area.x + (prefix.len() + app.editor.visual_cursor()) as u16;
        let line = Line::from(vec![
            Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
            Span::styled(app.editor.value().to_string(), style),
            Span::styled(format!("   {}", EDIT_HELP), style),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
        return;
    }

    let message = app.status.clone().unwrap_or_else(|| NAV_HELP.to_string());
    frame.render_widget(Paragraph::new(message).style(style), area);
}

/// Modal box for the blocking warning and confirmation dialogs.
pub fn draw_dialog(
    frame: &mut Frame<'_>,
    title: &str,
    message: &str,
    help: &str,
    colors: &UiColors,
    state: &mut PopupState,
) {
    let area = frame.area();
    let body_text = Text::from(vec![
        Line::from(message.to_string()),
        Line::from(String::new()),
        Line::from(Span::styled(help.to_string(), separator_style(colors))),
    ]);
    let title_line = Line::from(Span::styled(title.to_string(), header_text_style(colors)));
    let popup = Popup::new(body_text)
        .title(title_line)
        .border_style(border_style(colors, true));

    frame.render_stateful_widget_ref(popup, area, state);
}

fn selection_style(colors: &UiColors) -> Style {
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(colors: &UiColors, active: bool) -> Style {
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn header_text_style(colors: &UiColors) -> Style {
    Style::default().fg(color(colors.separator))
}

fn separator_style(colors: &UiColors) -> Style {
    Style::default()
        .fg(color(colors.separator))
        .add_modifier(Modifier::DIM)
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
