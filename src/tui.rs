// SPDX-License-Identifier: GPL-3.0-or-later

//! Terminal front end for a listing page.

use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{debug, warn};
use ratatui::{
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};
use regex::Regex;
use tui_logger::TuiWidgetState;

use crate::{
    controller::Controller,
    logview::{log_event, render_log_view},
    markup::{Content, Document, GlyphColor, NodeId},
    prelude::*,
    table::ListingTable,
};

const TICK: Duration = Duration::from_millis(50);

/// Why the UI loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Navigate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Table,
    Log,
}

pub struct App {
    controller: Controller,
    title: String,
    selected_row: usize,
    selected_button: usize,
    table_state: TableState,
    search: Option<Regex>,
    command: Option<String>,
    error: Option<String>,
    show_log: bool,
    focus: Focus,
    log_state: TuiWidgetState,
}
impl App {
    pub fn new(controller: Controller, title: impl Into<String>) -> Self {
        if controller.tables().len() > 1 {
            warn!(
                "Page has {} listing tables; only the first is shown",
                controller.tables().len()
            );
        }
        Self {
            controller,
            title: title.into(),
            selected_row: 0,
            selected_button: 0,
            table_state: TableState::default(),
            search: None,
            command: None,
            error: None,
            show_log: false,
            focus: Focus::Table,
            log_state: TuiWidgetState::new(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn run(mut self, terminal: &mut DefaultTerminal) -> Result<Exit> {
        loop {
            let now = Instant::now();
            if let Some(exit) = self.tick(now) {
                return Ok(exit);
            }

            terminal.draw(|frame| self.render(frame, now))?;

            if !event::poll(TICK)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(exit) = self.handle_key(key.code) {
                    return Ok(exit);
                }
            }
        }
    }

    /// Apply replies and timers up to `now`.
    fn tick(&mut self, now: Instant) -> Option<Exit> {
        self.controller.pump(now);
        self.clamp_selection();
        self.controller.take_navigation().map(Exit::Navigate)
    }

    fn table(&self) -> Option<&ListingTable> {
        self.controller.tables().first()
    }

    fn visible_rows(&self) -> Vec<NodeId> {
        match self.table() {
            Some(table) => table.matching_rows(self.controller.document(), self.search.as_ref()),
            None => Vec::new(),
        }
    }

    fn selected_buttons(&self) -> Vec<NodeId> {
        match self.visible_rows().get(self.selected_row) {
            Some(&row) => self
                .controller
                .buttons_in(row)
                .into_iter()
                .map(|config| config.button)
                .collect(),
            None => Vec::new(),
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.visible_rows().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        let buttons = self.selected_buttons().len();
        self.selected_button = self.selected_button.min(buttons.saturating_sub(1));
    }

    fn click_selected(&mut self) {
        let Some(&button) = self.selected_buttons().get(self.selected_button) else {
            self.error = Some("No button selected".into());
            return;
        };
        let event = self.controller.click(button);
        debug!("Click handled, default prevented: {}", event.default_prevented());
    }

    /// Handle a key press. Returns `Some` when the UI should exit.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<Exit> {
        if self.command.is_some() {
            return self.handle_command_key(key);
        }

        if self.focus == Focus::Log {
            match key {
                KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Table,
                key => {
                    if let Some(event) = log_event(key) {
                        self.log_state.transition(event);
                    }
                }
            }
            return None;
        }

        self.error = None;
        match key {
            KeyCode::Char('q') => return Some(Exit::Quit),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => self.selected_row += 1,
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_button = self.selected_button.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => self.selected_button += 1,
            KeyCode::Enter | KeyCode::Char(' ') => self.click_selected(),
            KeyCode::Tab if self.show_log => self.focus = Focus::Log,
            KeyCode::Char('/') => {
                self.command = Some("/".into());
                self.search = None;
            }
            KeyCode::Char(':') => self.command = Some(":".into()),
            _ => {}
        }
        self.clamp_selection();
        None
    }

    fn handle_command_key(&mut self, key: KeyCode) -> Option<Exit> {
        let Some(command) = self.command.as_mut() else {
            return None;
        };
        match key {
            KeyCode::Esc => {
                if command.starts_with('/') {
                    self.search = None;
                }
                self.command = None;
                self.error = None;
            }
            KeyCode::Backspace => {
                command.pop();
                if command.is_empty() {
                    self.command = None;
                    self.search = None;
                } else {
                    self.update_search();
                }
            }
            KeyCode::Char(c) => {
                command.push(c);
                self.update_search();
            }
            KeyCode::Enter => {
                let command = self.command.take().unwrap_or_default();
                if let Some(cmd) = command.strip_prefix(':') {
                    match cmd {
                        "q" | "quit" => return Some(Exit::Quit),
                        "log" => {
                            self.show_log = !self.show_log;
                            if !self.show_log {
                                self.focus = Focus::Table;
                            }
                        }
                        _ => self.error = Some(format!("Unknown command: {cmd}")),
                    }
                }
            }
            _ => {}
        }
        self.clamp_selection();
        None
    }

    fn update_search(&mut self) {
        let Some(pattern) = self.command.as_deref().and_then(|c| c.strip_prefix('/')) else {
            return;
        };
        self.error = None;
        self.search = None;
        if pattern.is_empty() {
            return;
        }
        match Regex::new(pattern) {
            Ok(regex) => self.search = Some(regex),
            Err(e) => self.error = Some(format!("{}", e)),
        }
    }

    fn render(&mut self, frame: &mut Frame, now: Instant) {
        let log_height = if self.show_log { 10 } else { 0 };
        let [table_area, log_area, status_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(log_height),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_table(frame, table_area, now);
        if self.show_log {
            render_log_view(frame, log_area, &self.log_state, self.focus == Focus::Log);
        }
        self.render_status(frame, status_area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let block = Block::default().title(self.title.as_str()).borders(Borders::ALL);
        let Some(table) = self.table() else {
            let empty = Paragraph::new("(no listing table on this page)").block(block);
            frame.render_widget(empty, area);
            return;
        };
        let doc = self.controller.document();

        let selected_button = self.selected_buttons().get(self.selected_button).copied();
        let widths = table
            .column_widths(doc, area.width.saturating_sub(2))
            .into_iter()
            .map(Constraint::Length)
            .collect_vec();
        let header = Row::new(table.headers(doc))
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self
            .visible_rows()
            .into_iter()
            .map(|row| {
                let cells = table
                    .cells(doc, row)
                    .into_iter()
                    .map(|cell| Cell::from(cell_line(doc, cell, selected_button)))
                    .collect_vec();
                let style = match table.fade_progress(row, now) {
                    Some(progress) if progress > 0.5 => Style::default().fg(Color::Black),
                    Some(_) => Style::default().fg(Color::DarkGray),
                    None => Style::default(),
                };
                Row::new(cells).style(style)
            })
            .collect_vec();

        let widget = Table::new(rows, widths)
            .header(header)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        self.table_state.select(Some(self.selected_row));
        frame.render_stateful_widget(widget, area, &mut self.table_state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(command) = &self.command {
            Line::from(command.as_str())
        } else if let Some(error) = &self.error {
            Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
        } else if let Some(notice) = self.controller.notices().last() {
            Line::from(Span::styled(notice.to_string(), Style::default().fg(Color::Red)))
        } else {
            let pending = match self.controller.in_flight() {
                0 => String::new(),
                n => format!("  ({n} pending)"),
            };
            Line::from(format!(
                "↑↓ listing  ←→ button  ⏎ click  / search  :log  q quit{pending}"
            ))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn glyph_color(color: GlyphColor) -> Color {
    match color {
        GlyphColor::Gold => Color::Yellow,
        GlyphColor::Black => Color::Gray,
        GlyphColor::Red => Color::Red,
    }
}

/// Render a table cell. Buttons are bracketed, and the selected one is
/// highlighted.
fn cell_line(doc: &Document, cell: NodeId, selected: Option<NodeId>) -> Line<'static> {
    let mut spans = Vec::new();
    for node in std::iter::once(cell).chain(doc.descendants(cell)) {
        let is_button = doc.tag(node) == "button";
        let mut style = Style::default();
        if is_button && Some(node) == selected {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let span = match doc.content(node) {
            Content::Empty if !is_button => continue,
            Content::Empty => Span::styled("·", style),
            Content::Text(text) => {
                if doc.has_class(node, "score") {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Span::styled(text.trim().to_string(), style)
            }
            Content::Glyph(glyph) => {
                Span::styled(glyph.symbol.to_string(), style.fg(glyph_color(glyph.color)))
            }
        };

        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        if is_button {
            spans.push(Span::raw("["));
            spans.push(span);
            spans.push(Span::raw("]"));
        } else {
            spans.push(span);
        }
    }
    Line::from(spans)
}
