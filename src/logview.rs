// SPDX-License-Identifier: GPL-3.0-or-later

use ratatui::{
    crossterm::event::KeyCode,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};
use tui_logger::{TuiLoggerWidget, TuiWidgetEvent, TuiWidgetState};

/// Map a key press inside the log pane to a logger widget event.
pub fn log_event(key: KeyCode) -> Option<TuiWidgetEvent> {
    Some(match key {
        KeyCode::Char(' ') => TuiWidgetEvent::SpaceKey,
        KeyCode::Down => TuiWidgetEvent::DownKey,
        KeyCode::Up => TuiWidgetEvent::UpKey,
        KeyCode::Left => TuiWidgetEvent::LeftKey,
        KeyCode::Right => TuiWidgetEvent::RightKey,
        KeyCode::Char('+') => TuiWidgetEvent::PlusKey,
        KeyCode::Char('-') => TuiWidgetEvent::MinusKey,
        KeyCode::Char('h') => TuiWidgetEvent::HideKey,
        KeyCode::Char('f') => TuiWidgetEvent::FocusKey,
        KeyCode::PageDown => TuiWidgetEvent::NextPageKey,
        KeyCode::PageUp => TuiWidgetEvent::PrevPageKey,
        _ => return None,
    })
}

pub fn render_log_view(frame: &mut Frame, area: Rect, state: &TuiWidgetState, has_focus: bool) {
    let border = if has_focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let logger = TuiLoggerWidget::default()
        .block(
            Block::default()
                .title("Debug Log")
                .borders(Borders::TOP)
                .border_style(border),
        )
        .style(Style::default())
        .style_warn(Style::default().fg(Color::Yellow))
        .style_error(Style::default().fg(Color::Red))
        .state(state);
    frame.render_widget(logger, area);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys() {
        assert!(matches!(log_event(KeyCode::PageUp), Some(TuiWidgetEvent::PrevPageKey)));
        assert!(log_event(KeyCode::Enter).is_none());
    }
}
