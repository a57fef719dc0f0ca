//! Picker layout.
//!
//! ```text
//! ctx | enter drill • space stage • ...        (hidden in compact mode)
//! mode:contexts | current:dev | staged:- | filter:off
//! status line
//! Current: root (ocid1...)                     (compartments only)
//! ┌─Select OCI context──────────────────────┐
//! │> dev        profile=dev region=r1       │
//! │  [*] prod   profile=prod region=r2      │
//! └─────────────────────────────────────────┘
//! ```

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use super::app::{Mode, NavState};

const INFO: Color = Color::Cyan;
const STAGED: Color = Color::Yellow;

/// Draw the whole picker.
pub fn draw(f: &mut Frame, state: &NavState) {
    let show_crumb = state.mode == Mode::Compartments && !state.crumb.is_empty();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if state.compact { 0 } else { 1 }), // key help
            Constraint::Length(1),                                 // meta
            Constraint::Length(if state.status.is_empty() { 0 } else { 1 }),
            Constraint::Length(if show_crumb { 1 } else { 0 }),
            Constraint::Min(3), // list
        ])
        .split(f.area());

    let info = Style::default().fg(INFO);
    if !state.compact {
        f.render_widget(Paragraph::new(state.instructions()).style(info), rows[0]);
    }
    let meta = if state.compact {
        format!("[ULTRA] {}", state.meta())
    } else {
        state.meta()
    };
    f.render_widget(Paragraph::new(meta).style(info), rows[1]);
    f.render_widget(Paragraph::new(state.status.as_str()), rows[2]);
    if show_crumb {
        f.render_widget(Paragraph::new(state.crumb.as_str()), rows[3]);
    }

    draw_list(f, state, rows[4]);
}

fn draw_list(f: &mut Frame, state: &NavState, area: ratatui::layout::Rect) {
    let list = state.list();

    let items: Vec<ListItem> = list
        .visible()
        .into_iter()
        .map(|row| {
            let is_staged = state.is_staged(row);
            let mut spans = Vec::with_capacity(3);
            if is_staged {
                spans.push(Span::styled("[*] ", Style::default().fg(STAGED)));
            }
            let title_style = if is_staged {
                Style::default().fg(STAGED).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            spans.push(Span::styled(row.title(), title_style));
            if !state.compact {
                spans.push(Span::styled(
                    format!("  {}", row.description()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if list.is_filtering() {
        format!("{} [filter: {}]", state.title(), list.filter_text())
    } else {
        state.title()
    };
    let block = if state.compact {
        Block::default()
    } else {
        Block::default().borders(Borders::ALL).title(title)
    };

    let widget = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(list.selected_index()));
    f.render_stateful_widget(widget, area, &mut list_state);
}
