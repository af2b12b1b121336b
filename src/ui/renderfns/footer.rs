use chrono::{DateTime, Local};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the status line shows
#[derive(Debug, Clone, Default)]
pub struct StatusLine<'a> {
  /// Rollback notice, shown until it expires
  pub notice: Option<&'a str>,
  /// Changes still waiting on the server
  pub pending: usize,
  /// When the list was last loaded
  pub synced_at: Option<DateTime<Local>>,
}

/// Draw the footer bar with notices and sync state
pub fn draw_footer(frame: &mut Frame, area: Rect, status: &StatusLine) {
  let mut spans = vec![Span::raw(" ")];

  if let Some(notice) = status.notice {
    spans.push(Span::styled(
      format!("✗ {}", notice),
      Style::default().fg(Color::Red).bold(),
    ));
    spans.push(Span::raw("  "));
  }

  if status.pending > 0 {
    spans.push(Span::styled(
      format!("⟳ {} pending", status.pending),
      Style::default().fg(Color::Yellow),
    ));
    spans.push(Span::raw("  "));
  }

  if let Some(synced_at) = status.synced_at {
    spans.push(Span::styled(
      format!("synced {}", synced_at.format("%H:%M:%S")),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
