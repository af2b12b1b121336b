use ratatui::prelude::*;

/// Truncate a string to a maximum number of chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Style for a todo's text: completed todos are dimmed and struck through
pub fn todo_style(completed: bool) -> Style {
  if completed {
    Style::default()
      .fg(Color::DarkGray)
      .add_modifier(Modifier::CROSSED_OUT)
  } else {
    Style::default().fg(Color::White)
  }
}

/// Checkbox glyph for a todo
pub fn checkbox(completed: bool) -> &'static str {
  if completed {
    "[x]"
  } else {
    "[ ]"
  }
}
