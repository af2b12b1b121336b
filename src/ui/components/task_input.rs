use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const PLACEHOLDER: &str = "Add a new task...";

/// The "new task" input box above the list.
///
/// `a` or `i` focuses it; Enter submits the text (blank text included) and
/// keeps the box focused for the next task; Esc or Tab leaves it.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
  input: TextInput,
  active: bool,
}

impl TaskInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// Handle a key event, emitting the submitted text
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<String> {
    if !self.active {
      if matches!(key.code, KeyCode::Char('a') | KeyCode::Char('i')) {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    if key.code == KeyCode::Tab {
      self.active = false;
      return KeyResult::Handled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(text) => {
        self.input.clear();
        KeyResult::Event(text)
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Handled
      }
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let border_color = if self.active {
      Color::Yellow
    } else {
      Color::DarkGray
    };

    let block = Block::default()
      .title(" New task ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border_color));

    let line = if self.active {
      Line::from(self.input.spans(Style::default()))
    } else if self.input.is_empty() {
      Line::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
      Line::raw(self.input.value())
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_ignores_typing() {
    let mut input = TaskInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert!(!input.is_active());
  }

  #[test]
  fn test_activation_key_is_not_typed() {
    let mut input = TaskInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('a'))), KeyResult::Handled);
    assert!(input.is_active());
    assert_eq!(input.value(), "");
  }

  #[test]
  fn test_submit_clears_and_stays_active() {
    let mut input = TaskInput::new();
    input.activate();
    for c in "buy milk".chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }

    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event("buy milk".to_string()));
    assert_eq!(input.value(), "");
    assert!(input.is_active());
  }

  #[test]
  fn test_blank_submission_is_emitted() {
    let mut input = TaskInput::new();
    input.activate();
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(String::new())
    );
  }

  #[test]
  fn test_escape_keeps_text() {
    let mut input = TaskInput::new();
    input.activate();
    input.handle_key(key(KeyCode::Char('z')));
    input.handle_key(key(KeyCode::Esc));
    assert!(!input.is_active());
    assert_eq!(input.value(), "z");
  }
}
