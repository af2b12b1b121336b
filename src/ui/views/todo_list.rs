use crate::cache::{is_provisional, TodoCache};
use crate::query::QueryState;
use crate::todo::{NewTodo, Todo, TodoPatch};
use crate::ui::components::{InputResult, KeyResult, Notice, Spinner, TaskInput, TextInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{checkbox, todo_style, truncate, StatusLine};
use crate::ui::view::{ShortcutInfo, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;

/// Inline editor for one row
#[derive(Debug)]
struct InlineEdit {
  id: String,
  input: TextInput,
}

/// The todo list: a "new task" input above the tasks, newest first.
///
/// Holds only transient UI state; the todos themselves live in the cache.
pub struct TodoListView {
  task_input: TaskInput,
  editing: Option<InlineEdit>,
  list_state: ListState,
  /// Id of the selected row, so the selection follows it when rows move
  selected_id: Option<String>,
  spinner: Spinner,
  notice: Option<Notice>,
  notice_ttl: Duration,
  /// Whether the first load has been seen (to focus the input on an empty list)
  seen_first_load: bool,
}

/// The todo shown at display row `index` (rows are in reverse cache order)
fn display_todo(todos: &[Todo], index: usize) -> Option<&Todo> {
  todos
    .len()
    .checked_sub(index + 1)
    .and_then(|i| todos.get(i))
}

impl TodoListView {
  pub fn new(notice_ttl: Duration) -> Self {
    Self {
      task_input: TaskInput::new(),
      editing: None,
      list_state: ListState::default(),
      selected_id: None,
      spinner: Spinner::new(),
      notice: None,
      notice_ttl,
      seen_first_load: false,
    }
  }

  fn selected<'a>(&self, todos: &'a [Todo]) -> Option<&'a Todo> {
    display_todo(todos, self.list_state.selected()?)
  }

  fn select_index(&mut self, todos: &[Todo], index: usize) {
    self.list_state.select(Some(index));
    self.selected_id = display_todo(todos, index).map(|t| t.id.clone());
  }

  fn move_selection(&mut self, todos: &[Todo], delta: isize) {
    if todos.is_empty() {
      return;
    }
    let current = self.list_state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, todos.len() as isize - 1) as usize;
    self.select_index(todos, next);
  }

  /// Re-find the selected row after the collection changed
  fn anchor_selection(&mut self, todos: &[Todo]) {
    if let Some(id) = &self.selected_id {
      if let Some(pos) = todos.iter().rev().position(|t| &t.id == id) {
        self.list_state.select(Some(pos));
        return;
      }
    }
    ensure_valid_selection(&mut self.list_state, todos.len());
    self.selected_id = self
      .list_state
      .selected()
      .and_then(|i| display_todo(todos, i))
      .map(|t| t.id.clone());
  }

  /// Close the inline editor, sending its text
  fn commit_edit(&mut self, cache: &mut TodoCache) {
    if let Some(edit) = self.editing.take() {
      cache.update(&edit.id, TodoPatch::text(edit.input.value()));
    }
  }

  // Key handling helpers for or_else chain pattern
  fn handle_edit(&mut self, key: KeyEvent, cache: &mut TodoCache) -> Option<ViewAction> {
    let edit = self.editing.as_mut()?;

    match key.code {
      // Moving away blurs the editor, then the move itself happens
      KeyCode::Up | KeyCode::Down => {
        self.commit_edit(cache);
        None
      }
      KeyCode::Tab => {
        self.commit_edit(cache);
        Some(ViewAction::None)
      }
      _ => match edit.input.handle_key(key) {
        InputResult::Submitted(_) | InputResult::Cancelled => {
          self.commit_edit(cache);
          Some(ViewAction::None)
        }
        InputResult::Consumed | InputResult::NotHandled => Some(ViewAction::None),
      },
    }
  }

  fn handle_task_input(&mut self, key: KeyEvent, cache: &mut TodoCache) -> Option<ViewAction> {
    match self.task_input.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(text) => {
        let id = cache.add(NewTodo::new(text));
        self.selected_id = Some(id);
        Some(ViewAction::None)
      }
      // The focused input swallows everything else
      KeyResult::NotHandled if self.task_input.is_active() => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent, todos: &[Todo]) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(todos, 1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(todos, -1),
      KeyCode::Char('g') | KeyCode::Home => self.move_selection(todos, isize::MIN / 2),
      KeyCode::Char('G') | KeyCode::End => self.move_selection(todos, isize::MAX / 2),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent, cache: &mut TodoCache) -> Option<ViewAction> {
    // Rows the server has not confirmed can only be refreshed or quit from
    let selected = self
      .selected(cache.todos())
      .filter(|t| !is_provisional(&t.id))
      .cloned();

    match key.code {
      KeyCode::Char(' ') | KeyCode::Char('x') => {
        let todo = selected?;
        cache.update(&todo.id, TodoPatch::completed(!todo.completed));
        Some(ViewAction::None)
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        let todo = selected?;
        self.editing = Some(InlineEdit {
          id: todo.id,
          input: TextInput::with_value(todo.todo),
        });
        Some(ViewAction::None)
      }
      KeyCode::Char('d') | KeyCode::Delete => {
        let todo = selected?;
        cache.remove(&todo.id);
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        cache.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') => Some(ViewAction::Quit),
      _ => None,
    }
  }

  /// Handle a key event, returning an action for App to execute
  pub fn handle_key(&mut self, key: KeyEvent, cache: &mut TodoCache) -> ViewAction {
    self
      .handle_edit(key, cache)
      .or_else(|| self.handle_task_input(key, cache))
      .or_else(|| self.handle_navigation(key, cache.todos()))
      .or_else(|| self.handle_actions(key, cache))
      .unwrap_or(ViewAction::None)
  }

  /// Called on each tick, after the cache has been polled
  pub fn tick(&mut self, cache: &mut TodoCache) {
    self.spinner.tick();

    if let Some(message) = cache.take_notice() {
      self.notice = Some(Notice::new(message, self.notice_ttl));
    }
    if self.notice.as_ref().is_some_and(|n| n.is_expired()) {
      self.notice = None;
    }

    if !self.seen_first_load && cache.state().is_success() {
      self.seen_first_load = true;
      if cache.todos().is_empty() && self.editing.is_none() {
        self.task_input.activate();
      }
    }

    self.anchor_selection(cache.todos());
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect, cache: &TodoCache) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(1)])
      .split(area);

    self.task_input.render(frame, chunks[0]);
    self.render_list(frame, chunks[1], cache);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, cache: &TodoCache) {
    let todos = cache.todos();
    self.anchor_selection(todos);

    let title = match cache.state() {
      QueryState::Loading => " Tasks (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Tasks (error: {}) ", truncate(e, 50)),
      _ if cache.query().is_fetching() => format!(" Tasks ({}, refreshing...) ", todos.len()),
      _ => format!(" Tasks ({}) ", todos.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    // The spinner replaces the list while the first load is outstanding
    if cache.state().is_loading() {
      let paragraph = Paragraph::new(format!("{} Loading tasks...", self.spinner.frame()))
        .block(block)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Blue));
      frame.render_widget(paragraph, area);
      return;
    }

    if todos.is_empty() {
      let content = match cache.state() {
        QueryState::Error(_) => "Failed to load tasks. Press 'r' to retry.",
        QueryState::Idle => "",
        _ => "No tasks yet. Add one above!",
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let editing = self.editing.as_ref();
    let items: Vec<ListItem> = todos
      .iter()
      .rev()
      .map(|todo| {
        let box_color = if todo.completed {
          Color::Green
        } else {
          Color::Gray
        };
        let mut spans = vec![
          Span::styled(checkbox(todo.completed), Style::default().fg(box_color)),
          Span::raw(" "),
        ];

        match editing {
          Some(edit) if edit.id == todo.id => {
            spans.extend(edit.input.spans(Style::default().fg(Color::Yellow)));
          }
          _ => spans.push(Span::styled(todo.todo.as_str(), todo_style(todo.completed))),
        }

        if is_provisional(&todo.id) || cache.is_pending(&todo.id) {
          spans.push(Span::styled(" …", Style::default().fg(Color::DarkGray)));
        }

        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  pub fn status<'a>(&'a self, cache: &TodoCache) -> StatusLine<'a> {
    StatusLine {
      notice: self.notice.as_ref().map(|n| n.message()),
      pending: cache.pending_count(),
      synced_at: cache.query().fetched_at(),
    }
  }

  /// Keyboard shortcuts to display in the header
  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.editing.is_some() {
      return vec![
        ShortcutInfo::new("enter", "save").with_priority(10),
        ShortcutInfo::new("esc", "done").with_priority(20),
      ];
    }

    if self.task_input.is_active() {
      return vec![
        ShortcutInfo::new("enter", "add").with_priority(10),
        ShortcutInfo::new("esc", "list").with_priority(20),
      ];
    }

    vec![
      ShortcutInfo::new("a", "add").with_priority(10),
      ShortcutInfo::new("space", "toggle").with_priority(20),
      ShortcutInfo::new("e", "edit").with_priority(30),
      ShortcutInfo::new("d", "delete").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "quit").with_priority(60),
    ]
  }
}
