use crate::cache::TodoCache;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::todo::TodoClient;
use crate::ui;
use crate::ui::view::ViewAction;
use crate::ui::views::TodoListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use tracing::{info, warn};

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// The local copy of the todo list
  cache: TodoCache,

  /// The list screen
  view: TodoListView,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = TodoClient::new(&config)?;
    info!(url = %client.base_url(), "Using todo collection");
    let mut cache = TodoCache::new(Arc::new(client));
    let view = TodoListView::new(config.notice_duration());

    // Initial data load
    cache.fetch();

    Ok(Self {
      config,
      cache,
      view,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result?;

    self.flush_pending().await;
    Ok(())
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(self.config.tick_rate());

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  /// Give changes still in flight a chance to reach the server
  async fn flush_pending(&mut self) {
    let pending = self.cache.pending_count();
    if pending == 0 {
      return;
    }

    info!(pending, "Waiting for pending changes before exit");
    match tokio::time::timeout(self.config.shutdown_grace(), self.cache.settle()).await {
      Ok(()) => info!("All pending changes settled"),
      Err(_) => warn!(
        pending = self.cache.pending_count(),
        "Exiting with unconfirmed changes"
      ),
    }
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        self.cache.poll();
        self.view.tick(&mut self.cache);
      }
      // The next draw uses the new size
      Event::Resize => {}
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.view.handle_key(key, &mut self.cache) {
      ViewAction::Quit => self.should_quit = true,
      ViewAction::None => {}
    }
  }

  // Accessors for UI rendering
  pub fn parts(&mut self) -> (&Config, &mut TodoListView, &TodoCache) {
    (&self.config, &mut self.view, &self.cache)
  }
}
