use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Endpoint the todo list talks to unless configured otherwise
pub const DEFAULT_API_URL: &str = "https://66ebef6a2b6cf2b89c5c7fe3.mockapi.io/api/v1/todos";

/// Environment variable overriding `api.url`
pub const URL_ENV: &str = "TODO_TUI_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Title shown in the header
  pub title: String,
  pub api: ApiConfig,
  pub ui: UiConfig,
  pub log: LogConfig,
  /// How long quitting waits for in-flight changes to reach the server
  pub shutdown_grace_ms: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      title: "My Todo List".to_string(),
      api: ApiConfig::default(),
      ui: UiConfig::default(),
      log: LogConfig::default(),
      shutdown_grace_ms: 2000,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Collection url of the todo resource
  pub url: String,
  pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      connect_timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  pub tick_rate_ms: u64,
  /// How long a rollback notice stays in the status line
  pub notice_secs: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: 100,
      notice_secs: 4,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Directory for log files (default: $XDG_DATA_HOME/todo-tui/logs)
  pub dir: Option<PathBuf>,
  /// Filter directive used when RUST_LOG is not set, e.g. "debug"
  pub level: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./todo-tui.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/todo-tui/config.yaml
  ///
  /// Without a config file the defaults are used. `TODO_TUI_URL` overrides
  /// the API url either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var(URL_ENV) {
      if !url.trim().is_empty() {
        config.api.url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("todo-tui.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("todo-tui").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means "all defaults"
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn tick_rate(&self) -> Duration {
    Duration::from_millis(self.ui.tick_rate_ms.max(10))
  }

  pub fn notice_duration(&self) -> Duration {
    Duration::from_secs(self.ui.notice_secs)
  }

  pub fn shutdown_grace(&self) -> Duration {
    Duration::from_millis(self.shutdown_grace_ms)
  }
}
