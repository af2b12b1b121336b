use crate::config::LogConfig;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "todo-tui.log";

/// Default log directory: $XDG_DATA_HOME/todo-tui/logs
fn default_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|d| d.join("todo-tui").join("logs"))
}

/// Filter used when RUST_LOG is unset
fn default_directive(level: Option<&str>) -> String {
  match level.map(str::trim) {
    None | Some("") => "todo_tui=info".to_string(),
    Some(directive) if directive.contains('=') => directive.to_string(),
    Some(level) => format!("todo_tui={}", level),
  }
}

/// Set up file logging.
///
/// The terminal belongs to the UI, so logs only go to a file: a daily rolling
/// file in the log directory, or exactly `file` when given. The returned guard
/// flushes buffered lines when dropped and must live until exit.
pub fn init(config: &LogConfig, file: Option<&Path>) -> Result<WorkerGuard> {
  let appender = match file {
    Some(path) => {
      let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;
      tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name)
    }
    None => {
      let dir = config
        .dir
        .clone()
        .or_else(default_dir)
        .ok_or_else(|| eyre!("Could not determine a log directory"))?;
      std::fs::create_dir_all(&dir)?;
      tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX)
    }
  };
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(default_directive(config.level.as_deref())))
    .map_err(|e| eyre!("Invalid log filter: {}", e))?;

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
