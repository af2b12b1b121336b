mod app;
mod cache;
mod config;
mod event;
mod logging;
mod query;
mod todo;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "todo-tui")]
#[command(about = "A terminal todo list backed by a REST API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/todo-tui/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Todo collection URL, overriding the config file and TODO_TUI_URL
  #[arg(short, long)]
  url: Option<String>,

  /// Write logs to this file instead of the daily log directory
  #[arg(long)]
  log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override the endpoint if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let _guard = logging::init(&config.log, args.log_file.as_deref())?;
  info!(version = env!("CARGO_PKG_VERSION"), "Starting todo-tui");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  info!("Exited cleanly");
  Ok(())
}
