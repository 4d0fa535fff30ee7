mod app;
mod config;
mod controller;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use cold_core::{ConsoleState, SolverCatalog};
use config::{load_config, Args, Config};
use controller::{ControllerClient, ControllerHandle, COMMAND_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, sync::Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type ConsoleTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(Args::parse())?;
    init_logging(&config)?;

    let catalog = load_catalog(&config)?;
    info!(
        event = "console_start",
        controller = %config.controller_url,
        solvers = catalog.len(),
        vocabulary = ?config.vocabulary
    );

    let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let client = ControllerClient::new(&config.controller_url, config.request_timeout)
        .context("failed to build controller client")?;
    let handle = ControllerHandle::start(client, config.poll_interval, event_tx, command_rx);

    let mut app = App::new(ConsoleState::new(catalog, config.vocabulary), command_tx);
    let mut terminal = setup_terminal()?;
    let outcome = run_app(&mut terminal, &mut app, &mut event_rx).await;

    handle.stop();
    restore_terminal(&mut terminal)?;
    outcome
}

async fn run_app(
    terminal: &mut ConsoleTerminal,
    app: &mut App,
    event_rx: &mut mpsc::Receiver<cold_core::ConsoleEvent>,
) -> Result<()> {
    let mut input = EventStream::new();
    loop {
        terminal.draw(|frame| ui::render(frame, &*app))?;
        tokio::select! {
            Some(event) = event_rx.recv() => {
                app.apply(event);
            }
            maybe_input = input.next() => {
                match maybe_input {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if app.handle_key(key) {
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(event = "terminal_input_error", error = %err);
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

fn load_catalog(config: &Config) -> Result<SolverCatalog> {
    match &config.solvers_dir {
        Some(dir) => {
            let catalog = SolverCatalog::load_dir(dir)?;
            if catalog.is_empty() {
                warn!(event = "solver_catalog_empty", dir = %dir.display());
            }
            Ok(catalog)
        }
        None => Ok(SolverCatalog::builtin()),
    }
}

fn setup_terminal() -> Result<ConsoleTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ConsoleTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// The terminal belongs to the UI, so logs go to `--log-file`, to stderr when
/// `COLD_LOG_STDERR` is set, or nowhere.
fn init_logging(config: &Config) -> Result<()> {
    let fallback = std::env::var("COLD_LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| if config.debug { "debug" } else { "info" }.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
        return Ok(());
    }

    if stderr_logging_enabled(std::env::var("COLD_LOG_STDERR").ok().as_deref()) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
    Ok(())
}

fn stderr_logging_enabled(value: Option<&str>) -> bool {
    matches!(
        value,
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_logging_needs_a_truthy_value() {
        assert!(stderr_logging_enabled(Some("1")));
        assert!(stderr_logging_enabled(Some("yes")));
        assert!(!stderr_logging_enabled(Some("0")));
        assert!(!stderr_logging_enabled(Some("")));
        assert!(!stderr_logging_enabled(None));
    }
}
