use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::Level;

use aiterm_client::{BackendClient, ClientConfig, EventChannel};
use aiterm_core::SpeechCapability;
use aiterm_observability::{
    default_logs_dir, emit_event, init_process_logging, ObservabilityEvent, ProcessKind,
    DEFAULT_RETENTION_DAYS,
};
use aiterm_types::Executor;

mod app;
mod cli;
mod ui;

use app::{Action, App};
use cli::Command;

#[derive(Parser, Debug)]
#[command(name = "aiterm")]
#[command(about = "Natural-language terminal backed by a command-execution service")]
struct Cli {
    /// REST base URL (overrides AITERM_API_URL / REACT_APP_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Event channel base URL (overrides AITERM_WS_URL / REACT_APP_WS_URL).
    #[arg(long, global = true)]
    ws_url: Option<String>,
    #[arg(long, global = true, default_value = "mini-bash")]
    executor: Executor,
    #[arg(long, global = true, env = "AITERM_LOGS_DIR")]
    logs_dir: Option<PathBuf>,
    /// Print raw JSON from one-shot commands.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Tui);
    let process = match command {
        Command::Tui => ProcessKind::Tui,
        _ => ProcessKind::Cli,
    };

    let logs_dir = cli.logs_dir.clone().unwrap_or_else(default_logs_dir);
    let (_log_guard, log_info) =
        init_process_logging(process, &logs_dir, DEFAULT_RETENTION_DAYS)?;
    emit_event(
        Level::INFO,
        process,
        ObservabilityEvent {
            event: "logging.initialized",
            component: "tui.main",
            detail: Some(&log_info.logs_dir),
            ..Default::default()
        },
    );

    let config = ClientConfig::resolve(cli.api_url.clone(), cli.ws_url.clone())
        .context("invalid backend URL")?;
    let client = BackendClient::new(&config).context("failed to build HTTP client")?;
    emit_event(
        Level::INFO,
        process,
        ObservabilityEvent {
            event: "config.resolved",
            component: "tui.main",
            endpoint: Some(&config.api_base_url),
            executor: Some(cli.executor.as_str()),
            ..Default::default()
        },
    );

    match command {
        Command::Tui => run_tui(&config, client, cli.executor).await,
        other => cli::run(other, &client, cli.executor, cli.json).await,
    }
}

async fn run_tui(
    config: &ClientConfig,
    client: BackendClient,
    executor: Executor,
) -> anyhow::Result<()> {
    let channel = EventChannel::new(config).context("invalid event channel URL")?;
    let (mut app, mut actions) = App::new(
        Arc::new(client.clone()),
        SpeechCapability::from_env(),
        executor,
    );
    app.attach_channel(channel);

    let health_tx = app.sender();
    tokio::spawn(async move {
        let _ = health_tx.send(Action::Health(client.health().await));
    });

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &mut actions).await;
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    actions: &mut mpsc::UnboundedReceiver<Action>,
) -> anyhow::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        while let Ok(action) = actions.try_recv() {
            app.update(action);
        }

        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key_event(key),
                Event::Paste(text) => Some(Action::InsertText(text)),
                _ => None,
            };
            if let Some(action) = action {
                app.update(action);
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.update(Action::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
