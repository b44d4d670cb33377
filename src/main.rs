mod app;
mod client;
mod config;
mod controller;
mod globals;
mod normalize;
mod relay;
mod ui;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dotenvy::dotenv;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use app::App;
use client::SearchClient;
use config::Config;
use controller::{Completion, SearchOutcome};
use normalize::Normalizer;
use ui::draw_ui;

#[derive(Parser)]
#[command(name = "btg-search", version, about = "Bitcoin Gold explorer search relay and widget")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the search relay and static file server
    Serve {
        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive terminal search widget
    Tui {
        /// Relay base URL (overrides BTG_SEARCH_RELAY)
        #[arg(long)]
        relay: Option<String>,
    },
    /// Run one search and print the normalized results as JSON
    Query {
        query: String,
        /// Relay base URL (overrides BTG_SEARCH_RELAY)
        #[arg(long)]
        relay: Option<String>,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => {
            fmt().with_env_filter(env_filter()).init();
            let mut config = Config::load()?;
            if let Some(port) = port {
                config.port = port;
            }
            relay::serve(&config).await
        }
        Command::Query { query, relay } => {
            fmt().with_env_filter(env_filter()).with_writer(io::stderr).init();
            let config = Config::load()?;
            let client = search_client(&config, relay);
            match client.search(&query).await {
                SearchOutcome::Completed(results) => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                    Ok(())
                }
                SearchOutcome::Failed(message) => anyhow::bail!(message),
                SearchOutcome::Cancelled => anyhow::bail!("Search was cancelled"),
            }
        }
        Command::Tui { relay } => {
            // The terminal belongs to the UI, so logs go to a file
            let log_path = Config::log_file();
            let log_file = File::create(&log_path)
                .with_context(|| format!("Failed to create {}", log_path.display()))?;
            fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .init();
            tracing::info!("Logging to {}", log_path.display());
            let config = Config::load()?;
            run_tui(&config, search_client(&config, relay)).await
        }
    }
}

fn search_client(config: &Config, relay: Option<String>) -> SearchClient {
    let relay = relay.unwrap_or_else(|| config.relay_url.clone());
    let mut normalizer = Normalizer::new(config.upstream_url());
    if !config.result_selectors.is_empty() {
        normalizer = normalizer.with_selectors(config.result_selectors.iter().cloned());
    }
    SearchClient::new(relay, normalizer)
}

async fn run_tui(config: &Config, client: SearchClient) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Channel for background search tasks
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(client, config.debounce, tx);

    // Run the app
    let res = run_app(&mut terminal, &mut app, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!("terminal UI failed: {err:#}");
    }

    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<Completion>,
) -> Result<()> {
    loop {
        // Check for finished searches (non-blocking)
        while let Ok(completion) = rx.try_recv() {
            app.handle_completion(completion);
        }

        // Debounced search once typing has settled
        app.tick(Instant::now());

        terminal.draw(|f| draw_ui(f, app))?;

        // Handle input with timeout - only read ONE event per loop iteration
        if !event::poll(Duration::from_millis(50))? {
            // Let spawned searches make progress between polls
            tokio::task::yield_now().await;
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events, ignore release and repeat
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => return Ok(()),
            KeyCode::Char('b') if ctrl => app.open_in_browser(),
            KeyCode::Char(c) if !ctrl => app.push_char(c),
            KeyCode::Backspace => app.pop_char(),
            KeyCode::Enter => app.submit(),
            KeyCode::Esc => app.clear_input(),
            KeyCode::Down => app.next_result(),
            KeyCode::Up => app.previous_result(),
            KeyCode::Home => app.first_result(),
            KeyCode::End => app.last_result(),
            _ => {}
        }
    }
}
