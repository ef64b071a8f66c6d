//! blogdeck - a terminal client for the blog API.
//!
//! Browse articles anonymously; log in to write posts and comments. The
//! session token is restored at startup and kept in the configured token
//! store.

mod app;
mod ui;
mod utils;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blogdeck_core::api::ApiClient;
use blogdeck_core::auth::{MemoryTokenStore, Session, SessionStatus, TokenStore};
use blogdeck_core::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file prefix inside the cache directory
const LOG_FILE_NAME: &str = "blogdeck.log";

const USAGE: &str = "\
Usage: blogdeck [OPTION]

Options:
  (none)        Start the terminal UI
  --whoami      Show the logged-in user
  --login       Log in from the command line
  --logout      Forget the saved session
  --ephemeral   Start the terminal UI without saving the session
  --help        Show this message

Environment:
  BLOGDECK_API_URL   Backend base URL (default http://localhost:8000)
  BLOGDECK_EMAIL     Email pre-filled at login
  RUST_LOG           Log filter (default warn)";

/// What the process was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Tui { ephemeral: bool },
    WhoAmI,
    Login,
    Logout,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None => Ok(Command::Tui { ephemeral: false }),
        Some("--ephemeral") => Ok(Command::Tui { ephemeral: true }),
        Some("--whoami") => Ok(Command::WhoAmI),
        Some("--login") => Ok(Command::Login),
        Some("--logout") => Ok(Command::Logout),
        Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => Err(anyhow::anyhow!("Unknown option: {}\n\n{}", other, USAGE)),
    }
}

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr (command-line modes)
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Log to a daily file while the TUI owns the terminal. The returned guard
/// flushes the writer on drop.
fn init_file_tracing() -> Result<WorkerGuard> {
    let log_dir = Config::cache_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();

    Ok(guard)
}

/// Load the config file, falling back to defaults if it can't be read.
/// Call after tracing is set up so the fallback warning is recorded.
fn load_config() -> Config {
    config_or_default(Config::load(), |key| std::env::var(key).ok())
}

fn config_or_default<F>(loaded: Result<Config>, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            let mut config = Config::default();
            config.apply_env_overrides(lookup);
            config
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    match command {
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::WhoAmI => {
            init_stderr_tracing();
            whoami(&load_config()).await
        }
        Command::Login => {
            init_stderr_tracing();
            login(load_config()).await
        }
        Command::Logout => {
            init_stderr_tracing();
            logout(&load_config())
        }
        Command::Tui { ephemeral } => run_tui(ephemeral).await,
    }
}

// ============================================================================
// Command-line modes
// ============================================================================

/// Session over the configured store, with an anonymous client to resolve
/// identities.
fn open_session(config: &Config) -> Result<(ApiClient, Session)> {
    let api = ApiClient::new(config)?;
    let store = config.token_store()?;
    let session = Session::new(Arc::new(api.clone()), store);
    Ok((api, session))
}

async fn whoami(config: &Config) -> Result<()> {
    let (_, session) = open_session(config)?;
    match session.restore().await {
        SessionStatus::Authenticated => {
            if let Some(user) = session.identity() {
                println!("{} <{}>", user.username, user.email);
            }
        }
        _ => println!("Not logged in"),
    }
    Ok(())
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim();
    match (value.is_empty(), default) {
        (true, Some(d)) => Ok(d.to_string()),
        _ => Ok(value.to_string()),
    }
}

async fn login(mut config: Config) -> Result<()> {
    let (api, session) = open_session(&config)?;

    let email = prompt("Email", config.last_email.as_deref())?;
    if email.is_empty() {
        return Err(anyhow::anyhow!("Email is required"));
    }
    let password = rpassword::prompt_password("Password: ")?;

    let credential = api
        .exchange_credentials(&email, &password)
        .await
        .context("Login failed")?;
    let user = session.login(credential).await.context("Login failed")?;

    if let Err(e) = config.save_last_email(&email) {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {} <{}>", user.username, user.email);
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    let store = config.token_store()?;
    store.clear().context("Failed to clear saved session")?;
    println!("Logged out");
    Ok(())
}

// ============================================================================
// Terminal UI
// ============================================================================

async fn run_tui(ephemeral: bool) -> Result<()> {
    // Logging is best-effort; the UI still runs without it
    let _log_guard = match init_file_tracing() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        }
    };
    info!("blogdeck starting");

    let config = load_config();

    let store: Arc<dyn TokenStore> = if ephemeral {
        Arc::new(MemoryTokenStore::default())
    } else {
        config.token_store()?
    };

    let mut app = App::new(config, store)?;
    app.persist_config = !ephemeral;

    // Restore runs in the background; the header shows Loading meanwhile
    app.start_restore();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // First frame shows the Loading header while the list is fetched
    terminal.draw(|f| render(f, &app))?;

    // The article list needs no login
    app.load_articles().await;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("blogdeck shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut needs_redraw = true;
    loop {
        if needs_redraw {
            terminal.draw(|f| render(f, app))?;
            needs_redraw = false;
        }

        // Poll for events with timeout so session changes get picked up
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    if handle_input(app, key).await? {
                        return Ok(());
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }

        // Restore finishing or a forced logout
        if app.check_session() {
            needs_redraw = true;
        }

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
