//! Agent TUI Entry Point
//!
//! Launches the terminal front-end for a real-time voice agent.
//!
//! Usage:
//!   agent-tui [OPTIONS]
//!
//! Options:
//!   --agent-name <NAME>          Agent dispatched into the room
//!   --sandbox-id <ID>            Sandbox id for the config and token endpoints
//!   --config <PATH>              Branding file (default: $XDG_CONFIG_HOME/voice-agent/app.toml)
//!   --agent-join-timeout <SECS>  How long to wait for the agent after connecting
//!   --offline                    Talk to the built-in loopback echo agent
//!
//! Only the loopback room ships with this binary, so `--offline` is required.
//!
//! Logs go to `$XDG_CACHE_HOME/voice-agent/agent-tui.log`; set `RUST_LOG` to
//! change the level.

use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agent_core::config::{default_config_path, ConfigLoader, ConfigOverrides, EnvSettings};
use agent_core::room::InProcessRoom;
use agent_core::theme::detect_system_scheme;
use agent_core::token::token_source_from_settings;
use agent_core::{SessionOptions, ThemeController, ThemeStore};

use agent_tui::session_client::SessionClient;
use agent_tui::App;

#[derive(Debug, Parser)]
#[command(name = "agent-tui", version, about = "Talk to a voice agent from the terminal")]
struct Cli {
    /// Agent dispatched into the room
    #[arg(long)]
    agent_name: Option<String>,

    /// Sandbox id for the config and token endpoints
    #[arg(long)]
    sandbox_id: Option<String>,

    /// Branding config file
    #[arg(long, env = "AGENT_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seconds to wait for the agent after connecting
    #[arg(long)]
    agent_join_timeout: Option<u64>,

    /// Use the built-in loopback room with an echo agent
    #[arg(long, env = "AGENT_OFFLINE")]
    offline: bool,
}

impl Cli {
    /// The room to drive; the loopback is never picked implicitly
    fn room(&self) -> anyhow::Result<InProcessRoom> {
        if !self.offline {
            anyhow::bail!(
                "no media-server transport is built in; \
                 run with --offline to use the loopback echo agent"
            );
        }
        Ok(InProcessRoom::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging();
    let room = cli.room()?;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: agent-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("Run it interactively, or use `agent-token` for scripted access.");
        std::process::exit(1);
    }

    // Config and theme resolve before the first frame
    let settings = EnvSettings::from_env();
    let mut overrides = ConfigOverrides::new();
    if let Some(name) = cli.agent_name {
        overrides = overrides.with_agent_name(name);
    }
    if let Some(id) = cli.sandbox_id {
        overrides = overrides.with_sandbox_id(id);
    }
    let loaded = ConfigLoader::new(settings.clone())
        .with_file(cli.config.or_else(default_config_path))
        .with_overrides(overrides)
        .load()
        .await;
    tracing::info!(source = %loaded.source, "Configuration ready");

    let tokens = token_source_from_settings(&settings, &loaded.config)?;
    let theme = ThemeController::load(
        ThemeStore::new(),
        detect_system_scheme(|key| std::env::var(key).ok()),
    )
    .await;

    let mut options = SessionOptions::default();
    if let Some(secs) = cli.agent_join_timeout {
        options.agent_join_timeout = Duration::from_secs(secs);
    }
    let client = SessionClient::with_options(
        Arc::new(room),
        tokens,
        Arc::clone(&loaded.config),
        options,
    );
    let mut app = App::new(client, Arc::clone(&loaded.config), theme);

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetTitle(&loaded.config.page_title)
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = app.run(&mut terminal).await;
    app.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "TUI exited with an error");
        if let Some(path) = log_path {
            eprintln!("See {} for details", path.display());
        }
    }

    // Propagate any errors
    result
}

/// Log to a file so the alternate screen stays clean
fn init_logging() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("voice-agent");
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join("agent-tui.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agent_core=info,agent_tui=info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_requires_offline_flag() {
        let cli = Cli::try_parse_from(["agent-tui"]).expect("valid args");
        let err = cli.room().expect_err("loopback must be opt-in");
        assert!(err.to_string().contains("--offline"));

        let cli = Cli::try_parse_from(["agent-tui", "--offline"]).expect("valid args");
        assert!(cli.room().is_ok());
    }
}
