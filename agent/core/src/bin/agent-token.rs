//! Agent Token
//!
//! Command-line access to the credential path the front-end uses.
//!
//! # Usage
//!
//! ```bash
//! # Print connection details from the configured source
//! agent-token fetch --agent-name support
//!
//! # Check a locally minted token against LIVEKIT_API_SECRET
//! agent-token verify --token eyJhbGciOi...
//!
//! # With verbose logging
//! RUST_LOG=debug agent-token fetch
//! ```
//!
//! # Environment Variables
//!
//! - `AGENT_CONN_DETAILS_ENDPOINT`: Backend issuing connection details
//! - `AGENT_SANDBOX_ID`: Sent as `X-Sandbox-Id` to the endpoint
//! - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`: Local minting
//! - `AGENT_NAME`: Agent dispatched into the room
//! - `RUST_LOG`: Log level (logs go to stderr)

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use agent_core::config::{AppConfig, EnvSettings};
use agent_core::token::{token_source_from_settings, verify_participant_token, TokenRequest};

#[derive(Debug, Parser)]
#[command(name = "agent-token", version, about = "Fetch or verify voice-agent connection credentials")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print connection details as JSON
    Fetch {
        /// Agent to dispatch into the room
        #[arg(long, env = "AGENT_NAME")]
        agent_name: Option<String>,
    },
    /// Validate a locally minted participant token and print its claims
    Verify {
        /// Token to check
        #[arg(long)]
        token: String,
        /// Skip the issuer check against LIVEKIT_API_KEY
        #[arg(long)]
        any_issuer: bool,
    },
}

/// Quiet unless `RUST_LOG` says otherwise
const DEFAULT_LOG_FILTER: &str = "agent_core=warn";

fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let settings = EnvSettings::from_env();

    match cli.command {
        Command::Fetch { agent_name } => {
            let config = AppConfig {
                sandbox_id: settings.sandbox_id.clone(),
                ..AppConfig::default()
            };
            let source = token_source_from_settings(&settings, &config)?;
            info!(source = source.name(), "Fetching connection details");

            let details = source
                .fetch(&TokenRequest { agent_name })
                .await
                .map_err(|e| anyhow::anyhow!(e.describe()))?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Verify { token, any_issuer } => {
            let secret = settings
                .api_secret
                .as_deref()
                .context("LIVEKIT_API_SECRET is not defined")?;
            let issuer = if any_issuer {
                None
            } else {
                settings.api_key.as_deref()
            };

            let claims = verify_participant_token(&token, secret, issuer)
                .map_err(|e| anyhow::anyhow!(e.describe()))?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_replaces_default_filter() {
        assert_eq!(log_filter(None).to_string(), DEFAULT_LOG_FILTER);
        assert_eq!(
            log_filter(Some("agent_core=debug".into())).to_string(),
            "agent_core=debug"
        );
    }
}
