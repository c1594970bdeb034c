//! Connection Credentials
//!
//! Every session start asks a [`TokenSource`] for fresh
//! [`ConnectionDetails`]: the server URL plus a short-lived participant token.
//!
//! Two sources exist:
//! - [`EndpointTokenSource`]: POSTs to a backend that issues tokens
//! - [`LocalTokenMinter`]: signs tokens in-process with the API secret
//!
//! [`token_source_from_settings`] prefers the endpoint when one is configured.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, EnvSettings};
use crate::error::AgentResult;

pub mod endpoint;
pub mod minting;

pub use endpoint::EndpointTokenSource;
pub use minting::{verify_participant_token, LocalTokenMinter, ParticipantClaims, VideoGrant};

/// What a session needs to join a room
///
/// Fetched fresh for every start and never reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    /// Real-time server URL
    pub server_url: String,
    /// Room to join
    pub room_name: String,
    /// Display name of the local participant
    pub participant_name: String,
    /// Signed participant token
    pub participant_token: String,
}

/// Parameters of a token request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// Agent to dispatch into the room
    pub agent_name: Option<String>,
}

impl TokenRequest {
    /// Request for the configured agent
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            agent_name: config.agent_name.clone(),
        }
    }
}

/// One agent dispatched into a room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAgentDispatch {
    /// Agent worker name
    pub agent_name: String,
}

/// Room creation options carried by a token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfiguration {
    /// Agents to dispatch when the room is created
    pub agents: Vec<RoomAgentDispatch>,
}

impl RoomConfiguration {
    /// Configuration dispatching exactly one agent, or `None` without a name
    #[must_use]
    pub fn for_agent(agent_name: Option<&str>) -> Option<Self> {
        agent_name.filter(|n| !n.is_empty()).map(|name| Self {
            agents: vec![RoomAgentDispatch {
                agent_name: name.to_string(),
            }],
        })
    }
}

/// Source of connection credentials
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Produce fresh connection details
    async fn fetch(&self, request: &TokenRequest) -> AgentResult<ConnectionDetails>;
}

/// Choose the token source from the environment
///
/// # Errors
///
/// Returns a configuration error if the endpoint URL is not absolute.
/// Missing minter settings are reported later, at fetch time.
pub fn token_source_from_settings(
    settings: &EnvSettings,
    config: &AppConfig,
) -> AgentResult<Arc<dyn TokenSource>> {
    if let Some(endpoint) = &settings.conn_details_endpoint {
        tracing::info!(endpoint = %endpoint, "Using connection-details endpoint");
        let source = EndpointTokenSource::new(endpoint, config.sandbox_id.clone())?;
        return Ok(Arc::new(source));
    }

    tracing::info!("No connection-details endpoint configured, minting tokens locally");
    Ok(Arc::new(LocalTokenMinter::new(
        settings.livekit_url.clone(),
        settings.api_key.clone(),
        settings.api_secret.clone(),
    )))
}
