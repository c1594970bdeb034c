//! Local Token Minting
//!
//! Signs participant tokens in-process with the server API key and secret.
//! This keeps a development setup self-contained, at the cost of holding the
//! signing secret in the client process. Deployments should configure
//! `AGENT_CONN_DETAILS_ENDPOINT` instead.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ConnectionDetails, RoomConfiguration, TokenRequest, TokenSource};
use crate::error::{AgentError, AgentResult};

/// Token lifetime
pub const TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

const PARTICIPANT_NAME: &str = "user";
const IDENTITY_PREFIX: &str = "voice_assistant_user_";
const ROOM_PREFIX: &str = "voice_assistant_room_";
const SUFFIX_RANGE: u32 = 10_000;

/// Room permissions granted by a token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Room the grant applies to
    pub room: String,
    /// May join the room
    pub room_join: bool,
    /// May publish tracks
    pub can_publish: bool,
    /// May publish data
    pub can_publish_data: bool,
    /// May subscribe to tracks
    pub can_subscribe: bool,
}

impl VideoGrant {
    /// Full participant grant for `room`
    #[must_use]
    pub fn participant(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            room_join: true,
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
        }
    }
}

/// Claims of a participant token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantClaims {
    /// API key
    pub iss: String,
    /// Participant identity
    pub sub: String,
    /// Token id
    pub jti: String,
    /// Participant display name
    pub name: String,
    /// Not valid before (unix seconds)
    pub nbf: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Room grant
    pub video: VideoGrant,
    /// Agent dispatch, present only when an agent was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfiguration>,
}

/// Mints participant tokens with locally held credentials
#[derive(Clone)]
pub struct LocalTokenMinter {
    server_url: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl std::fmt::Debug for LocalTokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTokenMinter")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl LocalTokenMinter {
    /// Create a minter; missing values are reported on fetch
    pub fn new(
        server_url: Option<String>,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Self {
        tracing::warn!(
            "Signing participant tokens in-process: the API secret is held by this client. \
             Configure AGENT_CONN_DETAILS_ENDPOINT for deployments"
        );
        Self {
            server_url,
            api_key,
            api_secret,
        }
    }

    fn require<'a>(value: Option<&'a String>, name: &'static str) -> AgentResult<&'a str> {
        value
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or(AgentError::MissingSetting(name))
    }

    /// Sign a token for `identity` in `room`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key or secret is missing, or if
    /// signing fails.
    pub fn mint(
        &self,
        identity: &str,
        name: &str,
        room: &str,
        agent_name: Option<&str>,
    ) -> AgentResult<String> {
        let api_key = Self::require(self.api_key.as_ref(), "LIVEKIT_API_KEY")?;
        let api_secret = Self::require(self.api_secret.as_ref(), "LIVEKIT_API_SECRET")?;

        let now = Utc::now().timestamp();
        let ttl = i64::try_from(TOKEN_TTL.as_secs()).unwrap_or(i64::MAX);
        let claims = ParticipantClaims {
            iss: api_key.to_string(),
            sub: identity.to_string(),
            jti: identity.to_string(),
            name: name.to_string(),
            nbf: now,
            exp: now + ttl,
            video: VideoGrant::participant(room),
            room_config: RoomConfiguration::for_agent(agent_name),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(api_secret.as_bytes()),
        )?;
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for LocalTokenMinter {
    fn name(&self) -> &str {
        "local-minter"
    }

    async fn fetch(&self, request: &TokenRequest) -> AgentResult<ConnectionDetails> {
        let server_url = Self::require(self.server_url.as_ref(), "LIVEKIT_URL")?.to_string();
        Self::require(self.api_key.as_ref(), "LIVEKIT_API_KEY")?;
        Self::require(self.api_secret.as_ref(), "LIVEKIT_API_SECRET")?;

        let (identity, room_name) = {
            let mut rng = rand::thread_rng();
            (
                format!("{IDENTITY_PREFIX}{}", rng.gen_range(0..SUFFIX_RANGE)),
                format!("{ROOM_PREFIX}{}", rng.gen_range(0..SUFFIX_RANGE)),
            )
        };

        let participant_token = self.mint(
            &identity,
            PARTICIPANT_NAME,
            &room_name,
            request.agent_name.as_deref(),
        )?;
        tracing::debug!(identity = %identity, room = %room_name, "Minted participant token");

        Ok(ConnectionDetails {
            server_url,
            room_name,
            participant_name: PARTICIPANT_NAME.to_string(),
            participant_token,
        })
    }
}

/// Decode and validate a participant token
///
/// Checks the HS256 signature, expiry and not-before, and the issuer when
/// `api_key` is given.
///
/// # Errors
///
/// Returns [`AgentError::Signing`] if the token is malformed, expired or
/// signed with a different secret.
pub fn verify_participant_token(
    token: &str,
    api_secret: &str,
    api_key: Option<&str>,
) -> AgentResult<ParticipantClaims> {
    let mut validation = Validation::default();
    validation.validate_nbf = true;
    validation.validate_aud = false;
    if let Some(key) = api_key {
        validation.set_issuer(&[key]);
    }

    let data = decode::<ParticipantClaims>(
        token,
        &DecodingKey::from_secret(api_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
