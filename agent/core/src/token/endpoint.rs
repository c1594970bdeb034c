//! Connection-details endpoint client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use super::{ConnectionDetails, RoomConfiguration, TokenRequest, TokenSource};
use crate::error::{AgentError, AgentResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches connection details from a backend endpoint
#[derive(Clone, Debug)]
pub struct EndpointTokenSource {
    url: Url,
    sandbox_id: Option<String>,
    http_client: reqwest::Client,
}

impl EndpointTokenSource {
    /// Create a source for an absolute endpoint URL
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidSetting`] if `endpoint` is not an absolute URL.
    pub fn new(endpoint: &str, sandbox_id: Option<String>) -> AgentResult<Self> {
        let url = Url::parse(endpoint).map_err(|e| AgentError::InvalidSetting {
            key: "AGENT_CONN_DETAILS_ENDPOINT",
            reason: e.to_string(),
        })?;
        Ok(Self {
            url,
            sandbox_id,
            http_client: reqwest::Client::new(),
        })
    }

    /// Endpoint URL
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn body(request: &TokenRequest) -> serde_json::Value {
        match RoomConfiguration::for_agent(request.agent_name.as_deref()) {
            Some(config) => {
                let agents: Vec<_> = config
                    .agents
                    .iter()
                    .map(|a| json!({ "agent_name": a.agent_name }))
                    .collect();
                json!({ "room_config": { "agents": agents } })
            }
            None => json!({}),
        }
    }
}

#[async_trait]
impl TokenSource for EndpointTokenSource {
    fn name(&self) -> &str {
        "endpoint"
    }

    async fn fetch(&self, request: &TokenRequest) -> AgentResult<ConnectionDetails> {
        tracing::debug!(url = %self.url, agent = ?request.agent_name, "Requesting connection details");

        let response = self
            .http_client
            .post(self.url.clone())
            .header("X-Sandbox-Id", self.sandbox_id.as_deref().unwrap_or_default())
            .json(&Self::body(request))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Connection-details endpoint failed");
            return Err(AgentError::HttpStatus(status.as_u16()));
        }

        let details: ConnectionDetails = response.json().await?;
        tracing::debug!(room = %details.room_name, "Received connection details");
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_body_without_agent_is_empty_object() {
        let body = EndpointTokenSource::body(&TokenRequest::default());
        assert_eq!(body, json!({}));
    }

    #[test]
    fn test_body_with_agent_uses_snake_case() {
        let body = EndpointTokenSource::body(&TokenRequest {
            agent_name: Some("support".into()),
        });
        assert_eq!(
            body,
            json!({ "room_config": { "agents": [{ "agent_name": "support" }] } })
        );
    }
}
