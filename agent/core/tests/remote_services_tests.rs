//! Remote configuration and connection-details endpoint tests
//!
//! Both services are stood up with wiremock; nothing leaves the machine.

use std::io::Write;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agent_core::config::{
    AppConfig, ConfigLoader, ConfigOverrides, ConfigSource, EnvSettings,
};
use agent_core::token::{
    token_source_from_settings, verify_participant_token, EndpointTokenSource, TokenRequest,
    TokenSource,
};
use agent_core::ErrorKind;

fn settings(pairs: &[(&str, String)]) -> EnvSettings {
    EnvSettings::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    })
}

// =============================================================================
// Remote Configuration
// =============================================================================

#[tokio::test]
async fn test_remote_config_entries_are_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .and(header("X-Sandbox-ID", "sbx-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companyName": { "type": "string", "value": "Acme" },
            "supportsVideoInput": { "type": "boolean", "value": false },
            "startButtonText": { "type": "boolean", "value": "wrong type" },
            "unknownKey": { "type": "string", "value": "ignored" },
            "accent": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let loaded = ConfigLoader::new(settings(&[
        ("AGENT_CONFIG_ENDPOINT", format!("{}/config", server.uri())),
        ("AGENT_SANDBOX_ID", "sbx-42".to_string()),
    ]))
    .with_file(None)
    .load()
    .await;

    let defaults = AppConfig::default();
    assert_eq!(loaded.config.company_name, "Acme");
    assert!(!loaded.config.supports_video_input);
    assert_eq!(loaded.config.start_button_text, defaults.start_button_text);
    assert_eq!(loaded.config.accent, defaults.accent);
    // Sandbox id from the environment is the top layer
    assert_eq!(loaded.config.sandbox_id.as_deref(), Some("sbx-42"));
    assert_eq!(loaded.source, ConfigSource::Env);
}

#[tokio::test]
async fn test_remote_config_failure_falls_back_to_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let loaded = ConfigLoader::new(settings(&[(
        "AGENT_CONFIG_ENDPOINT",
        format!("{}/config", server.uri()),
    )]))
    .with_file(None)
    .load()
    .await;

    assert_eq!(*loaded.config, AppConfig::default());
    assert_eq!(loaded.source, ConfigSource::Default);
}

#[tokio::test]
async fn test_remote_config_non_object_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
        .mount(&server)
        .await;

    let loader = ConfigLoader::new(EnvSettings::default()).with_file(None);
    let result = loader.fetch_remote(&server.uri()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_layers_file_then_remote_then_cli() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
company_name = "From File"
page_title = "File Title"
agent_name = "file-agent"
"#
    )
    .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pageTitle": { "type": "string", "value": "Remote Title" }
        })))
        .mount(&server)
        .await;

    let loaded = ConfigLoader::new(settings(&[(
        "AGENT_CONFIG_ENDPOINT",
        server.uri(),
    )]))
    .with_file(Some(file.path().to_path_buf()))
    .with_overrides(ConfigOverrides::new().with_agent_name("cli-agent"))
    .load()
    .await;

    assert_eq!(loaded.config.company_name, "From File");
    assert_eq!(loaded.config.page_title, "Remote Title");
    assert_eq!(loaded.config.agent_name.as_deref(), Some("cli-agent"));
    assert_eq!(loaded.source, ConfigSource::Cli);
    assert_eq!(loaded.file_path.as_deref(), Some(file.path()));
}

// =============================================================================
// Connection-Details Endpoint
// =============================================================================

#[tokio::test]
async fn test_endpoint_posts_agent_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/connection-details"))
        .and(header("X-Sandbox-Id", "sbx-1"))
        .and(body_json(json!({
            "room_config": { "agents": [{ "agent_name": "support" }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverUrl": "wss://example.livekit.cloud",
            "roomName": "voice_assistant_room_7",
            "participantName": "user",
            "participantToken": "jwt"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = EndpointTokenSource::new(
        &format!("{}/api/connection-details", server.uri()),
        Some("sbx-1".to_string()),
    )
    .unwrap();
    let details = source
        .fetch(&TokenRequest {
            agent_name: Some("support".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(details.server_url, "wss://example.livekit.cloud");
    assert_eq!(details.room_name, "voice_assistant_room_7");
    assert_eq!(details.participant_token, "jwt");
}

#[tokio::test]
async fn test_endpoint_without_agent_sends_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverUrl": "wss://a",
            "roomName": "r",
            "participantName": "user",
            "participantToken": "t"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = EndpointTokenSource::new(&server.uri(), None).unwrap();
    assert!(source.fetch(&TokenRequest::default()).await.is_ok());
}

#[tokio::test]
async fn test_endpoint_status_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = EndpointTokenSource::new(&server.uri(), None).unwrap();
    let err = source.fetch(&TokenRequest::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.describe(), "NetworkError: HTTP error! status: 403");
}

#[tokio::test]
async fn test_endpoint_malformed_body_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let source = EndpointTokenSource::new(&server.uri(), None).unwrap();
    let err = source.fetch(&TokenRequest::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

// =============================================================================
// Local Minting
// =============================================================================

#[tokio::test]
async fn test_local_minter_round_trip_through_settings() {
    let env = settings(&[
        ("LIVEKIT_URL", "wss://local.test".to_string()),
        ("LIVEKIT_API_KEY", "devkey".to_string()),
        ("LIVEKIT_API_SECRET", "a-long-enough-development-secret".to_string()),
    ]);
    let config = AppConfig {
        agent_name: Some("support".to_string()),
        ..AppConfig::default()
    };

    let source = token_source_from_settings(&env, &config).unwrap();
    assert_eq!(source.name(), "local-minter");

    let details = source
        .fetch(&TokenRequest::from_config(&config))
        .await
        .unwrap();
    assert_eq!(details.server_url, "wss://local.test");
    assert!(details.room_name.starts_with("voice_assistant_room_"));

    let claims = verify_participant_token(
        &details.participant_token,
        "a-long-enough-development-secret",
        Some("devkey"),
    )
    .unwrap();
    assert_eq!(claims.video.room, details.room_name);
    assert!(claims.room_config.is_some());
}

#[tokio::test]
async fn test_local_minter_reports_missing_url_first() {
    let env = settings(&[("LIVEKIT_API_KEY", "devkey".to_string())]);
    let source = token_source_from_settings(&env, &AppConfig::default()).unwrap();

    let err = source.fetch(&TokenRequest::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.to_string(), "LIVEKIT_URL is not defined");
}
