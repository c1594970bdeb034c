//! Application Configuration
//!
//! Loads the [`AppConfig`] the surface renders from, once, at startup.
//!
//! # Configuration Priority
//!
//! Layers are applied in this order, each overriding the previous:
//! 1. Compiled-in defaults ([`AppConfig::default`])
//! 2. TOML file at `$XDG_CONFIG_HOME/voice-agent/app.toml` (or `AGENT_CONFIG_FILE`)
//! 3. Remote config endpoint (`AGENT_CONFIG_ENDPOINT`), one attempt
//! 4. Environment variables (`AGENT_NAME`, `AGENT_SANDBOX_ID`)
//! 5. CLI overrides
//!
//! A layer that cannot be read is logged and skipped; loading never fails.
//!
//! # Example Configuration
//!
//! ```toml
//! company_name = "Acme"
//! page_title = "Acme Voice Agent"
//! start_button_text = "Talk to Acme"
//! supports_video_input = false
//! accent = "#ff6a00"
//! agent_name = "acme-support"
//! ```
//!
//! # Remote Format
//!
//! The remote endpoint answers with typed entries keyed by the camelCase
//! field name. An entry only applies when its declared type matches the field:
//!
//! ```json
//! { "companyName": { "type": "string", "value": "Acme" },
//!   "supportsChatInput": { "type": "boolean", "value": false } }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration or preferences
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Remote config request failed
    #[error("Remote config request failed: {0}")]
    RemoteError(#[from] reqwest::Error),

    /// Remote config endpoint returned a non-2xx status
    #[error("Remote config returned status {0}")]
    RemoteStatus(u16),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// The highest-priority layer that contributed to the loaded config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line override
    Cli,
    /// Environment variable
    Env,
    /// Remote config endpoint
    Remote,
    /// TOML configuration file
    File,
    /// Compiled-in default
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::Remote => write!(f, "remote endpoint"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Branding and feature flags for the front-end
///
/// Immutable once loaded; shared as `Arc<AppConfig>` and replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Company shown in the header
    pub company_name: String,
    /// Terminal title
    pub page_title: String,
    /// Subtitle shown under the header
    pub page_description: String,
    /// Label of the start control
    pub start_button_text: String,
    /// Whether the chat input is offered
    pub supports_chat_input: bool,
    /// Whether camera and screen share are offered
    pub supports_video_input: bool,
    /// Whether the microphone buffers audio before the room connects
    pub is_pre_connect_buffer_enabled: bool,
    /// Accent color for the light theme (hex)
    pub accent: String,
    /// Accent color for the dark theme (hex)
    pub accent_dark: String,
    /// Agent to dispatch into the room
    pub agent_name: Option<String>,
    /// Sandbox id sent to the token and config endpoints
    pub sandbox_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company_name: "LiveKit".to_string(),
            page_title: "LiveKit Voice Agent".to_string(),
            page_description: "A voice agent built with LiveKit".to_string(),
            start_button_text: "Start call".to_string(),
            supports_chat_input: true,
            supports_video_input: true,
            is_pre_connect_buffer_enabled: true,
            accent: "#002cf2".to_string(),
            accent_dark: "#1fd5f9".to_string(),
            agent_name: None,
            sandbox_id: None,
        }
    }
}

/// Expected JSON type of a remote entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryType {
    String,
    Boolean,
}

impl EntryType {
    fn tag(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

impl AppConfig {
    fn entry_type(key: &str) -> Option<EntryType> {
        match key {
            "companyName" | "pageTitle" | "pageDescription" | "startButtonText" | "accent"
            | "accentDark" | "agentName" | "sandboxId" => Some(EntryType::String),
            "supportsChatInput" | "supportsVideoInput" | "isPreConnectBufferEnabled" => {
                Some(EntryType::Boolean)
            }
            _ => None,
        }
    }

    fn set_string(&mut self, key: &str, value: String) {
        match key {
            "companyName" => self.company_name = value,
            "pageTitle" => self.page_title = value,
            "pageDescription" => self.page_description = value,
            "startButtonText" => self.start_button_text = value,
            "accent" => self.accent = value,
            "accentDark" => self.accent_dark = value,
            "agentName" => self.agent_name = Some(value),
            "sandboxId" => self.sandbox_id = Some(value),
            _ => {}
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        match key {
            "supportsChatInput" => self.supports_chat_input = value,
            "supportsVideoInput" => self.supports_video_input = value,
            "isPreConnectBufferEnabled" => self.is_pre_connect_buffer_enabled = value,
            _ => {}
        }
    }

    /// Merge typed remote entries; returns how many were applied
    ///
    /// Unknown keys, `null` entries and entries whose declared type or value
    /// does not match the field are ignored.
    pub fn apply_remote_entries(&mut self, entries: &Map<String, Value>) -> usize {
        let mut applied = 0;
        for (key, entry) in entries {
            let Some(expected) = Self::entry_type(key) else {
                continue;
            };
            let Some(entry) = entry.as_object() else {
                continue;
            };
            if entry.get("type").and_then(Value::as_str) != Some(expected.tag()) {
                continue;
            }
            match (expected, entry.get("value")) {
                (EntryType::String, Some(Value::String(s))) => {
                    self.set_string(key, s.clone());
                    applied += 1;
                }
                (EntryType::Boolean, Some(Value::Bool(b))) => {
                    self.set_bool(key, *b);
                    applied += 1;
                }
                _ => {}
            }
        }
        applied
    }
}

// =============================================================================
// TOML File Layer
// =============================================================================

/// On-disk configuration; every field optional
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfigToml {
    /// Company shown in the header
    pub company_name: Option<String>,
    /// Terminal title
    pub page_title: Option<String>,
    /// Subtitle shown under the header
    pub page_description: Option<String>,
    /// Label of the start control
    pub start_button_text: Option<String>,
    /// Whether the chat input is offered
    pub supports_chat_input: Option<bool>,
    /// Whether camera and screen share are offered
    pub supports_video_input: Option<bool>,
    /// Whether the microphone buffers audio before the room connects
    pub is_pre_connect_buffer_enabled: Option<bool>,
    /// Light theme accent
    pub accent: Option<String>,
    /// Dark theme accent
    pub accent_dark: Option<String>,
    /// Agent to dispatch
    pub agent_name: Option<String>,
    /// Sandbox id
    pub sandbox_id: Option<String>,
}

impl AppConfigToml {
    /// Apply every present field
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = &self.company_name {
            config.company_name.clone_from(v);
        }
        if let Some(v) = &self.page_title {
            config.page_title.clone_from(v);
        }
        if let Some(v) = &self.page_description {
            config.page_description.clone_from(v);
        }
        if let Some(v) = &self.start_button_text {
            config.start_button_text.clone_from(v);
        }
        if let Some(v) = self.supports_chat_input {
            config.supports_chat_input = v;
        }
        if let Some(v) = self.supports_video_input {
            config.supports_video_input = v;
        }
        if let Some(v) = self.is_pre_connect_buffer_enabled {
            config.is_pre_connect_buffer_enabled = v;
        }
        if let Some(v) = &self.accent {
            config.accent.clone_from(v);
        }
        if let Some(v) = &self.accent_dark {
            config.accent_dark.clone_from(v);
        }
        if self.agent_name.is_some() {
            config.agent_name.clone_from(&self.agent_name);
        }
        if self.sandbox_id.is_some() {
            config.sandbox_id.clone_from(&self.sandbox_id);
        }
    }
}

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/voice-agent/app.toml` or
/// `~/.config/voice-agent/app.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("voice-agent").join("app.toml"))
}

/// Read and parse a TOML config file
///
/// A missing file is `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn read_config_file(path: &Path) -> Result<Option<AppConfigToml>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    Ok(Some(toml::from_str(&content)?))
}

// =============================================================================
// Environment
// =============================================================================

/// Environment values the front-end reads
///
/// Empty values count as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSettings {
    /// `AGENT_CONFIG_ENDPOINT`
    pub config_endpoint: Option<String>,
    /// `AGENT_SANDBOX_ID`
    pub sandbox_id: Option<String>,
    /// `AGENT_CONN_DETAILS_ENDPOINT`
    pub conn_details_endpoint: Option<String>,
    /// `LIVEKIT_API_KEY`
    pub api_key: Option<String>,
    /// `LIVEKIT_API_SECRET`
    pub api_secret: Option<String>,
    /// `LIVEKIT_URL`
    pub livekit_url: Option<String>,
    /// `AGENT_NAME`
    pub agent_name: Option<String>,
    /// `AGENT_CONFIG_FILE`
    pub config_file: Option<PathBuf>,
}

impl EnvSettings {
    /// Read from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            config_endpoint: get("AGENT_CONFIG_ENDPOINT"),
            sandbox_id: get("AGENT_SANDBOX_ID"),
            conn_details_endpoint: get("AGENT_CONN_DETAILS_ENDPOINT"),
            api_key: get("LIVEKIT_API_KEY"),
            api_secret: get("LIVEKIT_API_SECRET"),
            livekit_url: get("LIVEKIT_URL"),
            agent_name: get("AGENT_NAME"),
            config_file: get("AGENT_CONFIG_FILE").map(PathBuf::from),
        }
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Agent name override
    pub agent_name: Option<String>,
    /// Sandbox id override
    pub sandbox_id: Option<String>,
}

impl ConfigOverrides {
    /// Create an empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set agent name override
    #[must_use]
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    /// Set sandbox id override
    #[must_use]
    pub fn with_sandbox_id(mut self, id: impl Into<String>) -> Self {
        self.sandbox_id = Some(id.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.agent_name.is_none() && self.sandbox_id.is_none()
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Result of [`ConfigLoader::load`]
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// The merged configuration
    pub config: Arc<AppConfig>,
    /// Highest layer that contributed
    pub source: ConfigSource,
    /// File that was read, if any
    pub file_path: Option<PathBuf>,
}

/// Layered configuration loader
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    settings: EnvSettings,
    file_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    http: reqwest::Client,
}

impl ConfigLoader {
    /// Loader reading the file named by `AGENT_CONFIG_FILE` or the default path
    #[must_use]
    pub fn new(settings: EnvSettings) -> Self {
        let file_path = settings.config_file.clone().or_else(default_config_path);
        Self {
            settings,
            file_path,
            overrides: ConfigOverrides::default(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a specific config file, or none
    #[must_use]
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file_path = path;
        self
    }

    /// Apply CLI overrides last
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load every layer; failures fall back to the previous layer
    pub async fn load(&self) -> LoadedConfig {
        let mut config = AppConfig::default();
        let mut source = ConfigSource::Default;
        let mut file_path = None;

        if let Some(path) = &self.file_path {
            match read_config_file(path).await {
                Ok(Some(toml)) => {
                    toml.apply(&mut config);
                    source = ConfigSource::File;
                    file_path = Some(path.clone());
                    tracing::info!(path = %path.display(), "Loaded configuration from file");
                }
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "Config file not found, using defaults");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                }
            }
        }

        if let Some(endpoint) = &self.settings.config_endpoint {
            match self.fetch_remote(endpoint).await {
                Ok(entries) => {
                    let applied = config.apply_remote_entries(&entries);
                    if applied > 0 {
                        source = ConfigSource::Remote;
                    }
                    tracing::info!(endpoint = %endpoint, applied, "Applied remote configuration");
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Remote configuration unavailable");
                }
            }
        }

        if let Some(name) = &self.settings.agent_name {
            config.agent_name = Some(name.clone());
            source = ConfigSource::Env;
        }
        if let Some(id) = &self.settings.sandbox_id {
            config.sandbox_id = Some(id.clone());
            source = ConfigSource::Env;
        }

        if !self.overrides.is_empty() {
            if self.overrides.agent_name.is_some() {
                config.agent_name.clone_from(&self.overrides.agent_name);
            }
            if self.overrides.sandbox_id.is_some() {
                config.sandbox_id.clone_from(&self.overrides.sandbox_id);
            }
            source = ConfigSource::Cli;
        }

        tracing::debug!(%source, "Configuration loaded");
        LoadedConfig {
            config: Arc::new(config),
            source,
            file_path,
        }
    }

    /// One GET against the remote config endpoint
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a body that
    /// is not a JSON object.
    pub async fn fetch_remote(&self, endpoint: &str) -> Result<Map<String, Value>, ConfigError> {
        let response = self
            .http
            .get(endpoint)
            .header(
                "X-Sandbox-ID",
                self.settings.sandbox_id.as_deref().unwrap_or_default(),
            )
            .timeout(REMOTE_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConfigError::RemoteStatus(response.status().as_u16()));
        }

        match response.json::<Value>().await? {
            Value::Object(entries) => Ok(entries),
            other => Err(ConfigError::ValidationError(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}
