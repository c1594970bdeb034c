//! Theme Preference
//!
//! Resolves the color scheme before the first frame and persists the user's
//! choice under the single key `theme-mode` in
//! `$XDG_CONFIG_HOME/voice-agent/preferences.toml`.
//!
//! `System` follows the terminal: `AGENT_COLOR_SCHEME` (`dark`/`light`) wins,
//! otherwise the background index in `COLORFGBG` decides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Preference key in the preferences file
pub const THEME_KEY: &str = "theme-mode";

/// What the user asked for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Always dark
    Dark,
    /// Always light
    Light,
    /// Follow the terminal
    #[default]
    System,
}

impl ThemePreference {
    /// Stored value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
            Self::System => "system",
        }
    }

    /// Next preference in toggle order: dark, light, system
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::System,
            Self::System => Self::Dark,
        }
    }

    /// Class applied for this preference
    #[must_use]
    pub fn resolve(self, system: ThemeClass) -> ThemeClass {
        match self {
            Self::Dark => ThemeClass::Dark,
            Self::Light => ThemeClass::Light,
            Self::System => system,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            "system" => Ok(Self::System),
            other => Err(ConfigError::ValidationError(format!(
                "unknown theme mode '{other}'"
            ))),
        }
    }
}

/// The single class applied to the surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThemeClass {
    /// Dark palette
    #[default]
    Dark,
    /// Light palette
    Light,
}

impl ThemeClass {
    /// Class name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// Terminal color scheme from the environment
pub fn detect_system_scheme<F>(lookup: F) -> ThemeClass
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(forced) = lookup("AGENT_COLOR_SCHEME") {
        match forced.trim().to_ascii_lowercase().as_str() {
            "dark" => return ThemeClass::Dark,
            "light" => return ThemeClass::Light,
            other => tracing::debug!(value = %other, "Ignoring unknown AGENT_COLOR_SCHEME"),
        }
    }

    // "fg;bg" or "fg;default;bg"; bg 7 and 9..=15 are light colors
    let background = lookup("COLORFGBG")
        .and_then(|v| v.rsplit(';').next().and_then(|bg| bg.trim().parse::<u8>().ok()));
    match background {
        Some(7 | 9..=15) => ThemeClass::Light,
        _ => ThemeClass::Dark,
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(rename = "theme-mode", default, skip_serializing_if = "Option::is_none")]
    theme_mode: Option<String>,
}

/// Persistent storage for the theme preference
#[derive(Clone, Debug)]
pub struct ThemeStore {
    path: Option<PathBuf>,
}

impl ThemeStore {
    /// Store at the default location
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Store at a specific file
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Store that never reads or writes
    #[must_use]
    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    /// `$XDG_CONFIG_HOME/voice-agent/preferences.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("voice-agent").join("preferences.toml"))
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the stored preference; `None` when nothing is stored
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// holds an unknown mode.
    pub async fn load(&self) -> Result<Option<ThemePreference>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.clone(),
                    source: e,
                })
            }
        };
        let file: PreferencesFile = toml::from_str(&content)?;
        file.theme_mode
            .as_deref()
            .map(str::parse::<ThemePreference>)
            .transpose()
    }

    /// Persist the preference
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, preference: ThemePreference) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        let content = toml::to_string(&PreferencesFile {
            theme_mode: Some(preference.as_str().to_string()),
        })?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                source: e,
            })
    }
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies and persists the theme
#[derive(Clone, Debug)]
pub struct ThemeController {
    store: ThemeStore,
    preference: ThemePreference,
    system: ThemeClass,
}

impl ThemeController {
    /// Read the stored preference; unreadable storage falls back to `System`
    pub async fn load(store: ThemeStore, system: ThemeClass) -> Self {
        let preference = match store.load().await {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable theme preference");
                ThemePreference::System
            }
        };
        tracing::debug!(%preference, class = system.as_str(), "Theme loaded");
        Self {
            store,
            preference,
            system,
        }
    }

    /// Current preference
    #[must_use]
    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    /// Applied class
    #[must_use]
    pub fn class(&self) -> ThemeClass {
        self.preference.resolve(self.system)
    }

    /// Update the terminal scheme used by `System`
    pub fn set_system(&mut self, system: ThemeClass) {
        self.system = system;
    }

    /// Apply and persist a preference
    ///
    /// The new class applies even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub async fn set_preference(
        &mut self,
        preference: ThemePreference,
    ) -> Result<ThemeClass, ConfigError> {
        self.preference = preference;
        self.store.save(preference).await?;
        Ok(self.class())
    }

    /// Advance to the next preference
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub async fn cycle(&mut self) -> Result<ThemeClass, ConfigError> {
        self.set_preference(self.preference.next()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ============================================================================
    // Resolution
    // ============================================================================

    #[test]
    fn test_preference_resolution() {
        assert_eq!(ThemePreference::Dark.resolve(ThemeClass::Light), ThemeClass::Dark);
        assert_eq!(ThemePreference::Light.resolve(ThemeClass::Dark), ThemeClass::Light);
        assert_eq!(ThemePreference::System.resolve(ThemeClass::Light), ThemeClass::Light);
    }

    #[test]
    fn test_cycle_order() {
        assert_eq!(ThemePreference::Dark.next(), ThemePreference::Light);
        assert_eq!(ThemePreference::Light.next(), ThemePreference::System);
        assert_eq!(ThemePreference::System.next(), ThemePreference::Dark);
    }

    #[test]
    fn test_system_scheme_detection() {
        assert_eq!(detect_system_scheme(env(&[])), ThemeClass::Dark);
        assert_eq!(detect_system_scheme(env(&[("COLORFGBG", "0;15")])), ThemeClass::Light);
        assert_eq!(detect_system_scheme(env(&[("COLORFGBG", "15;0")])), ThemeClass::Dark);
        assert_eq!(
            detect_system_scheme(env(&[("COLORFGBG", "0;default;7")])),
            ThemeClass::Light
        );
        assert_eq!(
            detect_system_scheme(env(&[("COLORFGBG", "0;15"), ("AGENT_COLOR_SCHEME", "dark")])),
            ThemeClass::Dark
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!("sepia".parse::<ThemePreference>().is_err());
        assert_eq!("dark".parse::<ThemePreference>().unwrap(), ThemePreference::Dark);
    }

    // ============================================================================
    // Persistence
    // ============================================================================

    #[tokio::test]
    async fn test_persisted_dark_applies_single_dark_class() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");
        tokio::fs::write(&path, "theme-mode = \"dark\"\n").await.unwrap();

        let theme = ThemeController::load(ThemeStore::at(&path), ThemeClass::Light).await;

        assert_eq!(theme.preference(), ThemePreference::Dark);
        assert_eq!(theme.class(), ThemeClass::Dark);
    }

    #[tokio::test]
    async fn test_missing_preference_follows_system() {
        let dir = TempDir::new().unwrap();
        let store = ThemeStore::at(dir.path().join("absent.toml"));

        let theme = ThemeController::load(store, ThemeClass::Light).await;

        assert_eq!(theme.preference(), ThemePreference::System);
        assert_eq!(theme.class(), ThemeClass::Light);
    }

    #[tokio::test]
    async fn test_corrupt_preference_falls_back_to_system() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");
        tokio::fs::write(&path, "theme-mode = \"sepia\"\n").await.unwrap();

        let theme = ThemeController::load(ThemeStore::at(&path), ThemeClass::Dark).await;
        assert_eq!(theme.preference(), ThemePreference::System);
    }

    #[tokio::test]
    async fn test_cycle_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");
        let mut theme = ThemeController::load(ThemeStore::at(&path), ThemeClass::Dark).await;

        assert_eq!(theme.cycle().await.unwrap(), ThemeClass::Dark);
        assert_eq!(theme.cycle().await.unwrap(), ThemeClass::Light);

        let stored = ThemeStore::at(&path).load().await.unwrap();
        assert_eq!(stored, Some(ThemePreference::Light));

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.trim(), "theme-mode = \"light\"");
    }

    #[tokio::test]
    async fn test_ephemeral_store() {
        let store = ThemeStore::ephemeral();
        store.save(ThemePreference::Dark).await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
