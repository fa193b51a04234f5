//! Configuration loading for Keepsake.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the Keepsake home directory (~/.keepsake, or $KEEPSAKE_HOME).
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("KEEPSAKE_HOME") {
        return Ok(PathBuf::from(home));
    }
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    Ok(home.home_dir().join(".keepsake"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Which backend pair the application wires up.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite documents plus filesystem blobs under the data directory.
    Local,
    /// Hosted document collection and blob bucket over HTTP.
    Remote,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Local
    }
}

/// Remote backend configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "memories".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            collection: default_collection(),
        }
    }
}

/// Web server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7151
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Keepsake settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,

    /// Data directory for the local backend; defaults under the home dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub web: WebConfig,
}

impl Settings {
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_home_dir()?.join("data")),
        }
    }
}

/// Load settings from ~/.keepsake/settings.json. A missing file is not an
/// error; the defaults work without a setup step.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.backend == Backend::Remote && settings.remote.base_url.is_none() {
        return Err(Error::Config(
            "backend is 'remote' but remote.base_url is not set".to_string(),
        ));
    }
    Ok(())
}

/// Load settings or return defaults on any failure.
pub fn load_settings_or_default() -> Settings {
    load_settings().unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
        Settings::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend, Backend::Local);
        assert_eq!(settings.remote.collection, "memories");
        assert_eq!(settings.web.port, 7151);
    }

    #[test]
    fn test_remote_requires_base_url() {
        let settings: Settings = serde_json::from_str(r#"{"backend": "remote"}"#).unwrap();
        assert!(validate_settings(&settings).is_err());

        let settings: Settings = serde_json::from_str(
            r#"{"backend": "remote", "remote": {"base_url": "https://api.example.com"}}"#,
        )
        .unwrap();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"web": {"port": 9000}}"#).unwrap();
        assert_eq!(settings.web.port, 9000);
        assert_eq!(settings.web.host, "127.0.0.1");
        assert_eq!(settings.backend, Backend::Local);
    }
}
