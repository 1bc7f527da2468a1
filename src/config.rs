//! Laufzeit-Konfiguration
//!
//! Standardwerte, überschreibbar per JSON-Dokument oder Umgebungsvariablen:
//!
//! | Variable | Format |
//! |---|---|
//! | `CALL_ICE_SERVERS` | kommagetrennte URLs |
//! | `CALL_STATS_INTERVAL_SECS` | Sekunden |
//! | `CALL_AUDIO_PREFERENCE` | kommagetrennt: `bluetooth`, `wired`, `earpiece`, `speaker` |
//! | `CALL_NEGOTIATION_ATTEMPTS` | Anzahl Versuche |

use crate::audio::AudioDeviceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Standard STUN Server
pub const DEFAULT_STUN_URLS: [&str; 3] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
];

pub const ENV_ICE_SERVERS: &str = "CALL_ICE_SERVERS";
pub const ENV_STATS_INTERVAL: &str = "CALL_STATS_INTERVAL_SECS";
pub const ENV_AUDIO_PREFERENCE: &str = "CALL_AUDIO_PREFERENCE";
pub const ENV_NEGOTIATION_ATTEMPTS: &str = "CALL_NEGOTIATION_ATTEMPTS";

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// CONFIG TYPES
// ============================================================================

/// Ein STUN- oder TURN-Server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub stats_interval_secs: u64,
    /// Leer bedeutet Standardreihenfolge
    pub audio_preference: Vec<AudioDeviceKind>,
    pub negotiation_attempts: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: DEFAULT_STUN_URLS.iter().map(|url| url.to_string()).collect(),
                username: None,
                credential: None,
            }],
            stats_interval_secs: 10,
            audio_preference: Vec::new(),
            negotiation_attempts: 3,
        }
    }
}

impl CallConfig {
    /// Standardwerte mit Überschreibungen aus der Umgebung
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parst ein JSON-Dokument; fehlende Felder behalten ihren Standardwert
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats_interval_secs == 0 {
            return Err(ConfigError::invalid("stats_interval_secs", "must be positive"));
        }
        if self.negotiation_attempts == 0 {
            return Err(ConfigError::invalid("negotiation_attempts", "must be at least 1"));
        }
        Ok(())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ICE_SERVERS) {
            config.ice_servers = split_list(&value).map(IceServerConfig::stun).collect();
        }

        if let Some(value) = lookup(ENV_STATS_INTERVAL) {
            config.stats_interval_secs = value
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_STATS_INTERVAL, format!("{}", e)))?;
        }

        if let Some(value) = lookup(ENV_AUDIO_PREFERENCE) {
            config.audio_preference = split_list(&value)
                .map(|kind| kind.parse::<AudioDeviceKind>())
                .collect::<Result<_, _>>()
                .map_err(|e| ConfigError::invalid(ENV_AUDIO_PREFERENCE, e))?;
        }

        if let Some(value) = lookup(ENV_NEGOTIATION_ATTEMPTS) {
            config.negotiation_attempts = value
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_NEGOTIATION_ATTEMPTS, format!("{}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
