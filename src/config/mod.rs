//! # Configuration Management Module
//!
//! Loads the bridge configuration from TOML once at startup and converts it
//! into the immutable [`BridgeSettings`] the pipeline runs with.
//!
//! ## Configuration Structure
//!
//! - [`GeofenceConfig`] - deployment center and maximum plausible distance
//! - [`ChannelConfig`] - watched channel secret, id and MAC policy
//! - [`ObserverConfig`] - observers whose reports are trusted
//! - [`MqttConfig`] - broker connection for the observer feed
//! - [`ServiceConfig`] - ingestion service base URL and request timeout
//! - [`LoggingConfig`] - log level, optional log file, stats interval
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshcore_wardrive::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let settings = config.bridge_settings()?;
//!     println!("Watching channel {:02x}", settings.channel_hash);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [geofence]
//! center = [47.6062, -122.3321]
//! max_distance_miles = 60.0
//!
//! [channel]
//! secret = "8b3387e9c5cdea6ac9e5edbaa115cd72"
//! # hash = "11"          # optional; derived from the secret when omitted
//! verify_mac = false
//!
//! [observers]
//! watched = ["Capitol Hill Observer"]
//!
//! [mqtt]
//! host = "mqtt.example.net"
//! port = 443
//! transport = "wss"
//! topic = "meshcore/+/packets"
//!
//! [service]
//! base_url = "https://wardrive.example.dev"
//! ```

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::crypto::{self, ChannelCipher};
use crate::error::ConfigError;
use crate::geo::{self, Geofence};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub geofence: GeofenceConfig,
    pub channel: ChannelConfig,
    pub observers: ObserverConfig,
    pub mqtt: MqttConfig,
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// `[lat, lon]` in degrees.
    pub center: [f64; 2],
    pub max_distance_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel secret as hex (16, 24 or 32 bytes).
    pub secret: String,
    /// Channel id as two hex digits. Derived from the secret when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Check the 2-byte MAC before decrypting. Off by default; the feed
    /// has historically been consumed without verification.
    #[serde(default)]
    pub verify_mac: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Observer names (the envelope `origin` field) to accept reports from.
    pub watched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// One of "tcp", "tls", "ws", "wss".
    #[serde(default = "default_transport")]
    pub transport: String,
    /// Request path for websocket transports.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
}

fn default_transport() -> String {
    "wss".to_string()
}

fn default_ws_path() -> String {
    "/mqtt".to_string()
}

fn default_client_id() -> String {
    "wardrive_bot".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
    /// Interval for periodic counter summaries (0 disables).
    #[serde(default)]
    pub stats_interval_seconds: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            stats_interval_seconds: 0,
        }
    }
}

/// Validated, immutable settings the pipeline runs with.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub geofence: Geofence,
    pub channel_hash: u8,
    pub cipher: ChannelCipher,
    pub verify_mac: bool,
    pub watched_observers: HashSet<String>,
}

/// Parse a one-byte id written as two hex digits.
pub fn parse_channel_hash(s: &str) -> Result<u8, ConfigError> {
    let s = s.trim();
    if s.len() != 2 {
        return Err(ConfigError::ChannelHash(s.to_string()));
    }
    u8::from_str_radix(s, 16).map_err(|_| ConfigError::ChannelHash(s.to_string()))
}

impl ChannelConfig {
    pub fn secret_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        hex::decode(self.secret.trim()).map_err(|e| ConfigError::ChannelSecret(e.to_string()))
    }

    /// Configured channel id, or the one derived from the secret.
    pub fn channel_hash(&self, secret: &[u8]) -> Result<u8, ConfigError> {
        match &self.hash {
            Some(hash) => parse_channel_hash(hash),
            None => Ok(crypto::channel_hash(secret)),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Validate the file form and build runtime settings.
    pub fn bridge_settings(&self) -> Result<BridgeSettings, ConfigError> {
        let [lat, lon] = self.geofence.center;
        if !geo::is_valid_coordinate(lat, lon) {
            return Err(ConfigError::Center { lat, lon });
        }
        let radius = self.geofence.max_distance_miles;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::Radius(radius));
        }

        let secret = self.channel.secret_bytes()?;
        let cipher =
            ChannelCipher::new(&secret).map_err(|e| ConfigError::ChannelSecret(e.to_string()))?;
        let channel_hash = self.channel.channel_hash(&secret)?;

        let watched_observers: HashSet<String> = self
            .observers
            .watched
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if watched_observers.is_empty() {
            return Err(ConfigError::NoObservers);
        }

        Ok(BridgeSettings {
            geofence: Geofence::new((lat, lon), radius),
            channel_hash,
            cipher,
            verify_mac: self.channel.verify_mac,
            watched_observers,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            geofence: GeofenceConfig {
                center: [47.6062, -122.3321],
                max_distance_miles: 60.0,
            },
            channel: ChannelConfig {
                // MeshCore's well-known "Public" channel
                secret: "8b3387e9c5cdea6ac9e5edbaa115cd72".to_string(),
                hash: None,
                verify_mac: false,
            },
            observers: ObserverConfig {
                watched: vec!["Your Observer".to_string()],
            },
            mqtt: MqttConfig {
                host: "mqtt.example.net".to_string(),
                port: 443,
                transport: default_transport(),
                ws_path: default_ws_path(),
                username: String::new(),
                password: String::new(),
                topic: "meshcore/packets".to_string(),
                client_id: default_client_id(),
                keep_alive_seconds: default_keep_alive(),
            },
            service: ServiceConfig {
                base_url: "https://wardrive.example.dev".to_string(),
                timeout_seconds: default_timeout(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("wardrive.log".to_string()),
                stats_interval_seconds: 300,
            },
        }
    }
}
