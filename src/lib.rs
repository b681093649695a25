//! # MeshCore Wardrive Bridge
//!
//! Listens to MeshCore observer reports on MQTT, decodes the radio packets
//! they carry and forwards repeater locations and coverage samples to the
//! wardrive ingestion service.
//!
//! ## Features
//!
//! - **Packet Decoding**: Bounds-checked parsing of the MeshCore envelope, adverts and group messages.
//! - **Channel Decryption**: AES-ECB decryption of a watched channel, with optional MAC verification.
//! - **Coverage Samples**: Coordinates posted in channel text, attributed to the first repeater that relayed them.
//! - **Repeater Discovery**: Repeater adverts with a location inside the geofence.
//! - **Filtering**: Trusted observers only, duplicate suppression via a bounded FIFO of packet hashes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshcore_wardrive::bridge::Bridge;
//! use meshcore_wardrive::config::Config;
//! use meshcore_wardrive::service::ServiceClient;
//! use meshcore_wardrive::transport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let uploader = ServiceClient::new(&config.service);
//!     let mut bridge = Bridge::new(config.bridge_settings()?, uploader);
//!
//!     let options = transport::mqtt_options(&config.mqtt)?;
//!     let fatal = transport::run(options, &config.mqtt.topic, &mut bridge, None).await;
//!     Err(fatal.into())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`meshcore`] - MeshCore packet, advert and group message decoding
//! - [`crypto`] - channel cipher, MAC and channel hash
//! - [`coords`] - coordinate extraction from channel text
//! - [`geo`] - haversine distance and geofence
//! - [`bridge`] - envelope filter, dedup cache and the pipeline itself
//! - [`service`] - ingestion service client
//! - [`transport`] - MQTT observer feed
//! - [`config`] - configuration loading and validation
//! - [`inspect`] - JSON rendering of raw packets for offline diagnosis
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  MQTT Transport │ ← observer envelopes, one at a time
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │     Bridge      │ ← filter, decode, decrypt, geofence
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Service Client  │ ← /put-repeater, /put-sample
//! └─────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod coords;
pub mod crypto;
pub mod error;
pub mod geo;
pub mod inspect;
pub mod logutil;
pub mod meshcore;
pub mod metrics;
pub mod service;
pub mod transport;
