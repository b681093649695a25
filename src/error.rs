//! Error types shared across the decode pipeline, upload client and transport.
//!
//! The split follows how each failure is handled:
//!
//! - [`DecodeError`] / [`CipherError`] - malformed input for one envelope; logged and dropped
//! - [`UploadError`] - the ingestion service failed; logged and dropped, never retried
//! - [`TransportError`] - the observer feed is gone; fatal, returned to `main`
//! - [`ConfigError`] - invalid settings at startup
use thiserror::Error;

/// Failure while reading the binary packet layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The buffer ended before a fixed-size field could be read.
    #[error("truncated {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// An accepted envelope lacks a string field the decoder needs.
    #[error("envelope field {0} missing or not a string")]
    MissingField(&'static str),

    /// The envelope's `raw` field was not valid hex.
    #[error("invalid hex in raw packet: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Failure inside the channel cipher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("channel secret must be 16, 24 or 32 bytes (got {0})")]
    InvalidKeyLength(usize),

    #[error("ciphertext length {0} is not a multiple of the 16-byte block size")]
    Misaligned(usize),
}

/// Failure talking to the ingestion service.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Loss of the observer feed. Always fatal to the bridge; the hosting
/// process decides whether to restart.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("mqtt connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("mqtt client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("broker refused connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    #[error("broker closed the connection")]
    Disconnected,
}

/// Invalid configuration detected while building runtime settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid channel hash '{0}' (expected two hex digits)")]
    ChannelHash(String),

    #[error("invalid channel secret: {0}")]
    ChannelSecret(String),

    #[error("center position ({lat}, {lon}) is not a valid coordinate")]
    Center { lat: f64, lon: f64 },

    #[error("max_distance_miles must be a positive number (got {0})")]
    Radius(f64),

    #[error("no watched observers configured")]
    NoObservers,

    #[error("unsupported mqtt transport '{0}' (expected tcp, tls, ws or wss)")]
    MqttTransport(String),
}
