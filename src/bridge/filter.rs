//! Envelope gate applied before any decoding.
//!
//! An envelope is processed only when its hash is new, it comes from a
//! trusted observer and it carries one of the two packet types we handle.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::dedup::SeenCache;

/// Envelope `packet_type` for adverts.
pub const ENVELOPE_TYPE_ADVERT: &str = "4";
/// Envelope `packet_type` for group messages.
pub const ENVELOPE_TYPE_GROUP_MESSAGE: &str = "5";

/// One packet report from an observer, as published on the feed.
///
/// Every field is optional and anything other than a JSON string reads as
/// absent, so a malformed field only matters once the envelope has passed
/// the gate and the field is actually needed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "string_or_none")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub origin_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub packet_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub raw: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Advert,
    GroupMessage,
}

impl EnvelopeKind {
    pub fn from_packet_type(packet_type: &str) -> Option<Self> {
        match packet_type {
            ENVELOPE_TYPE_ADVERT => Some(EnvelopeKind::Advert),
            ENVELOPE_TYPE_GROUP_MESSAGE => Some(EnvelopeKind::GroupMessage),
            _ => None,
        }
    }
}

/// Why an envelope was filtered out. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingHash,
    Duplicate,
    UntrustedOrigin(Option<String>),
    UnrecognizedType(Option<String>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingHash => write!(f, "missing hash"),
            Rejection::Duplicate => write!(f, "already seen"),
            Rejection::UntrustedOrigin(origin) => write!(f, "untrusted origin {:?}", origin),
            Rejection::UnrecognizedType(t) => write!(f, "unhandled packet type {:?}", t),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvelopeFilter {
    watched: HashSet<String>,
}

impl EnvelopeFilter {
    pub fn new(watched: HashSet<String>) -> Self {
        Self { watched }
    }

    /// Checks run in order: hash, origin, type.
    pub fn check(&self, envelope: &Envelope, seen: &SeenCache) -> Result<EnvelopeKind, Rejection> {
        let hash = envelope.hash.as_deref().ok_or(Rejection::MissingHash)?;
        if seen.contains(hash) {
            return Err(Rejection::Duplicate);
        }

        match envelope.origin.as_deref() {
            Some(origin) if self.watched.contains(origin) => {}
            other => return Err(Rejection::UntrustedOrigin(other.map(str::to_string))),
        }

        envelope
            .packet_type
            .as_deref()
            .and_then(EnvelopeKind::from_packet_type)
            .ok_or_else(|| Rejection::UnrecognizedType(envelope.packet_type.clone()))
    }
}
