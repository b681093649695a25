//! Test utilities & fixtures.
//! Builders for observer envelopes and raw MeshCore packets, plus an uploader
//! that records instead of posting.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Mutex;

use async_trait::async_trait;
use meshcore_wardrive::bridge::Bridge;
use meshcore_wardrive::config::{BridgeSettings, Config};
use meshcore_wardrive::error::UploadError;
use meshcore_wardrive::service::{UploadRecord, Uploader};

pub const TRUSTED: &str = "trusted-observer";
pub const OBSERVER_ID: &str = "C4FFEE0011223344";
pub const CENTER: (f64, f64) = (37.0, -122.0);

pub fn config() -> Config {
    let mut config = Config::default();
    config.geofence.center = [CENTER.0, CENTER.1];
    config.geofence.max_distance_miles = 100.0;
    config.observers.watched = vec![TRUSTED.to_string()];
    config.logging.file = None;
    config
}

pub fn settings() -> BridgeSettings {
    config().bridge_settings().expect("fixture config is valid")
}

#[derive(Default)]
pub struct RecordingUploader {
    pub records: Mutex<Vec<UploadRecord>>,
    pub fail: bool,
}

impl RecordingUploader {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn recorded(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, record: &UploadRecord) -> Result<(), UploadError> {
        self.records.lock().unwrap().push(record.clone());
        if self.fail {
            return Err(UploadError::Timeout(5));
        }
        Ok(())
    }
}

pub fn bridge() -> Bridge<RecordingUploader> {
    Bridge::new(settings(), RecordingUploader::default())
}

/// Flood-routed packet header for `payload_type`.
pub fn flood_header(payload_type: u8) -> u8 {
    (payload_type << 2) | 0x01
}

pub fn packet(payload_type: u8, path: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut raw = vec![flood_header(payload_type), path.len() as u8];
    raw.extend_from_slice(path);
    raw.extend_from_slice(payload);
    raw
}

/// Advert payload; `flags` low nibble is the node type.
pub fn advert_payload(id: u8, flags: u8, location: Option<(i32, i32)>, name: Option<&str>) -> Vec<u8> {
    let mut out = vec![id];
    out.extend_from_slice(&[0x22; 31]);
    out.extend_from_slice(&1_718_000_000u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 64]);
    out.push(flags);
    if let Some((lat, lon)) = location {
        out.extend_from_slice(&lat.to_le_bytes());
        out.extend_from_slice(&lon.to_le_bytes());
    }
    if let Some(name) = name {
        out.extend_from_slice(name.as_bytes());
    }
    out
}

pub fn repeater_advert_raw(id: u8, lat: i32, lon: i32, name: &str) -> String {
    let payload = advert_payload(id, 0x02 | 0x10 | 0x80, Some((lat, lon)), Some(name));
    hex::encode(packet(4, &[], &payload))
}

/// Group text payload on `channel_hash`, encrypted with the fixture secret.
pub fn group_payload(settings: &BridgeSettings, channel_hash: u8, text: &str) -> Vec<u8> {
    let mut plain = vec![0x10, 0x20, 0x30, 0x40, 0x00];
    plain.extend_from_slice(text.as_bytes());
    let padded = plain.len().div_ceil(16) * 16;
    plain.resize(padded, 0);
    let ciphertext = settings.cipher.encrypt(&plain).unwrap();
    let mac = settings.cipher.mac(&ciphertext);

    let mut payload = vec![channel_hash, mac[0], mac[1]];
    payload.extend_from_slice(&ciphertext);
    payload
}

pub fn group_raw(settings: &BridgeSettings, path: &[u8], text: &str) -> String {
    let payload = group_payload(settings, settings.channel_hash, text);
    hex::encode(packet(5, path, &payload))
}

pub fn envelope(hash: &str, packet_type: &str, raw: &str) -> Vec<u8> {
    envelope_from(hash, TRUSTED, packet_type, raw)
}

pub fn envelope_from(hash: &str, origin: &str, packet_type: &str, raw: &str) -> Vec<u8> {
    serde_json::json!({
        "hash": hash,
        "origin": origin,
        "origin_id": OBSERVER_ID,
        "packet_type": packet_type,
        "raw": raw,
    })
    .to_string()
    .into_bytes()
}
