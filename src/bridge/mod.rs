//! # Observer-to-Service Bridge
//!
//! [`Bridge`] takes one observer envelope at a time and runs it through the
//! whole pipeline before looking at the next:
//!
//! ```text
//! envelope ──► filter (hash / origin / type) ──► decode packet ──► append observer hop
//!                                                     │
//!                 ┌───────────────────────────────────┴──────────────────┐
//!              advert                                            group message
//!      repeater? ─► geofence                 aligned? ─► our channel? ─► decrypt ─► coordinates
//!                      │                                                        ─► attribute hop ─► geofence
//!                      └──────────────────────► upload ◄─────────────────────────────────┘
//! ```
//!
//! The hash of every envelope that made it through decoding is remembered in
//! the [`SeenCache`], whether or not it produced an upload. Envelopes that fail
//! to decode are logged and not remembered.

pub mod dedup;
pub mod filter;

use log::{debug, info, trace, warn};

use crate::config::BridgeSettings;
use crate::coords;
use crate::error::DecodeError;
use crate::geo::GeofenceRejection;
use crate::logutil::{escape_log, escape_payload, hex_preview};
use crate::meshcore::advert::{parse_advert, ParsedAdvert};
use crate::meshcore::group::{plaintext_text, GroupMessage};
use crate::meshcore::{Packet, PAYLOAD_TYPE_ADVERT, PAYLOAD_TYPE_GROUP_TEXT};
use crate::metrics;
use crate::service::{UploadRecord, Uploader};

pub use dedup::SeenCache;
pub use filter::{Envelope, EnvelopeFilter, EnvelopeKind, Rejection};

/// Why a decoded envelope produced no upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Discard {
    /// Advert from a node that is not a repeater (node type code).
    NotRepeater(u8),
    /// Ciphertext length not a multiple of the block size.
    MisalignedCiphertext(usize),
    /// Group message for a channel we do not watch.
    OtherChannel(u8),
    /// MAC check failed (only when verification is enabled).
    MacMismatch,
    /// Decrypted plaintext too short to carry text.
    IncompletePlaintext(usize),
    NoCoordinates,
    /// No hop left to attribute the sample to.
    NoHop,
    Geofence(GeofenceRejection),
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Rejected(Rejection),
    Malformed(String),
    Discarded(Discard),
    Uploaded(UploadRecord),
    UploadFailed(UploadRecord),
}

enum Outcome {
    Emit(UploadRecord),
    Discard(Discard),
}

pub struct Bridge<U> {
    settings: BridgeSettings,
    filter: EnvelopeFilter,
    seen: SeenCache,
    uploader: U,
}

impl<U: Uploader> Bridge<U> {
    pub fn new(settings: BridgeSettings, uploader: U) -> Self {
        Self::with_cache(settings, uploader, SeenCache::default())
    }

    pub fn with_cache(settings: BridgeSettings, uploader: U, seen: SeenCache) -> Self {
        let filter = EnvelopeFilter::new(settings.watched_observers.clone());
        Self {
            settings,
            filter,
            seen,
            uploader,
        }
    }

    pub fn seen(&self) -> &SeenCache {
        &self.seen
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Handle one raw transport message. Never fails: every problem is
    /// logged and reported through the returned [`Disposition`].
    pub async fn handle_payload(&mut self, payload: &[u8]) -> Disposition {
        metrics::inc_received();
        let envelope: Envelope = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Invalid envelope: {}", e);
                warn!(">> {}", escape_payload(payload));
                metrics::inc_malformed();
                return Disposition::Malformed(e.to_string());
            }
        };

        match self.handle_envelope(&envelope).await {
            Ok(disposition) => {
                match &disposition {
                    Disposition::Rejected(_) => metrics::inc_rejected(),
                    Disposition::Discarded(_) => metrics::inc_discarded(),
                    Disposition::Uploaded(UploadRecord::Repeater(_)) => metrics::inc_repeater_uploaded(),
                    Disposition::Uploaded(UploadRecord::Sample(_)) => metrics::inc_sample_uploaded(),
                    Disposition::UploadFailed(_) => metrics::inc_upload_failed(),
                    Disposition::Malformed(_) => metrics::inc_malformed(),
                }
                disposition
            }
            Err(e) => {
                warn!("Error handling envelope: {}", e);
                warn!(">> {}", escape_payload(payload));
                metrics::inc_malformed();
                Disposition::Malformed(e.to_string())
            }
        }
    }

    /// Run an already-parsed envelope through the pipeline.
    pub async fn handle_envelope(&mut self, envelope: &Envelope) -> Result<Disposition, DecodeError> {
        let kind = match self.filter.check(envelope, &self.seen) {
            Ok(kind) => kind,
            Err(rejection) => {
                trace!("Skipping envelope {:?}: {}", envelope.hash, rejection);
                return Ok(Disposition::Rejected(rejection));
            }
        };
        // the filter guarantees a hash
        let hash = envelope.hash.clone().unwrap_or_default();

        let raw = envelope.raw.as_deref().ok_or(DecodeError::MissingField("raw"))?;
        let origin_id = envelope
            .origin_id
            .as_deref()
            .ok_or(DecodeError::MissingField("origin_id"))?;
        let mut packet = Packet::from_hex(raw)?;
        packet.append_hop(origin_id);
        debug!(
            "Decoded {}: route={} path={:?} payload={}",
            hash,
            packet.route_type,
            packet.path,
            hex_preview(&packet.payload, 16)
        );

        let expected = match kind {
            EnvelopeKind::Advert => PAYLOAD_TYPE_ADVERT,
            EnvelopeKind::GroupMessage => PAYLOAD_TYPE_GROUP_TEXT,
        };
        if packet.payload_type != expected {
            debug!(
                "Envelope {} labelled {:?} but header says payload type {}",
                hash, kind, packet.payload_type
            );
        }

        let outcome = match kind {
            EnvelopeKind::Advert => self.handle_advert(&packet)?,
            EnvelopeKind::GroupMessage => self.handle_group_message(&packet)?,
        };

        let disposition = match outcome {
            Outcome::Emit(record) => self.forward(record).await,
            Outcome::Discard(reason) => {
                debug!("Discarded {} ({:?}): {:?}", hash, kind, reason);
                Disposition::Discarded(reason)
            }
        };

        self.seen.remember(&hash);
        Ok(disposition)
    }

    async fn forward(&self, record: UploadRecord) -> Disposition {
        let body = record.to_json();
        match self.uploader.upload(&record).await {
            Ok(()) => {
                info!("Sent {} {}", record.endpoint(), body);
                Disposition::Uploaded(record)
            }
            Err(e) => {
                warn!("POST {} {} failed: {}", record.endpoint(), body, e);
                Disposition::UploadFailed(record)
            }
        }
    }

    fn check_location(&self, lat: f64, lon: f64) -> Result<(), Discard> {
        match self.settings.geofence.check(lat, lon) {
            Ok(_) => Ok(()),
            Err(rejection) => {
                info!("Rejected position ({}, {}): {}", lat, lon, rejection);
                Err(Discard::Geofence(rejection))
            }
        }
    }

    fn handle_advert(&self, packet: &Packet) -> Result<Outcome, DecodeError> {
        let advert = match parse_advert(&packet.payload)? {
            ParsedAdvert::Repeater(advert) => advert,
            ParsedAdvert::Ignored(header) => {
                return Ok(Outcome::Discard(Discard::NotRepeater(header.node_type().code())));
            }
        };

        let (lat, lon) = advert.lat_lon();
        if let Err(reason) = self.check_location(lat, lon) {
            return Ok(Outcome::Discard(reason));
        }
        Ok(Outcome::Emit(UploadRecord::repeater(
            advert.id(),
            advert.name_or_empty().to_string(),
            lat,
            lon,
        )))
    }

    fn handle_group_message(&self, packet: &Packet) -> Result<Outcome, DecodeError> {
        let message = GroupMessage::parse(&packet.payload)?;
        Ok(match self.sample_from_group_message(packet, &message) {
            Ok(record) => Outcome::Emit(record),
            Err(reason) => Outcome::Discard(reason),
        })
    }

    fn sample_from_group_message(
        &self,
        packet: &Packet,
        message: &GroupMessage,
    ) -> Result<UploadRecord, Discard> {
        if !message.is_block_aligned() {
            return Err(Discard::MisalignedCiphertext(message.ciphertext.len()));
        }
        if message.channel_hash != self.settings.channel_hash {
            return Err(Discard::OtherChannel(message.channel_hash));
        }

        // The MAC is read but only checked when explicitly enabled.
        let cipher = &self.settings.cipher;
        if self.settings.verify_mac && !cipher.verify_mac(message.mac, &message.ciphertext) {
            return Err(Discard::MacMismatch);
        }

        let plaintext = cipher
            .decrypt(&message.ciphertext)
            .map_err(|_| Discard::MisalignedCiphertext(message.ciphertext.len()))?;
        let text = plaintext_text(&plaintext)
            .ok_or(Discard::IncompletePlaintext(plaintext.len()))?
            .to_lowercase();
        trace!("Channel text: {}", escape_log(&text));

        let found = coords::extract(&text).ok_or(Discard::NoCoordinates)?;

        let mut first_hop = packet.first_hop();
        if let Some(ignored) = found.ignored.as_deref() {
            if first_hop == Some(ignored) {
                first_hop = packet.hop(1);
                info!("Ignoring first hop {}, using {:?}", ignored, first_hop);
            }
        }

        self.check_location(found.lat, found.lon)?;
        let hop = first_hop.filter(|h| !h.is_empty()).ok_or(Discard::NoHop)?;
        Ok(UploadRecord::sample(found.lat, found.lon, hop.to_string()))
    }
}
