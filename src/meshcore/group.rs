//! Group (channel) message payloads.
//!
//! ```text
//! channel hash (1) | MAC (2) | ciphertext (rest, AES blocks)
//! ```
//!
//! Decrypted plaintext is `timestamp (4) | flags (1) | "sender: text"` padded
//! with NULs to the block size.

use super::decode_text;
use super::reader::PacketReader;
use crate::error::DecodeError;

/// Offset of the message text inside decrypted plaintext.
pub const PLAINTEXT_TEXT_OFFSET: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    pub channel_hash: u8,
    pub mac: [u8; 2],
    pub ciphertext: Vec<u8>,
}

impl GroupMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(payload);
        let channel_hash = r.read_u8("channel hash")?;
        let mac = r.read_array::<2>("mac")?;
        let ciphertext = r.rest().to_vec();
        Ok(GroupMessage {
            channel_hash,
            mac,
            ciphertext,
        })
    }

    /// Ciphertext is whole AES blocks.
    pub fn is_block_aligned(&self) -> bool {
        self.ciphertext.len() % 16 == 0
    }
}

/// Message text from decrypted plaintext, or `None` when the plaintext is
/// too short to carry the timestamp and flags.
pub fn plaintext_text(plaintext: &[u8]) -> Option<String> {
    if plaintext.len() <= 4 {
        return None;
    }
    let text = plaintext.get(PLAINTEXT_TEXT_OFFSET..).unwrap_or(&[]);
    Some(decode_text(text))
}
