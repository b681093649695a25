//! # MeshCore Packet Decoding
//!
//! Observers on the MeshCore network publish every packet they hear as a hex
//! string. This module turns those bytes back into structure:
//!
//! - [`Packet`] - the outer envelope (route type, payload type, transport codes, hop path, payload)
//! - [`advert::Advert`] - node announcements carrying a public key, flags, location and name
//! - [`group::GroupMessage`] - encrypted broadcasts addressed to a shared-key channel
//!
//! ## Wire Layout
//!
//! ```text
//! +--------+------------------+----------+-----------------+---------+
//! | header | transport codes  | path_len | path            | payload |
//! | 1 byte | 4 bytes (opt.)   | 1 byte   | path_len bytes  | rest    |
//! +--------+------------------+----------+-----------------+---------+
//! header bits 0-1: route type, bits 2-5: payload type
//! ```
//!
//! Transport codes are only present for the two transport route types.
//! All reads are bounds checked; a short buffer is a [`DecodeError`], never a panic.

pub mod advert;
pub mod group;
pub mod reader;

use std::fmt;

use crate::error::DecodeError;
use reader::PacketReader;

/// Route type (header bits 0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    TransportFlood,
    Flood,
    Direct,
    TransportDirect,
}

impl RouteType {
    pub fn from_header(header: u8) -> Self {
        match header & 0x03 {
            0 => RouteType::TransportFlood,
            1 => RouteType::Flood,
            2 => RouteType::Direct,
            _ => RouteType::TransportDirect,
        }
    }

    pub fn has_transport_codes(self) -> bool {
        matches!(self, RouteType::TransportFlood | RouteType::TransportDirect)
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteType::TransportFlood => "TRANSPORT_FLOOD",
            RouteType::Flood => "FLOOD",
            RouteType::Direct => "DIRECT",
            RouteType::TransportDirect => "TRANSPORT_DIRECT",
        };
        f.write_str(label)
    }
}

/// Payload type value for node announcements.
pub const PAYLOAD_TYPE_ADVERT: u8 = 0x04;
/// Payload type value for group (channel) text messages.
pub const PAYLOAD_TYPE_GROUP_TEXT: u8 = 0x05;

/// A decoded outer packet.
///
/// `path` holds one lowercase hex id per hop, in traversal order. `path_len`
/// starts as the byte count read from the wire; see [`Packet::append_hop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub route_type: RouteType,
    pub payload_type: u8,
    pub transport_codes: Option<(u16, u16)>,
    pub path_len: usize,
    pub path: Vec<String>,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Decode a packet from raw bytes.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = PacketReader::new(data);
        let header = r.read_u8("header")?;
        let route_type = RouteType::from_header(header);
        let payload_type = (header >> 2) & 0x0F;

        let transport_codes = if route_type.has_transport_codes() {
            let first = r.read_u16_le("transport code")?;
            let second = r.read_u16_le("transport code")?;
            Some((first, second))
        } else {
            None
        };

        let path_len = r.read_u8("path length")? as usize;
        let path = r
            .read_bytes("path", path_len)?
            .iter()
            .map(|hop| format!("{:02x}", hop))
            .collect();
        let payload = r.rest().to_vec();

        Ok(Packet {
            route_type,
            payload_type,
            transport_codes,
            path_len,
            path,
            payload,
        })
    }

    /// Decode from the hex string observers publish.
    pub fn from_hex(raw: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(raw.trim())?;
        Self::decode(&bytes)
    }

    /// Transport codes, or `(0, 0)` when the route type carries none.
    pub fn transport_codes_or_default(&self) -> (u16, u16) {
        self.transport_codes.unwrap_or((0, 0))
    }

    /// Append the observer that heard this packet as the final hop.
    ///
    /// Observers never appear in the radio path they capture. The recorded
    /// length grows by 2 (one hop rendered as two hex characters), not by 1.
    pub fn append_hop(&mut self, origin_id: &str) {
        let hop: String = origin_id.chars().take(2).collect::<String>().to_lowercase();
        if !hop.is_empty() {
            self.path.push(hop);
        }
        self.path_len += 2;
    }

    /// Hop that relayed this packet first, if any.
    pub fn first_hop(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    pub fn hop(&self, index: usize) -> Option<&str> {
        self.path.get(index).map(String::as_str)
    }
}

/// Decode node-supplied text: invalid UTF-8 sequences are dropped and NUL
/// padding is stripped.
pub fn decode_text(bytes: &[u8]) -> String {
    bytes
        .utf8_chunks()
        .flat_map(|chunk| chunk.valid().chars())
        .filter(|c| *c != '\0')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_drops_invalid_bytes_and_padding() {
        assert_eq!(decode_text(b"Hill\xffTop\0\0\0"), "HillTop");
        assert_eq!(decode_text("caf\u{e9}".as_bytes()), "caf\u{e9}");
        assert_eq!(decode_text(b""), "");
    }

    fn header(route: u8, payload_type: u8) -> u8 {
        (payload_type << 2) | route
    }

    #[test]
    fn decodes_flood_packet_without_transport_codes() {
        let mut raw = vec![header(1, PAYLOAD_TYPE_GROUP_TEXT), 2, 0xab, 0x0c];
        raw.extend_from_slice(b"payload");
        let packet = Packet::decode(&raw).unwrap();
        assert_eq!(packet.route_type, RouteType::Flood);
        assert_eq!(packet.payload_type, PAYLOAD_TYPE_GROUP_TEXT);
        assert_eq!(packet.transport_codes, None);
        assert_eq!(packet.transport_codes_or_default(), (0, 0));
        assert_eq!(packet.path_len, 2);
        assert_eq!(packet.path, vec!["ab".to_string(), "0c".to_string()]);
        assert_eq!(packet.payload, b"payload");
    }

    #[test]
    fn decodes_transport_codes_little_endian() {
        let raw = vec![header(3, PAYLOAD_TYPE_ADVERT), 0x34, 0x12, 0x78, 0x56, 0, 0xff];
        let packet = Packet::decode(&raw).unwrap();
        assert_eq!(packet.route_type, RouteType::TransportDirect);
        assert_eq!(packet.transport_codes, Some((0x1234, 0x5678)));
        assert!(packet.path.is_empty());
        assert_eq!(packet.payload, vec![0xff]);

        let raw = vec![header(0, PAYLOAD_TYPE_ADVERT), 1, 0, 2, 0, 0];
        let packet = Packet::decode(&raw).unwrap();
        assert_eq!(packet.route_type, RouteType::TransportFlood);
        assert_eq!(packet.transport_codes, Some((1, 2)));
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn truncated_packets_fail_cleanly() {
        assert!(Packet::decode(&[]).is_err());
        // transport route with only 3 code bytes
        assert!(Packet::decode(&[header(0, 4), 1, 2, 3]).is_err());
        // missing path length
        assert!(Packet::decode(&[header(1, 4)]).is_err());
        // path shorter than declared
        let err = Packet::decode(&[header(1, 4), 3, 0xaa]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "path",
                needed: 3,
                remaining: 1
            }
        );
    }

    #[test]
    fn from_hex_rejects_bad_hex() {
        assert!(matches!(
            Packet::from_hex("zz"),
            Err(DecodeError::InvalidHex(_))
        ));
        let packet = Packet::from_hex("1501aa").unwrap();
        assert_eq!(packet.first_hop(), Some("aa"));
    }

    #[test]
    fn append_hop_adds_observer_and_bumps_length_by_two() {
        let mut packet = Packet::decode(&[header(1, 5), 1, 0x11]).unwrap();
        packet.append_hop("BEEF0011");
        assert_eq!(packet.path, vec!["11".to_string(), "be".to_string()]);
        assert_eq!(packet.path_len, 3);
        assert_eq!(packet.hop(1), Some("be"));
    }
}
