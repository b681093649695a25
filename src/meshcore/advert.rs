//! Advertisement payloads.
//!
//! ```text
//! public key (32) | timestamp u32 LE (4) | signature (64) | flags (1) | optional fields
//! ```
//!
//! Optional fields follow the flag bits in fixed order: location (two i32 LE,
//! degrees x 1e6), feature block 1 (2 bytes), feature block 2 (2 bytes), then
//! the node name filling the rest of the payload.
//!
//! The signature is carried but not verified.

use super::decode_text;
use super::reader::PacketReader;
use crate::error::DecodeError;

pub const ADV_TYPE_MASK: u8 = 0x0F;
pub const ADV_LATLON_MASK: u8 = 0x10;
pub const ADV_FEAT1_MASK: u8 = 0x20;
pub const ADV_FEAT2_MASK: u8 = 0x40;
pub const ADV_NAME_MASK: u8 = 0x80;

/// Node type advertised in the low flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Chat,
    Repeater,
    Room,
    Sensor,
    Other(u8),
}

impl NodeType {
    pub fn from_flags(flags: u8) -> Self {
        match flags & ADV_TYPE_MASK {
            1 => NodeType::Chat,
            2 => NodeType::Repeater,
            3 => NodeType::Room,
            4 => NodeType::Sensor,
            other => NodeType::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            NodeType::Chat => 1,
            NodeType::Repeater => 2,
            NodeType::Room => 3,
            NodeType::Sensor => 4,
            NodeType::Other(code) => code,
        }
    }
}

/// Fixed-size header shared by every advert, read before the node type is known.
#[derive(Debug, Clone)]
pub struct AdvertHeader {
    pub public_key: [u8; 32],
    pub timestamp: u32,
    pub signature: [u8; 64],
    pub flags: u8,
}

impl AdvertHeader {
    pub fn node_type(&self) -> NodeType {
        NodeType::from_flags(self.flags)
    }

    /// Short node id: first byte of the public key, lowercase hex.
    pub fn id(&self) -> String {
        format!("{:02x}", self.public_key[0])
    }
}

/// A fully parsed advert.
#[derive(Debug, Clone)]
pub struct Advert {
    pub header: AdvertHeader,
    /// `(lat, lon)` in degrees when the location flag is set.
    pub location: Option<(f64, f64)>,
    /// Name when the name flag is set.
    pub name: Option<String>,
}

impl Advert {
    pub fn id(&self) -> String {
        self.header.id()
    }

    pub fn node_type(&self) -> NodeType {
        self.header.node_type()
    }

    /// Location, defaulting to `(0.0, 0.0)` when none was advertised.
    pub fn lat_lon(&self) -> (f64, f64) {
        self.location.unwrap_or((0.0, 0.0))
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Outcome of [`parse_advert`]: repeaters are parsed fully, every other node
/// type stops after the header.
#[derive(Debug, Clone)]
pub enum ParsedAdvert {
    Repeater(Advert),
    Ignored(AdvertHeader),
}

fn read_header(r: &mut PacketReader<'_>) -> Result<AdvertHeader, DecodeError> {
    let public_key = r.read_array::<32>("public key")?;
    let timestamp = r.read_u32_le("timestamp")?;
    let signature = r.read_array::<64>("signature")?;
    let flags = r.read_u8("flags")?;
    Ok(AdvertHeader {
        public_key,
        timestamp,
        signature,
        flags,
    })
}

fn read_body(r: &mut PacketReader<'_>, header: AdvertHeader) -> Result<Advert, DecodeError> {
    let flags = header.flags;
    let mut location = None;
    let mut name = None;

    if flags & ADV_LATLON_MASK != 0 {
        let lat = r.read_i32_le("latitude")? as f64 / 1e6;
        let lon = r.read_i32_le("longitude")? as f64 / 1e6;
        location = Some((lat, lon));
    }
    if flags & ADV_FEAT1_MASK != 0 {
        r.skip("feature block 1", 2)?;
    }
    if flags & ADV_FEAT2_MASK != 0 {
        r.skip("feature block 2", 2)?;
    }
    if flags & ADV_NAME_MASK != 0 {
        name = Some(decode_text(r.rest()));
    }

    Ok(Advert {
        header,
        location,
        name,
    })
}

/// Parse an advert payload, reading optional fields only for repeaters.
pub fn parse_advert(payload: &[u8]) -> Result<ParsedAdvert, DecodeError> {
    let mut r = PacketReader::new(payload);
    let header = read_header(&mut r)?;
    if header.node_type() != NodeType::Repeater {
        return Ok(ParsedAdvert::Ignored(header));
    }
    Ok(ParsedAdvert::Repeater(read_body(&mut r, header)?))
}

/// Parse an advert payload fully regardless of node type. Used by the
/// offline decoder.
pub fn parse_any_advert(payload: &[u8]) -> Result<Advert, DecodeError> {
    let mut r = PacketReader::new(payload);
    let header = read_header(&mut r)?;
    read_body(&mut r, header)
}

/// Build an advert payload. Only needed to produce fixtures.
#[cfg(test)]
pub(crate) fn encode_advert(
    public_key: [u8; 32],
    flags: u8,
    location: Option<(i32, i32)>,
    name: Option<&[u8]>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&public_key);
    out.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    out.extend_from_slice(&[0x5a; 64]);
    out.push(flags);
    if let Some((lat, lon)) = location {
        out.extend_from_slice(&lat.to_le_bytes());
        out.extend_from_slice(&lon.to_le_bytes());
    }
    if flags & ADV_FEAT1_MASK != 0 {
        out.extend_from_slice(&[0, 0]);
    }
    if flags & ADV_FEAT2_MASK != 0 {
        out.extend_from_slice(&[0, 0]);
    }
    if let Some(name) = name {
        out.extend_from_slice(name);
    }
    out
}
