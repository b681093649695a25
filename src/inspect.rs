//! Offline packet inspection for `wardrive decode`.
//!
//! Renders a raw packet as JSON, including advert or group message fields.
//! With settings available, group messages on the watched channel are
//! decrypted as well.
use serde_json::{json, Value};

use crate::config::BridgeSettings;
use crate::error::DecodeError;
use crate::meshcore::advert::parse_any_advert;
use crate::meshcore::group::{plaintext_text, GroupMessage};
use crate::meshcore::{Packet, PAYLOAD_TYPE_ADVERT, PAYLOAD_TYPE_GROUP_TEXT};

pub fn describe_hex(raw: &str, settings: Option<&BridgeSettings>) -> Result<Value, DecodeError> {
    let packet = Packet::from_hex(raw)?;
    describe(&packet, settings)
}

pub fn describe(packet: &Packet, settings: Option<&BridgeSettings>) -> Result<Value, DecodeError> {
    let (code_a, code_b) = packet.transport_codes_or_default();
    let mut out = json!({
        "route_type": packet.route_type.to_string(),
        "payload_type": packet.payload_type,
        "transport_codes": [code_a, code_b],
        "path_len": packet.path_len,
        "path": packet.path,
        "payload": hex::encode(&packet.payload),
    });

    match packet.payload_type {
        PAYLOAD_TYPE_ADVERT => {
            let advert = parse_any_advert(&packet.payload)?;
            out["advert"] = json!({
                "id": advert.id(),
                "node_type": advert.node_type().code(),
                "timestamp": advert.header.timestamp,
                "flags": advert.header.flags,
                "location": advert.location.map(|(lat, lon)| json!([lat, lon])),
                "name": advert.name,
            });
        }
        PAYLOAD_TYPE_GROUP_TEXT => {
            let message = GroupMessage::parse(&packet.payload)?;
            let mut group = json!({
                "channel_hash": format!("{:02x}", message.channel_hash),
                "mac": hex::encode(message.mac),
                "ciphertext_len": message.ciphertext.len(),
                "block_aligned": message.is_block_aligned(),
            });
            if let Some(settings) = settings {
                if message.channel_hash == settings.channel_hash {
                    group["mac_valid"] =
                        json!(settings.cipher.verify_mac(message.mac, &message.ciphertext));
                    if let Ok(plain) = settings.cipher.decrypt(&message.ciphertext) {
                        group["text"] = json!(plaintext_text(&plain));
                    }
                }
            }
            out["group_message"] = group;
        }
        _ => {}
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::meshcore::advert::{encode_advert, ADV_LATLON_MASK, ADV_NAME_MASK};

    #[test]
    fn describes_advert() {
        let mut raw = vec![0x11, 0x00];
        let mut key = [0u8; 32];
        key[0] = 0xc3;
        raw.extend(encode_advert(
            key,
            0x02 | ADV_LATLON_MASK | ADV_NAME_MASK,
            Some((1_500_000, -2_250_000)),
            Some(b"Tower"),
        ));
        let value = describe_hex(&hex::encode(&raw), None).unwrap();
        assert_eq!(value["route_type"], "FLOOD");
        assert_eq!(value["payload_type"], 4);
        assert_eq!(value["advert"]["id"], "c3");
        assert_eq!(value["advert"]["location"], json!([1.5, -2.25]));
        assert_eq!(value["advert"]["name"], "Tower");
    }

    #[test]
    fn decrypts_watched_channel() {
        let settings = Config::default().bridge_settings().unwrap();
        let mut plain = vec![0, 0, 0, 0, 0];
        plain.extend_from_slice(b"bob: hi");
        plain.resize(16, 0);
        let ciphertext = settings.cipher.encrypt(&plain).unwrap();
        let mac = settings.cipher.mac(&ciphertext);

        let mut raw = vec![0x15, 0x01, 0x42, settings.channel_hash, mac[0], mac[1]];
        raw.extend_from_slice(&ciphertext);
        let value = describe_hex(&hex::encode(&raw), Some(&settings)).unwrap();
        assert_eq!(value["path"], json!(["42"]));
        assert_eq!(value["group_message"]["text"], "bob: hi");
        assert_eq!(value["group_message"]["mac_valid"], true);

        let without = describe_hex(&hex::encode(&raw), None).unwrap();
        assert!(without["group_message"].get("text").is_none());
    }
}
