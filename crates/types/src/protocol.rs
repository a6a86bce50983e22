//! Wire protocol description carried by each layout

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ParseError;

/// Default report header used by the Pearless Assassin family
pub const DEFAULT_HEADER_HEX: &str = "dadbdcdd000000000000000000000000fc0000ff";

/// HID report payload size shared by all known layouts
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Order in which a lit LED's channels are written to the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ChannelOrder {
    /// Reorder an `(r, g, b)` triplet for the wire
    pub fn apply(self, r: u8, g: u8, b: u8) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Rbg => [r, b, g],
            ChannelOrder::Grb => [g, r, b],
            ChannelOrder::Gbr => [g, b, r],
            ChannelOrder::Brg => [b, r, g],
            ChannelOrder::Bgr => [b, g, r],
        }
    }
}

/// Framing parameters of a layout's HID protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Magic bytes written before the LED triplets
    #[serde(
        default = "default_header",
        serialize_with = "serialize_hex",
        deserialize_with = "deserialize_hex"
    )]
    pub header: Vec<u8>,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    /// Payload bytes per report, excluding the report-ID byte
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub report_id: u8,
    /// Payload sent once after the device is opened
    #[serde(
        default,
        serialize_with = "serialize_opt_hex",
        deserialize_with = "deserialize_opt_hex"
    )]
    pub init_report: Option<Vec<u8>>,
}

fn default_header() -> Vec<u8> {
    decode_hex(DEFAULT_HEADER_HEX).unwrap_or_default()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            channel_order: ChannelOrder::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            report_id: 0,
            init_report: None,
        }
    }
}

/// Decode a hex string (whitespace ignored) into bytes
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, ParseError> {
    let digits: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHex(hex.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ParseError::InvalidHex(hex.to_string()))
        })
        .collect()
}

/// Encode bytes as a lowercase hex string
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_hex(bytes))
}

fn deserialize_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    decode_hex(&s).map_err(serde::de::Error::custom)
}

fn serialize_opt_hex<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_some(&encode_hex(bytes)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_opt_hex<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<u8>>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| decode_hex(&s).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocol() {
        let protocol = ProtocolConfig::default();
        assert_eq!(protocol.header.len(), 20);
        assert_eq!(&protocol.header[..4], &[0xda, 0xdb, 0xdc, 0xdd]);
        assert_eq!(&protocol.header[16..], &[0xfc, 0x00, 0x00, 0xff]);
        assert_eq!(protocol.chunk_size, 64);
    }

    #[test]
    fn test_protocol_from_json() {
        let protocol: ProtocolConfig = serde_json::from_str(
            r#"{"header": "aa bb", "channel_order": "brg", "init_report": "0102"}"#,
        )
        .unwrap();
        assert_eq!(protocol.header, vec![0xaa, 0xbb]);
        assert_eq!(protocol.channel_order, ChannelOrder::Brg);
        assert_eq!(protocol.init_report, Some(vec![1, 2]));
        assert_eq!(protocol.report_id, 0);

        assert!(serde_json::from_str::<ProtocolConfig>(r#"{"header": "abc"}"#).is_err());
    }

    #[test]
    fn test_channel_order() {
        assert_eq!(ChannelOrder::Rgb.apply(1, 2, 3), [1, 2, 3]);
        assert_eq!(ChannelOrder::Brg.apply(1, 2, 3), [3, 1, 2]);
    }
}
