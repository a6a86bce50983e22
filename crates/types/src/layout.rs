//! Device layout configuration (JSON schema)
//!
//! A layout names LED groups, declares display modes mapping groups to data
//! sources, and carries the wire protocol parameters of the device.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::protocol::ProtocolConfig;
use crate::ParseError;

/// String-keyed map that keeps declaration order
///
/// Mapping tables are applied in the order they are written, so the order of
/// JSON object keys carries meaning here.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Direction of a range group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// Ascending `start..stop`
    Classic,
    /// Descending from `start` down to, but excluding, `stop`
    Reversed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(rename = "type")]
    pub kind: RangeKind,
    pub start: usize,
    pub stop: usize,
}

/// Physical LED indices of a named group, in visual order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupSpec {
    Index(usize),
    List(Vec<usize>),
    Range(RangeSpec),
}

impl GroupSpec {
    pub fn indices(&self) -> Vec<usize> {
        match self {
            GroupSpec::Index(index) => vec![*index],
            GroupSpec::List(indices) => indices.clone(),
            GroupSpec::Range(RangeSpec {
                kind: RangeKind::Classic,
                start,
                stop,
            }) => (*start..*stop).collect(),
            GroupSpec::Range(RangeSpec {
                kind: RangeKind::Reversed,
                start,
                stop,
            }) => {
                if start <= stop {
                    Vec::new()
                } else {
                    (stop + 1..=*start).rev().collect()
                }
            }
        }
    }
}

/// Where a group's value comes from in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Hours,
    Minutes,
    Seconds,
    Literal(bool),
    Letter(char),
    Metric(String),
}

impl DataSource {
    /// Whether the group should be painted with the time palette
    pub fn is_time(&self) -> bool {
        matches!(self, DataSource::Hours | DataSource::Minutes | DataSource::Seconds)
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::InvalidDataSource(s.to_string()));
        }
        let source = match s {
            "hours" => DataSource::Hours,
            "minutes" => DataSource::Minutes,
            "seconds" => DataSource::Seconds,
            _ => {
                let letter = s.strip_prefix("letter:").unwrap_or(s);
                let mut chars = letter.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => DataSource::Letter(c.to_ascii_uppercase()),
                    _ if s.starts_with("letter:") => {
                        return Err(ParseError::InvalidDataSource(s.to_string()))
                    }
                    _ => DataSource::Metric(s.to_string()),
                }
            }
        };
        Ok(source)
    }
}

impl Serialize for DataSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataSource::Hours => serializer.serialize_str("hours"),
            DataSource::Minutes => serializer.serialize_str("minutes"),
            DataSource::Seconds => serializer.serialize_str("seconds"),
            DataSource::Literal(lit) => serializer.serialize_bool(*lit),
            DataSource::Letter(c) => serializer.serialize_str(&format!("letter:{}", c)),
            DataSource::Metric(key) => serializer.serialize_str(key),
        }
    }
}

impl<'de> Deserialize<'de> for DataSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataSourceVisitor;

        impl<'de> Visitor<'de> for DataSourceVisitor {
            type Value = DataSource;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean, 0/1, or a data source name")
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<DataSource, E> {
                Ok(DataSource::Literal(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<DataSource, E> {
                match v {
                    0 => Ok(DataSource::Literal(false)),
                    1 => Ok(DataSource::Literal(true)),
                    _ => Err(E::custom(format!("literal must be 0 or 1, got {}", v))),
                }
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<DataSource, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("literal must be 0 or 1, got {}", v)))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<DataSource, E> {
                DataSource::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DataSourceVisitor)
    }
}

/// One entry of an alternating mode: a named mode or an inline one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeEntry {
    Reference(String),
    Inline(ModeSpec),
}

/// Display mode as written in the layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModeSpec {
    Static {
        #[serde(default)]
        mappings: OrderedMap<DataSource>,
    },
    Alternating {
        /// Seconds each entry stays on screen
        interval: f64,
        displays: Vec<ModeEntry>,
    },
}

/// Whole layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub name: String,
    /// Number of LEDs; derived from the highest group index when absent
    #[serde(default)]
    pub led_count: Option<usize>,
    pub groups: BTreeMap<String, GroupSpec>,
    /// Alternatives tried, in order, when a group name is not defined
    #[serde(default)]
    pub group_fallbacks: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub default_mode: Option<String>,
    #[serde(default)]
    pub display_modes: OrderedMap<ModeSpec>,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_spec_variants() {
        let groups: BTreeMap<String, GroupSpec> = serde_json::from_str(
            r#"{
                "scalar": 23,
                "list": [4, 1, 1, 9],
                "classic": {"type": "classic", "start": 2, "stop": 5},
                "reversed": {"type": "reversed", "start": 81, "stop": 60},
                "empty": {"type": "reversed", "start": 3, "stop": 3}
            }"#,
        )
        .unwrap();

        assert_eq!(groups["scalar"].indices(), vec![23]);
        assert_eq!(groups["list"].indices(), vec![4, 1, 1, 9]);
        assert_eq!(groups["classic"].indices(), vec![2, 3, 4]);
        let reversed = groups["reversed"].indices();
        assert_eq!(reversed.len(), 21);
        assert_eq!(reversed.first(), Some(&81));
        assert_eq!(reversed.last(), Some(&61));
        assert!(groups["empty"].indices().is_empty());
    }

    #[test]
    fn test_data_source_parsing() {
        let mappings: OrderedMap<DataSource> = serde_json::from_str(
            r#"{"z": "hours", "a": true, "m": 0, "h": "H", "l": "letter:c", "t": "cpu_temp"}"#,
        )
        .unwrap();

        // declaration order survives
        assert_eq!(mappings.keys().collect::<Vec<_>>(), vec!["z", "a", "m", "h", "l", "t"]);
        assert_eq!(mappings.get("z"), Some(&DataSource::Hours));
        assert_eq!(mappings.get("a"), Some(&DataSource::Literal(true)));
        assert_eq!(mappings.get("m"), Some(&DataSource::Literal(false)));
        assert_eq!(mappings.get("h"), Some(&DataSource::Letter('H')));
        assert_eq!(mappings.get("l"), Some(&DataSource::Letter('C')));
        assert_eq!(mappings.get("t"), Some(&DataSource::Metric("cpu_temp".to_string())));

        assert!(serde_json::from_str::<DataSource>("2").is_err());
        assert!(serde_json::from_str::<DataSource>("\"letter:ab\"").is_err());
    }

    #[test]
    fn test_mode_specs() {
        let layout = LayoutConfig::from_json(
            r#"{
                "groups": {"a": [0, 1]},
                "display_modes": {
                    "m": {"type": "static", "mappings": {"a": "cpu_usage"}},
                    "alt": {"type": "alternating", "interval": 2.5, "displays": [
                        "m",
                        {"type": "static", "mappings": {"a": false}}
                    ]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(layout.display_modes.keys().collect::<Vec<_>>(), vec!["m", "alt"]);
        match layout.display_modes.get("alt") {
            Some(ModeSpec::Alternating { interval, displays }) => {
                assert_eq!(*interval, 2.5);
                assert_eq!(displays[0], ModeEntry::Reference("m".to_string()));
                assert!(matches!(displays[1], ModeEntry::Inline(ModeSpec::Static { .. })));
            }
            other => panic!("unexpected mode {:?}", other),
        }
        assert_eq!(layout.protocol, ProtocolConfig::default());
        assert!(layout.led_count.is_none());
    }
}
