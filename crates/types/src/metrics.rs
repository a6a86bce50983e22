//! Metrics snapshot consumed by the renderer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Temperature unit configured per device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TemperatureUnit {
    #[serde(rename = "celsius")]
    #[default]
    Celsius,
    #[serde(rename = "fahrenheit")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    /// Convert a Celsius reading into this unit, truncating like the device firmware expects
    pub fn convert(self, celsius: f32) -> i64 {
        match self {
            TemperatureUnit::Celsius => celsius as i64,
            TemperatureUnit::Fahrenheit => (celsius * 9.0 / 5.0 + 32.0) as i64,
        }
    }
}

/// Point-in-time view of all metrics
///
/// Values are integers; a negative value means "no reading". Keys of the form
/// `<device>_celsius` / `<device>_fahrenheit` are derived from `temp_units`
/// and resolve to 1 when the device uses that unit, 0 otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub values: HashMap<String, i64>,
    /// True when the collaborator refreshed its readings for this snapshot
    #[serde(default)]
    pub updated: bool,
    #[serde(default)]
    pub temp_units: HashMap<String, TemperatureUnit>,
}

impl MetricsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, mostly used by tests and fixtures
    pub fn with(mut self, key: &str, value: i64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with_unit(mut self, device: &str, unit: TemperatureUnit) -> Self {
        self.temp_units.insert(device.to_string(), unit);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: i64) {
        self.values.insert(key.into(), value);
    }

    /// Temperature unit of a device, Celsius when unset
    pub fn temp_unit(&self, device: &str) -> TemperatureUnit {
        self.temp_units.get(device).copied().unwrap_or_default()
    }

    /// Look up a metric, including derived unit indicator keys
    pub fn get(&self, key: &str) -> Option<i64> {
        if let Some(value) = self.values.get(key) {
            return Some(*value);
        }
        for unit in [TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit] {
            if let Some(device) = key.strip_suffix(unit.as_str()).and_then(|k| k.strip_suffix('_')) {
                if device.is_empty() {
                    return None;
                }
                return Some(i64::from(self.temp_unit(device) == unit));
            }
        }
        None
    }
}

/// Inclusive value range used to normalize a metric for color gradients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Normalized position of `value` in the range, or `None` when `min == max`
    pub fn factor(&self, value: f64) -> Option<f64> {
        if self.min == self.max {
            return None;
        }
        Some(((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0))
    }
}

/// Per-metric bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    ranges: HashMap<String, MetricRange>,
}

impl MetricBounds {
    pub fn empty() -> Self {
        Self {
            ranges: HashMap::new(),
        }
    }

    pub fn get(&self, metric: &str) -> Option<MetricRange> {
        self.ranges.get(metric).copied()
    }

    pub fn set(&mut self, metric: impl Into<String>, range: MetricRange) {
        self.ranges.insert(metric.into(), range);
    }

    pub fn with(mut self, metric: &str, min: f64, max: f64) -> Self {
        self.set(metric, MetricRange::new(min, max));
        self
    }
}

impl Default for MetricBounds {
    fn default() -> Self {
        Self::empty()
            .with("cpu_temp", 30.0, 90.0)
            .with("gpu_temp", 30.0, 90.0)
            .with("cpu_usage", 0.0, 100.0)
            .with("gpu_usage", 0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_unit_keys() {
        let snapshot = MetricsSnapshot::new()
            .with("cpu_temp", 50)
            .with_unit("gpu", TemperatureUnit::Fahrenheit);

        assert_eq!(snapshot.get("cpu_temp"), Some(50));
        assert_eq!(snapshot.get("cpu_celsius"), Some(1));
        assert_eq!(snapshot.get("cpu_fahrenheit"), Some(0));
        assert_eq!(snapshot.get("gpu_fahrenheit"), Some(1));
        assert_eq!(snapshot.get("gpu_celsius"), Some(0));
        assert_eq!(snapshot.get("celsius"), None);
        assert_eq!(snapshot.get("gpu_usage"), None);
    }

    #[test]
    fn test_fahrenheit_conversion() {
        assert_eq!(TemperatureUnit::Celsius.convert(45.7), 45);
        assert_eq!(TemperatureUnit::Fahrenheit.convert(100.0), 212);
    }

    #[test]
    fn test_range_factor() {
        let range = MetricRange::new(30.0, 90.0);
        assert_eq!(range.factor(60.0), Some(0.5));
        assert_eq!(range.factor(10.0), Some(0.0));
        assert_eq!(range.factor(120.0), Some(1.0));
        assert_eq!(MetricRange::new(50.0, 50.0).factor(50.0), None);
    }
}
