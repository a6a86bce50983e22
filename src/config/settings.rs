//! Runtime configuration file

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use led_sens_types::{MetricBounds, MetricRange, TemperatureUnit};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "LED_SENS_CONFIG";

/// Shortest tick the controller runs, in seconds
pub const MIN_TICK_SECONDS: f64 = 0.01;

/// Metrics palette used when there is no config file at all
const NO_CONFIG_METRICS_COLOR: &str = "ff0000";

/// Palette as written in the config: a bare array, `{"colors": [...]}`, or
/// one color spec for every LED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteConfig {
    Colors(Vec<String>),
    Wrapped { colors: Vec<String> },
    Fill(String),
}

impl PaletteConfig {
    /// Per-LED color specs for a layout of `led_count` LEDs
    pub fn colors(&self, led_count: usize) -> Cow<'_, [String]> {
        match self {
            PaletteConfig::Colors(colors) | PaletteConfig::Wrapped { colors } => {
                Cow::Borrowed(colors)
            }
            PaletteConfig::Fill(spec) => Cow::Owned(vec![spec.clone(); led_count]),
        }
    }
}

/// Application-wide configuration
///
/// Every key is optional; a missing file or key falls back to the values the
/// Pearless Assassin 120 ships with. Without any config file the metrics
/// palette is solid red, while a file that omits it gets the yellow default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// USB vendor id as a hex string
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
    /// USB product id as a hex string
    #[serde(default = "default_product_id")]
    pub product_id: String,
    /// Built-in layout name or id
    #[serde(default = "default_layout_mode")]
    pub layout_mode: String,
    /// Custom layout file, takes precedence over `layout_mode`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_file: Option<PathBuf>,
    #[serde(default = "default_display_mode")]
    pub display_mode: String,
    /// Seconds per tick
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
    /// Seconds for half a color gradient period
    #[serde(default = "default_cycle_duration")]
    pub cycle_duration: f64,
    /// Seconds between metric refreshes
    #[serde(default = "default_metrics_update_interval")]
    pub metrics_update_interval: f64,

    #[serde(default = "default_min_temp")]
    pub cpu_min_temp: f64,
    #[serde(default = "default_max_temp")]
    pub cpu_max_temp: f64,
    #[serde(default = "default_min_temp")]
    pub gpu_min_temp: f64,
    #[serde(default = "default_max_temp")]
    pub gpu_max_temp: f64,
    #[serde(default)]
    pub cpu_min_usage: f64,
    #[serde(default = "default_max_usage")]
    pub cpu_max_usage: f64,
    #[serde(default)]
    pub gpu_min_usage: f64,
    #[serde(default = "default_max_usage")]
    pub gpu_max_usage: f64,
    /// Bounds for any metric, overriding the legacy keys above
    #[serde(default)]
    pub metric_bounds: HashMap<String, MetricRange>,

    /// Temperature unit per device (`cpu`, `gpu`)
    #[serde(default = "default_temp_unit")]
    pub temp_unit: HashMap<String, TemperatureUnit>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PaletteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<PaletteConfig>,
}

fn default_vendor_id() -> String {
    "0x0416".to_string()
}

fn default_product_id() -> String {
    "0x8001".to_string()
}

fn default_layout_mode() -> String {
    "Pearless Assasin 120".to_string()
}

fn default_display_mode() -> String {
    "metrics".to_string()
}

fn default_update_interval() -> f64 {
    0.1
}

fn default_cycle_duration() -> f64 {
    5.0
}

fn default_metrics_update_interval() -> f64 {
    0.5
}

fn default_min_temp() -> f64 {
    30.0
}

fn default_max_temp() -> f64 {
    90.0
}

fn default_max_usage() -> f64 {
    100.0
}

fn default_temp_unit() -> HashMap<String, TemperatureUnit> {
    HashMap::from([
        ("cpu".to_string(), TemperatureUnit::Celsius),
        ("gpu".to_string(), TemperatureUnit::Celsius),
    ])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            layout_mode: default_layout_mode(),
            layout_file: None,
            display_mode: default_display_mode(),
            update_interval: default_update_interval(),
            cycle_duration: default_cycle_duration(),
            metrics_update_interval: default_metrics_update_interval(),
            cpu_min_temp: default_min_temp(),
            cpu_max_temp: default_max_temp(),
            gpu_min_temp: default_min_temp(),
            gpu_max_temp: default_max_temp(),
            cpu_min_usage: 0.0,
            cpu_max_usage: default_max_usage(),
            gpu_min_usage: 0.0,
            gpu_max_usage: default_max_usage(),
            metric_bounds: HashMap::new(),
            temp_unit: default_temp_unit(),
            metrics: Some(PaletteConfig::Fill(NO_CONFIG_METRICS_COLOR.to_string())),
            time: None,
        }
    }
}

/// Parse `0x0416`, `0416` or `416` as a 16-bit hex id
pub fn parse_usb_id(text: &str) -> Result<u16> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u16::from_str_radix(digits, 16).with_context(|| format!("Invalid USB id '{}'", text))
}

impl AppConfig {
    /// Parse a config from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Load the config, or the defaults when there is no usable file
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No config file, using defaults");
            return Self::default();
        };
        if !path.exists() {
            info!("Config {} does not exist, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file location in the user's config directory
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "led-sens", "led-sens")
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Config path from the CLI, then the environment, then the user config dir
    pub fn resolve_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
        cli_path
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(|| match Self::default_path() {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            })
    }

    pub fn usb_ids(&self) -> Result<(u16, u16)> {
        Ok((parse_usb_id(&self.vendor_id)?, parse_usb_id(&self.product_id)?))
    }

    /// Seconds per tick, never below [`MIN_TICK_SECONDS`]
    pub fn tick_seconds(&self) -> f64 {
        self.update_interval.max(MIN_TICK_SECONDS)
    }

    /// Ticks in half a gradient period, at least one
    pub fn cycle_length(&self) -> u64 {
        ((self.cycle_duration / self.tick_seconds()) as u64).max(1)
    }

    /// Gradient bounds: legacy per-device keys, then `metric_bounds` overrides
    pub fn metric_bounds(&self) -> MetricBounds {
        let mut bounds = MetricBounds::empty()
            .with("cpu_temp", self.cpu_min_temp, self.cpu_max_temp)
            .with("gpu_temp", self.gpu_min_temp, self.gpu_max_temp)
            .with("cpu_usage", self.cpu_min_usage, self.cpu_max_usage)
            .with("gpu_usage", self.gpu_min_usage, self.gpu_max_usage);
        for (metric, range) in &self.metric_bounds {
            bounds.set(metric.clone(), *range);
        }
        bounds
    }

    pub fn metrics_palette(&self, led_count: usize) -> Option<Cow<'_, [String]>> {
        self.metrics.as_ref().map(|palette| palette.colors(led_count))
    }

    pub fn time_palette(&self, led_count: usize) -> Option<Cow<'_, [String]>> {
        self.time.as_ref().map(|palette| palette.colors(led_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(
            config,
            AppConfig {
                metrics: None,
                ..AppConfig::default()
            }
        );
        assert_eq!(config.usb_ids().unwrap(), (0x0416, 0x8001));
        assert_eq!(config.cycle_length(), 50);
        assert_eq!(config.temp_unit.get("gpu"), Some(&TemperatureUnit::Celsius));
    }

    #[test]
    fn test_palette_shapes() {
        let config = AppConfig::from_json(
            r#"{"metrics": {"colors": ["ff0000", "random"]}, "time": ["00ff00"]}"#,
        )
        .unwrap();
        assert_eq!(config.metrics_palette(84).unwrap().len(), 2);
        assert_eq!(config.time_palette(84).unwrap().as_ref(), &["00ff00".to_string()]);

        let filled = AppConfig::from_json(r#"{"time": "00ff00-0000ff-seconds"}"#).unwrap();
        let colors = filled.time_palette(3).unwrap();
        assert_eq!(colors.len(), 3);
        assert!(colors.iter().all(|c| c == "00ff00-0000ff-seconds"));
        assert_eq!(filled.metrics_palette(3), None);
    }

    #[test]
    fn test_bounds_merge() {
        let config = AppConfig::from_json(
            r#"{
                "cpu_max_temp": 80,
                "metric_bounds": {"gpu_temp": {"min": 40, "max": 70}, "cpu_power": {"min": 0, "max": 150}}
            }"#,
        )
        .unwrap();
        let bounds = config.metric_bounds();
        assert_eq!(bounds.get("cpu_temp"), Some(MetricRange::new(30.0, 80.0)));
        assert_eq!(bounds.get("gpu_temp"), Some(MetricRange::new(40.0, 70.0)));
        assert_eq!(bounds.get("cpu_power"), Some(MetricRange::new(0.0, 150.0)));
        assert_eq!(bounds.get("gpu_usage"), Some(MetricRange::new(0.0, 100.0)));
    }

    #[test]
    fn test_usb_id_parsing() {
        assert_eq!(parse_usb_id("0x0416").unwrap(), 0x0416);
        assert_eq!(parse_usb_id("8001").unwrap(), 0x8001);
        assert!(parse_usb_id("0xzz").is_err());
    }

    #[test]
    fn test_cycle_length_floor() {
        let config = AppConfig {
            update_interval: 0.3,
            cycle_duration: 1.0,
            ..AppConfig::default()
        };
        assert_eq!(config.cycle_length(), 3);

        let tiny = AppConfig {
            cycle_duration: 0.0,
            ..AppConfig::default()
        };
        assert_eq!(tiny.cycle_length(), 1);

        let fast = AppConfig {
            update_interval: 0.001,
            ..AppConfig::default()
        };
        assert_eq!(fast.tick_seconds(), MIN_TICK_SECONDS);
        assert_eq!(fast.cycle_length(), 500);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_or_default(Some(&path)), AppConfig::default());

        let config = AppConfig {
            display_mode: "time".to_string(),
            ..AppConfig::default()
        };
        config.save_to_path(&path).unwrap();
        assert_eq!(AppConfig::load_or_default(Some(&path)), config);
    }
}
