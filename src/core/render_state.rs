//! Everything the controller needs to render one tick, built from an `AppConfig`

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

use led_sens_core::{DeviceLayout, DisplayModeEngine, PacketEncoder, PaletteSet, TemperatureUnit};

use crate::config::{load_layout, AppConfig};

/// Smallest accepted tick or refresh interval
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Immutable render configuration, swapped as a whole on config change
#[derive(Debug, Clone)]
pub struct RenderState {
    pub engine: DisplayModeEngine,
    pub encoder: PacketEncoder,
    pub display_mode: String,
    pub update_interval: Duration,
    pub metrics_update_interval: Duration,
    pub vendor_id: u16,
    pub product_id: u16,
    pub temp_units: HashMap<String, TemperatureUnit>,
}

fn interval(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(MIN_INTERVAL)
        .max(MIN_INTERVAL)
}

impl RenderState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let (vendor_id, product_id) = config.usb_ids()?;
        let tick_seconds = config.tick_seconds();
        let layout = DeviceLayout::from_config(load_layout(config)?, tick_seconds)
            .context("Invalid device layout")?;

        let led_count = layout.led_count();
        let palettes = PaletteSet::parse(
            config.metrics_palette(led_count).as_deref(),
            config.time_palette(led_count).as_deref(),
            led_count,
        );
        let encoder = PacketEncoder::for_layout(&layout);
        let display_mode = layout.resolve_mode_name(&config.display_mode).to_string();

        log::info!(
            "Layout '{}' ({} LEDs), mode '{}'",
            layout.name(),
            layout.led_count(),
            display_mode
        );

        Ok(Self {
            engine: DisplayModeEngine::new(
                layout,
                palettes,
                config.metric_bounds(),
                config.cycle_length(),
            ),
            encoder,
            display_mode,
            update_interval: interval(tick_seconds),
            metrics_update_interval: interval(config.metrics_update_interval),
            vendor_id,
            product_id,
            temp_units: config.temp_unit.clone(),
        })
    }

    pub fn usb_ids(&self) -> (u16, u16) {
        (self.vendor_id, self.product_id)
    }
}
