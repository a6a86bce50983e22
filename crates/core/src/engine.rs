//! Display mode engine: composes one frame per tick

use chrono::{NaiveTime, Timelike};
use log::{trace, warn};

use led_sens_types::{DataSource, MetricBounds, MetricsSnapshot};

use crate::color_resolver::{ColorContext, PaletteSet};
use crate::digits::{FieldLayout, Fill, Glyph};
use crate::error::{RenderError, Result};
use crate::frame::{Frame, LedBuffer};
use crate::groups::GroupValue;
use crate::layout::DeviceLayout;

/// Renders frames for one layout with one set of palettes
///
/// Built from the configuration and immutable afterwards; the only state that
/// changes between frames is the tick passed to [`DisplayModeEngine::render`].
#[derive(Debug, Clone)]
pub struct DisplayModeEngine {
    layout: DeviceLayout,
    palettes: PaletteSet,
    bounds: MetricBounds,
    cycle_length: u64,
    tick_period: u64,
}

impl DisplayModeEngine {
    pub fn new(
        layout: DeviceLayout,
        palettes: PaletteSet,
        bounds: MetricBounds,
        cycle_length: u64,
    ) -> Self {
        let cycle_length = cycle_length.max(1);
        let gradient_period = cycle_length.saturating_mul(2);
        let tick_period = layout
            .alternation_period()
            .and_then(|period| crate::layout::lcm(gradient_period, period))
            .unwrap_or_else(|| {
                warn!("Display mode periods overflow, ticks wrap at the gradient period");
                gradient_period
            });
        Self {
            layout,
            palettes,
            bounds,
            cycle_length,
            tick_period,
        }
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    pub fn palettes(&self) -> &PaletteSet {
        &self.palettes
    }

    /// Ticks in half a gradient period
    pub fn cycle_length(&self) -> u64 {
        self.cycle_length
    }

    /// Ticks before the counter wraps: a multiple of both the gradient
    /// period (twice the cycle length) and every alternation period
    pub fn tick_period(&self) -> u64 {
        self.tick_period
    }

    pub fn next_tick(&self, tick: u64) -> u64 {
        (tick + 1) % self.tick_period
    }

    /// Render `mode_name` at `tick`.
    ///
    /// Unknown modes fall back to the layout default. Fields whose value
    /// cannot be shown are skipped with a warning; only a mode that cannot be
    /// resolved at all fails the frame.
    pub fn render(
        &self,
        mode_name: &str,
        tick: u64,
        snapshot: &MetricsSnapshot,
        now: NaiveTime,
    ) -> Result<Frame> {
        let mappings = self.layout.select_mappings(mode_name, tick)?;
        let groups = self.layout.groups();
        let mut leds = LedBuffer::new(self.layout.led_count());

        for (group, source) in mappings.iter() {
            if let Err(e) = self.write_field(&mut leds, group, source, snapshot, now) {
                warn!("Skipping group '{}' ({:?}): {}", group, source, e);
            }
        }

        let ctx = ColorContext {
            tick,
            cycle_length: self.cycle_length,
            snapshot,
            bounds: &self.bounds,
            now,
        };
        let mut colors = self.palettes.metrics.evaluate(&ctx);

        let time_groups: Vec<&str> = mappings
            .iter()
            .filter(|(_, source)| source.is_time())
            .map(|(group, _)| group)
            .collect();
        if !time_groups.is_empty() {
            let time_colors = self.palettes.time.evaluate(&ctx);
            for index in time_groups
                .iter()
                .filter_map(|group| groups.resolve(group))
                .flatten()
            {
                colors.set(*index, time_colors.get(*index));
            }
        }

        trace!(
            "Rendered tick {} of '{}': {} LEDs lit",
            tick,
            mode_name,
            leds.lit_count()
        );
        Ok(Frame { leds, colors })
    }

    fn write_field(
        &self,
        leds: &mut LedBuffer,
        group: &str,
        source: &DataSource,
        snapshot: &MetricsSnapshot,
        now: NaiveTime,
    ) -> Result<()> {
        let groups = self.layout.groups();
        let width = groups
            .resolve(group)
            .map(<[usize]>::len)
            .ok_or_else(|| RenderError::lookup(format!("unknown LED group '{}'", group)))?;
        let field = FieldLayout::for_width(width);

        let bits = match source {
            DataSource::Literal(lit) => return groups.set(leds, group, GroupValue::Bit(*lit)),
            DataSource::Hours => field.encode_time(now.hour(), Glyph::letter('H')),
            DataSource::Minutes => field.encode_time(now.minute(), None),
            DataSource::Seconds => field.encode_time(now.second(), None),
            DataSource::Letter(c) => {
                let glyph = Glyph::letter(*c)
                    .ok_or_else(|| RenderError::lookup(format!("no glyph for letter '{}'", c)))?;
                field.encode_glyph(glyph)?
            }
            DataSource::Metric(key) => {
                let value = snapshot
                    .get(key)
                    .ok_or_else(|| RenderError::lookup(format!("metric '{}' not available", key)))?;
                field.encode_number(value, Fill::Blank)?
            }
        };
        groups.set(leds, group, GroupValue::Bits(&bits))
    }
}
