//! Evaluation of per-LED color specs against the current tick, clock and metrics

use chrono::{NaiveTime, Timelike};
use log::warn;
use rand::Rng;

use led_sens_types::{BandPolicy, ColorSpec, ColorStop, MetricBounds, MetricsSnapshot, Rgb, TimeUnit};

use crate::frame::ColorBuffer;

/// Color used for a whole palette when it is absent from the config
pub const DEFAULT_PALETTE_COLOR: Rgb = Rgb::new(0xff, 0xe0, 0x00);

/// Color used for a whole palette whose length does not match the layout
pub const MISMATCH_PALETTE_COLOR: Rgb = Rgb::new(0xff, 0x00, 0x00);

/// Everything a color spec may depend on for one tick
#[derive(Debug, Clone, Copy)]
pub struct ColorContext<'a> {
    pub tick: u64,
    /// Ticks in half a gradient period
    pub cycle_length: u64,
    pub snapshot: &'a MetricsSnapshot,
    pub bounds: &'a MetricBounds,
    pub now: NaiveTime,
}

/// Ping-pong factor: 0 at tick 0, 1 at `cycle_length`, back to 0 at twice that
pub fn gradient_factor(tick: u64, cycle_length: u64) -> f64 {
    if cycle_length == 0 {
        return 0.0;
    }
    let period = cycle_length.saturating_mul(2);
    let phase = (tick % period) as f64;
    let half = cycle_length as f64;
    (1.0 - (phase - half).abs() / half).clamp(0.0, 1.0)
}

fn time_factor(unit: TimeUnit, now: NaiveTime) -> f64 {
    let value = match unit {
        TimeUnit::Seconds => now.second(),
        TimeUnit::Minutes => now.minute(),
        TimeUnit::Hours => now.hour(),
    };
    (value as f64 / unit.max_value() as f64).clamp(0.0, 1.0)
}

/// First stop whose threshold exceeds `value`, else the last stop
fn band_color(stops: &[ColorStop], value: f64) -> Option<Rgb> {
    stops
        .iter()
        .find(|stop| stop.threshold > value)
        .or_else(|| stops.last())
        .map(|stop| stop.color)
}

/// Linear interpolation between the stops bracketing `value`
fn smooth_color(stops: &[ColorStop], value: f64) -> Option<Rgb> {
    let first = stops.first()?;
    let last = stops.last()?;
    if value <= first.threshold {
        return Some(first.color);
    }
    if value >= last.threshold {
        return Some(last.color);
    }
    stops.windows(2).find_map(|pair| {
        let (lo, hi) = (pair[0], pair[1]);
        if value == lo.threshold {
            Some(lo.color)
        } else if value > lo.threshold && value <= hi.threshold {
            let span = hi.threshold - lo.threshold;
            let factor = if span > 0.0 { (value - lo.threshold) / span } else { 1.0 };
            Some(Rgb::lerp(lo.color, hi.color, factor))
        } else {
            None
        }
    })
}

fn metric_value(metric: &str, ctx: &ColorContext<'_>) -> Option<f64> {
    match ctx.snapshot.get(metric) {
        Some(value) => Some(value as f64),
        None => {
            warn!("Metric '{}' not found in snapshot, using start color", metric);
            None
        }
    }
}

/// Evaluate one color spec. Never fails: unusable inputs give the spec's start color.
pub fn resolve(spec: &ColorSpec, ctx: &ColorContext<'_>) -> Rgb {
    match spec {
        ColorSpec::Literal(color) => *color,
        ColorSpec::Random => {
            let mut rng = rand::thread_rng();
            Rgb::new(rng.gen(), rng.gen(), rng.gen())
        }
        ColorSpec::Gradient { start, end } => {
            Rgb::lerp(*start, *end, gradient_factor(ctx.tick, ctx.cycle_length))
        }
        ColorSpec::TimeGradient { start, end, unit } => {
            Rgb::lerp(*start, *end, time_factor(*unit, ctx.now))
        }
        ColorSpec::MetricGradient { start, end, metric } => {
            let Some(value) = metric_value(metric, ctx) else {
                return *start;
            };
            let factor = match ctx.bounds.get(metric).and_then(|range| range.factor(value)) {
                Some(factor) => factor,
                None => {
                    warn!(
                        "Metric '{}' has no usable bounds (missing or min == max), using start color",
                        metric
                    );
                    0.0
                }
            };
            Rgb::lerp(*start, *end, factor)
        }
        ColorSpec::MultiStopBand {
            metric,
            stops,
            policy,
        } => {
            let color = metric_value(metric, ctx).and_then(|value| match policy {
                BandPolicy::Banding => band_color(stops, value),
                BandPolicy::Smooth => smooth_color(stops, value),
            });
            color.unwrap_or_else(|| spec.fallback_color())
        }
    }
}

/// One color spec per LED, parsed once per configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    specs: Vec<ColorSpec>,
}

impl Palette {
    /// Same literal color on every LED
    pub fn uniform(led_count: usize, color: Rgb) -> Self {
        Self {
            specs: vec![ColorSpec::Literal(color); led_count],
        }
    }

    /// Parse a palette from config strings.
    ///
    /// A missing palette fills with [`DEFAULT_PALETTE_COLOR`], a length
    /// mismatch with [`MISMATCH_PALETTE_COLOR`]. A malformed entry falls back
    /// to [`DEFAULT_PALETTE_COLOR`] for that LED only.
    pub fn parse(name: &str, entries: Option<&[String]>, led_count: usize) -> Self {
        let Some(entries) = entries else {
            return Self::uniform(led_count, DEFAULT_PALETTE_COLOR);
        };
        if entries.len() != led_count {
            warn!(
                "Palette '{}' has {} colors but the layout has {} LEDs, using default colors",
                name,
                entries.len(),
                led_count
            );
            return Self::uniform(led_count, MISMATCH_PALETTE_COLOR);
        }

        let specs = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| match entry.parse::<ColorSpec>() {
                Ok(spec) => spec,
                Err(e) => {
                    warn!("Palette '{}' LED {}: {}, using default color", name, index, e);
                    ColorSpec::Literal(DEFAULT_PALETTE_COLOR)
                }
            })
            .collect();
        Self { specs }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[ColorSpec] {
        &self.specs
    }

    /// Resolve every LED's color for this tick
    pub fn evaluate(&self, ctx: &ColorContext<'_>) -> ColorBuffer {
        self.specs
            .iter()
            .map(|spec| resolve(spec, ctx))
            .collect::<Vec<_>>()
            .into()
    }
}

/// The two named palettes of the runtime config
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteSet {
    pub metrics: Palette,
    pub time: Palette,
}

impl PaletteSet {
    pub fn uniform(led_count: usize, color: Rgb) -> Self {
        Self {
            metrics: Palette::uniform(led_count, color),
            time: Palette::uniform(led_count, color),
        }
    }

    pub fn parse(metrics: Option<&[String]>, time: Option<&[String]>, led_count: usize) -> Self {
        Self {
            metrics: Palette::parse("metrics", metrics, led_count),
            time: Palette::parse("time", time, led_count),
        }
    }
}
