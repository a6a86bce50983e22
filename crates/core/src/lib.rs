//! led-sens-core: Rendering engine for segmented cooler LED displays.
//!
//! This crate turns a validated device layout, a metrics snapshot and a tick
//! counter into an LED/color frame, and frames into HID reports. It performs
//! no I/O.

pub mod color_resolver;
pub mod digits;
pub mod engine;
mod error;
pub mod frame;
pub mod groups;
pub mod layout;
pub mod packet;

pub use color_resolver::{gradient_factor, ColorContext, Palette, PaletteSet};
pub use digits::{FieldLayout, Fill, Glyph};
pub use engine::DisplayModeEngine;
pub use error::{RenderError, Result};
pub use frame::{ColorBuffer, Frame, LedBuffer};
pub use groups::{GroupValue, LedGroupRegistry};
pub use layout::{DeviceLayout, DisplayMode, ModeRef};
pub use packet::{PacketEncoder, Report};

// Re-export types used in public signatures for convenience
pub use led_sens_types::{
    ColorSpec, LayoutConfig, MetricBounds, MetricRange, MetricsSnapshot, ProtocolConfig, Rgb,
    TemperatureUnit,
};
