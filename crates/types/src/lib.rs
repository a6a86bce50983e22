//! led-sens-types: Shared data types for the led-sens cooler display driver.
//!
//! This crate contains pure data types (layout schema, color specs, metrics
//! snapshots, protocol parameters) shared by the rendering engine and the
//! application. It performs no I/O.

pub mod color;
pub mod color_spec;
pub mod layout;
pub mod metrics;
pub mod protocol;

// Re-export commonly used types at the crate root for convenience
pub use color::{ColorStop, Rgb};
pub use color_spec::{BandPolicy, ColorSpec, TimeUnit};
pub use layout::{
    DataSource, GroupSpec, LayoutConfig, ModeEntry, ModeSpec, OrderedMap, RangeKind, RangeSpec,
};
pub use metrics::{MetricBounds, MetricRange, MetricsSnapshot, TemperatureUnit};
pub use protocol::{ChannelOrder, ProtocolConfig, DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_HEX};

/// Errors raised while parsing configuration strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid hex value '{0}'")]
    InvalidHex(String),
    #[error("invalid color spec '{0}'")]
    InvalidColorSpec(String),
    #[error("invalid data source '{0}'")]
    InvalidDataSource(String),
}
