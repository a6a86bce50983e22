//! led-sens: drives the segmented LED displays of Pearless Assassin style CPU coolers
//!
//! This library provides:
//! - Runtime configuration and the built-in device layouts
//! - Hardware metrics collection (CPU, GPU)
//! - HID transports
//! - The controller loop tying them to the `led-sens-core` renderer

pub mod config;
pub mod core;
pub mod sources;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use self::core::{ConfigWatcher, Controller, RenderState};
pub use sources::{FixedMetrics, MetricsProvider, SystemMetrics};
pub use transport::{DryRunFactory, HidApiFactory, Transport, TransportFactory};
