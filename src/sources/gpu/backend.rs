//! GPU backend trait

use anyhow::Result;

/// Identity of a detected GPU
#[derive(Debug, Clone)]
pub struct GpuInfo {
    pub index: u32,
    pub name: String,
    pub vendor: GpuVendor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
}

impl GpuVendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Amd => "AMD",
        }
    }
}

/// Readings of one GPU; a reading the hardware does not expose stays `None`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuReading {
    /// Celsius
    pub temperature: Option<f32>,
    /// Percent busy
    pub utilization: Option<u32>,
    /// Watts
    pub power: Option<f32>,
    /// Graphics clock in MHz
    pub clock: Option<u32>,
}

/// Vendor-specific GPU monitoring
pub trait GpuBackend: Send {
    fn info(&self) -> &GpuInfo;

    /// Refresh readings from the hardware
    fn update(&mut self) -> Result<()>;

    fn reading(&self) -> GpuReading;
}
