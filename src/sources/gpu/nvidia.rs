//! NVIDIA GPU backend using NVML

use super::backend::{GpuBackend, GpuInfo, GpuReading, GpuVendor};
use anyhow::{anyhow, Result};
use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
use nvml_wrapper::Nvml;

/// NVIDIA GPU backend
pub struct NvidiaBackend {
    info: GpuInfo,
    reading: GpuReading,
    nvml: Nvml,
    device_index: u32,
}

impl NvidiaBackend {
    pub fn new(index: u32) -> Result<Self> {
        let nvml = Nvml::init()?;
        let device = nvml.device_by_index(index)?;
        let name = device
            .name()
            .unwrap_or_else(|_| format!("NVIDIA GPU {}", index));

        Ok(Self {
            info: GpuInfo {
                index,
                name,
                vendor: GpuVendor::Nvidia,
            },
            reading: GpuReading::default(),
            nvml,
            device_index: index,
        })
    }
}

impl GpuBackend for NvidiaBackend {
    fn info(&self) -> &GpuInfo {
        &self.info
    }

    fn update(&mut self) -> Result<()> {
        let device = self
            .nvml
            .device_by_index(self.device_index)
            .map_err(|e| anyhow!("Failed to get NVIDIA GPU device: {}", e))?;

        self.reading = GpuReading {
            temperature: device
                .temperature(TemperatureSensor::Gpu)
                .ok()
                .map(|t| t as f32),
            utilization: device.utilization_rates().ok().map(|u| u.gpu),
            // mW to W
            power: device.power_usage().ok().map(|p| p as f32 / 1000.0),
            clock: device.clock_info(Clock::Graphics).ok(),
        };
        Ok(())
    }

    fn reading(&self) -> GpuReading {
        self.reading
    }
}
