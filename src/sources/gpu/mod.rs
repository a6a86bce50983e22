//! GPU readings with multi-vendor support (NVIDIA, AMD)

mod amd;
mod backend;
mod detector;
#[cfg(feature = "nvidia")]
mod nvidia;

pub use amd::AmdBackend;
pub use backend::{GpuBackend, GpuInfo, GpuReading, GpuVendor};
pub use detector::detect_gpus;

/// Monitor for the first detected GPU
pub struct GpuMonitor {
    backend: Option<Box<dyn GpuBackend>>,
    reading: GpuReading,
}

impl GpuMonitor {
    /// Detect GPUs and keep the first one
    pub fn new() -> Self {
        let backend = detect_gpus().into_iter().next();
        match &backend {
            Some(gpu) => log::info!("Monitoring GPU: {}", gpu.info().name),
            None => log::warn!("GPU metrics unavailable"),
        }
        Self::with_backend(backend)
    }

    pub fn with_backend(backend: Option<Box<dyn GpuBackend>>) -> Self {
        Self {
            backend,
            reading: GpuReading::default(),
        }
    }

    pub fn update(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        self.reading = match backend.update() {
            Ok(()) => backend.reading(),
            Err(e) => {
                log::debug!("GPU update failed: {}", e);
                GpuReading::default()
            }
        };
    }

    pub fn reading(&self) -> GpuReading {
        self.reading
    }
}

impl Default for GpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}
