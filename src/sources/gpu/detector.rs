//! GPU detection

use super::amd::AmdBackend;
use super::backend::GpuBackend;

/// Detect all available GPUs, NVIDIA first
pub fn detect_gpus() -> Vec<Box<dyn GpuBackend>> {
    let mut gpus: Vec<Box<dyn GpuBackend>> = Vec::new();

    detect_nvidia_gpus(&mut gpus);
    detect_amd_gpus(&mut gpus);

    if gpus.is_empty() {
        log::warn!("No GPUs detected");
    } else {
        for gpu in &gpus {
            let info = gpu.info();
            log::info!("  [{}] {} - {}", info.index, info.vendor.as_str(), info.name);
        }
    }

    gpus
}

#[cfg(feature = "nvidia")]
fn detect_nvidia_gpus(gpus: &mut Vec<Box<dyn GpuBackend>>) {
    use super::nvidia::NvidiaBackend;
    use nvml_wrapper::Nvml;

    let count = match Nvml::init().and_then(|nvml| nvml.device_count()) {
        Ok(count) => count,
        Err(e) => {
            log::info!("NVML: Not available ({})", e);
            return;
        }
    };

    for i in 0..count {
        match NvidiaBackend::new(i) {
            Ok(backend) => gpus.push(Box::new(backend)),
            Err(e) => log::warn!("Failed to initialize NVIDIA GPU {}: {}", i, e),
        }
    }
}

#[cfg(not(feature = "nvidia"))]
fn detect_nvidia_gpus(_gpus: &mut Vec<Box<dyn GpuBackend>>) {
    log::info!("NVML: NVIDIA support not compiled in");
}

fn detect_amd_gpus(gpus: &mut Vec<Box<dyn GpuBackend>>) {
    // Not every card index is an AMD GPU
    for i in 0..16 {
        if let Ok(backend) = AmdBackend::new(i) {
            gpus.push(Box::new(backend));
        }
    }
}
