//! Hardware metrics collection
//!
//! [`SystemMetrics`] reads the CPU through sysinfo and RAPL and the first GPU
//! through NVML or sysfs, and turns the readings into a [`MetricsSnapshot`].

mod cpu;
mod gpu;
mod shared_sensors;

pub use cpu::{CpuMonitor, CpuReading, RaplMeter};
pub use gpu::{detect_gpus, AmdBackend, GpuBackend, GpuInfo, GpuMonitor, GpuReading, GpuVendor};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use led_sens_types::{MetricsSnapshot, TemperatureUnit};

/// Value stored for a metric without a reading; renders as a blank field
pub const MISSING_VALUE: i64 = -1;

/// Source of metric snapshots for the render loop
pub trait MetricsProvider: Send {
    /// Current snapshot; temperatures are converted per `temp_units`
    fn snapshot(&mut self, temp_units: &HashMap<String, TemperatureUnit>) -> MetricsSnapshot;

    /// Change how often hardware readings are refreshed
    fn set_refresh_interval(&mut self, _interval: Duration) {}
}

fn temperature(celsius: Option<f32>, unit: TemperatureUnit) -> i64 {
    celsius.map_or(MISSING_VALUE, |c| unit.convert(c))
}

fn rounded(value: Option<f32>) -> i64 {
    value
        .filter(|v| v.is_finite())
        .map_or(MISSING_VALUE, |v| v.round() as i64)
}

/// Build a snapshot from raw CPU and GPU readings
pub fn assemble_snapshot(
    cpu: &CpuReading,
    gpu: &GpuReading,
    temp_units: &HashMap<String, TemperatureUnit>,
) -> MetricsSnapshot {
    let unit = |device: &str| temp_units.get(device).copied().unwrap_or_default();

    let mut snapshot = MetricsSnapshot {
        temp_units: temp_units.clone(),
        ..MetricsSnapshot::default()
    };
    snapshot.insert("cpu_temp", temperature(cpu.temperature, unit("cpu")));
    snapshot.insert("cpu_usage", rounded(cpu.usage));
    snapshot.insert(
        "cpu_frequency",
        cpu.frequency.map_or(MISSING_VALUE, |f| f as i64),
    );
    snapshot.insert("cpu_power", rounded(cpu.power));

    snapshot.insert("gpu_temp", temperature(gpu.temperature, unit("gpu")));
    snapshot.insert(
        "gpu_usage",
        gpu.utilization.map_or(MISSING_VALUE, i64::from),
    );
    snapshot.insert("gpu_frequency", gpu.clock.map_or(MISSING_VALUE, i64::from));
    snapshot.insert("gpu_power", rounded(gpu.power));
    snapshot
}

/// Live metrics from the local machine
pub struct SystemMetrics {
    cpu: CpuMonitor,
    gpu: GpuMonitor,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
}

impl SystemMetrics {
    /// Probe sensors and GPUs; readings are refreshed at most every `refresh_interval`
    pub fn new(refresh_interval: Duration) -> Self {
        shared_sensors::initialize();
        Self {
            cpu: CpuMonitor::new(),
            gpu: GpuMonitor::new(),
            refresh_interval,
            last_refresh: None,
        }
    }

    fn refresh_due(&self) -> bool {
        self.last_refresh
            .map_or(true, |last| last.elapsed() >= self.refresh_interval)
    }
}

impl MetricsProvider for SystemMetrics {
    fn snapshot(&mut self, temp_units: &HashMap<String, TemperatureUnit>) -> MetricsSnapshot {
        let updated = self.refresh_due();
        if updated {
            self.cpu.update();
            self.gpu.update();
            self.last_refresh = Some(Instant::now());
        }

        let mut snapshot = assemble_snapshot(&self.cpu.reading(), &self.gpu.reading(), temp_units);
        snapshot.updated = updated;
        snapshot
    }

    fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }
}

/// Provider returning the same values every time
#[derive(Debug, Clone, Default)]
pub struct FixedMetrics(pub MetricsSnapshot);

impl MetricsProvider for FixedMetrics {
    fn snapshot(&mut self, temp_units: &HashMap<String, TemperatureUnit>) -> MetricsSnapshot {
        let mut snapshot = self.0.clone();
        snapshot.temp_units = temp_units.clone();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_readings_blank() {
        let snapshot = assemble_snapshot(
            &CpuReading::default(),
            &GpuReading::default(),
            &HashMap::new(),
        );
        for key in [
            "cpu_temp",
            "cpu_usage",
            "cpu_frequency",
            "cpu_power",
            "gpu_temp",
            "gpu_usage",
            "gpu_frequency",
            "gpu_power",
        ] {
            assert_eq!(snapshot.get(key), Some(MISSING_VALUE), "{}", key);
        }
    }

    #[test]
    fn test_unit_conversion() {
        let cpu = CpuReading {
            usage: Some(41.6),
            temperature: Some(50.0),
            frequency: Some(4200),
            power: Some(64.4),
        };
        let gpu = GpuReading {
            temperature: Some(60.5),
            utilization: Some(99),
            power: Some(210.0),
            clock: Some(1950),
        };
        let units = HashMap::from([("gpu".to_string(), TemperatureUnit::Fahrenheit)]);
        let snapshot = assemble_snapshot(&cpu, &gpu, &units);

        assert_eq!(snapshot.get("cpu_temp"), Some(50));
        assert_eq!(snapshot.get("cpu_usage"), Some(42));
        assert_eq!(snapshot.get("cpu_frequency"), Some(4200));
        assert_eq!(snapshot.get("cpu_power"), Some(64));
        assert_eq!(snapshot.get("gpu_temp"), Some(140));
        assert_eq!(snapshot.get("gpu_fahrenheit"), Some(1));
        assert_eq!(snapshot.get("cpu_celsius"), Some(1));
        assert_eq!(snapshot.get("gpu_frequency"), Some(1950));
    }

    #[test]
    fn test_fixed_metrics_takes_units() {
        let mut provider = FixedMetrics(MetricsSnapshot::new().with("cpu_temp", 70));
        let units = HashMap::from([("cpu".to_string(), TemperatureUnit::Fahrenheit)]);
        let snapshot = provider.snapshot(&units);
        assert_eq!(snapshot.get("cpu_temp"), Some(70));
        assert_eq!(snapshot.get("cpu_fahrenheit"), Some(1));
    }
}
