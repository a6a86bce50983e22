//! CPU readings: usage, temperature, frequency and package power

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use super::shared_sensors;

/// Powercap root holding the RAPL energy counters
const POWERCAP_ROOT: &str = "/sys/class/powercap";

/// Latest CPU readings, temperatures in Celsius
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuReading {
    pub usage: Option<f32>,
    pub temperature: Option<f32>,
    /// MHz
    pub frequency: Option<u64>,
    /// Watts
    pub power: Option<f32>,
}

/// CPU package power from a RAPL energy counter
#[derive(Debug)]
pub struct RaplMeter {
    energy_path: PathBuf,
    /// Counter wrap value in microjoules
    max_energy_uj: u64,
    last: Option<(u64, Instant)>,
}

impl RaplMeter {
    /// First `intel-rapl`/`amd-rapl` package domain under `root`
    pub fn discover(root: &Path) -> Result<Self> {
        let mut domains: Vec<PathBuf> = fs::read_dir(root)
            .with_context(|| format!("Failed to list {}", root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("intel-rapl:") || n.starts_with("amd-rapl:"))
            })
            .filter(|path| path.join("energy_uj").is_file())
            .collect();
        domains.sort();

        let domain = domains
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No RAPL energy counter under {}", root.display()))?;
        let max_energy_uj = read_u64(&domain.join("max_energy_range_uj")).unwrap_or(1 << 32);

        Ok(Self {
            energy_path: domain.join("energy_uj"),
            max_energy_uj,
            last: None,
        })
    }

    /// Average power since the previous call; `None` on the first sample
    pub fn sample(&mut self) -> Option<f32> {
        let energy = read_u64(&self.energy_path).ok()?;
        let now = Instant::now();
        let previous = self.last.replace((energy, now));
        let (prev_energy, prev_time) = previous?;

        let elapsed = now.duration_since(prev_time).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let delta = if energy >= prev_energy {
            energy - prev_energy
        } else {
            // counter wrapped
            self.max_energy_uj - prev_energy + energy
        };
        Some((delta as f64 / 1_000_000.0 / elapsed) as f32)
    }
}

fn read_u64(path: &Path) -> Result<u64> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse integer from {}", path.display()))
}

/// Pick the CPU temperature sensor: package sensors first, then per-core ones
fn pick_cpu_sensor(labels: &[String]) -> Option<String> {
    let find = |keys: &[&str]| {
        labels
            .iter()
            .find(|label| {
                let lower = label.to_lowercase();
                keys.iter().any(|key| lower.contains(key))
            })
            .cloned()
    };
    find(&["cpu", "package", "tctl"]).or_else(|| find(&["core"]))
}

/// CPU monitor backed by sysinfo
pub struct CpuMonitor {
    system: System,
    sensor_label: Option<String>,
    rapl: Option<RaplMeter>,
    reading: CpuReading,
}

impl CpuMonitor {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::everything()),
        );

        let sensor_label = pick_cpu_sensor(&shared_sensors::sensor_labels());
        match &sensor_label {
            Some(label) => log::info!("CPU temperature sensor: {}", label),
            None => log::warn!("No CPU temperature sensor found"),
        }

        let rapl = match RaplMeter::discover(Path::new(POWERCAP_ROOT)) {
            Ok(meter) => Some(meter),
            Err(e) => {
                log::info!("CPU power unavailable: {:#}", e);
                None
            }
        };

        Self {
            system,
            sensor_label,
            rapl,
            reading: CpuReading::default(),
        }
    }

    pub fn update(&mut self) {
        self.system.refresh_cpu_all();

        self.reading = CpuReading {
            usage: Some(self.system.global_cpu_usage()),
            temperature: self
                .sensor_label
                .as_deref()
                .and_then(shared_sensors::temperature_by_label),
            frequency: self.system.cpus().first().map(|cpu| cpu.frequency()),
            power: self.rapl.as_mut().and_then(RaplMeter::sample),
        };
    }

    pub fn reading(&self) -> CpuReading {
        self.reading
    }
}

impl Default for CpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_preference() {
        let labels = vec![
            "nvme Composite".to_string(),
            "coretemp Core 0".to_string(),
            "coretemp Package id 0".to_string(),
        ];
        assert_eq!(pick_cpu_sensor(&labels).as_deref(), Some("coretemp Package id 0"));

        let cores = vec!["acpitz".to_string(), "coretemp Core 1".to_string()];
        assert_eq!(pick_cpu_sensor(&cores).as_deref(), Some("coretemp Core 1"));
        assert_eq!(pick_cpu_sensor(&["acpitz".to_string()]), None);
    }

    #[test]
    fn test_rapl_discovery_and_wrap() {
        let root = tempfile::tempdir().unwrap();
        let domain = root.path().join("intel-rapl:0");
        fs::create_dir(&domain).unwrap();
        fs::create_dir(root.path().join("intel-rapl")).unwrap();
        fs::write(domain.join("energy_uj"), "999000000\n").unwrap();
        fs::write(domain.join("max_energy_range_uj"), "1000000000\n").unwrap();

        let mut meter = RaplMeter::discover(root.path()).unwrap();
        assert_eq!(meter.sample(), None);

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(domain.join("energy_uj"), "1000000\n").unwrap();
        let power = meter.sample().unwrap();
        assert!(power > 0.0);
    }

    #[test]
    fn test_rapl_missing() {
        let root = tempfile::tempdir().unwrap();
        assert!(RaplMeter::discover(root.path()).is_err());
    }
}
