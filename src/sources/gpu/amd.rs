//! AMD GPU backend using sysfs

use super::backend::{GpuBackend, GpuInfo, GpuReading, GpuVendor};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const AMD_VENDOR_ID: u32 = 0x1002;

/// AMD GPU backend
pub struct AmdBackend {
    info: GpuInfo,
    reading: GpuReading,
    device_path: PathBuf,
    hwmon_path: Option<PathBuf>,
}

impl AmdBackend {
    /// Backend for `/sys/class/drm/card<index>`
    pub fn new(card_index: u32) -> Result<Self> {
        let device_path = PathBuf::from(format!("/sys/class/drm/card{}/device", card_index));
        Self::from_device_path(device_path, card_index)
    }

    pub fn from_device_path(device_path: PathBuf, card_index: u32) -> Result<Self> {
        if !device_path.exists() {
            return Err(anyhow!("AMD GPU card{} not found", card_index));
        }

        let vendor_id = read_hex_file(&device_path.join("vendor"))?;
        if vendor_id != AMD_VENDOR_ID {
            return Err(anyhow!(
                "card{} is not an AMD GPU (vendor ID: 0x{:04x})",
                card_index,
                vendor_id
            ));
        }

        let name = read_hex_file(&device_path.join("device"))
            .ok()
            .and_then(gpu_name)
            .unwrap_or_else(|| format!("AMD GPU {}", card_index));
        let hwmon_path = find_hwmon_path(&device_path)?;

        Ok(Self {
            info: GpuInfo {
                index: card_index,
                name,
                vendor: GpuVendor::Amd,
            },
            reading: GpuReading::default(),
            device_path,
            hwmon_path,
        })
    }

    fn read_temperature(&self) -> Option<f32> {
        let hwmon = self.hwmon_path.as_ref()?;
        ["temp1_input", "temp2_input", "temp3_input"]
            .iter()
            .find_map(|file| read_int_file(&hwmon.join(file)).ok())
            // millidegrees
            .map(|value| value as f32 / 1000.0)
    }

    fn read_utilization(&self) -> Option<u32> {
        read_int_file(&self.device_path.join("gpu_busy_percent"))
            .ok()
            .map(|v| v.clamp(0, 100) as u32)
    }

    fn read_power(&self) -> Option<f32> {
        let hwmon = self.hwmon_path.as_ref()?;
        ["power1_average", "power1_input"]
            .iter()
            .find_map(|file| read_int_file(&hwmon.join(file)).ok())
            // microwatts
            .map(|value| value as f32 / 1_000_000.0)
    }

    fn read_clock(&self) -> Option<u32> {
        let content = fs::read_to_string(self.device_path.join("pp_dpm_sclk")).ok()?;
        active_dpm_clock(&content)
    }
}

fn read_hex_file(path: &Path) -> Result<u32> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let trimmed = content.trim().trim_start_matches("0x");
    u32::from_str_radix(trimmed, 16)
        .with_context(|| format!("Failed to parse hex value from {}", path.display()))
}

fn read_int_file(path: &Path) -> Result<i64> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .trim()
        .parse::<i64>()
        .with_context(|| format!("Failed to parse integer from {}", path.display()))
}

fn find_hwmon_path(device_path: &Path) -> Result<Option<PathBuf>> {
    let hwmon_dir = device_path.join("hwmon");
    if !hwmon_dir.exists() {
        return Ok(None);
    }

    for entry in fs::read_dir(&hwmon_dir)? {
        let path = entry?.path();
        let is_hwmon = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("hwmon"));
        if path.is_dir() && is_hwmon {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn gpu_name(device_id: u32) -> Option<String> {
    let name = match device_id {
        0x67DF => "RX 480/470",
        0x687F => "Vega 56/64",
        0x731F => "RX 5700 XT",
        0x73BF => "RX 6900 XT",
        0x73DF => "RX 6700 XT",
        0x744C => "RX 7900 XTX",
        0x7480 => "RX 7600",
        _ => return None,
    };
    Some(format!("AMD Radeon {}", name))
}

/// Clock of the active DPM level, marked with `*`: `"1: 1200Mhz *"`
fn active_dpm_clock(content: &str) -> Option<u32> {
    content
        .lines()
        .filter(|line| line.contains('*'))
        .find_map(|line| {
            let (_, clock) = line.split_once(':')?;
            clock
                .trim()
                .trim_end_matches('*')
                .trim()
                .to_ascii_lowercase()
                .trim_end_matches("mhz")
                .parse::<u32>()
                .ok()
        })
}

impl GpuBackend for AmdBackend {
    fn info(&self) -> &GpuInfo {
        &self.info
    }

    fn update(&mut self) -> Result<()> {
        self.reading = GpuReading {
            temperature: self.read_temperature(),
            utilization: self.read_utilization(),
            power: self.read_power(),
            clock: self.read_clock(),
        };
        Ok(())
    }

    fn reading(&self) -> GpuReading {
        self.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_dpm_clock() {
        assert_eq!(active_dpm_clock("0: 500Mhz\n1: 1800Mhz *\n2: 2400Mhz\n"), Some(1800));
        assert_eq!(active_dpm_clock("0: 500Mhz\n"), None);
    }

    #[test]
    fn test_sysfs_card() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("device");
        let hwmon = device.join("hwmon").join("hwmon3");
        fs::create_dir_all(&hwmon).unwrap();
        fs::write(device.join("vendor"), "0x1002\n").unwrap();
        fs::write(device.join("device"), "0x73bf\n").unwrap();
        fs::write(device.join("gpu_busy_percent"), "37\n").unwrap();
        fs::write(device.join("pp_dpm_sclk"), "0: 500Mhz\n1: 2100Mhz *\n").unwrap();
        fs::write(hwmon.join("temp1_input"), "54000\n").unwrap();
        fs::write(hwmon.join("power1_average"), "123000000\n").unwrap();

        let mut backend = AmdBackend::from_device_path(device, 0).unwrap();
        assert_eq!(backend.info().name, "AMD Radeon RX 6900 XT");
        backend.update().unwrap();
        assert_eq!(
            backend.reading(),
            GpuReading {
                temperature: Some(54.0),
                utilization: Some(37),
                power: Some(123.0),
                clock: Some(2100),
            }
        );
    }

    #[test]
    fn test_rejects_other_vendors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vendor"), "0x10de\n").unwrap();
        assert!(AmdBackend::from_device_path(dir.path().to_path_buf(), 1).is_err());
    }
}
