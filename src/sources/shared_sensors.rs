//! Shared temperature sensor components cache
//!
//! sysinfo's component discovery is slow, so a single `Components` list is
//! built on first use and refreshed at most every [`MIN_REFRESH_INTERVAL`].

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use sysinfo::Components;

/// Minimum interval between sensor refreshes
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

struct SharedSensors {
    components: Components,
    last_refresh: Instant,
}

impl SharedSensors {
    fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
            last_refresh: Instant::now(),
        }
    }

    fn refresh_if_needed(&mut self) {
        if self.last_refresh.elapsed() >= MIN_REFRESH_INTERVAL {
            self.components.refresh();
            self.last_refresh = Instant::now();
        }
    }
}

static SHARED_COMPONENTS: Lazy<Mutex<SharedSensors>> = Lazy::new(|| {
    let sensors = SharedSensors::new();
    log::info!("Found {} temperature sensors", sensors.components.len());
    for component in sensors.components.iter() {
        log::debug!("  {}: {:.1}°C", component.label(), component.temperature());
    }
    Mutex::new(sensors)
});

fn lock() -> MutexGuard<'static, SharedSensors> {
    // A poisoned lock still holds usable readings
    SHARED_COMPONENTS.lock().unwrap_or_else(|poisoned| {
        log::warn!("Shared sensors mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Labels of all temperature components, in discovery order
pub fn sensor_labels() -> Vec<String> {
    lock()
        .components
        .iter()
        .map(|c| c.label().to_string())
        .collect()
}

/// Temperature in Celsius of the component with `label` (refreshes if needed)
pub fn temperature_by_label(label: &str) -> Option<f32> {
    let mut sensors = lock();
    sensors.refresh_if_needed();
    sensors
        .components
        .iter()
        .find(|c| c.label() == label)
        .map(|c| c.temperature())
        .filter(|t| t.is_finite())
}

/// Force sensor discovery up front
pub fn initialize() {
    let _ = &*SHARED_COMPONENTS;
}
