//! The render loop: metrics in, HID reports out, once per tick

use arc_swap::ArcSwap;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use led_sens_core::{ColorBuffer, Frame, LedBuffer, MetricsSnapshot, Report, Rgb};

use super::{ConfigWatcher, RenderState};
use crate::config::AppConfig;
use crate::sources::MetricsProvider;
use crate::transport::{Transport, TransportFactory};

/// Delay before reopening a missing or failed device
pub const DEVICE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

pub struct Controller {
    state: Arc<ArcSwap<RenderState>>,
    watcher: Option<ConfigWatcher>,
    metrics: Box<dyn MetricsProvider>,
    factory: Box<dyn TransportFactory>,
    device: Option<Box<dyn Transport>>,
    device_ids: Option<(u16, u16)>,
    retry_at: Option<Instant>,
    tick: u64,
    shutdown: Arc<AtomicBool>,
}

impl Controller {
    pub fn new(
        state: RenderState,
        metrics: Box<dyn MetricsProvider>,
        factory: Box<dyn TransportFactory>,
    ) -> Self {
        let mut metrics = metrics;
        metrics.set_refresh_interval(state.metrics_update_interval);
        Self {
            state: Arc::new(ArcSwap::from_pointee(state)),
            watcher: None,
            metrics,
            factory,
            device: None,
            device_ids: None,
            retry_at: None,
            tick: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reload the config whenever the watched file changes
    pub fn with_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Shared handle to the current render state
    pub fn state(&self) -> Arc<ArcSwap<RenderState>> {
        Arc::clone(&self.state)
    }

    /// Flag that stops [`Controller::run`] once set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Rebuild the render state from `config`; a config that fails to build
    /// leaves the current state in place
    pub fn apply_config(&mut self, config: &AppConfig) {
        match RenderState::from_config(config) {
            Ok(state) => {
                self.metrics.set_refresh_interval(state.metrics_update_interval);
                self.state.store(Arc::new(state));
            }
            Err(e) => log::warn!("Ignoring config change: {:#}", e),
        }
    }

    /// Run one tick and return how long to wait before the next one
    pub fn step(&mut self) -> Duration {
        if let Some(config) = self.watcher.as_mut().and_then(ConfigWatcher::poll) {
            self.apply_config(&config);
        }

        let state = self.state.load_full();
        self.ensure_device(&state);
        if self.device.is_none() {
            return state.update_interval;
        }

        let snapshot = self.metrics.snapshot(&state.temp_units);
        if snapshot.updated {
            log::debug!("Metrics refreshed at tick {}", self.tick);
        }

        let reports = render_reports(&state, self.tick, &snapshot);
        if self.send(&reports) {
            self.tick = state.engine.next_tick(self.tick);
        }
        state.update_interval
    }

    /// Tick until shutdown, or until `max_ticks` ticks have run
    pub fn run(&mut self, max_ticks: Option<u64>) {
        let mut ticks = 0u64;
        while !self.shutdown.load(Ordering::SeqCst) {
            if max_ticks.map_or(false, |max| ticks >= max) {
                break;
            }
            let started = Instant::now();
            let interval = self.step();
            ticks += 1;

            if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        log::info!("Stopped after {} ticks", ticks);
    }

    fn ensure_device(&mut self, state: &RenderState) {
        let ids = state.usb_ids();
        if self.device_ids != Some(ids) {
            if self.device.take().is_some() {
                log::info!("USB ids changed to {:04x}:{:04x}, reopening", ids.0, ids.1);
            }
            self.device_ids = Some(ids);
            self.retry_at = None;
        }

        if self.device.is_some() || self.retry_at.map_or(false, |at| Instant::now() < at) {
            return;
        }

        match self.factory.open(ids.0, ids.1) {
            Ok(device) => {
                self.device = Some(device);
                self.retry_at = None;
                if !self.send(&state.encoder.init_reports()) {
                    return;
                }
            }
            Err(e) => {
                log::warn!(
                    "{:#}, retrying in {}s",
                    e,
                    DEVICE_RETRY_INTERVAL.as_secs()
                );
                self.retry_at = Some(Instant::now() + DEVICE_RETRY_INTERVAL);
            }
        }
    }

    /// Write `reports` in order; `false` if the device is gone or a write failed
    fn send(&mut self, reports: &[Report]) -> bool {
        let Some(device) = self.device.as_mut() else {
            return false;
        };
        for report in reports {
            if let Err(e) = device.write_report(report) {
                log::warn!(
                    "Device write failed: {}, reopening in {}s",
                    e,
                    DEVICE_RETRY_INTERVAL.as_secs()
                );
                self.device = None;
                self.retry_at = Some(Instant::now() + DEVICE_RETRY_INTERVAL);
                return false;
            }
        }
        true
    }
}

/// Reports for one tick; a frame that fails to render goes out blank
fn render_reports(state: &RenderState, tick: u64, snapshot: &MetricsSnapshot) -> Vec<Report> {
    let led_count = state.engine.layout().led_count();
    let now = Local::now().time();

    let frame = state
        .engine
        .render(&state.display_mode, tick, snapshot, now)
        .unwrap_or_else(|e| {
            log::warn!("Render failed at tick {}: {}", tick, e);
            Frame {
                leds: LedBuffer::new(led_count),
                colors: ColorBuffer::filled(led_count, Rgb::BLACK),
            }
        });

    state.encoder.encode(&frame).unwrap_or_else(|e| {
        log::warn!("Encoding failed at tick {}: {}", tick, e);
        Vec::new()
    })
}
