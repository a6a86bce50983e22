//! Output transports for HID reports

mod hid;

pub use hid::{HidApiFactory, HidTransport};

use anyhow::Result;
use std::io;
use std::sync::{Arc, Mutex};

/// Open connection to the display
pub trait Transport: Send {
    /// Write one complete HID report
    fn write_report(&mut self, report: &[u8]) -> io::Result<()>;
}

/// Opens transports for a USB vendor/product id pair
pub trait TransportFactory: Send {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Box<dyn Transport>>;
}

/// Transport that records every report in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    reports: Arc<Mutex<Vec<Vec<u8>>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports written so far
    pub fn reports(&self) -> Vec<Vec<u8>> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.clear();
        }
    }

    /// Make subsequent writes fail as if the device was unplugged
    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut flag) = self.fail.lock() {
            *flag = fail;
        }
    }
}

impl Transport for MemoryTransport {
    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        if self.fail.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        self.reports
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "report log poisoned"))?
            .push(report.to_vec());
        Ok(())
    }
}

/// Factory handing out clones of one [`MemoryTransport`]
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    pub transport: MemoryTransport,
    /// Opened vendor/product id pairs, in order
    pub opened: Arc<Mutex<Vec<(u16, u16)>>>,
}

impl TransportFactory for MemoryFactory {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Box<dyn Transport>> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((vendor_id, product_id));
        }
        Ok(Box::new(self.transport.clone()))
    }
}

/// Transport printing reports as hex instead of writing to a device
#[derive(Debug, Default)]
pub struct DryRunTransport;

impl Transport for DryRunTransport {
    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        println!("{}", to_hex(report));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DryRunFactory;

impl TransportFactory for DryRunFactory {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Box<dyn Transport>> {
        log::info!("Dry run for {:04x}:{:04x}", vendor_id, product_id);
        Ok(Box::new(DryRunTransport))
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
