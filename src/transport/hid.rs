//! USB HID transport through hidapi

use anyhow::{Context, Result};
use hidapi::{HidApi, HidDevice};
use std::io;

use super::{Transport, TransportFactory};

/// Opens the first HID device matching a vendor/product id pair
#[derive(Debug, Default)]
pub struct HidApiFactory;

impl TransportFactory for HidApiFactory {
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Box<dyn Transport>> {
        // A fresh context per attempt picks up devices plugged in since the last one
        let api = HidApi::new().context("Failed to initialize hidapi")?;
        let device = api
            .open(vendor_id, product_id)
            .with_context(|| format!("No HID device {:04x}:{:04x}", vendor_id, product_id))?;
        log::info!("Opened HID device {:04x}:{:04x}", vendor_id, product_id);
        Ok(Box::new(HidTransport { device }))
    }
}

/// Open hidapi device handle
pub struct HidTransport {
    device: HidDevice,
}

impl Transport for HidTransport {
    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        let written = self
            .device
            .write(report)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        check_written(written, report.len())
    }
}

/// A report is only delivered when every byte went out
fn check_written(written: usize, expected: usize) -> io::Result<()> {
    if written < expected {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short HID write: {} of {} bytes", written, expected),
        ));
    }
    Ok(())
}
