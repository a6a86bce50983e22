//! HID report framing
//!
//! A frame goes on the wire as `header ++ triplets`, one triplet per LED in
//! physical order (black when unlit, channels in the layout's order). The
//! stream is cut into `chunk_size` pieces, the last one zero-padded, and each
//! piece is prefixed with the report ID.

use led_sens_types::ProtocolConfig;

use crate::error::{RenderError, Result};
use crate::frame::Frame;
use crate::layout::DeviceLayout;

/// One HID output report, report-ID byte included
pub type Report = Vec<u8>;

#[derive(Debug, Clone, PartialEq)]
pub struct PacketEncoder {
    led_count: usize,
    protocol: ProtocolConfig,
}

impl PacketEncoder {
    pub fn new(led_count: usize, protocol: ProtocolConfig) -> Self {
        Self { led_count, protocol }
    }

    pub fn for_layout(layout: &DeviceLayout) -> Self {
        Self::new(layout.led_count(), layout.protocol().clone())
    }

    /// Bytes per report, report ID included
    pub fn report_len(&self) -> usize {
        self.protocol.chunk_size + 1
    }

    /// Unframed byte stream: header followed by one triplet per LED
    pub fn payload(&self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.leds.len() != self.led_count || frame.colors.len() != self.led_count {
            return Err(RenderError::config(format!(
                "frame has {} LEDs and {} colors but the layout has {} LEDs",
                frame.leds.len(),
                frame.colors.len(),
                self.led_count
            )));
        }

        let mut payload = Vec::with_capacity(self.protocol.header.len() + self.led_count * 3);
        payload.extend_from_slice(&self.protocol.header);
        for index in 0..self.led_count {
            let color = frame.output_color(index);
            payload.extend(self.protocol.channel_order.apply(color.r, color.g, color.b));
        }
        Ok(payload)
    }

    /// Reports for one frame
    pub fn encode(&self, frame: &Frame) -> Result<Vec<Report>> {
        let payload = self.payload(frame)?;
        Ok(self.frame_reports(&payload))
    }

    /// Reports sent once after the device opens; empty when the layout has none
    pub fn init_reports(&self) -> Vec<Report> {
        self.protocol
            .init_report
            .as_deref()
            .map(|payload| self.frame_reports(payload))
            .unwrap_or_default()
    }

    fn frame_reports(&self, payload: &[u8]) -> Vec<Report> {
        let chunk_size = self.protocol.chunk_size.max(1);
        payload
            .chunks(chunk_size)
            .map(|chunk| {
                let mut report = Vec::with_capacity(chunk_size + 1);
                report.push(self.protocol.report_id);
                report.extend_from_slice(chunk);
                report.resize(chunk_size + 1, 0);
                report
            })
            .collect()
    }
}
