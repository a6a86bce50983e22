//! Per-tick LED and color buffers

use led_sens_types::Rgb;

/// Lit flag per physical LED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedBuffer(Vec<bool>);

impl LedBuffer {
    pub fn new(led_count: usize) -> Self {
        Self(vec![false; led_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Indices are validated against the layout at load time
    pub(crate) fn set(&mut self, index: usize, lit: bool) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = lit;
        }
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn lit_count(&self) -> usize {
        self.0.iter().filter(|lit| **lit).count()
    }
}

impl From<Vec<bool>> for LedBuffer {
    fn from(leds: Vec<bool>) -> Self {
        Self(leds)
    }
}

/// Resolved color per physical LED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBuffer(Vec<Rgb>);

impl ColorBuffer {
    pub fn filled(led_count: usize, color: Rgb) -> Self {
        Self(vec![color; led_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Rgb {
        self.0.get(index).copied().unwrap_or(Rgb::BLACK)
    }

    pub(crate) fn set(&mut self, index: usize, color: Rgb) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = color;
        }
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.0
    }
}

impl From<Vec<Rgb>> for ColorBuffer {
    fn from(colors: Vec<Rgb>) -> Self {
        Self(colors)
    }
}

/// One rendered frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub leds: LedBuffer,
    pub colors: ColorBuffer,
}

impl Frame {
    /// Color that goes on the wire for `index`: black when unlit
    pub fn output_color(&self, index: usize) -> Rgb {
        if self.leds.get(index) {
            self.colors.get(index)
        } else {
            Rgb::BLACK
        }
    }
}
