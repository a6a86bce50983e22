//! Render error taxonomy

use thiserror::Error;

/// Errors produced while building or rendering a frame
///
/// Per-field errors are logged and the field skipped; only structural problems
/// (empty layout, no resolvable mode) reach the caller of a render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed or missing layout, mode or palette data
    #[error("configuration error: {0}")]
    Config(String),

    /// Value does not fit the field it is written to
    #[error("value {value} exceeds field capacity (must be below {ceiling})")]
    Domain { value: i64, ceiling: i64 },

    /// Unknown group, metric key or glyph
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Transport write failure
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn config(msg: impl Into<String>) -> Self {
        RenderError::Config(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        RenderError::Lookup(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
