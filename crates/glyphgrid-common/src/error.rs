//! Error types for GlyphGrid.

use thiserror::Error;

/// Top-level error type for GlyphGrid operations.
#[derive(Debug, Error)]
pub enum GlyphGridError {
    /// Font resource errors
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    /// Drawing target errors
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors decoding a bitmap font resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FontError {
    /// Resource has fewer than four lines
    #[error("Font resource has no metrics line")]
    MissingMetrics,

    /// Metrics line has the wrong number of fields
    #[error("Expected 7 or 8 font metrics, found {found}")]
    MetricCount {
        /// Number of fields found
        found: usize,
    },

    /// A metric is not a number
    #[error("Font metric {index} is not numeric: '{value}'")]
    InvalidMetric {
        /// Zero-based metric position
        index: usize,
        /// Offending text
        value: String,
    },

    /// Glyph width or height is zero
    #[error("Font glyph size {width}x{height} is empty")]
    ZeroSizedGlyph {
        /// Declared glyph width
        width: u32,
        /// Resolved glyph height
        height: u32,
    },

    /// Glyph line is not `<codepoint>:<base64>`
    #[error("Malformed glyph on line {line}: {reason}")]
    MalformedGlyph {
        /// One-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// Glyph codepoint is not a valid character
    #[error("Invalid codepoint '{value}' on line {line}")]
    InvalidCodepoint {
        /// One-based line number
        line: usize,
        /// Offending text
        value: String,
    },
}

/// Drawing target errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Target cannot perform a required composite operator
    #[error("Drawing target does not support the {0} operator")]
    UnsupportedOperator(&'static str),

    /// Surface has no pixels
    #[error("Drawing surface {width}x{height} is empty")]
    EmptySurface {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings text could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    /// Settings failed to serialize
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    /// Settings parsed but are out of range
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Result type alias for GlyphGrid operations.
pub type GlyphGridResult<T> = Result<T, GlyphGridError>;
