//! Error types for GRIB2 decoding.

use thiserror::Error;

/// Result type alias using Grib2Error.
pub type Grib2Result<T> = Result<T, Grib2Error>;

/// Errors raised while scanning and decoding GRIB2 messages.
///
/// None of these are fatal to the caller: a failed field or message is
/// skipped by the scanner, and only [`Grib2Error::InsufficientData`] is
/// reported for a whole buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Grib2Error {
    // === Framing Errors ===
    #[error("Invalid GRIB2 format: {0}")]
    Format(String),

    #[error("Read of {len} bytes at offset {offset} exceeds available {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    // === Template Errors ===
    #[error("Unsupported template {template} in section {section}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("Unsupported bitmap indicator: {0}")]
    UnsupportedBitmap(u8),

    #[error("Unsupported missing value management: {0}")]
    UnsupportedMissingValues(u8),

    // === Data Errors ===
    #[error("Unpacking failed: {0}")]
    Unpacking(String),

    #[error("Insufficient data: decoded {found:?}, need PRMSL, UGRD and VGRD")]
    InsufficientData { found: Vec<&'static str> },
}

