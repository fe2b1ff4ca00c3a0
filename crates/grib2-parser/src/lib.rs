//! GRIB2 decoder for the weather overlay (WMO FM 92 GRIB Edition 2).
//!
//! This crate provides a pure Rust decoder for the subset of GRIB2 needed to
//! draw pressure contours and wind arrows: regular lat/lon grids (template
//! 3.0) packed with simple (5.0), complex (5.2) or complex packing with
//! spatial differencing (5.3).
//!
//! ```no_run
//! let data = std::fs::read("gfs.t00z.pgrb2.0p25.f000").unwrap();
//! let fields = grib2_parser::decode_weather_fields(&data).unwrap();
//! println!("{}x{} pressure grid", fields.pressure.nx, fields.pressure.ny);
//! ```

pub mod error;
pub mod reader;
pub mod scanner;
pub mod sections;
pub mod tables;
pub mod unpacking;

pub use error::{Grib2Error, Grib2Result};
pub use scanner::{
    decode_weather_fields, DecodedField, Message, MessageScanner, WeatherFields, MAX_GRID_POINTS,
};
pub use sections::{GridDefinition, PackingDescriptor, PackingTemplate, ProductDefinition};
pub use tables::TargetParameter;
pub use unpacking::{read_bits, BitReader};
