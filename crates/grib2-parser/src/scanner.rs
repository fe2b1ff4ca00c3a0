//! Message scanning and field collection.
//!
//! [`MessageScanner`] walks a buffer that may hold any number of
//! concatenated GRIB2 messages mixed with noise, and [`decode_weather_fields`]
//! drives section decoding for each message until the pressure and both wind
//! components have been collected.

use tracing::{debug, warn};

use crate::error::{Grib2Error, Grib2Result};
use crate::sections::{
    check_bitmap, parse_data_representation, parse_grid_definition, parse_indicator,
    parse_product_definition, read_section_header, GridDefinition, Indicator,
    PackingDescriptor, ProductDefinition, END_MARKER, GRIB_MAGIC, INDICATOR_LEN,
    SECTION_HEADER_LEN,
};
use crate::tables::{parameter_short_name, TargetParameter};
use crate::unpacking::unpack_values;

/// Upper bound on grid points accepted from a grid definition.
pub const MAX_GRID_POINTS: usize = 64 * 1024 * 1024;

/// One decoded meteorological field on an `nx` x `ny` grid, row-major.
///
/// `values` may be shorter than `nx * ny` when the data section declared
/// fewer points than the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub values: Vec<f32>,
    pub nx: usize,
    pub ny: usize,
}

impl DecodedField {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at grid column `x`, row `y`, if decoded.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.nx || y >= self.ny {
            return None;
        }
        self.values.get(y * self.nx + x).copied()
    }

    /// Minimum and maximum of the non-NaN values.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// The three fields needed to draw the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherFields {
    /// Mean sea level pressure in hPa
    pub pressure: DecodedField,
    /// Eastward wind in m/s
    pub u_wind: DecodedField,
    /// Northward wind in m/s
    pub v_wind: DecodedField,
}

/// A located GRIB2 message.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    /// Offset of the "GRIB" magic within the scanned buffer
    pub offset: usize,
    pub indicator: Indicator,
    /// The whole message, Section 0 through "7777"
    pub bytes: &'a [u8],
}

/// Iterator over the GRIB2 edition 2 messages in a byte buffer.
///
/// Bytes that are not the start of a valid edition 2 message are skipped, so
/// leading noise, other editions and trailing garbage are tolerated.
#[derive(Debug, Clone)]
pub struct MessageScanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MessageScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for MessageScanner<'a> {
    type Item = Message<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos + INDICATOR_LEN <= self.data.len() {
            let candidate = &self.data[self.pos..];
            if !candidate.starts_with(GRIB_MAGIC) {
                self.pos += 1;
                continue;
            }

            match parse_indicator(candidate) {
                Ok(indicator) => {
                    let offset = self.pos;
                    // parse_indicator checked the length fits in `candidate`
                    let len = indicator.total_length as usize;
                    self.pos += len;
                    return Some(Message {
                        offset,
                        indicator,
                        bytes: &candidate[..len],
                    });
                }
                Err(e) => {
                    debug!(offset = self.pos, error = %e, "Skipping GRIB candidate");
                    self.pos += 1;
                }
            }
        }
        None
    }
}

/// Section state accumulated while walking one message.
///
/// A section that fails to parse clears its slot, which abandons any field
/// whose data section follows before a valid replacement is seen.
#[derive(Debug, Default)]
struct FieldContext {
    grid: Option<GridDefinition>,
    product: Option<ProductDefinition>,
    packing: Option<PackingDescriptor>,
    bitmap_absent: bool,
}

impl FieldContext {
    /// Decode a data section against the preceding sections.
    ///
    /// Returns `Ok(None)` for parameters the overlay does not use.
    fn decode_data(
        &self,
        discipline: u8,
        body: &[u8],
    ) -> Grib2Result<Option<(TargetParameter, DecodedField)>> {
        let Some(product) = self.product else {
            return Err(Grib2Error::Format(
                "Data section without a product definition".to_string(),
            ));
        };
        let key = (discipline, product.parameter_category, product.parameter_number);
        let Some(target) = TargetParameter::from_key(key) else {
            debug!(parameter = %parameter_short_name(key), "Ignoring parameter");
            return Ok(None);
        };

        let grid = self.grid.as_ref().ok_or_else(|| {
            Grib2Error::Format("No usable grid definition for field".to_string())
        })?;
        let packing = self.packing.as_ref().ok_or_else(|| {
            Grib2Error::Format("No usable data representation for field".to_string())
        })?;
        if !self.bitmap_absent {
            return Err(Grib2Error::Format(
                "Field has a bitmap or no bitmap section".to_string(),
            ));
        }

        let nx = grid.nx as usize;
        let ny = grid.ny as usize;
        let points = nx
            .checked_mul(ny)
            .filter(|&n| n <= MAX_GRID_POINTS)
            .ok_or_else(|| Grib2Error::Format(format!("Grid {}x{} is too large", nx, ny)))?;

        let mut values = unpack_values(body, packing, points)?;
        if values.is_empty() {
            return Err(Grib2Error::Unpacking("Field decoded no values".to_string()));
        }

        let divisor = target.display_divisor();
        if divisor != 1.0 {
            values.iter_mut().for_each(|v| *v /= divisor);
        }

        debug!(
            parameter = target.short_name(),
            nx,
            ny,
            values = values.len(),
            template = packing.template.number(),
            "Decoded field"
        );

        Ok(Some((target, DecodedField { values, nx, ny })))
    }
}

/// Collects the target fields across messages.
#[derive(Debug, Default)]
struct FieldCollector {
    pressure: Option<DecodedField>,
    u_wind: Option<DecodedField>,
    v_wind: Option<DecodedField>,
}

impl FieldCollector {
    fn insert(&mut self, target: TargetParameter, field: DecodedField) {
        let slot = match target {
            TargetParameter::Prmsl => &mut self.pressure,
            TargetParameter::Ugrd => &mut self.u_wind,
            TargetParameter::Vgrd => &mut self.v_wind,
        };
        *slot = Some(field);
    }

    fn is_complete(&self) -> bool {
        self.pressure.is_some() && self.u_wind.is_some() && self.v_wind.is_some()
    }

    fn finish(self) -> Grib2Result<WeatherFields> {
        match (self.pressure, self.u_wind, self.v_wind) {
            (Some(pressure), Some(u_wind), Some(v_wind)) => Ok(WeatherFields {
                pressure,
                u_wind,
                v_wind,
            }),
            (pressure, u_wind, v_wind) => {
                let found = [
                    (pressure.is_some(), TargetParameter::Prmsl),
                    (u_wind.is_some(), TargetParameter::Ugrd),
                    (v_wind.is_some(), TargetParameter::Vgrd),
                ]
                .into_iter()
                .filter(|(present, _)| *present)
                .map(|(_, target)| target.short_name())
                .collect();
                Err(Grib2Error::InsufficientData { found })
            }
        }
    }
}

/// Walk the sections of one message, feeding decoded fields to `collector`.
///
/// A framing error abandons the rest of the message; errors in individual
/// sections only abandon the field they belong to.
fn decode_message(message: &Message<'_>, collector: &mut FieldCollector) {
    let bytes = message.bytes;
    let discipline = message.indicator.discipline;
    let mut ctx = FieldContext::default();
    let mut offset = INDICATOR_LEN;

    while offset + SECTION_HEADER_LEN <= bytes.len() {
        if bytes[offset..].starts_with(END_MARKER) {
            break;
        }

        let header = match read_section_header(bytes, offset) {
            Ok(header) => header,
            Err(e) => {
                warn!(message = message.offset, error = %e, "Abandoning message");
                return;
            }
        };
        let body = header.body(bytes);

        match header.number {
            1 | 2 => {}
            3 => ctx.grid = keep_or_log(3, parse_grid_definition(body)),
            4 => ctx.product = keep_or_log(4, parse_product_definition(body)),
            5 => ctx.packing = keep_or_log(5, parse_data_representation(body)),
            6 => ctx.bitmap_absent = keep_or_log(6, check_bitmap(body)).is_some(),
            7 => match ctx.decode_data(discipline, body) {
                Ok(Some((target, field))) => collector.insert(target, field),
                Ok(None) => {}
                Err(e) => warn!(message = message.offset, error = %e, "Skipping field"),
            },
            other => debug!(section = other, "Ignoring unknown section"),
        }

        offset = header.end();
    }
}

fn keep_or_log<T>(section: u8, result: Grib2Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section, error = %e, "Section rejected, field abandoned");
            None
        }
    }
}

/// Decode PRMSL, UGRD and VGRD from a buffer of GRIB2 messages.
///
/// Scanning stops as soon as all three fields have been collected. Fails with
/// [`Grib2Error::InsufficientData`] if any of them is missing; this never
/// panics on malformed input.
pub fn decode_weather_fields(data: &[u8]) -> Grib2Result<WeatherFields> {
    let mut collector = FieldCollector::default();

    for message in MessageScanner::new(data) {
        debug!(
            offset = message.offset,
            length = message.indicator.total_length,
            discipline = message.indicator.discipline,
            "Found GRIB2 message"
        );
        decode_message(&message, &mut collector);
        if collector.is_complete() {
            break;
        }
    }

    collector.finish()
}
