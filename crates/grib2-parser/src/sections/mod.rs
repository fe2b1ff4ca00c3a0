//! GRIB2 section parsing.
//!
//! This module handles parsing of individual GRIB2 message sections.
//! Each section is decoded field-by-field through [`ByteReader`], so a
//! truncated or inconsistent section yields an error instead of an
//! out-of-range read.

use crate::error::{Grib2Error, Grib2Result};
use crate::reader::ByteReader;

pub use crate::reader::decode_grib2_signed;

/// "GRIB" magic at the start of Section 0.
pub const GRIB_MAGIC: &[u8; 4] = b"GRIB";

/// "7777" end-of-message marker (Section 8).
pub const END_MARKER: &[u8; 4] = b"7777";

/// Length of Section 0 in edition 2.
pub const INDICATOR_LEN: usize = 16;

/// Length of the common section header (4-byte length + section number).
pub const SECTION_HEADER_LEN: usize = 5;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub total_length: u64,
}

/// Location and size of one section within a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub number: u8,
    /// Offset of the section's first byte from the start of the message
    pub start: usize,
    /// Declared length including the 5-byte header
    pub length: usize,
}

impl SectionHeader {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// The section contents after the length and number octets.
    ///
    /// The header is only constructed once `end() <= message.len()` has been
    /// checked, so the range is always in bounds for the same message.
    pub fn body<'a>(&self, message: &'a [u8]) -> &'a [u8] {
        &message[self.start + SECTION_HEADER_LEN..self.end()]
    }
}

/// Section 3: Grid Definition Section (template 3.0 only)
#[derive(Debug, Clone, PartialEq)]
pub struct GridDefinition {
    pub template: u16,
    /// Ni - number of points along a parallel
    pub nx: u32,
    /// Nj - number of points along a meridian
    pub ny: u32,
    pub extent: Option<LatLonExtent>,
}

/// Corner coordinates of a regular lat/lon grid, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonExtent {
    pub first_lat: f64,
    pub first_lon: f64,
    pub last_lat: f64,
    pub last_lon: f64,
    pub scanning_mode: u8,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone, PartialEq)]
pub struct PackingDescriptor {
    /// Number of data points declared by the section
    pub value_count: u32,
    /// R - IEEE 32-bit reference value
    pub reference_value: f32,
    /// E - binary scale factor
    pub binary_scale: i16,
    /// D - decimal scale factor
    pub decimal_scale: i16,
    /// Bits per packed value (group reference width for complex packing)
    pub bits_per_value: u8,
    pub template: PackingTemplate,
}

/// Supported data representation templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackingTemplate {
    /// Template 5.0
    Simple,
    /// Template 5.2
    Complex(GroupDescriptor),
    /// Template 5.3
    ComplexSpatialDiff {
        groups: GroupDescriptor,
        spatial: SpatialDescriptor,
    },
}

impl PackingTemplate {
    pub fn number(&self) -> u16 {
        match self {
            PackingTemplate::Simple => 0,
            PackingTemplate::Complex(_) => 2,
            PackingTemplate::ComplexSpatialDiff { .. } => 3,
        }
    }
}

/// Group layout parameters shared by templates 5.2 and 5.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDescriptor {
    pub missing_value_management: u8,
    pub group_count: u32,
    /// Reference added to every decoded group width
    pub width_reference: u8,
    /// Bits used to encode each group width
    pub width_bits: u8,
    /// Reference added to every decoded group length
    pub length_reference: u32,
    /// Scale applied to every decoded group length
    pub length_increment: u8,
    /// Stored length of the last group, which overrides the decoded one
    pub true_last_length: u32,
    /// Bits used to encode each group length
    pub length_bits: u8,
}

/// Spatial differencing parameters of template 5.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialDescriptor {
    pub order: u8,
    /// Octets per extra descriptor at the start of Section 7
    pub extra_octets: u8,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from the start of a candidate message.
///
/// Validates the magic, the edition and that the declared total length is
/// at least a bare indicator and fits inside `data`.
pub fn parse_indicator(data: &[u8]) -> Grib2Result<Indicator> {
    let mut reader = ByteReader::new(data);
    if reader.bytes(4)? != GRIB_MAGIC {
        return Err(Grib2Error::Format("Invalid GRIB magic bytes".to_string()));
    }

    // Octets 5-6 reserved, octet 7 discipline, octet 8 edition
    reader.skip(2)?;
    let discipline = reader.u8()?;
    let edition = reader.u8()?;
    if edition != 2 {
        return Err(Grib2Error::Format(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let total_length = reader.u64_be()?;
    if total_length < INDICATOR_LEN as u64 {
        return Err(Grib2Error::Format(format!(
            "Message length {} is shorter than the indicator section",
            total_length
        )));
    }
    if total_length > data.len() as u64 {
        return Err(Grib2Error::Format(format!(
            "Message length {} exceeds remaining {} bytes",
            total_length,
            data.len()
        )));
    }

    Ok(Indicator {
        discipline,
        edition,
        total_length,
    })
}

/// Read the header of the section starting at `offset` within `message`.
pub fn read_section_header(message: &[u8], offset: usize) -> Grib2Result<SectionHeader> {
    let mut reader = ByteReader::at(message, offset);
    let length = reader.u32_be()? as usize;
    let number = reader.u8()?;

    if length < SECTION_HEADER_LEN || offset.saturating_add(length) > message.len() {
        return Err(Grib2Error::Format(format!(
            "Section {} at offset {} declares length {} beyond message end {}",
            number,
            offset,
            length,
            message.len()
        )));
    }

    Ok(SectionHeader {
        number,
        start: offset,
        length,
    })
}

/// Parse Section 3 (Grid Definition) body.
///
/// Only template 3.0 (regular latitude/longitude) is accepted.
pub fn parse_grid_definition(body: &[u8]) -> Grib2Result<GridDefinition> {
    // Body layout (offsets after the 5-byte header):
    // 0: source of grid definition
    // 1-4: number of data points
    // 5: octets for optional list
    // 6: interpretation of optional list
    // 7-8: grid definition template number
    // 9+: template data
    let mut reader = ByteReader::at(body, 7);
    let template = reader.u16_be()?;
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 3,
            template,
        });
    }

    // Template 3.0: shape of earth and radii (16 bytes), then Ni, Nj
    reader.skip(16)?;
    let nx = reader.u32_be()?;
    let ny = reader.u32_be()?;
    if nx == 0 || ny == 0 {
        return Err(Grib2Error::Format(format!(
            "Grid has empty dimensions {}x{}",
            nx, ny
        )));
    }

    Ok(GridDefinition {
        template,
        nx,
        ny,
        extent: parse_lat_lon_extent(body).ok(),
    })
}

/// Corner coordinates of template 3.0, in microdegrees on the wire.
fn parse_lat_lon_extent(body: &[u8]) -> Grib2Result<LatLonExtent> {
    const MICRODEGREES: f64 = 1_000_000.0;

    // Skip basic angle and subdivisions (template offsets 24-31)
    let mut reader = ByteReader::at(body, 41);
    let la1 = reader.i32_sm()?;
    let lo1 = reader.i32_sm()?;
    reader.skip(1)?; // resolution and component flags
    let la2 = reader.i32_sm()?;
    let lo2 = reader.i32_sm()?;
    reader.skip(8)?; // Di, Dj
    let scanning_mode = reader.u8()?;

    Ok(LatLonExtent {
        first_lat: la1 as f64 / MICRODEGREES,
        first_lon: lo1 as f64 / MICRODEGREES,
        last_lat: la2 as f64 / MICRODEGREES,
        last_lon: lo2 as f64 / MICRODEGREES,
        scanning_mode,
    })
}

/// Parse Section 4 (Product Definition) body.
pub fn parse_product_definition(body: &[u8]) -> Grib2Result<ProductDefinition> {
    // 0-1: number of coordinate values after template
    // 2-3: product definition template number
    // 4: parameter category
    // 5: parameter number
    let mut reader = ByteReader::at(body, 2);
    let template = reader.u16_be()?;
    let parameter_category = reader.u8()?;
    let parameter_number = reader.u8()?;

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
    })
}

/// Parse Section 5 (Data Representation) body.
pub fn parse_data_representation(body: &[u8]) -> Grib2Result<PackingDescriptor> {
    // 0-3: number of data points
    // 4-5: data representation template number
    // 6-9: reference value (R)
    // 10-11: binary scale factor (E)
    // 12-13: decimal scale factor (D)
    // 14: number of bits per packed value
    // 15: type of original field values
    let mut reader = ByteReader::new(body);
    let value_count = reader.u32_be()?;
    let template_number = reader.u16_be()?;
    let reference_value = reader.f32_be()?;
    let binary_scale = reader.i16_sm()?;
    let decimal_scale = reader.i16_sm()?;
    let bits_per_value = reader.u8()?;

    let template = match template_number {
        0 => PackingTemplate::Simple,
        2 => PackingTemplate::Complex(parse_group_descriptor(body)?),
        3 => {
            let groups = parse_group_descriptor(body)?;
            let mut reader = ByteReader::at(body, 42);
            let spatial = SpatialDescriptor {
                order: reader.u8()?,
                extra_octets: reader.u8()?,
            };
            PackingTemplate::ComplexSpatialDiff { groups, spatial }
        }
        other => {
            return Err(Grib2Error::UnsupportedTemplate {
                section: 5,
                template: other,
            })
        }
    };

    Ok(PackingDescriptor {
        value_count,
        reference_value,
        binary_scale,
        decimal_scale,
        bits_per_value,
        template,
    })
}

/// Group parameters of templates 5.2/5.3 (body offsets 16-41).
fn parse_group_descriptor(body: &[u8]) -> Grib2Result<GroupDescriptor> {
    let mut reader = ByteReader::at(body, 16);
    reader.skip(1)?; // group splitting method
    let missing_value_management = reader.u8()?;
    if missing_value_management != 0 {
        return Err(Grib2Error::UnsupportedMissingValues(
            missing_value_management,
        ));
    }
    reader.skip(8)?; // primary and secondary missing value substitutes

    Ok(GroupDescriptor {
        missing_value_management,
        group_count: reader.u32_be()?,
        width_reference: reader.u8()?,
        width_bits: reader.u8()?,
        length_reference: reader.u32_be()?,
        length_increment: reader.u8()?,
        true_last_length: reader.u32_be()?,
        length_bits: reader.u8()?,
    })
}

/// Check Section 6 (Bitmap) body: only "no bitmap" (255) is supported.
pub fn check_bitmap(body: &[u8]) -> Grib2Result<()> {
    const NO_BITMAP: u8 = 255;

    match ByteReader::new(body).u8()? {
        NO_BITMAP => Ok(()),
        indicator => Err(Grib2Error::UnsupportedBitmap(indicator)),
    }
}
