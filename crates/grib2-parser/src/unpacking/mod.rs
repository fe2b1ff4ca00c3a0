//! GRIB2 data unpacking algorithms.
//!
//! Implements the supported packing methods:
//! - Simple packing (template 5.0)
//! - Complex packing (template 5.2)
//! - Complex packing with spatial differencing (template 5.3)
//!
//! All three share the simple packing formula:
//! `value = (R + X * 2^E) / 10^D`

pub mod bits;

pub use bits::{read_bits, BitReader};

use crate::error::{Grib2Error, Grib2Result};
use crate::reader::ByteReader;
use crate::sections::{GroupDescriptor, PackingDescriptor, PackingTemplate, SpatialDescriptor};

/// Converts packed integers to physical values.
#[derive(Debug, Clone, Copy)]
struct Scaling {
    reference: f64,
    binary: f64,
    decimal: f64,
}

impl Scaling {
    fn new(desc: &PackingDescriptor) -> Self {
        Self {
            reference: desc.reference_value as f64,
            binary: 2.0_f64.powi(desc.binary_scale as i32),
            decimal: 10.0_f64.powi(desc.decimal_scale as i32),
        }
    }

    #[inline]
    fn apply(&self, packed: f64) -> f32 {
        ((self.reference + packed * self.binary) / self.decimal) as f32
    }
}

/// Unpack a data section into at most `count` physical values.
pub fn unpack_values(data: &[u8], desc: &PackingDescriptor, count: usize) -> Grib2Result<Vec<f32>> {
    let scaling = Scaling::new(desc);
    let count = count.min(desc.value_count as usize);

    let integers = match &desc.template {
        PackingTemplate::Simple => return unpack_simple(data, desc, count),
        PackingTemplate::Complex(groups) => {
            unpack_complex(data, desc.bits_per_value, groups, None, count)?
        }
        PackingTemplate::ComplexSpatialDiff { groups, spatial } => {
            unpack_complex(data, desc.bits_per_value, groups, Some(spatial), count)?
        }
    };

    Ok(integers.iter().map(|&v| scaling.apply(v as f64)).collect())
}

/// Unpack simple packed data (template 5.0).
///
/// With zero bits per value every point equals the reference value and no
/// data bits are consumed. Otherwise the count is limited to the number of
/// whole values the data section holds.
pub fn unpack_simple(data: &[u8], desc: &PackingDescriptor, count: usize) -> Grib2Result<Vec<f32>> {
    let scaling = Scaling::new(desc);
    let width = desc.bits_per_value as u32;

    if width == 0 {
        return Ok(vec![scaling.apply(0.0); count]);
    }

    let count = count.min(data.len() * 8 / width as usize);
    let mut reader = BitReader::new(data);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(scaling.apply(reader.read(width)? as f64));
    }

    Ok(values)
}

/// Per-group parameters decoded from the head of a complex packed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    pub references: Vec<u32>,
    pub widths: Vec<u32>,
    pub lengths: Vec<u32>,
}

impl GroupLayout {
    /// Number of values described by all groups.
    pub fn total_length(&self) -> u64 {
        self.lengths.iter().map(|&l| l as u64).sum()
    }
}

/// Decode group references, widths and lengths.
///
/// Each of the three arrays starts on an octet boundary, as WMO 5.2 lays
/// them out. Encoders that pack the arrays back to back without padding are
/// not readable here and fail with `OutOfBounds` or misread widths. The last group's
/// length is always the explicitly stored true length, never a decoded or
/// computed one.
pub fn decode_groups(
    reader: &mut BitReader<'_>,
    bits_per_value: u8,
    groups: &GroupDescriptor,
) -> Grib2Result<GroupLayout> {
    let ng = groups.group_count as usize;

    let mut references = vec![0u32; ng];
    if bits_per_value > 0 {
        for reference in references.iter_mut() {
            *reference = reader.read(bits_per_value as u32)?;
        }
    }
    reader.align_to_byte();

    let width_reference = groups.width_reference as u32;
    let mut widths = vec![width_reference; ng];
    if groups.width_bits > 0 {
        for width in widths.iter_mut() {
            *width = reader
                .read(groups.width_bits as u32)?
                .saturating_add(width_reference);
        }
    }
    reader.align_to_byte();

    let increment = groups.length_increment.max(1) as u32;
    let mut lengths = vec![groups.length_reference; ng];
    if groups.length_bits > 0 {
        for length in lengths.iter_mut() {
            let raw = reader.read(groups.length_bits as u32)?;
            *length = raw
                .checked_mul(increment)
                .and_then(|l| l.checked_add(groups.length_reference))
                .ok_or_else(|| Grib2Error::Unpacking("Group length overflow".to_string()))?;
        }
    }
    reader.align_to_byte();

    if let Some(last) = lengths.last_mut() {
        *last = groups.true_last_length;
    }

    Ok(GroupLayout {
        references,
        widths,
        lengths,
    })
}

/// Unpack complex packed data into integers (templates 5.2 and 5.3).
///
/// For template 5.3 the spatial differencing descriptors are read first and
/// the decoded differences are integrated back into the original sequence.
pub fn unpack_complex(
    data: &[u8],
    bits_per_value: u8,
    groups: &GroupDescriptor,
    spatial: Option<&SpatialDescriptor>,
    count: usize,
) -> Grib2Result<Vec<i64>> {
    if groups.group_count == 0 {
        return Err(Grib2Error::Unpacking("Complex packing with zero groups".to_string()));
    }
    if groups.group_count as usize > count.max(1) {
        return Err(Grib2Error::Unpacking(format!(
            "{} groups for {} values",
            groups.group_count, count
        )));
    }

    let header = match spatial {
        Some(spatial) => read_spatial_header(data, spatial)?,
        None => None,
    };
    let data_start = header.as_ref().map_or(0, |h| h.byte_len);

    let mut reader = BitReader::at_byte(data, data_start);
    let layout = decode_groups(&mut reader, bits_per_value, groups)?;
    let count = count.min(usize::try_from(layout.total_length()).unwrap_or(usize::MAX));

    let mut values = Vec::with_capacity(count);
    for ((&reference, &width), &length) in layout
        .references
        .iter()
        .zip(&layout.widths)
        .zip(&layout.lengths)
    {
        if values.len() >= count {
            break;
        }
        let length = length as usize;
        let take = length.min(count - values.len());
        for _ in 0..take {
            values.push(reference as i64 + reader.read(width)? as i64);
        }
        if take < length {
            reader.skip(length - take, width);
        }
    }

    match header {
        Some(header) => Ok(restore_spatial_differences(
            &values,
            &header.seeds,
            header.min_diff,
        )),
        None => Ok(values),
    }
}

/// Extra descriptors at the start of a template 5.3 data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialHeader {
    /// First `order` values of the undifferenced sequence
    pub seeds: Vec<i64>,
    /// Overall minimum of the differences, added back to each one
    pub min_diff: i64,
    /// Octets occupied by the descriptors
    pub byte_len: usize,
}

/// Read the seeds and minimum difference of spatial differencing.
///
/// Returns `None` when the descriptor disables differencing (order or octet
/// width of zero), in which case the section is plain complex packing.
pub fn read_spatial_header(
    data: &[u8],
    spatial: &SpatialDescriptor,
) -> Grib2Result<Option<SpatialHeader>> {
    if spatial.order == 0 || spatial.extra_octets == 0 {
        return Ok(None);
    }
    if spatial.order > 2 {
        return Err(Grib2Error::Unpacking(format!(
            "Unsupported spatial differencing order {}",
            spatial.order
        )));
    }

    let octets = spatial.extra_octets as usize;
    let mut reader = ByteReader::new(data);
    let mut seeds = Vec::with_capacity(spatial.order as usize);
    for _ in 0..spatial.order {
        seeds.push(reader.uint_be(octets)? as i64);
    }

    // Sign-magnitude: MSB of the field is the sign
    let raw = reader.uint_be(octets)?;
    let sign_bit = 1u64 << (octets * 8 - 1);
    let min_diff = if raw & sign_bit != 0 {
        -((raw & !sign_bit) as i64)
    } else {
        raw as i64
    };

    Ok(Some(SpatialHeader {
        seeds,
        min_diff,
        byte_len: reader.position(),
    }))
}

/// Integrate first- or second-order spatial differences.
///
/// The order is the number of seeds. Order 1:
/// `x[0] = s0`, `x[i] = x[i-1] + d[i] + min`. Order 2:
/// `x[0] = s0`, `x[1] = s1`, `x[i] = 2x[i-1] - x[i-2] + d[i] + min`.
/// Differences at the seed positions are ignored.
pub fn restore_spatial_differences(diffs: &[i64], seeds: &[i64], min_diff: i64) -> Vec<i64> {
    let order = seeds.len();
    let mut restored: Vec<i64> = Vec::with_capacity(diffs.len());

    for (i, &diff) in diffs.iter().enumerate() {
        let value = if i < order {
            seeds[i]
        } else if order == 1 {
            restored[i - 1].wrapping_add(diff).wrapping_add(min_diff)
        } else {
            restored[i - 1]
                .wrapping_mul(2)
                .wrapping_sub(restored[i - 2])
                .wrapping_add(diff)
                .wrapping_add(min_diff)
        };
        restored.push(value);
    }

    restored
}
