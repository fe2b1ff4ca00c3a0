//! Bit-level extraction from packed GRIB2 data sections.

use crate::error::{Grib2Error, Grib2Result};

/// Widest field a single read may extract.
pub const MAX_BIT_WIDTH: u32 = 32;

/// Read `width` bits starting at `bit_offset`, most significant bit first.
///
/// A width of 0 returns 0 without touching the buffer. Otherwise the minimal
/// run of whole bytes covering the field is assembled into a 64-bit
/// accumulator, shifted right to drop the trailing bits and masked.
pub fn read_bits(data: &[u8], bit_offset: usize, width: u32) -> Grib2Result<u32> {
    if width == 0 {
        return Ok(0);
    }
    if width > MAX_BIT_WIDTH {
        return Err(Grib2Error::Unpacking(format!(
            "Invalid number of bits: {}",
            width
        )));
    }

    let byte_start = bit_offset / 8;
    let bit_start = bit_offset % 8;
    let bytes_needed = (bit_start + width as usize + 7) / 8;

    let span = byte_start
        .checked_add(bytes_needed)
        .and_then(|end| data.get(byte_start..end))
        .ok_or(Grib2Error::OutOfBounds {
            offset: byte_start,
            len: bytes_needed,
            available: data.len(),
        })?;

    let acc = span.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let shift = bytes_needed * 8 - bit_start - width as usize;
    let mask = (1u64 << width) - 1;
    Ok(((acc >> shift) & mask) as u32)
}

/// Sequential reader over a packed bit stream.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Starts reading at a whole-byte offset.
    pub fn at_byte(data: &'a [u8], byte_offset: usize) -> Self {
        Self {
            data,
            bit_pos: byte_offset.saturating_mul(8),
        }
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Reads the next `width` bits. Width 0 yields 0 and does not advance.
    pub fn read(&mut self, width: u32) -> Grib2Result<u32> {
        let value = read_bits(self.data, self.bit_pos, width)?;
        self.bit_pos += width as usize;
        Ok(value)
    }

    /// Skips `count` fields of `width` bits each.
    pub fn skip(&mut self, count: usize, width: u32) {
        self.bit_pos = self
            .bit_pos
            .saturating_add(count.saturating_mul(width as usize));
    }

    /// Advances to the next octet boundary (no-op when already aligned).
    pub fn align_to_byte(&mut self) {
        let rem = self.bit_pos % 8;
        if rem != 0 {
            self.bit_pos += 8 - rem;
        }
    }
}
