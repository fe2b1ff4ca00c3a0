//! Bounds-checked big-endian cursor over GRIB2 bytes.
//!
//! Every read validates its span against the underlying slice and returns
//! [`Grib2Error::OutOfBounds`] instead of panicking, so malformed lengths in
//! a message can never cause an out-of-range access.

use crate::error::{Grib2Error, Grib2Result};

/// A cursor that reads big-endian values from a byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `offset` within `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Advances the cursor without reading.
    pub fn skip(&mut self, len: usize) -> Grib2Result<()> {
        self.bytes(len).map(|_| ())
    }

    /// Returns the next `len` bytes and advances past them.
    pub fn bytes(&mut self, len: usize) -> Grib2Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(Grib2Error::OutOfBounds {
                offset: self.pos,
                len,
                available: self.data.len(),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Grib2Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Grib2Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16_be(&mut self) -> Grib2Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u32_be(&mut self) -> Grib2Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn u64_be(&mut self) -> Grib2Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// IEEE 754 single precision, big-endian (GRIB2 reference values).
    pub fn f32_be(&mut self) -> Grib2Result<f32> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    /// 16-bit GRIB2 signed integer (sign-magnitude, MSB is the sign).
    pub fn i16_sm(&mut self) -> Grib2Result<i16> {
        let raw = self.u16_be()?;
        let magnitude = (raw & 0x7FFF) as i16;
        Ok(if raw & 0x8000 != 0 { -magnitude } else { magnitude })
    }

    /// 32-bit GRIB2 signed integer (sign-magnitude, MSB is the sign).
    pub fn i32_sm(&mut self) -> Grib2Result<i32> {
        Ok(decode_grib2_signed(&self.array::<4>()?))
    }

    /// Unsigned big-endian integer spanning `octets` bytes (1..=8).
    pub fn uint_be(&mut self, octets: usize) -> Grib2Result<u64> {
        if octets == 0 || octets > 8 {
            return Err(Grib2Error::Unpacking(format!(
                "Unsupported integer width: {} octets",
                octets
            )));
        }
        Ok(self
            .bytes(octets)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

/// Decode a 4-byte GRIB2 sign-magnitude integer.
///
/// GRIB2 encodes negative numbers with the most significant bit as a sign
/// flag, not two's complement. Slices of any other length decode to 0.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    let Ok(raw) = <[u8; 4]>::try_from(bytes) else {
        return 0;
    };
    let raw = u32::from_be_bytes(raw);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}
