//! Synthetic GRIB2 message builder.
//!
//! Creates minimal but structurally valid GRIB2 edition 2 messages holding
//! one or more fields on a regular lat/lon grid. Values can be packed with
//! simple packing (5.0), complex packing (5.2) or complex packing with
//! first/second order spatial differencing (5.3), so decoders can be checked
//! against known input without real model output.

/// Data representation used for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Template 5.0, bit width chosen from the value range
    Simple,
    /// Template 5.2 with groups of `group_len` values
    Complex { group_len: usize },
    /// Template 5.3 with the given differencing order (1 or 2)
    ComplexSpatial { order: u8, group_len: usize },
    /// Writes a bare template number with simple packing fields only
    Unsupported(u16),
}

/// One field of a message: grid, parameter and values.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub category: u8,
    pub number: u8,
    pub nx: u32,
    pub ny: u32,
    /// Row-major values in the GRIB unit (Pa for pressure, m/s for wind)
    pub values: Vec<f32>,
    pub packing: Packing,
    /// D - values are stored as `round(v * 10^D)`
    pub decimal_scale: i16,
    /// E - stored integers count steps of `2^E` above the reference
    pub binary_scale: i16,
    pub grid_template: u16,
    pub bitmap_indicator: u8,
}

impl FieldSpec {
    pub fn new(category: u8, number: u8, nx: u32, ny: u32, values: Vec<f32>) -> Self {
        Self {
            category,
            number,
            nx,
            ny,
            values,
            packing: Packing::Simple,
            decimal_scale: 0,
            binary_scale: 0,
            grid_template: 0,
            bitmap_indicator: 255,
        }
    }

    /// Mean sea level pressure (0, 3, 1) in Pa.
    pub fn pressure(nx: u32, ny: u32, values: Vec<f32>) -> Self {
        Self::new(3, 1, nx, ny, values)
    }

    /// U-component of wind (0, 2, 2) in m/s, stored to 0.1 m/s.
    pub fn u_wind(nx: u32, ny: u32, values: Vec<f32>) -> Self {
        Self::new(2, 2, nx, ny, values).with_decimal_scale(1)
    }

    /// V-component of wind (0, 2, 3) in m/s, stored to 0.1 m/s.
    pub fn v_wind(nx: u32, ny: u32, values: Vec<f32>) -> Self {
        Self::new(2, 3, nx, ny, values).with_decimal_scale(1)
    }

    pub fn with_packing(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    pub fn with_decimal_scale(mut self, decimal_scale: i16) -> Self {
        self.decimal_scale = decimal_scale;
        self
    }

    pub fn with_binary_scale(mut self, binary_scale: i16) -> Self {
        self.binary_scale = binary_scale;
        self
    }

    pub fn with_grid_template(mut self, template: u16) -> Self {
        self.grid_template = template;
        self
    }

    pub fn with_bitmap_indicator(mut self, indicator: u8) -> Self {
        self.bitmap_indicator = indicator;
        self
    }
}

/// Build a GRIB2 message with the specified fields.
///
/// Sections 3 through 7 are repeated for every field inside one message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    edition: u8,
    fields: Vec<FieldSpec>,
}

impl Default for Grib2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Grib2Builder {
    pub fn new() -> Self {
        Self {
            discipline: 0,
            edition: 2,
            fields: Vec::new(),
        }
    }

    pub fn with_discipline(mut self, discipline: u8) -> Self {
        self.discipline = discipline;
        self
    }

    /// Edition octet written into Section 0 (decoders only accept 2).
    pub fn with_edition(mut self, edition: u8) -> Self {
        self.edition = edition;
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut body = build_section1();
        for field in &self.fields {
            body.extend(build_section3(field));
            body.extend(build_section4(field));
            let (section5, packed) = pack_field(field);
            body.extend(section5);
            body.extend(build_section6(field.bitmap_indicator));
            body.extend(wrap_section(7, &packed));
        }

        let message_length = 16 + body.len() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]); // Reserved
        message.push(self.discipline);
        message.push(self.edition);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        message.extend(body);
        message.extend_from_slice(b"7777");
        message
    }
}

/// A message holding PRMSL, UGRD and VGRD on the same grid.
pub fn weather_message(
    nx: u32,
    ny: u32,
    pressure_pa: Vec<f32>,
    u: Vec<f32>,
    v: Vec<f32>,
    packing: Packing,
) -> Vec<u8> {
    Grib2Builder::new()
        .with_field(FieldSpec::pressure(nx, ny, pressure_pa).with_packing(packing))
        .with_field(FieldSpec::u_wind(nx, ny, u).with_packing(packing))
        .with_field(FieldSpec::v_wind(nx, ny, v).with_packing(packing))
        .build()
}

fn wrap_section(number: u8, body: &[u8]) -> Vec<u8> {
    let mut section = Vec::with_capacity(body.len() + 5);
    section.extend_from_slice(&(body.len() as u32 + 5).to_be_bytes());
    section.push(number);
    section.extend_from_slice(body);
    section
}

fn build_section1() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&7u16.to_be_bytes()); // Center (NCEP)
    body.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
    body.push(2); // Master table version
    body.push(1); // Local table version
    body.push(1); // Significance of reference time
    body.extend_from_slice(&2025u16.to_be_bytes());
    body.extend_from_slice(&[1, 15, 12, 0, 0]); // Month, day, hour, minute, second
    body.push(0); // Production status
    body.push(1); // Type of data (forecast)
    wrap_section(1, &body)
}

/// Sign-magnitude encoding used by GRIB2 for signed integers.
fn sign_magnitude_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

fn sign_magnitude_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn build_section3(field: &FieldSpec) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(0); // Source of grid definition
    body.extend_from_slice(&(field.nx * field.ny).to_be_bytes());
    body.push(0); // Octets for optional list
    body.push(0); // Interpretation of optional list
    body.extend_from_slice(&field.grid_template.to_be_bytes());

    body.push(6); // Shape of Earth
    body.extend_from_slice(&[0; 15]); // Radius and axes
    body.extend_from_slice(&field.nx.to_be_bytes());
    body.extend_from_slice(&field.ny.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
    body.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // Subdivisions

    let di = 360_000_000 / field.nx.max(1);
    let dj = 180_000_000 / field.ny.saturating_sub(1).max(1);
    body.extend_from_slice(&sign_magnitude_i32(90_000_000)); // La1
    body.extend_from_slice(&sign_magnitude_i32(0)); // Lo1
    body.push(48); // Resolution and component flags
    body.extend_from_slice(&sign_magnitude_i32(-90_000_000)); // La2
    body.extend_from_slice(&sign_magnitude_i32((360_000_000 - di) as i32)); // Lo2
    body.extend_from_slice(&di.to_be_bytes());
    body.extend_from_slice(&dj.to_be_bytes());
    body.push(0); // Scanning mode: +i, -j
    wrap_section(3, &body)
}

fn build_section4(field: &FieldSpec) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u16.to_be_bytes()); // Coordinate values
    body.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0
    body.push(field.category);
    body.push(field.number);
    body.extend_from_slice(&[2, 0, 0, 0, 0, 0, 1]); // Process and cutoff, hours
    body.extend_from_slice(&0u32.to_be_bytes()); // Forecast time
    body.extend_from_slice(&[101, 0, 0, 0, 0, 0]); // First surface (mean sea level)
    body.extend_from_slice(&[255, 0, 0, 0, 0, 0]); // Second surface (none)
    wrap_section(4, &body)
}

fn build_section6(indicator: u8) -> Vec<u8> {
    wrap_section(6, &[indicator])
}

/// Bits needed to store `max`.
fn bit_width(max: u64) -> u8 {
    (64 - max.leading_zeros()) as u8
}

/// MSB-first bit stream writer.
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    fn write(&mut self, value: u64, width: u8) {
        for i in (0..width).rev() {
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= bit << (7 - self.bit_len % 8);
            self.bit_len += 1;
        }
    }

    fn align(&mut self) {
        self.bit_len = self.bytes.len() * 8;
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Quantize values to non-negative integers relative to a reference.
///
/// Scaled values are snapped to multiples of `2^E`, so the reference is one
/// too and every stored integer is exact.
fn quantize(values: &[f32], decimal_scale: i16, binary_scale: i16) -> (f32, Vec<u64>) {
    let factor = 10f64.powi(decimal_scale as i32);
    let step = 2f64.powi(binary_scale as i32);
    let scaled: Vec<f64> = values
        .iter()
        .map(|&v| (v as f64 * factor / step).round() * step)
        .collect();
    let reference = scaled.iter().cloned().fold(f64::INFINITY, f64::min);
    let reference = if reference.is_finite() { reference } else { 0.0 };
    let integers = scaled
        .iter()
        .map(|&s| ((s - reference) / step).round() as u64)
        .collect();
    (reference as f32, integers)
}

/// Common Section 5 prefix: count, template, R, E, D, bits, type.
fn section5_prefix(
    field: &FieldSpec,
    count: usize,
    template: u16,
    reference: f32,
    bits: u8,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(count as u32).to_be_bytes());
    body.extend_from_slice(&template.to_be_bytes());
    body.extend_from_slice(&reference.to_be_bytes());
    body.extend_from_slice(&sign_magnitude_i16(field.binary_scale));
    body.extend_from_slice(&sign_magnitude_i16(field.decimal_scale));
    body.push(bits);
    body.push(0); // Original field type (floating point)
    body
}

/// Produce Section 5 and the Section 7 payload for a field.
fn pack_field(field: &FieldSpec) -> (Vec<u8>, Vec<u8>) {
    let (reference, integers) = quantize(&field.values, field.decimal_scale, field.binary_scale);
    let count = integers.len();

    match field.packing {
        Packing::Simple | Packing::Unsupported(_) => {
            let template = match field.packing {
                Packing::Unsupported(template) => template,
                _ => 0,
            };
            let bits = bit_width(integers.iter().copied().max().unwrap_or(0));
            let body = section5_prefix(field, count, template, reference, bits);

            let mut writer = BitWriter::default();
            for &x in &integers {
                writer.write(x, bits);
            }
            (wrap_section(5, &body), writer.into_bytes())
        }
        Packing::Complex { group_len } => {
            let (groups, packed) = pack_groups(&integers, group_len);
            let mut body = section5_prefix(field, count, 2, reference, groups.reference_bits);
            body.extend(groups.descriptor());
            (wrap_section(5, &body), packed)
        }
        Packing::ComplexSpatial { order, group_len } => {
            let (extra, stored) = spatial_difference(&integers, order);
            let (groups, packed) = pack_groups(&stored, group_len);
            let mut body = section5_prefix(field, count, 3, reference, groups.reference_bits);
            body.extend(groups.descriptor());
            body.push(order);
            body.push(extra.octets);

            let mut payload = extra.to_bytes();
            payload.extend(packed);
            (wrap_section(5, &body), payload)
        }
    }
}

/// Group parameters written to template 5.2/5.3.
struct GroupParams {
    reference_bits: u8,
    group_count: u32,
    width_bits: u8,
    length_reference: u32,
    true_last_length: u32,
    length_bits: u8,
}

impl GroupParams {
    /// Body octets 16-41 of Section 5.
    fn descriptor(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(1); // Group splitting method
        body.push(0); // Missing value management
        body.extend_from_slice(&[0; 8]); // Missing value substitutes
        body.extend_from_slice(&self.group_count.to_be_bytes());
        body.push(0); // Reference for group widths
        body.push(self.width_bits);
        body.extend_from_slice(&self.length_reference.to_be_bytes());
        body.push(1); // Length increment
        body.extend_from_slice(&self.true_last_length.to_be_bytes());
        body.push(self.length_bits);
        body
    }
}

/// Split integers into fixed-size groups and pack them.
///
/// Group references, widths and lengths each start on an octet boundary;
/// the group values follow contiguously.
fn pack_groups(integers: &[u64], group_len: usize) -> (GroupParams, Vec<u8>) {
    let chunks: Vec<&[u64]> = integers.chunks(group_len.max(1)).collect();
    let references: Vec<u64> = chunks
        .iter()
        .map(|c| c.iter().copied().min().unwrap_or(0))
        .collect();
    let widths: Vec<u8> = chunks
        .iter()
        .zip(&references)
        .map(|(c, &r)| bit_width(c.iter().map(|&x| x - r).max().unwrap_or(0)))
        .collect();
    let lengths: Vec<u32> = chunks.iter().map(|c| c.len() as u32).collect();

    let length_reference = lengths.iter().copied().min().unwrap_or(0);
    let true_last_length = lengths.last().copied().unwrap_or(0);
    let params = GroupParams {
        reference_bits: bit_width(references.iter().copied().max().unwrap_or(0)),
        group_count: chunks.len() as u32,
        width_bits: bit_width(widths.iter().map(|&w| w as u64).max().unwrap_or(0)),
        length_reference,
        true_last_length,
        length_bits: bit_width(
            lengths
                .iter()
                .map(|&l| (l - length_reference) as u64)
                .max()
                .unwrap_or(0),
        ),
    };

    let mut writer = BitWriter::default();
    for &r in &references {
        writer.write(r, params.reference_bits);
    }
    writer.align();
    for &w in &widths {
        writer.write(w as u64, params.width_bits);
    }
    writer.align();
    for &l in &lengths {
        writer.write((l - length_reference) as u64, params.length_bits);
    }
    writer.align();
    for ((chunk, &r), &w) in chunks.iter().zip(&references).zip(&widths) {
        for &x in chunk.iter() {
            writer.write(x - r, w);
        }
    }

    (params, writer.into_bytes())
}

/// Seeds and minimum difference written ahead of the group data.
struct SpatialExtra {
    seeds: Vec<u64>,
    min_diff: i64,
    octets: u8,
}

impl SpatialExtra {
    fn to_bytes(&self) -> Vec<u8> {
        let octets = self.octets as usize;
        let mut bytes = Vec::new();
        for &seed in &self.seeds {
            bytes.extend_from_slice(&seed.to_be_bytes()[8 - octets..]);
        }
        let mut raw = self.min_diff.unsigned_abs();
        if self.min_diff < 0 {
            raw |= 1 << (octets * 8 - 1);
        }
        bytes.extend_from_slice(&raw.to_be_bytes()[8 - octets..]);
        bytes
    }
}

/// Difference integers to `order` and shift by the minimum difference.
///
/// The first `order` stored values are zero; decoders take those points from
/// the seeds instead.
fn spatial_difference(integers: &[u64], order: u8) -> (SpatialExtra, Vec<u64>) {
    let order = order as usize;
    let x: Vec<i64> = integers.iter().map(|&v| v as i64).collect();
    let diffs: Vec<i64> = (0..x.len())
        .map(|i| match (order, i) {
            (_, i) if i < order => 0,
            (1, i) => x[i] - x[i - 1],
            (_, i) => x[i] - 2 * x[i - 1] + x[i - 2],
        })
        .collect();

    let min_diff = diffs.iter().skip(order).copied().min().unwrap_or(0);
    let stored = diffs
        .iter()
        .enumerate()
        .map(|(i, &d)| if i < order { 0 } else { (d - min_diff) as u64 })
        .collect();

    let seeds: Vec<u64> = integers.iter().take(order).copied().collect();
    let largest = seeds
        .iter()
        .copied()
        .chain(std::iter::once(min_diff.unsigned_abs()))
        .max()
        .unwrap_or(0);
    // One spare bit for the sign of the minimum
    let octets = (bit_width(largest) as usize + 1).div_ceil(8).max(1) as u8;

    (
        SpatialExtra {
            seeds,
            min_diff,
            octets,
        },
        stored,
    )
}
