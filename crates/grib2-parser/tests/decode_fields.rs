//! End-to-end decoding of synthetic GRIB2 buffers.

use grib2_parser::{decode_weather_fields, Grib2Error, MessageScanner, WeatherFields};
use test_utils::{
    assert_approx_eq, assert_values_approx_eq, create_pressure_low_grid, create_vortex_wind,
    weather_message, FieldSpec, Grib2Builder, Packing,
};

const NX: usize = 12;
const NY: usize = 7;

struct Inputs {
    pressure_pa: Vec<f32>,
    u: Vec<f32>,
    v: Vec<f32>,
}

fn inputs() -> Inputs {
    let (u, v) = create_vortex_wind(NX, NY, 25.0);
    Inputs {
        pressure_pa: create_pressure_low_grid(NX, NY, 972.0, 48.0)
            .iter()
            .map(|p| p.round())
            .collect(),
        u,
        v,
    }
}

fn message(packing: Packing) -> Vec<u8> {
    let inputs = inputs();
    weather_message(
        NX as u32,
        NY as u32,
        inputs.pressure_pa,
        inputs.u,
        inputs.v,
        packing,
    )
}

fn assert_matches_inputs(fields: &WeatherFields) {
    let inputs = inputs();
    for field in [&fields.pressure, &fields.u_wind, &fields.v_wind] {
        assert_eq!((field.nx, field.ny), (NX, NY));
        assert_eq!(field.values.len(), NX * NY);
    }
    for (decoded, pa) in fields.pressure.values.iter().zip(&inputs.pressure_pa) {
        assert_approx_eq!(*decoded, pa / 100.0, 0.001);
    }
    assert_values_approx_eq!(fields.u_wind.values, inputs.u, 0.051);
    assert_values_approx_eq!(fields.v_wind.values, inputs.v, 0.051);
}

#[test]
fn test_simple_packing_round_trip() {
    let fields = decode_weather_fields(&message(Packing::Simple)).unwrap();
    assert_matches_inputs(&fields);

    let (lo, hi) = fields.pressure.value_range().unwrap();
    // No grid point sits exactly on the centre of an even-width grid
    assert!(lo > 972.0 && lo < 980.0);
    assert_approx_eq!(hi, 1020.0, 0.01);
}

#[test]
fn test_complex_packing_round_trip() {
    let fields = decode_weather_fields(&message(Packing::Complex { group_len: 5 })).unwrap();
    assert_matches_inputs(&fields);
}

#[test]
fn test_spatial_differencing_first_order() {
    let packing = Packing::ComplexSpatial {
        order: 1,
        group_len: 9,
    };
    let fields = decode_weather_fields(&message(packing)).unwrap();
    assert_matches_inputs(&fields);
}

#[test]
fn test_spatial_differencing_second_order() {
    let packing = Packing::ComplexSpatial {
        order: 2,
        group_len: 16,
    };
    let fields = decode_weather_fields(&message(packing)).unwrap();
    assert_matches_inputs(&fields);
}

/// Fields stored with non-zero binary scale factors and a negative decimal
/// scale on pressure.
fn scaled_message(packing: Packing) -> Vec<u8> {
    let inputs = inputs();
    let (nx, ny) = (NX as u32, NY as u32);
    Grib2Builder::new()
        .with_field(
            FieldSpec::pressure(nx, ny, inputs.pressure_pa)
                .with_decimal_scale(-1)
                .with_binary_scale(-2)
                .with_packing(packing),
        )
        .with_field(
            FieldSpec::u_wind(nx, ny, inputs.u)
                .with_binary_scale(-3)
                .with_packing(packing),
        )
        .with_field(
            FieldSpec::v_wind(nx, ny, inputs.v)
                .with_decimal_scale(0)
                .with_binary_scale(1)
                .with_packing(packing),
        )
        .build()
}

fn assert_matches_scaled_inputs(fields: &WeatherFields) {
    let inputs = inputs();
    // Half a step of 2^E / 10^D, pressure converted to hPa
    for (decoded, pa) in fields.pressure.values.iter().zip(&inputs.pressure_pa) {
        assert_approx_eq!(*decoded, pa / 100.0, 0.0126);
    }
    assert_values_approx_eq!(fields.u_wind.values, inputs.u, 0.0065);
    assert_values_approx_eq!(fields.v_wind.values, inputs.v, 1.0001);
}

#[test]
fn test_simple_packing_with_binary_scale() {
    let fields = decode_weather_fields(&scaled_message(Packing::Simple)).unwrap();
    assert_matches_scaled_inputs(&fields);
}

#[test]
fn test_complex_packing_with_binary_scale() {
    let fields = decode_weather_fields(&scaled_message(Packing::Complex { group_len: 5 })).unwrap();
    assert_matches_scaled_inputs(&fields);

    let packing = Packing::ComplexSpatial {
        order: 2,
        group_len: 9,
    };
    let fields = decode_weather_fields(&scaled_message(packing)).unwrap();
    assert_matches_scaled_inputs(&fields);
}

#[test]
fn test_fields_in_separate_messages_with_noise() {
    let inputs = inputs();
    let (nx, ny) = (NX as u32, NY as u32);

    let mut data = b"HTTP junk before the first message".to_vec();
    data.extend(
        Grib2Builder::new()
            .with_field(FieldSpec::v_wind(nx, ny, inputs.v.clone()))
            .build(),
    );
    data.extend_from_slice(&[0u8; 13]);
    data.extend(
        Grib2Builder::new()
            .with_field(FieldSpec::new(0, 0, nx, ny, vec![288.0; NX * NY]))
            .with_field(FieldSpec::pressure(nx, ny, inputs.pressure_pa.clone()))
            .build(),
    );
    data.extend(
        Grib2Builder::new()
            .with_field(
                FieldSpec::u_wind(nx, ny, inputs.u.clone())
                    .with_packing(Packing::Complex { group_len: 10 }),
            )
            .build(),
    );
    data.extend_from_slice(b"GRI");

    assert_eq!(MessageScanner::new(&data).count(), 3);
    let fields = decode_weather_fields(&data).unwrap();
    assert_matches_inputs(&fields);
}

#[test]
fn test_missing_field_is_insufficient_data() {
    let inputs = inputs();
    let data = Grib2Builder::new()
        .with_field(FieldSpec::pressure(NX as u32, NY as u32, inputs.pressure_pa))
        .with_field(FieldSpec::v_wind(NX as u32, NY as u32, inputs.v))
        .build();

    assert_eq!(
        decode_weather_fields(&data),
        Err(Grib2Error::InsufficientData {
            found: vec!["PRMSL", "VGRD"]
        })
    );
}

#[test]
fn test_edition_one_messages_are_skipped() {
    let inputs = inputs();
    let data = Grib2Builder::new()
        .with_edition(1)
        .with_field(FieldSpec::pressure(NX as u32, NY as u32, inputs.pressure_pa))
        .build();

    assert_eq!(MessageScanner::new(&data).count(), 0);
    assert!(matches!(
        decode_weather_fields(&data),
        Err(Grib2Error::InsufficientData { .. })
    ));
}

#[test]
fn test_oversized_length_does_not_hide_later_messages() {
    let mut bad = message(Packing::Simple);
    let claimed = bad.len() as u64 + 1000;
    bad[8..16].copy_from_slice(&claimed.to_be_bytes());

    assert!(matches!(
        decode_weather_fields(&bad),
        Err(Grib2Error::InsufficientData { .. })
    ));

    let mut data = bad;
    data.extend(message(Packing::Complex { group_len: 4 }));
    let fields = decode_weather_fields(&data).unwrap();
    assert_matches_inputs(&fields);
}

#[test]
fn test_unsupported_templates_skip_only_their_field() {
    let inputs = inputs();
    let (nx, ny) = (NX as u32, NY as u32);
    let data = Grib2Builder::new()
        // Rejected: JPEG2000 packing, Gaussian grid, explicit bitmap
        .with_field(
            FieldSpec::pressure(nx, ny, inputs.pressure_pa.clone())
                .with_packing(Packing::Unsupported(40)),
        )
        .with_field(FieldSpec::u_wind(nx, ny, inputs.u.clone()).with_grid_template(40))
        .with_field(FieldSpec::v_wind(nx, ny, inputs.v.clone()).with_bitmap_indicator(0))
        .with_field(FieldSpec::u_wind(nx, ny, inputs.u.clone()))
        .build();

    assert_eq!(
        decode_weather_fields(&data),
        Err(Grib2Error::InsufficientData {
            found: vec!["UGRD"]
        })
    );
}

#[test]
fn test_truncated_buffers_never_panic() {
    let data = message(Packing::ComplexSpatial {
        order: 2,
        group_len: 7,
    });
    for cut in (0..data.len()).step_by(7) {
        let _ = decode_weather_fields(&data[..cut]);
    }

    // Corrupt each header and descriptor byte in turn
    for i in 16..data.len().min(400) {
        let mut corrupt = data.clone();
        corrupt[i] ^= 0xA5;
        let _ = decode_weather_fields(&corrupt);
    }
}

#[test]
fn test_data_count_shorter_than_grid() {
    let data = Grib2Builder::new()
        .with_field(FieldSpec::pressure(4, 4, vec![101000.0, 101100.0, 101200.0]))
        .with_field(FieldSpec::u_wind(4, 4, vec![1.0; 16]))
        .with_field(FieldSpec::v_wind(4, 4, vec![-1.0; 16]))
        .build();

    let fields = decode_weather_fields(&data).unwrap();
    assert_eq!(fields.pressure.values, vec![1010.0, 1011.0, 1012.0]);
    assert_eq!(fields.pressure.get(3, 3), None);
    assert_eq!(fields.u_wind.values, vec![1.0; 16]);
}

#[test]
fn test_empty_buffer() {
    assert_eq!(
        decode_weather_fields(&[]),
        Err(Grib2Error::InsufficientData { found: vec![] })
    );
}
