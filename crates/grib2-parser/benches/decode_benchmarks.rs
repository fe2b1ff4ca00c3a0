//! Benchmarks for decoding synthetic PRMSL/UGRD/VGRD messages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grib2_parser::decode_weather_fields;
use test_utils::{create_pressure_low_grid, create_vortex_wind, weather_message, Packing};

fn message(nx: usize, ny: usize, packing: Packing) -> Vec<u8> {
    let pressure = create_pressure_low_grid(nx, ny, 970.0, 60.0)
        .into_iter()
        .map(f32::round)
        .collect();
    let (u, v) = create_vortex_wind(nx, ny, 30.0);
    weather_message(nx as u32, ny as u32, pressure, u, v, packing)
}

// ============================================================================
// Packing templates
// ============================================================================

fn bench_packings(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_weather_fields");
    group.sample_size(20);

    // GFS 0.25 degree grid size
    let (nx, ny) = (1440, 721);
    group.throughput(Throughput::Elements((nx * ny * 3) as u64));

    let packings = [
        ("simple", Packing::Simple),
        ("complex", Packing::Complex { group_len: 32 }),
        (
            "complex_spatial",
            Packing::ComplexSpatial {
                order: 2,
                group_len: 32,
            },
        ),
    ];

    for (name, packing) in packings {
        let data = message(nx, ny, packing);
        group.bench_with_input(BenchmarkId::new(name, format!("{nx}x{ny}")), &data, |b, data| {
            b.iter(|| decode_weather_fields(black_box(data)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_packings);
criterion_main!(benches);
