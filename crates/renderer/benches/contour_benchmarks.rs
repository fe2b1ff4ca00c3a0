//! Benchmarks for overlay geometry and rasterisation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use renderer::contour::march_squares;
use renderer::{
    build_overlay, contour_segments, create_png, pressure_levels, render_overlay_rgba, FieldView,
    OverlayConfig,
};
use test_utils::{create_pressure_low_grid, create_vortex_wind};

/// Pressure low in hPa with some noise so contours are not perfectly smooth.
fn noisy_pressure(nx: usize, ny: usize) -> Vec<f32> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    create_pressure_low_grid(nx, ny, 965.0, 70.0)
        .into_iter()
        .map(|pa| pa / 100.0 + rng.gen_range(-0.5..0.5))
        .collect()
}

// ============================================================================
// Marching squares
// ============================================================================

fn bench_march_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("march_squares");

    for &(w, h) in &[(165, 83), (330, 165), (660, 330)] {
        let field = noisy_pressure(w, h);
        group.throughput(Throughput::Elements((w * h) as u64));
        group.bench_with_input(
            BenchmarkId::new("single_level", format!("{w}x{h}")),
            &field,
            |b, field| b.iter(|| march_squares(black_box(field), w, h, 1000.0)),
        );
    }

    group.finish();
}

fn bench_contour_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("contour_segments");
    let levels = pressure_levels();

    // GFS 0.25 degree grid size
    let (nx, ny) = (1440, 721);
    let values = noisy_pressure(nx, ny);
    let field = FieldView::new(&values, nx, ny);

    for &(w, h) in &[(330, 165), (660, 330), (1320, 660)] {
        group.bench_with_input(
            BenchmarkId::new("all_levels", format!("{w}x{h}")),
            &(w, h),
            |b, &(w, h)| b.iter(|| contour_segments(black_box(&field), w, h, &levels)),
        );
    }

    group.finish();
}

// ============================================================================
// Full overlay
// ============================================================================

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay");
    group.sample_size(20);

    let (nx, ny) = (1440, 721);
    let pressure = noisy_pressure(nx, ny);
    let (u, v) = create_vortex_wind(nx, ny, 30.0);
    let pressure = FieldView::new(&pressure, nx, ny);
    let u = FieldView::new(&u, nx, ny);
    let v = FieldView::new(&v, nx, ny);
    let config = OverlayConfig::default();

    group.bench_function("build", |b| {
        b.iter(|| build_overlay(black_box(&pressure), &u, &v, &config))
    });

    if let Ok(overlay) = build_overlay(&pressure, &u, &v, &config) {
        group.bench_function("rasterise", |b| {
            b.iter(|| render_overlay_rgba(black_box(&overlay), &config))
        });

        if let Ok(rgba) = render_overlay_rgba(&overlay, &config) {
            group.bench_function("png", |b| {
                b.iter(|| create_png(black_box(&rgba), 660, 330))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_march_squares, bench_contour_segments, bench_overlay);
criterion_main!(benches);
