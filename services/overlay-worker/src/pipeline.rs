//! Decode, build and rasterise one cycle's overlay.
//!
//! Everything here is synchronous and CPU bound; callers run it on the
//! blocking pool.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use grib2_parser::{decode_weather_fields, DecodedField};
use renderer::{build_overlay, create_png, render_overlay_rgba, FieldView, OverlayConfig};
use tracing::info;

use crate::cycle::CycleId;
use crate::slot::{OverlaySlot, PublishedOverlay};

fn view(field: &DecodedField) -> FieldView<'_> {
    FieldView::new(&field.values, field.nx, field.ny)
}

/// Turn a GRIB2 buffer into a publishable overlay.
///
/// Fails without side effects when any of PRMSL, UGRD or VGRD is missing.
pub fn render_cycle(data: &[u8], cycle: CycleId, config: &OverlayConfig) -> Result<PublishedOverlay> {
    let start = Instant::now();

    let fields = decode_weather_fields(data)
        .with_context(|| format!("Failed to decode GRIB2 data for cycle {}", cycle))?;
    info!(
        cycle = %cycle,
        pressure_points = fields.pressure.values.len(),
        wind_points = fields.u_wind.values.len(),
        nx = fields.pressure.nx,
        ny = fields.pressure.ny,
        "Decoded GFS fields"
    );

    let overlay = build_overlay(
        &view(&fields.pressure),
        &view(&fields.u_wind),
        &view(&fields.v_wind),
        config,
    )
    .context("Failed to build overlay geometry")?;
    let rgba = render_overlay_rgba(&overlay, config).context("Failed to rasterise overlay")?;

    info!(
        cycle = %cycle,
        contours = overlay.contours.len(),
        glyphs = overlay.glyphs.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Rendered overlay"
    );

    Ok(PublishedOverlay {
        cycle,
        overlay,
        rgba,
    })
}

/// Encode a published overlay as PNG and write it to `path`.
pub async fn write_png(published: &PublishedOverlay, path: &Path) -> Result<()> {
    let png = create_png(
        &published.rgba,
        published.overlay.width as usize,
        published.overlay.height as usize,
    )?;
    tokio::fs::write(path, &png)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = png.len(), cycle = %published.cycle, "Wrote overlay PNG");
    Ok(())
}

/// Write the slot's unread overlay, if any, to `path`.
///
/// Returns whether an overlay was taken. A failed write still consumes it.
pub async fn drain_slot(slot: &OverlaySlot, path: &Path) -> Result<bool> {
    match slot.take() {
        Some(published) => {
            write_png(&published, path).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_utils::{create_pressure_low_grid, create_vortex_wind, weather_message, Packing};

    fn cycle() -> CycleId {
        CycleId {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            hour: 6,
        }
    }

    fn message() -> Vec<u8> {
        let pressure = create_pressure_low_grid(24, 12, 972.0, 48.0)
            .into_iter()
            .map(f32::round)
            .collect();
        let (u, v) = create_vortex_wind(24, 12, 20.0);
        weather_message(24, 12, pressure, u, v, Packing::Complex { group_len: 8 })
    }

    fn small_config() -> OverlayConfig {
        OverlayConfig {
            width: 120,
            height: 60,
            ..OverlayConfig::default()
        }
    }

    #[test]
    fn test_render_cycle() {
        let published = render_cycle(&message(), cycle(), &small_config()).unwrap();
        assert_eq!(published.cycle, cycle());
        assert!(!published.overlay.contours.is_empty());
        assert!(!published.overlay.glyphs.is_empty());
        assert_eq!(published.rgba.len(), 120 * 60 * 4);
    }

    #[test]
    fn test_render_cycle_rejects_garbage() {
        let err = render_cycle(b"not a grib file", cycle(), &small_config()).unwrap_err();
        assert!(err.to_string().contains("20250115t06z"));
    }

    #[tokio::test]
    async fn test_write_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let published = render_cycle(&message(), cycle(), &small_config()).unwrap();

        tokio_test::assert_ok!(write_png(&published, &path).await);
        let png = std::fs::read(&path).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_drain_slot_writes_pending_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let slot = OverlaySlot::new();

        // Nothing published yet
        assert!(!drain_slot(&slot, &path).await.unwrap());
        assert!(!path.exists());

        slot.publish(render_cycle(&message(), cycle(), &small_config()).unwrap());
        assert!(drain_slot(&slot, &path).await.unwrap());
        assert!(!slot.has_pending());
        assert_eq!(&std::fs::read(&path).unwrap()[1..4], b"PNG");

        // Already consumed
        assert!(!drain_slot(&slot, &path).await.unwrap());
    }
}
