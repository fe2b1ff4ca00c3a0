//! Rasterisation of overlay geometry with tiny-skia.

use tiny_skia::{Color, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::contour::Segment;
use crate::error::{RenderError, RenderResult};
use crate::overlay::{Overlay, OverlayConfig};

/// Stroke a batch of segments with one colour and width.
fn stroke_segments<I>(pixmap: &mut Pixmap, segments: I, color: [u8; 4], width: f32)
where
    I: IntoIterator<Item = Segment>,
{
    let mut pb = PathBuilder::new();
    for segment in segments {
        pb.move_to(segment.start.x, segment.start.y);
        pb.line_to(segment.end.x, segment.end.y);
    }
    // None when there were no segments
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;

    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };

    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Render an overlay to a transparent, straight-alpha RGBA buffer.
///
/// Contours are drawn first, wind arrows on top.
pub fn render_overlay_rgba(overlay: &Overlay, config: &OverlayConfig) -> RenderResult<Vec<u8>> {
    let (width, height) = (overlay.width, overlay.height);
    let mut pixmap =
        Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
    pixmap.fill(Color::TRANSPARENT);

    stroke_segments(
        &mut pixmap,
        overlay.contours.iter().copied(),
        config.contour.line_color,
        config.contour.line_width,
    );
    stroke_segments(
        &mut pixmap,
        overlay.glyphs.iter().flat_map(|g| g.segments()),
        config.quiver.line_color,
        config.quiver.line_width,
    );

    // tiny-skia stores premultiplied colour; PNG expects straight alpha
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    tracing::debug!(width, height, segments = overlay.segment_count(), "Rasterised overlay");

    Ok(rgba)
}
