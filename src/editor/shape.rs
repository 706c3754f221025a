use image::RgbaImage;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::render::raster::{image_from_pixmap, skia_color};

use super::layer::{ShapeKind, ShapeSpec};

/// Outline of `kind` inside a `width` x `height` box, pulled in by `inset` on every side.
fn shape_path(kind: ShapeKind, width: f32, height: f32, inset: f32) -> Option<Path> {
    match kind {
        ShapeKind::Rectangle => {
            Rect::from_ltrb(inset, inset, width - inset, height - inset).map(PathBuilder::from_rect)
        }
        ShapeKind::Square => {
            let side = width.min(height);
            let left = (width - side) / 2.0 + inset;
            let top = (height - side) / 2.0 + inset;
            let inner = side - inset * 2.0;
            Rect::from_xywh(left, top, inner, inner).map(PathBuilder::from_rect)
        }
        ShapeKind::Circle => {
            PathBuilder::from_circle(width / 2.0, height / 2.0, width.min(height) / 2.0 - inset)
        }
        ShapeKind::Ellipse => {
            Rect::from_ltrb(inset, inset, width - inset, height - inset)
                .and_then(PathBuilder::from_oval)
        }
    }
}

/// Rasterizes a shape into a transparent `width` x `height` bitmap. The outline path is
/// inset by half the stroke width so the stroke stays inside the bitmap.
pub fn rasterize_shape(spec: &ShapeSpec) -> RgbaImage {
    let spec = spec.normalized();
    let Some(mut pixmap) = Pixmap::new(spec.width, spec.height) else {
        return RgbaImage::new(spec.width, spec.height);
    };
    let stroke_width = spec.stroke_width as f32;
    let Some(path) = shape_path(
        spec.kind,
        spec.width as f32,
        spec.height as f32,
        stroke_width / 2.0,
    ) else {
        tracing::debug!(kind = ?spec.kind, "shape outline has no area");
        return image_from_pixmap(&pixmap);
    };

    let mut paint = Paint::default();
    paint.set_color(skia_color(spec.fill));
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    if stroke_width > 0.0 {
        paint.set_color(skia_color(spec.stroke));
        let stroke = Stroke {
            width: stroke_width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    image_from_pixmap(&pixmap)
}
