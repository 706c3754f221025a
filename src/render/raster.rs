//! Drawing primitives over `tiny_skia` pixmaps. Pixmaps hold premultiplied color, so
//! straight-alpha `RgbaImage` buffers are converted on the way in and out.

use image::{Rgba, RgbaImage};
use tiny_skia::{
    BlendMode, ColorU8, FillRule, FilterQuality, GradientStop, Mask, Paint, Path, PathBuilder,
    Pattern, Pixmap, PixmapPaint, PixmapRef, Point, RadialGradient, Rect, SpreadMode, Stroke,
    Transform,
};

use crate::editor::layer::CropShape;
use crate::geometry::{Color, DocPoint, LayerFrame};

pub(crate) fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// `color` with its alpha multiplied by `opacity`.
pub(crate) fn faded_color(color: Color, opacity: f32) -> tiny_skia::Color {
    let mut faded = skia_color(color);
    faded.apply_opacity(opacity.clamp(0.0, 1.0));
    faded
}

fn solid_paint(color: tiny_skia::Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint
}

pub(crate) fn pixmap_from_image(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (slot, pixel) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = pixel.0;
        *slot = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Writes `pixmap` into `target` as straight alpha. Both must have the same size.
pub(crate) fn copy_into_image(pixmap: &Pixmap, target: &mut RgbaImage) {
    for (pixel, color) in target.pixels_mut().zip(pixmap.pixels()) {
        let color = color.demultiply();
        *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
}

pub(crate) fn image_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    copy_into_image(pixmap, &mut image);
    image
}

/// Tiles whose column plus row index is even get `even`, the rest `odd`.
pub(crate) fn fill_checkerboard(target: &mut Pixmap, tile_size: u32, even: Color, odd: Color) {
    let tile_size = tile_size.clamp(1, 1 << 14);
    let Some(mut tile) = Pixmap::new(tile_size * 2, tile_size * 2) else {
        return;
    };
    tile.fill(skia_color(odd));
    let side = tile_size as f32;
    let even_paint = solid_paint(skia_color(even));
    for (x, y) in [(0.0, 0.0), (side, side)] {
        if let Some(rect) = Rect::from_xywh(x, y, side, side) {
            tile.fill_rect(rect, &even_paint, Transform::identity(), None);
        }
    }

    let mut paint = Paint::default();
    paint.shader = Pattern::new(
        tile.as_ref(),
        SpreadMode::Repeat,
        FilterQuality::Nearest,
        1.0,
        Transform::identity(),
    );
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, target.width() as f32, target.height() as f32) {
        target.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

/// Rotation by `degrees` about the origin followed by a move to `center`.
fn rotation_about(center: DocPoint, degrees: f64) -> Transform {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Transform::from_row(
        cos as f32,
        sin as f32,
        -sin as f32,
        cos as f32,
        center.x as f32,
        center.y as f32,
    )
}

/// The frame's box in its own unrotated space, centered on the origin.
fn local_rect(frame: &LayerFrame) -> Option<Rect> {
    Rect::from_xywh(
        -frame.half_width() as f32,
        -frame.half_height() as f32,
        frame.width as f32,
        frame.height as f32,
    )
}

/// How a layer's clip shape resolves against a target.
pub(crate) enum LayerClip {
    Unclipped,
    Masked(Mask),
    /// The shape has no area; nothing of the layer shows.
    Hidden,
}

impl LayerClip {
    pub(crate) fn mask(&self) -> Option<&Mask> {
        match self {
            Self::Masked(mask) => Some(mask),
            Self::Unclipped | Self::Hidden => None,
        }
    }
}

/// Where a layer lands on the target: its rotated frame, flips and clip shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub frame: LayerFrame,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub clip: CropShape,
}

impl Placement {
    /// Maps frame-local coordinates onto the document.
    fn frame_transform(&self) -> Transform {
        rotation_about(self.frame.center, self.frame.rotation)
    }

    /// Maps a `width` x `height` pixel buffer onto the frame, stretched and flipped.
    fn content_transform(&self, width: u32, height: u32) -> Transform {
        let (sin, cos) = self.frame.rotation.to_radians().sin_cos();
        let (width, height) = (f64::from(width), f64::from(height));
        let flip = |flipped: bool| if flipped { -1.0 } else { 1.0 };
        let scale_x = self.frame.width / width * flip(self.flip_horizontal);
        let scale_y = self.frame.height / height * flip(self.flip_vertical);

        let (a, b) = (cos * scale_x, sin * scale_x);
        let (c, d) = (-sin * scale_y, cos * scale_y);
        let tx = self.frame.center.x - (a * width / 2.0 + c * height / 2.0);
        let ty = self.frame.center.y - (b * width / 2.0 + d * height / 2.0);
        Transform::from_row(
            a as f32, b as f32, c as f32, d as f32, tx as f32, ty as f32,
        )
    }

    /// Whether the frame's bounding box reaches into a `width` x `height` target.
    pub(crate) fn overlaps(&self, width: u32, height: u32) -> bool {
        let (min_x, min_y, max_x, max_y) = self.frame.bounding_box();
        max_x > 0.0 && max_y > 0.0 && min_x < f64::from(width) && min_y < f64::from(height)
    }

    fn clip_path(&self) -> Option<Path> {
        let half_width = self.frame.half_width() as f32;
        let half_height = self.frame.half_height() as f32;
        match self.clip {
            CropShape::None => local_rect(&self.frame).map(PathBuilder::from_rect),
            CropShape::Circle => {
                PathBuilder::from_circle(0.0, 0.0, half_width.min(half_height))
            }
            CropShape::Ellipse => local_rect(&self.frame).and_then(PathBuilder::from_oval),
        }
    }

    /// Resolves the clip shape into a coverage mask sized for the target.
    pub(crate) fn clip(&self, width: u32, height: u32) -> LayerClip {
        let Some(path) = self.clip_path() else {
            return LayerClip::Hidden;
        };
        if self.clip == CropShape::None {
            return LayerClip::Unclipped;
        }
        let Some(mut mask) = Mask::new(width, height) else {
            return LayerClip::Hidden;
        };
        mask.fill_path(&path, FillRule::Winding, true, self.frame_transform());
        LayerClip::Masked(mask)
    }
}

/// Draws `pixels` stretched over the placement's box with bilinear sampling.
pub(crate) fn draw_layer_pixels(
    target: &mut Pixmap,
    pixels: PixmapRef<'_>,
    placement: &Placement,
    opacity: f32,
    mask: Option<&Mask>,
) {
    let paint = PixmapPaint {
        opacity: opacity.clamp(0.0, 1.0),
        blend_mode: BlendMode::SourceOver,
        quality: FilterQuality::Bilinear,
    };
    let transform = placement.content_transform(pixels.width(), pixels.height());
    target.draw_pixmap(0, 0, pixels, &paint, transform, mask);
}

/// Fills the placement's box with a solid color.
pub(crate) fn fill_frame(
    target: &mut Pixmap,
    placement: &Placement,
    color: tiny_skia::Color,
    mask: Option<&Mask>,
) {
    let Some(rect) = local_rect(&placement.frame) else {
        return;
    };
    target.fill_rect(rect, &solid_paint(color), placement.frame_transform(), mask);
}

/// Radial ramp from the frame center out to its half diagonal: transparent up to
/// `ramp_start` (a fraction of the radius), then easing to `color` at `alpha`.
pub(crate) fn fill_frame_vignette(
    target: &mut Pixmap,
    placement: &Placement,
    color: Color,
    alpha: f32,
    ramp_start: f32,
    mask: Option<&Mask>,
) {
    let Some(rect) = local_rect(&placement.frame) else {
        return;
    };
    let radius = placement
        .frame
        .half_width()
        .hypot(placement.frame.half_height()) as f32;
    let stops = vec![
        GradientStop::new(ramp_start.clamp(0.0, 1.0), faded_color(color, 0.0)),
        GradientStop::new(1.0, faded_color(color, alpha)),
    ];
    let center = Point::from_xy(0.0, 0.0);
    let Some(shader) = RadialGradient::new(
        center,
        center,
        radius,
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    target.fill_rect(rect, &paint, placement.frame_transform(), mask);
}

/// Strokes the frame's border, centered on the edge.
pub(crate) fn stroke_frame_outline(
    target: &mut Pixmap,
    frame: &LayerFrame,
    color: Color,
    width: f32,
) {
    let Some(rect) = local_rect(frame) else {
        return;
    };
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    target.stroke_path(
        &PathBuilder::from_rect(rect),
        &solid_paint(skia_color(color)),
        &stroke,
        rotation_about(frame.center, frame.rotation),
        None,
    );
}

pub(crate) fn stroke_segment(
    target: &mut Pixmap,
    from: DocPoint,
    to: DocPoint,
    color: Color,
    width: f32,
) {
    let mut builder = PathBuilder::new();
    builder.move_to(from.x as f32, from.y as f32);
    builder.line_to(to.x as f32, to.y as f32);
    let Some(path) = builder.finish() else {
        return;
    };
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    target.stroke_path(
        &path,
        &solid_paint(skia_color(color)),
        &stroke,
        Transform::identity(),
        None,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleShape {
    Square,
    Round,
}

/// Fills a handle of side `size` centered on `center`, aligned with `rotation`,
/// then traces a one pixel `border` around it.
pub(crate) fn draw_handle(
    target: &mut Pixmap,
    center: DocPoint,
    size: f32,
    rotation: f64,
    shape: HandleShape,
    fill: Color,
    border: Color,
) {
    let half = size / 2.0;
    let path = match shape {
        HandleShape::Square => Rect::from_xywh(-half, -half, size, size).map(PathBuilder::from_rect),
        HandleShape::Round => PathBuilder::from_circle(0.0, 0.0, half),
    };
    let Some(path) = path else {
        return;
    };
    let transform = rotation_about(center, rotation);
    target.fill_path(
        &path,
        &solid_paint(skia_color(fill)),
        FillRule::Winding,
        transform,
        None,
    );
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    target.stroke_path(&path, &solid_paint(skia_color(border)), &stroke, transform, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> Placement {
        Placement {
            frame: LayerFrame::from_box(x, y, width, height, rotation),
            flip_horizontal: false,
            flip_vertical: false,
            clip: CropShape::None,
        }
    }

    fn surface(width: u32, height: u32) -> Pixmap {
        Pixmap::new(width, height).expect("surface should allocate")
    }

    fn pixel_at(pixmap: &Pixmap, x: u32, y: u32) -> Rgba<u8> {
        let color = pixmap.pixel(x, y).expect("pixel in bounds").demultiply();
        Rgba([color.red(), color.green(), color.blue(), color.alpha()])
    }

    #[test]
    fn image_survives_pixmap_conversion_when_opaque() {
        let image = RgbaImage::from_fn(4, 3, |x, y| Rgba([(x * 60) as u8, (y * 90) as u8, 17, 255]));
        let pixmap = pixmap_from_image(&image).expect("pixmap should allocate");
        assert_eq!(image_from_pixmap(&pixmap), image);
    }

    #[test]
    fn checkerboard_alternates_tiles() {
        let mut target = surface(40, 40);
        fill_checkerboard(&mut target, 20, Color::rgb(204, 204, 204), Color::WHITE);
        assert_eq!(pixel_at(&target, 0, 0), Rgba([204, 204, 204, 255]));
        assert_eq!(pixel_at(&target, 25, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(pixel_at(&target, 25, 25), Rgba([204, 204, 204, 255]));
    }

    #[test]
    fn blit_maps_source_pixels_one_to_one_when_unscaled() {
        let source = RgbaImage::from_fn(3, 2, |x, y| Rgba([(x * 40) as u8, (y * 90) as u8, 7, 255]));
        let pixels = pixmap_from_image(&source).expect("pixmap should allocate");
        let mut target = surface(10, 10);
        let placement = placement(4.0, 5.0, 3.0, 2.0, 0.0);
        draw_layer_pixels(&mut target, pixels.as_ref(), &placement, 1.0, None);

        for (x, y, pixel) in source.enumerate_pixels() {
            assert_eq!(&pixel_at(&target, x + 4, y + 5), pixel);
        }
        assert_eq!(pixel_at(&target, 3, 5)[3], 0);
        assert_eq!(pixel_at(&target, 7, 5)[3], 0);
    }

    #[test]
    fn horizontal_flip_mirrors_samples() {
        let mut source = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        source.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let pixels = pixmap_from_image(&source).expect("pixmap should allocate");
        let mut target = surface(2, 1);
        let mut flipped = placement(0.0, 0.0, 2.0, 1.0, 0.0);
        flipped.flip_horizontal = true;
        draw_layer_pixels(&mut target, pixels.as_ref(), &flipped, 1.0, None);
        assert_eq!(pixel_at(&target, 0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(pixel_at(&target, 1, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn scaled_blit_stretches_over_the_whole_frame() {
        let source = RgbaImage::from_pixel(5, 5, Rgba([255, 0, 0, 255]));
        let pixels = pixmap_from_image(&source).expect("pixmap should allocate");
        let mut target = surface(40, 40);
        draw_layer_pixels(&mut target, pixels.as_ref(), &placement(10.0, 10.0, 20.0, 20.0, 0.0), 1.0, None);
        assert_eq!(pixel_at(&target, 12, 12), Rgba([255, 0, 0, 255]));
        assert_eq!(pixel_at(&target, 27, 27), Rgba([255, 0, 0, 255]));
        assert_eq!(pixel_at(&target, 5, 5)[3], 0);
        assert_eq!(pixel_at(&target, 35, 20)[3], 0);
    }

    #[test]
    fn circle_clip_hides_corners() {
        let source = RgbaImage::from_pixel(20, 20, Rgba([255, 0, 0, 255]));
        let pixels = pixmap_from_image(&source).expect("pixmap should allocate");
        let mut target = surface(20, 20);
        let mut clipped = placement(0.0, 0.0, 20.0, 20.0, 0.0);
        clipped.clip = CropShape::Circle;
        let clip = clipped.clip(20, 20);
        assert!(matches!(clip, LayerClip::Masked(_)));
        draw_layer_pixels(&mut target, pixels.as_ref(), &clipped, 1.0, clip.mask());
        assert_eq!(pixel_at(&target, 0, 0)[3], 0);
        assert_eq!(pixel_at(&target, 10, 10)[3], 255);
        assert!(pixel_at(&target, 10, 1)[3] > 200);
    }

    #[test]
    fn frame_outside_target_does_not_overlap() {
        assert!(placement(10.0, 10.0, 5.0, 5.0, 0.0).overlaps(20, 20));
        assert!(!placement(30.0, 0.0, 5.0, 5.0, 0.0).overlaps(20, 20));
        assert!(!placement(-10.0, -10.0, 5.0, 5.0, 0.0).overlaps(20, 20));
        assert!(placement(-2.0, -2.0, 5.0, 5.0, 45.0).overlaps(20, 20));
    }

    #[test]
    fn vignette_is_clear_inside_ramp_start() {
        let mut target = surface(40, 40);
        target.fill(tiny_skia::Color::WHITE);
        let frame = placement(0.0, 0.0, 40.0, 40.0, 0.0);
        fill_frame_vignette(&mut target, &frame, Color::BLACK, 1.0, 0.5, None);
        assert_eq!(pixel_at(&target, 20, 20), Rgba([255, 255, 255, 255]));
        assert!(pixel_at(&target, 0, 0)[0] < 40);
    }

    #[test]
    fn outline_marks_edges_but_not_interior() {
        let mut target = surface(40, 40);
        let frame = LayerFrame::from_box(10.0, 10.0, 20.0, 20.0, 0.0);
        stroke_frame_outline(&mut target, &frame, Color::rgb(0, 0, 255), 2.0);
        assert_eq!(pixel_at(&target, 10, 20), Rgba([0, 0, 255, 255]));
        assert_eq!(pixel_at(&target, 20, 20)[3], 0);
        assert_eq!(pixel_at(&target, 2, 2)[3], 0);
    }

    #[test]
    fn round_handle_skips_square_corners() {
        let mut square = surface(12, 12);
        let mut round = surface(12, 12);
        let center = DocPoint::new(6.0, 6.0);
        let blue = Color::rgb(0, 0, 255);
        draw_handle(&mut square, center, 10.0, 0.0, HandleShape::Square, Color::WHITE, blue);
        draw_handle(&mut round, center, 10.0, 0.0, HandleShape::Round, Color::WHITE, blue);

        assert_eq!(pixel_at(&square, 6, 1)[2], 255);
        assert_eq!(pixel_at(&round, 1, 1)[3], 0);
        assert_eq!(pixel_at(&round, 6, 6), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn segment_connects_its_endpoints() {
        let mut target = surface(20, 20);
        let from = DocPoint::new(10.0, 2.0);
        let to = DocPoint::new(10.0, 18.0);
        stroke_segment(&mut target, from, to, Color::rgb(0, 0, 255), 2.0);
        assert_eq!(pixel_at(&target, 10, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(pixel_at(&target, 3, 10)[3], 0);
    }
}
