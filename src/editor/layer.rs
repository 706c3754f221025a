use std::sync::Arc;

use image::RgbaImage;

use crate::geometry::{normalize_rotation, CanvasSize, Color, LayerFrame};

pub type LayerId = u64;

pub const DEFAULT_LAYER_X: f64 = 50.0;
pub const DEFAULT_LAYER_Y: f64 = 50.0;
const LAYER_NAME_MAX_CHARS: usize = 20;
const LAYER_NAME_TRUNCATED_CHARS: usize = 17;
const RESET_DISPLAY_CANVAS_RATIO: f64 = 0.9;

/// Immutable decoded pixels. Clones share the buffer, so history snapshots
/// only pay for geometry and parameter records.
#[derive(Debug, Clone)]
pub struct LayerSource {
    pixels: Arc<RgbaImage>,
}

impl LayerSource {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn shared(pixels: Arc<RgbaImage>) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Copies the pixel buffer into a fresh allocation.
    pub fn deep_copy(&self) -> Self {
        Self::new(RgbaImage::clone(&self.pixels))
    }

    pub fn shares_pixels_with(&self, other: &LayerSource) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl PartialEq for LayerSource {
    fn eq(&self, other: &Self) -> bool {
        self.shares_pixels_with(other) || *self.pixels == *other.pixels
    }
}

/// Region of the source bitmap that is drawn, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Clamps the rectangle so it lies inside a `source_width` x `source_height` bitmap
    /// and covers at least one pixel.
    pub fn clamped_to(self, source_width: u32, source_height: u32) -> Self {
        let source_width = source_width.max(1);
        let source_height = source_height.max(1);
        let x = self.x.min(source_width - 1);
        let y = self.y.min(source_height - 1);
        Self {
            x,
            y,
            width: self.width.clamp(1, source_width - x),
            height: self.height.clamp(1, source_height - y),
        }
    }

    pub fn fits_within(&self, source_width: u32, source_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(source_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(source_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropShape {
    #[default]
    None,
    Circle,
    Ellipse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturate,
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Sharpen,
    Noise,
}

impl FilterKind {
    pub const ALL: [FilterKind; 9] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturate,
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Invert,
        FilterKind::Blur,
        FilterKind::Sharpen,
        FilterKind::Noise,
    ];

    pub const fn range(self) -> (f32, f32) {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => (0.0, 200.0),
            Self::Blur => (0.0, 20.0),
            Self::Grayscale | Self::Sepia | Self::Invert | Self::Sharpen | Self::Noise => {
                (0.0, 100.0)
            }
        }
    }

    pub const fn default_value(self) -> f32 {
        match self {
            Self::Brightness | Self::Contrast | Self::Saturate => 100.0,
            _ => 0.0,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Blur => "px",
            Self::Sharpen | Self::Noise => "",
            _ => "%",
        }
    }

    fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.range();
        if value.is_nan() {
            return self.default_value();
        }
        value.clamp(min, max)
    }
}

/// Magnitudes of the filter chain; percentages for color filters, pixels for blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturate: f32,
    pub grayscale: f32,
    pub sepia: f32,
    pub invert: f32,
    pub blur: f32,
    pub sharpen: f32,
    pub noise: f32,
}

impl FilterParams {
    pub const fn new() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturate: 100.0,
            grayscale: 0.0,
            sepia: 0.0,
            invert: 0.0,
            blur: 0.0,
            sharpen: 0.0,
            noise: 0.0,
        }
    }

    pub const fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturate => self.saturate,
            FilterKind::Grayscale => self.grayscale,
            FilterKind::Sepia => self.sepia,
            FilterKind::Invert => self.invert,
            FilterKind::Blur => self.blur,
            FilterKind::Sharpen => self.sharpen,
            FilterKind::Noise => self.noise,
        }
    }

    pub fn set(&mut self, kind: FilterKind, value: f32) {
        let value = kind.clamp(value);
        let slot = match kind {
            FilterKind::Brightness => &mut self.brightness,
            FilterKind::Contrast => &mut self.contrast,
            FilterKind::Saturate => &mut self.saturate,
            FilterKind::Grayscale => &mut self.grayscale,
            FilterKind::Sepia => &mut self.sepia,
            FilterKind::Invert => &mut self.invert,
            FilterKind::Blur => &mut self.blur,
            FilterKind::Sharpen => &mut self.sharpen,
            FilterKind::Noise => &mut self.noise,
        };
        *slot = value;
    }

    /// True when the combined filter pass would leave pixels untouched.
    pub fn is_identity_chain(&self) -> bool {
        FilterKind::ALL
            .iter()
            .filter(|kind| **kind != FilterKind::Noise)
            .all(|kind| self.get(*kind) == kind.default_value())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub position: f32,
    pub color: Color,
}

impl GradientStop {
    pub const fn new(position: f32, color: Color) -> Self {
        Self { position, color }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap {
    pub enabled: bool,
    stops: Vec<GradientStop>,
}

impl GradientMap {
    pub fn default_stops() -> Vec<GradientStop> {
        vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(1.0, Color::WHITE),
        ]
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.stops.len() >= 2
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled && self.stops.len() < 2 {
            self.stops = Self::default_stops();
        }
    }

    /// Replaces every stop; positions are clamped and the list re-sorted.
    pub fn set_stops(&mut self, stops: Vec<GradientStop>) {
        self.stops = stops
            .into_iter()
            .map(|stop| GradientStop::new(clamp_unit(stop.position, 0.0), stop.color))
            .collect();
        if self.stops.len() < 2 {
            self.stops = Self::default_stops();
        }
        self.sort_stops();
    }

    pub fn set_stop_position(&mut self, index: usize, position: f32) -> bool {
        let Some(stop) = self.stops.get_mut(index) else {
            return false;
        };
        stop.position = clamp_unit(position, stop.position);
        self.sort_stops();
        true
    }

    pub fn set_stop_color(&mut self, index: usize, color: Color) -> bool {
        let Some(stop) = self.stops.get_mut(index) else {
            return false;
        };
        stop.color = color;
        true
    }

    fn sort_stops(&mut self) {
        self.stops
            .sort_by(|left, right| left.position.total_cmp(&right.position));
    }
}

impl Default for GradientMap {
    fn default() -> Self {
        Self {
            enabled: false,
            stops: Self::default_stops(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint {
    pub input: u8,
    pub output: u8,
}

impl CurvePoint {
    pub const fn new(input: u8, output: u8) -> Self {
        Self { input, output }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curves {
    pub enabled: bool,
    pub points: Vec<CurvePoint>,
}

impl Curves {
    pub fn default_points() -> Vec<CurvePoint> {
        vec![
            CurvePoint::new(0, 0),
            CurvePoint::new(64, 48),
            CurvePoint::new(128, 128),
            CurvePoint::new(192, 208),
            CurvePoint::new(255, 255),
        ]
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.points.is_empty()
    }

    pub fn set_point_output(&mut self, index: usize, output: f32) -> bool {
        let Some(point) = self.points.get_mut(index) else {
            return false;
        };
        point.output = clamp_channel(output, point.output);
        true
    }

    pub fn reset(&mut self) {
        self.points = Self::default_points();
    }
}

impl Default for Curves {
    fn default() -> Self {
        Self {
            enabled: false,
            points: Self::default_points(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub color: Color,
    pub strength: f32,
}

impl Tint {
    pub const fn new() -> Self {
        Self {
            color: Color::TRANSPARENT,
            strength: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.strength > 0.0 && !self.color.is_transparent()
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::new()
    }
}

pub const VIGNETTE_MIN_SOFTNESS: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vignette {
    pub strength: f32,
    pub color: Color,
    pub extent: f32,
    pub softness: f32,
}

impl Vignette {
    pub const fn new() -> Self {
        Self {
            strength: 0.0,
            color: Color::BLACK,
            extent: 0.5,
            softness: 0.5,
        }
    }

    pub fn is_active(&self) -> bool {
        self.strength > 0.0
    }
}

impl Default for Vignette {
    fn default() -> Self {
        Self::new()
    }
}

pub const TEXT_MIN_FONT_SIZE: u32 = 8;
pub const TEXT_MAX_FONT_SIZE: u32 = 200;

/// Generating parameters of a text layer. Glyph rasterization happens outside the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub content: String,
    pub font_family: String,
    pub font_size: u32,
    pub color: Color,
}

impl TextSpec {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Self {
        self.font_size = self.font_size.clamp(TEXT_MIN_FONT_SIZE, TEXT_MAX_FONT_SIZE);
        if self.font_family.trim().is_empty() {
            self.font_family = Self::default().font_family;
        }
        self
    }

    pub fn layer_name(&self) -> String {
        let preview: String = self.content.chars().take(10).collect();
        format!("Text: {preview}...")
    }
}

impl Default for TextSpec {
    fn default() -> Self {
        Self {
            content: "Hello World".to_string(),
            font_family: "Arial".to_string(),
            font_size: 48,
            color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Square,
    Circle,
    Ellipse,
}

impl ShapeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "Rectangle",
            Self::Square => "Square",
            Self::Circle => "Circle",
            Self::Ellipse => "Ellipse",
        }
    }
}

pub const SHAPE_MAX_STROKE_WIDTH: u32 = 100;
const SHAPE_MAX_DIMENSION: u32 = 4096;

/// Generating parameters of a shape layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: u32,
    pub width: u32,
    pub height: u32,
}

impl ShapeSpec {
    pub const fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            fill: Color::rgb(0xcc, 0xcc, 0xcc),
            stroke: Color::rgb(0x33, 0x33, 0x33),
            stroke_width: 2,
            width: 150,
            height: 100,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            stroke_width: self.stroke_width.min(SHAPE_MAX_STROKE_WIDTH),
            width: self.width.clamp(1, SHAPE_MAX_DIMENSION),
            height: self.height.clamp(1, SHAPE_MAX_DIMENSION),
            ..self
        }
    }

    pub fn layer_name(&self) -> String {
        format!("Shape: {}", self.kind.label())
    }
}

impl Default for ShapeSpec {
    fn default() -> Self {
        Self::new(ShapeKind::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LayerKind {
    #[default]
    Raster,
    Text(TextSpec),
    Shape(ShapeSpec),
}

impl LayerKind {
    /// Text and shape layers own a buffer rendered by the editor rather than an imported asset.
    pub const fn is_rendered_buffer(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Shape(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) kind: LayerKind,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) rotation: f64,
    pub(crate) flip_horizontal: bool,
    pub(crate) flip_vertical: bool,
    pub(crate) source: LayerSource,
    pub(crate) crop: CropRect,
    pub(crate) crop_shape: CropShape,
    pub(crate) aspect_ratio: f64,
    pub(crate) opacity: f32,
    pub(crate) visible: bool,
    pub(crate) filters: FilterParams,
    pub(crate) gradient_map: GradientMap,
    pub(crate) curves: Curves,
    pub(crate) tint: Tint,
    pub(crate) vignette: Vignette,
    pub(crate) pixelate: u32,
    pub(crate) noise_seed: u64,
}

impl Layer {
    /// Builds a layer showing the whole source at its natural size with neutral effects.
    pub fn new(id: LayerId, name: &str, source: LayerSource, kind: LayerKind) -> Self {
        let source = if source.is_empty() {
            tracing::warn!(id, "layer source has no pixels; substituting a 1x1 buffer");
            LayerSource::new(RgbaImage::new(1, 1))
        } else {
            source
        };
        let natural_width = source.width();
        let natural_height = source.height();

        Self {
            id,
            name: display_name(name),
            kind,
            x: DEFAULT_LAYER_X,
            y: DEFAULT_LAYER_Y,
            width: f64::from(natural_width),
            height: f64::from(natural_height),
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            crop: CropRect::full(natural_width, natural_height),
            crop_shape: CropShape::None,
            aspect_ratio: f64::from(natural_width) / f64::from(natural_height),
            source,
            opacity: 1.0,
            visible: true,
            filters: FilterParams::new(),
            gradient_map: GradientMap::default(),
            curves: Curves::default(),
            tint: Tint::new(),
            vignette: Vignette::new(),
            pixelate: 1,
            noise_seed: id,
        }
    }

    pub const fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub const fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub const fn rotation(&self) -> f64 {
        self.rotation
    }

    pub const fn flips(&self) -> (bool, bool) {
        (self.flip_horizontal, self.flip_vertical)
    }

    pub const fn source(&self) -> &LayerSource {
        &self.source
    }

    pub const fn crop(&self) -> CropRect {
        self.crop
    }

    pub const fn crop_shape(&self) -> CropShape {
        self.crop_shape
    }

    pub const fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub const fn opacity(&self) -> f32 {
        self.opacity
    }

    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    pub const fn filters(&self) -> &FilterParams {
        &self.filters
    }

    pub const fn gradient_map(&self) -> &GradientMap {
        &self.gradient_map
    }

    pub const fn curves(&self) -> &Curves {
        &self.curves
    }

    pub const fn tint(&self) -> &Tint {
        &self.tint
    }

    pub const fn vignette(&self) -> &Vignette {
        &self.vignette
    }

    pub const fn pixelate(&self) -> u32 {
        self.pixelate
    }

    pub const fn noise_seed(&self) -> u64 {
        self.noise_seed
    }

    pub fn frame(&self) -> LayerFrame {
        LayerFrame::from_box(self.x, self.y, self.width, self.height, self.rotation)
    }

    pub(crate) fn set_frame(&mut self, frame: LayerFrame) {
        self.width = frame.width.max(1.0);
        self.height = frame.height.max(1.0);
        self.x = frame.center.x - self.width / 2.0;
        self.y = frame.center.y - self.height / 2.0;
        self.rotation = normalize_rotation(frame.rotation);
    }

    pub(crate) fn set_rotation(&mut self, degrees: f64) {
        self.rotation = normalize_rotation(degrees);
    }

    /// Scales the display box down so its longer side fits within `limit`, keeping the aspect ratio.
    pub(crate) fn fit_within(&mut self, limit: f64) {
        let max_dimension = self.width.max(self.height);
        if max_dimension <= limit || max_dimension <= 0.0 {
            return;
        }
        let scale = limit / max_dimension;
        self.width = (self.width * scale).round();
        self.height = (self.height * scale).round();
        if self.width <= 0.0 {
            self.width = 100.0;
        }
        if self.height <= 0.0 {
            self.height = 50.0;
        }
    }

    /// Swaps in a new bitmap with its natural size as the display size, resetting the crop.
    pub(crate) fn replace_rendered_source(&mut self, source: LayerSource, kind: LayerKind) {
        if source.is_empty() {
            tracing::warn!(id = self.id, "ignoring empty replacement bitmap");
            return;
        }
        self.width = f64::from(source.width());
        self.height = f64::from(source.height());
        self.aspect_ratio = self.width / self.height;
        self.crop = CropRect::full(source.width(), source.height());
        self.source = source;
        self.kind = kind;
    }

    /// Swaps in a new bitmap keeping the display width, e.g. after a background removal.
    pub(crate) fn replace_source_keep_width(&mut self, source: LayerSource, canvas: CanvasSize) {
        if source.is_empty() {
            tracing::warn!(id = self.id, "ignoring empty replacement bitmap");
            return;
        }
        let natural_width = f64::from(source.width());
        let natural_height = f64::from(source.height());
        self.aspect_ratio = natural_width / natural_height;
        self.crop = CropRect::full(source.width(), source.height());
        self.source = source;

        let derived_height = self.width / self.aspect_ratio;
        if derived_height.is_finite() && derived_height > 0.0 {
            self.height = derived_height;
        } else {
            let scale = (f64::from(canvas.width) * 0.75 / natural_width)
                .min(f64::from(canvas.height) * 0.75 / natural_height)
                .min(1.0);
            self.width = natural_width * scale;
            self.height = natural_height * scale;
        }
        self.filters.brightness = FilterKind::Brightness.default_value();
        self.filters.contrast = FilterKind::Contrast.default_value();
    }

    pub(crate) fn reset_display_size(&mut self, canvas: CanvasSize) {
        let crop_width = f64::from(self.crop.width);
        let crop_height = f64::from(self.crop.height);
        let limit = f64::from(canvas.shorter_side()) * RESET_DISPLAY_CANVAS_RATIO;
        let scale = (limit / crop_width).min(limit / crop_height).min(1.0);
        self.width = (crop_width * scale).round().max(1.0);
        self.height = (crop_height * scale).round().max(1.0);
        self.aspect_ratio = crop_width / crop_height;
    }

    /// Duplicate sharing nothing mutable with `self`; rendered buffers get their own pixels.
    pub(crate) fn duplicate_as(&self, id: LayerId, offset: f64) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.noise_seed = id;
        copy.name = format!("{} Copy", self.name);
        copy.x += offset;
        copy.y += offset;
        if self.kind.is_rendered_buffer() {
            copy.source = self.source.deep_copy();
        }
        copy
    }
}

fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "Layer".to_string();
    }
    if trimmed.chars().count() > LAYER_NAME_MAX_CHARS {
        let head: String = trimmed.chars().take(LAYER_NAME_TRUNCATED_CHARS).collect();
        return format!("{head}...");
    }
    trimmed.to_string()
}

pub(crate) fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        return fallback;
    }
    value.clamp(0.0, 1.0)
}

pub(crate) fn clamp_channel(value: f32, fallback: u8) -> u8 {
    if value.is_nan() {
        return fallback;
    }
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(width: u32, height: u32) -> LayerSource {
        LayerSource::new(RgbaImage::new(width, height))
    }

    #[test]
    fn new_layer_uses_natural_size_and_neutral_effects() {
        let layer = Layer::new(3, "photo.png", source(40, 20), LayerKind::Raster);

        assert_eq!(layer.position(), (50.0, 50.0));
        assert_eq!(layer.size(), (40.0, 20.0));
        assert_eq!(layer.crop(), CropRect::full(40, 20));
        assert_eq!(layer.aspect_ratio(), 2.0);
        assert!(layer.filters().is_identity_chain());
        assert!(!layer.gradient_map().is_active());
        assert!(!layer.curves().is_active());
        assert!(!layer.tint().is_active());
        assert!(!layer.vignette().is_active());
        assert_eq!(layer.pixelate(), 1);
    }

    #[test]
    fn long_names_are_truncated_with_ellipsis() {
        let layer = Layer::new(
            1,
            "a-very-long-file-name-for-a-layer.png",
            source(1, 1),
            LayerKind::Raster,
        );
        assert_eq!(layer.name(), "a-very-long-file-...");
        assert_eq!(display_name("exactly-twenty-chars"), "exactly-twenty-chars");
        assert_eq!(display_name("   "), "Layer");
    }

    #[test]
    fn empty_source_is_replaced_by_single_pixel() {
        let layer = Layer::new(1, "empty", source(0, 0), LayerKind::Raster);
        assert_eq!(layer.source().width(), 1);
        assert_eq!(layer.crop(), CropRect::full(1, 1));
    }

    #[test]
    fn crop_clamp_keeps_rectangle_inside_source() {
        let cases = [
            (CropRect::new(0, 0, 500, 500), CropRect::new(0, 0, 100, 50)),
            (CropRect::new(150, 80, 10, 10), CropRect::new(99, 49, 1, 1)),
            (CropRect::new(20, 10, 0, 0), CropRect::new(20, 10, 1, 1)),
            (CropRect::new(60, 30, 90, 90), CropRect::new(60, 30, 40, 20)),
        ];
        for (input, expected) in cases {
            let clamped = input.clamped_to(100, 50);
            assert_eq!(clamped, expected);
            assert!(clamped.fits_within(100, 50));
        }
    }

    #[test]
    fn gradient_stop_position_edit_keeps_stops_sorted() {
        let mut map = GradientMap::default();
        map.set_stops(vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(0.5, Color::rgb(255, 0, 0)),
            GradientStop::new(1.0, Color::WHITE),
        ]);

        assert!(map.set_stop_position(0, 0.8));
        let positions: Vec<f32> = map.stops().iter().map(|stop| stop.position).collect();
        assert_eq!(positions, vec![0.5, 0.8, 1.0]);
        assert_eq!(map.stops()[1].color, Color::BLACK);

        assert!(map.set_stop_position(2, -3.0));
        assert_eq!(map.stops()[0].position, 0.0);
        assert!(!map.set_stop_position(9, 0.1));
    }

    #[test]
    fn enabling_gradient_map_restores_default_stops_when_too_few() {
        let mut map = GradientMap::default();
        map.stops.truncate(1);
        map.set_enabled(true);
        assert_eq!(map.stops(), GradientMap::default_stops().as_slice());
        assert!(map.is_active());
    }

    #[test]
    fn curve_point_output_is_clamped() {
        let mut curves = Curves::default();
        assert!(curves.set_point_output(1, 300.0));
        assert_eq!(curves.points[1].output, 255);
        assert!(curves.set_point_output(1, -4.0));
        assert_eq!(curves.points[1].output, 0);
        assert!(!curves.set_point_output(42, 10.0));
        curves.reset();
        assert_eq!(curves.points, Curves::default_points());
    }

    #[test]
    fn filter_values_clamp_to_their_ranges() {
        let mut filters = FilterParams::new();
        filters.set(FilterKind::Brightness, 500.0);
        filters.set(FilterKind::Blur, -2.0);
        filters.set(FilterKind::Sepia, f32::NAN);
        assert_eq!(filters.brightness, 200.0);
        assert_eq!(filters.blur, 0.0);
        assert_eq!(filters.sepia, 0.0);
        assert!(!filters.is_identity_chain());
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        let mut layer = Layer::new(1, "wide", source(2000, 1000), LayerKind::Raster);
        layer.fit_within(768.0);
        assert_eq!(layer.size(), (768.0, 384.0));
    }

    #[test]
    fn duplicate_deep_copies_rendered_buffers_only() {
        let raster = Layer::new(1, "raster", source(4, 4), LayerKind::Raster);
        let raster_copy = raster.duplicate_as(2, 10.0);
        assert!(raster_copy.source().shares_pixels_with(raster.source()));
        assert_eq!(raster_copy.name(), "raster Copy");

        let shape = Layer::new(3, "shape", source(4, 4), LayerKind::Shape(ShapeSpec::default()));
        let shape_copy = shape.duplicate_as(4, 10.0);
        assert!(!shape_copy.source().shares_pixels_with(shape.source()));
        assert_eq!(shape_copy.source(), shape.source());
    }

    #[test]
    fn replace_source_keeps_width_and_resets_crop() {
        let mut layer = Layer::new(1, "photo", source(200, 100), LayerKind::Raster);
        layer.crop = CropRect::new(10, 10, 50, 50);
        layer.replace_source_keep_width(source(100, 100), CanvasSize::default());
        assert_eq!(layer.size(), (200.0, 200.0));
        assert_eq!(layer.crop(), CropRect::full(100, 100));
    }

    #[test]
    fn reset_display_size_fits_crop_into_canvas() {
        let mut layer = Layer::new(1, "photo", source(2000, 1000), LayerKind::Raster);
        layer.reset_display_size(CanvasSize::clamped(1000, 1000));
        assert_eq!(layer.size(), (900.0, 450.0));
    }
}
