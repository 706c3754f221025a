use crate::geometry::{CanvasSize, Color, CANVAS_MAX_DIMENSION};

use super::layer::{
    clamp_unit, CropRect, CropShape, CurvePoint, FilterKind, GradientStop, Layer,
    VIGNETTE_MIN_SOFTNESS,
};

const MIN_DISPLAY_DIMENSION: f64 = 1.0;
/// Typed sizes beyond ten canvases wide are clamped.
const MAX_DISPLAY_DIMENSION: f64 = CANVAS_MAX_DIMENSION as f64 * 10.0;

/// One typed edit of a layer property. Values are clamped into range when applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerUpdate {
    Name(String),
    Position { x: f64, y: f64 },
    Width { value: f64, keep_aspect: bool },
    Height { value: f64, keep_aspect: bool },
    Rotation(f64),
    FlipHorizontal(bool),
    FlipVertical(bool),
    Opacity(f32),
    Visible(bool),
    Crop(CropRect),
    CropShape(CropShape),
    ResetCrop,
    ResetDisplaySize,
    Filter(FilterKind, f32),
    GradientMapEnabled(bool),
    GradientStops(Vec<GradientStop>),
    GradientStopPosition { index: usize, position: f32 },
    GradientStopColor { index: usize, color: Color },
    CurvesEnabled(bool),
    CurvePoints(Vec<CurvePoint>),
    CurvePointOutput { index: usize, output: f32 },
    ResetCurves,
    TintColor(Color),
    TintStrength(f32),
    VignetteStrength(f32),
    VignetteColor(Color),
    VignetteExtent(f32),
    VignetteSoftness(f32),
    Pixelate(u32),
}

impl Layer {
    /// Applies `update`, correcting out-of-range values instead of rejecting them.
    pub fn apply_update(&mut self, update: LayerUpdate, canvas: CanvasSize) {
        match update {
            LayerUpdate::Name(name) => {
                if !name.trim().is_empty() {
                    self.name = name.trim().to_string();
                }
            }
            LayerUpdate::Position { x, y } => {
                if x.is_finite() {
                    self.x = x;
                }
                if y.is_finite() {
                    self.y = y;
                }
            }
            LayerUpdate::Width { value, keep_aspect } => {
                let Some(width) = display_dimension(value) else {
                    return;
                };
                self.width = width;
                if keep_aspect && self.aspect_ratio > 0.0 {
                    self.height = clamp_display((width / self.aspect_ratio).round());
                }
            }
            LayerUpdate::Height { value, keep_aspect } => {
                let Some(height) = display_dimension(value) else {
                    return;
                };
                self.height = height;
                if keep_aspect && self.aspect_ratio > 0.0 {
                    self.width = clamp_display((height * self.aspect_ratio).round());
                }
            }
            LayerUpdate::Rotation(degrees) => self.set_rotation(degrees),
            LayerUpdate::FlipHorizontal(flipped) => self.flip_horizontal = flipped,
            LayerUpdate::FlipVertical(flipped) => self.flip_vertical = flipped,
            LayerUpdate::Opacity(opacity) => self.opacity = clamp_unit(opacity, self.opacity),
            LayerUpdate::Visible(visible) => self.visible = visible,
            LayerUpdate::Crop(crop) => {
                self.crop = crop.clamped_to(self.source.width(), self.source.height());
            }
            LayerUpdate::CropShape(shape) => self.crop_shape = shape,
            LayerUpdate::ResetCrop => {
                self.crop = CropRect::full(self.source.width(), self.source.height());
            }
            LayerUpdate::ResetDisplaySize => self.reset_display_size(canvas),
            LayerUpdate::Filter(kind, value) => self.filters.set(kind, value),
            LayerUpdate::GradientMapEnabled(enabled) => self.gradient_map.set_enabled(enabled),
            LayerUpdate::GradientStops(stops) => self.gradient_map.set_stops(stops),
            LayerUpdate::GradientStopPosition { index, position } => {
                if !self.gradient_map.set_stop_position(index, position) {
                    tracing::debug!(id = self.id, index, "gradient stop index out of range");
                }
            }
            LayerUpdate::GradientStopColor { index, color } => {
                if !self.gradient_map.set_stop_color(index, color) {
                    tracing::debug!(id = self.id, index, "gradient stop index out of range");
                }
            }
            LayerUpdate::CurvesEnabled(enabled) => self.curves.enabled = enabled,
            LayerUpdate::CurvePoints(points) => self.curves.points = points,
            LayerUpdate::CurvePointOutput { index, output } => {
                if !self.curves.set_point_output(index, output) {
                    tracing::debug!(id = self.id, index, "curve point index out of range");
                }
            }
            LayerUpdate::ResetCurves => self.curves.reset(),
            LayerUpdate::TintColor(color) => self.tint.color = color,
            LayerUpdate::TintStrength(strength) => {
                self.tint.strength = clamp_unit(strength, self.tint.strength);
            }
            LayerUpdate::VignetteStrength(strength) => {
                self.vignette.strength = clamp_unit(strength, self.vignette.strength);
            }
            LayerUpdate::VignetteColor(color) => self.vignette.color = color,
            LayerUpdate::VignetteExtent(extent) => {
                self.vignette.extent = clamp_unit(extent, self.vignette.extent);
            }
            LayerUpdate::VignetteSoftness(softness) => {
                self.vignette.softness =
                    clamp_unit(softness, self.vignette.softness).max(VIGNETTE_MIN_SOFTNESS);
            }
            LayerUpdate::Pixelate(size) => self.pixelate = size.max(1),
        }
    }
}

fn clamp_display(value: f64) -> f64 {
    value.clamp(MIN_DISPLAY_DIMENSION, MAX_DISPLAY_DIMENSION)
}

fn display_dimension(value: f64) -> Option<f64> {
    value.is_finite().then(|| clamp_display(value))
}
