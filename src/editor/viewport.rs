use crate::geometry::{CanvasSize, DocPoint, ScreenPoint};

pub const VIEWPORT_ZOOM_MIN: f64 = 0.1;
pub const VIEWPORT_ZOOM_MAX: f64 = 5.0;
pub const VIEWPORT_ZOOM_STEP: f64 = 0.1;
const VIEWPORT_FIT_MARGIN: f64 = 0.98;

fn clamp_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return 1.0;
    }
    zoom.clamp(VIEWPORT_ZOOM_MIN, VIEWPORT_ZOOM_MAX)
}

// Step arithmetic drifts in binary floating point; keep ladder values on hundredths.
fn round_zoom(zoom: f64) -> f64 {
    (zoom * 100.0).round() / 100.0
}

/// Presentation transform of the canvas. It never reaches exported pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

impl Viewport {
    pub const fn new() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    pub const fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn zoom_in(&mut self, step: f64) {
        self.zoom = clamp_zoom(round_zoom(self.zoom + step.abs()));
    }

    pub fn zoom_out(&mut self, step: f64) {
        self.zoom = clamp_zoom(round_zoom(self.zoom - step.abs()));
    }

    /// Scales the canvas to fit a `viewport_width` x `viewport_height` area and recenters it.
    pub fn zoom_to_fit(&mut self, canvas: CanvasSize, viewport_width: f64, viewport_height: f64) {
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        if viewport_width <= 0.0 || viewport_height <= 0.0 {
            self.zoom = 1.0;
            return;
        }
        let scale = (viewport_width / f64::from(canvas.width))
            .min(viewport_height / f64::from(canvas.height));
        self.zoom = clamp_zoom(scale * VIEWPORT_FIT_MARGIN);
    }

    pub fn set_actual_size(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        if !delta_x.is_finite() || !delta_y.is_finite() {
            return;
        }
        self.pan_x += delta_x;
        self.pan_y += delta_y;
    }

    /// Maps a pointer already corrected for the element origin into document space.
    /// Pan is a display transform and does not take part.
    pub fn to_document(&self, point: ScreenPoint) -> DocPoint {
        DocPoint::new(point.x / self.zoom, point.y / self.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
