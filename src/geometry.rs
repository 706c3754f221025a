//! Shared geometric and color primitives used by the layer model, hit-testing and the compositor.

/// A position in document space (canvas pixels, before zoom).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: DocPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A pointer position relative to the rendering element's on-screen origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub const CANVAS_MIN_DIMENSION: u32 = 100;
pub const CANVAS_MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Builds a canvas size with both dimensions clamped into the supported range.
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(CANVAS_MIN_DIMENSION, CANVAS_MAX_DIMENSION),
            height: height.clamp(CANVAS_MIN_DIMENSION, CANVAS_MAX_DIMENSION),
        }
    }

    pub fn shorter_side(self) -> u32 {
        self.width.min(self.height)
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::clamped(1024, 1024)
    }
}

/// Maps any angle in degrees into `(-180, 180]`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let mut wrapped = degrees % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Rotates a vector clockwise on screen (y grows downward) by `degrees`.
pub fn rotate_vector(x: f64, y: f64, degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Center-anchored rectangle with a rotation, the reference frame of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerFrame {
    pub center: DocPoint,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl LayerFrame {
    pub fn from_box(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> Self {
        Self {
            center: DocPoint::new(x + width / 2.0, y + height / 2.0),
            width,
            height,
            rotation,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// Converts a document point into the un-rotated frame, origin at the center.
    pub fn to_local(&self, point: DocPoint) -> DocPoint {
        let (x, y) = rotate_vector(
            point.x - self.center.x,
            point.y - self.center.y,
            -self.rotation,
        );
        DocPoint::new(x, y)
    }

    pub fn to_document(&self, local: DocPoint) -> DocPoint {
        let (x, y) = rotate_vector(local.x, local.y, self.rotation);
        DocPoint::new(self.center.x + x, self.center.y + y)
    }

    pub fn contains(&self, point: DocPoint) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.half_width() && local.y.abs() <= self.half_height()
    }

    /// Corners in document space: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [DocPoint; 4] {
        let hw = self.half_width();
        let hh = self.half_height();
        [
            self.to_document(DocPoint::new(-hw, -hh)),
            self.to_document(DocPoint::new(hw, -hh)),
            self.to_document(DocPoint::new(hw, hh)),
            self.to_document(DocPoint::new(-hw, hh)),
        ]
    }

    /// Axis-aligned bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        self.corners().iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_x, min_y, max_x, max_y), corner| {
                (
                    min_x.min(corner.x),
                    min_y.min(corner.y),
                    max_x.max(corner.x),
                    max_y.max(corner.y),
                )
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn is_transparent(self) -> bool {
        self.a == 0
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`; the leading `#` is optional.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        match digits.len() {
            3 => {
                let expand = |index: usize| channel(index..index + 1).map(|value| value * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}
