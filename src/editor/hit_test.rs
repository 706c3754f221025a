use crate::geometry::{normalize_rotation, rotate_vector, DocPoint, LayerFrame};

use super::layer::{Layer, LayerId};

pub const HANDLE_HIT_RADIUS: f64 = 8.0;
pub const ROTATION_HANDLE_OFFSET: f64 = 25.0;
pub const MIN_GESTURE_DIMENSION: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopMiddle,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
    Rotate,
}

impl Handle {
    /// Enumeration order used for hit-testing; the first match wins.
    pub const ALL: [Handle; 9] = [
        Handle::TopLeft,
        Handle::TopMiddle,
        Handle::TopRight,
        Handle::MiddleLeft,
        Handle::MiddleRight,
        Handle::BottomLeft,
        Handle::BottomMiddle,
        Handle::BottomRight,
        Handle::Rotate,
    ];

    pub const fn is_rotate(self) -> bool {
        matches!(self, Self::Rotate)
    }

    /// Edge-midpoint handles move a single axis and ignore the aspect lock.
    pub const fn is_single_axis(self) -> bool {
        matches!(
            self,
            Self::TopMiddle | Self::BottomMiddle | Self::MiddleLeft | Self::MiddleRight
        )
    }

    const fn touches_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::MiddleLeft | Self::BottomLeft)
    }

    const fn touches_right(self) -> bool {
        matches!(self, Self::TopRight | Self::MiddleRight | Self::BottomRight)
    }

    const fn touches_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopMiddle | Self::TopRight)
    }

    const fn touches_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomMiddle | Self::BottomRight)
    }

    fn local_offset(self, frame: &LayerFrame, rotation_offset: f64) -> DocPoint {
        let hw = frame.half_width();
        let hh = frame.half_height();
        let (x, y) = match self {
            Self::TopLeft => (-hw, -hh),
            Self::TopMiddle => (0.0, -hh),
            Self::TopRight => (hw, -hh),
            Self::MiddleLeft => (-hw, 0.0),
            Self::MiddleRight => (hw, 0.0),
            Self::BottomLeft => (-hw, hh),
            Self::BottomMiddle => (0.0, hh),
            Self::BottomRight => (hw, hh),
            Self::Rotate => (0.0, -hh - rotation_offset),
        };
        DocPoint::new(x, y)
    }
}

/// Handle centers in document space, rotated with the frame.
pub fn handle_positions(frame: &LayerFrame, rotation_offset: f64) -> [(Handle, DocPoint); 9] {
    Handle::ALL.map(|handle| {
        (
            handle,
            frame.to_document(handle.local_offset(frame, rotation_offset)),
        )
    })
}

pub fn handle_at_point(
    frame: &LayerFrame,
    point: DocPoint,
    hit_radius: f64,
    rotation_offset: f64,
) -> Option<Handle> {
    let radius_squared = hit_radius * hit_radius;
    handle_positions(frame, rotation_offset)
        .into_iter()
        .find(|(_, position)| position.distance_squared(point) <= radius_squared)
        .map(|(handle, _)| handle)
}

/// Topmost visible layer whose rotated box contains `point`.
pub fn top_layer_at_point(layers: &[Layer], point: DocPoint) -> Option<LayerId> {
    layers
        .iter()
        .rev()
        .filter(|layer| layer.is_visible())
        .find(|layer| layer.frame().contains(point))
        .map(Layer::id)
}

/// Frame produced by dragging `handle` from `start` to `current`, with the
/// reference center kept fixed.
pub fn resized_frame_from_handle(
    reference: &LayerFrame,
    handle: Handle,
    start: DocPoint,
    current: DocPoint,
    keep_aspect: bool,
    min_dimension: f64,
) -> LayerFrame {
    let (dx, dy) = rotate_vector(
        current.x - start.x,
        current.y - start.y,
        -reference.rotation,
    );

    let mut width = reference.width;
    let mut height = reference.height;
    if handle.touches_left() {
        width -= dx;
    }
    if handle.touches_right() {
        width += dx;
    }
    if handle.touches_top() {
        height -= dy;
    }
    if handle.touches_bottom() {
        height += dy;
    }

    if keep_aspect && !handle.is_single_axis() && reference.height > 0.0 && height != 0.0 {
        let ratio = reference.width / reference.height;
        if width / height > ratio {
            width = height * ratio;
        } else {
            height = width / ratio;
        }
    }

    LayerFrame {
        center: reference.center,
        width: width.max(min_dimension),
        height: height.max(min_dimension),
        rotation: reference.rotation,
    }
}

/// Frame rotated by the signed angle swept from `start` to `current` around the reference center.
pub fn rotated_frame(reference: &LayerFrame, start: DocPoint, current: DocPoint) -> LayerFrame {
    let center = reference.center;
    let start_angle = (start.y - center.y).atan2(start.x - center.x);
    let current_angle = (current.y - center.y).atan2(current.x - center.x);
    LayerFrame {
        rotation: normalize_rotation(
            reference.rotation + (current_angle - start_angle).to_degrees(),
        ),
        ..*reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::layer::{LayerKind, LayerSource};
    use image::RgbaImage;

    fn frame(rotation: f64) -> LayerFrame {
        LayerFrame::from_box(0.0, 0.0, 200.0, 100.0, rotation)
    }

    fn hit(frame: &LayerFrame, x: f64, y: f64) -> Option<Handle> {
        handle_at_point(
            frame,
            DocPoint::new(x, y),
            HANDLE_HIT_RADIUS,
            ROTATION_HANDLE_OFFSET,
        )
    }

    #[test]
    fn unrotated_handles_sit_on_corners_and_midpoints() {
        let frame = frame(0.0);
        assert_eq!(hit(&frame, 0.0, 0.0), Some(Handle::TopLeft));
        assert_eq!(hit(&frame, 100.0, 0.0), Some(Handle::TopMiddle));
        assert_eq!(hit(&frame, 203.0, 3.0), Some(Handle::TopRight));
        assert_eq!(hit(&frame, 0.0, 50.0), Some(Handle::MiddleLeft));
        assert_eq!(hit(&frame, 200.0, 100.0), Some(Handle::BottomRight));
        assert_eq!(hit(&frame, 100.0, -25.0), Some(Handle::Rotate));
        assert_eq!(hit(&frame, 100.0, 50.0), None);
        assert_eq!(hit(&frame, 209.0, 0.0), None);
    }

    #[test]
    fn handles_rotate_with_the_layer() {
        let rotated = frame(90.0);
        // After a quarter turn the top-left corner sits at the visual top-right.
        let (min_x, min_y, max_x, _) = rotated.bounding_box();
        assert_eq!(hit(&rotated, max_x, min_y), Some(Handle::TopLeft));
        assert_eq!(hit(&rotated, min_x, min_y), Some(Handle::BottomLeft));
        // The old top-right position is no longer a handle.
        assert_eq!(hit(&rotated, 200.0, 0.0), None);
        // Rotation handle moves to the right of the center.
        assert_eq!(hit(&rotated, 100.0 + 50.0 + 25.0, 50.0), Some(Handle::Rotate));
    }

    #[test]
    fn top_layer_at_point_skips_hidden_layers_and_prefers_topmost() {
        let source = || LayerSource::new(RgbaImage::new(10, 10));
        let bottom = Layer::new(1, "bottom", source(), LayerKind::Raster);
        let mut top = Layer::new(2, "top", source(), LayerKind::Raster);
        let point = DocPoint::new(55.0, 55.0);

        assert_eq!(
            top_layer_at_point(&[bottom.clone(), top.clone()], point),
            Some(2)
        );
        top.visible = false;
        assert_eq!(top_layer_at_point(&[bottom, top], point), Some(1));
        assert_eq!(top_layer_at_point(&[], point), None);
    }

    #[test]
    fn edge_handle_resizes_one_axis_and_ignores_aspect_lock() {
        let reference = frame(0.0);
        let resized = resized_frame_from_handle(
            &reference,
            Handle::MiddleRight,
            DocPoint::new(200.0, 50.0),
            DocPoint::new(240.0, 90.0),
            true,
            MIN_GESTURE_DIMENSION,
        );
        assert_eq!(resized.width, 240.0);
        assert_eq!(resized.height, 100.0);
        assert_eq!(resized.center, reference.center);
    }

    #[test]
    fn corner_handle_with_aspect_lock_keeps_ratio() {
        let reference = frame(0.0);
        let resized = resized_frame_from_handle(
            &reference,
            Handle::BottomRight,
            DocPoint::new(200.0, 100.0),
            DocPoint::new(300.0, 110.0),
            true,
            MIN_GESTURE_DIMENSION,
        );
        assert_eq!(resized.height, 110.0);
        assert_eq!(resized.width, 220.0);
    }

    #[test]
    fn resize_delta_is_taken_in_the_rotated_frame() {
        let reference = frame(90.0);
        // Local +x points down the screen after a quarter turn.
        let resized = resized_frame_from_handle(
            &reference,
            Handle::MiddleRight,
            DocPoint::new(100.0, 150.0),
            DocPoint::new(100.0, 170.0),
            false,
            MIN_GESTURE_DIMENSION,
        );
        assert!((resized.width - 220.0).abs() < 1e-9);
        assert_eq!(resized.height, 100.0);
    }

    #[test]
    fn resize_never_goes_below_minimum_dimension() {
        let reference = frame(0.0);
        let resized = resized_frame_from_handle(
            &reference,
            Handle::TopLeft,
            DocPoint::new(0.0, 0.0),
            DocPoint::new(500.0, 500.0),
            false,
            MIN_GESTURE_DIMENSION,
        );
        assert_eq!(resized.width, MIN_GESTURE_DIMENSION);
        assert_eq!(resized.height, MIN_GESTURE_DIMENSION);
    }

    #[test]
    fn rotation_follows_swept_pointer_angle() {
        let reference = frame(170.0);
        let rotated = rotated_frame(
            &reference,
            DocPoint::new(200.0, 50.0),
            DocPoint::new(100.0, 150.0),
        );
        assert!((rotated.rotation - -100.0).abs() < 1e-9);
        assert_eq!(rotated.width, reference.width);
    }
}
