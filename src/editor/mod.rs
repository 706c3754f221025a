//! Editing surface: the document, its layer stack, gestures and undo history.

pub mod document;
pub mod hit_test;
pub mod layer;
pub mod shape;
pub mod tools;
pub mod update;
pub mod viewport;

use image::RgbaImage;

use crate::config::{load_editor_config, EditorConfig};
use crate::export::{export_document, ExportOutcome, ExportRequest};
use crate::geometry::{CanvasSize, DocPoint, ScreenPoint};
use crate::history::{CommitOutcome, History, HistoryAction};
use crate::render::{Compositor, RenderMode};
use crate::state::{GestureCapture, GestureMachine, GestureState};

pub use document::{Alignment, Document, DocumentSnapshot, StackDirection};
pub use hit_test::Handle;
pub use layer::{Layer, LayerId, LayerKind, LayerSource, ShapeSpec, TextSpec};
pub use tools::{ToolKind, ToolPanel};
pub use update::LayerUpdate;
pub use viewport::Viewport;

/// Turns text parameters into a bitmap. Font handling lives with the caller.
pub trait TextRasterizer {
    fn rasterize(&self, spec: &TextSpec) -> Option<RgbaImage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl NudgeDirection {
    const fn unit(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }
}

#[derive(Debug)]
pub struct Editor {
    document: Document,
    history: History<DocumentSnapshot>,
    gestures: GestureMachine,
    compositor: Compositor,
    config: EditorConfig,
    aspect_lock: bool,
    revision: u64,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let config = config.sanitized();
        let mut editor = Self {
            document: Document::new(config.default_canvas()),
            history: History::new(config.history_capacity),
            gestures: GestureMachine::new(),
            compositor: Compositor::new(&config),
            config,
            aspect_lock: true,
            revision: 0,
        };
        editor.history.commit(editor.document.snapshot());
        editor
    }

    /// Editor configured from the user's `config.json`.
    pub fn from_user_config() -> Self {
        Self::new(load_editor_config())
    }

    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.document.layer(id)
    }

    /// Bumped on every change to the live document, committed or not.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    pub const fn aspect_lock(&self) -> bool {
        self.aspect_lock
    }

    pub fn set_aspect_lock(&mut self, locked: bool) {
        self.aspect_lock = locked;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Records the live document as a completed edit.
    pub fn commit(&mut self) -> CommitOutcome {
        self.history.commit(self.document.snapshot())
    }

    fn finish_mutation(&mut self) -> CommitOutcome {
        self.revision += 1;
        self.commit()
    }

    fn finish_if(&mut self, changed: bool) -> bool {
        if changed {
            self.finish_mutation();
        }
        changed
    }

    fn fit_ratio(&self) -> f64 {
        self.config.auto_fit_ratio
    }

    pub fn add_layer(&mut self, name: &str, pixels: RgbaImage) -> LayerId {
        self.add_layer_source(name, LayerSource::new(pixels))
    }

    /// Inserts a decoded bitmap as a raster layer on top of the stack.
    pub fn add_layer_source(&mut self, name: &str, source: LayerSource) -> LayerId {
        let id = self
            .document
            .insert_layer(name, source, LayerKind::Raster, self.fit_ratio());
        self.finish_mutation();
        id
    }

    pub fn add_text_layer(
        &mut self,
        spec: TextSpec,
        rasterizer: &dyn TextRasterizer,
    ) -> Option<LayerId> {
        let spec = spec.normalized();
        if spec.content.trim().is_empty() {
            return None;
        }
        let Some(bitmap) = rasterizer.rasterize(&spec) else {
            tracing::warn!("text rasterizer produced no bitmap");
            return None;
        };
        let name = spec.layer_name();
        let id = self.document.insert_layer(
            &name,
            LayerSource::new(bitmap),
            LayerKind::Text(spec),
            self.fit_ratio(),
        );
        self.finish_mutation();
        Some(id)
    }

    /// Re-renders a text layer from new parameters, replacing its bitmap and crop.
    pub fn update_text_layer(
        &mut self,
        id: LayerId,
        spec: TextSpec,
        rasterizer: &dyn TextRasterizer,
    ) -> bool {
        if !matches!(self.document.layer(id).map(Layer::kind), Some(LayerKind::Text(_))) {
            return false;
        }
        let spec = spec.normalized();
        if spec.content.trim().is_empty() {
            return false;
        }
        let Some(bitmap) = rasterizer.rasterize(&spec) else {
            tracing::warn!(id, "text rasterizer produced no bitmap");
            return false;
        };
        let changed = self.document.replace_rendered_layer(
            id,
            LayerSource::new(bitmap),
            LayerKind::Text(spec),
        );
        self.finish_if(changed)
    }

    pub fn add_shape_layer(&mut self, spec: ShapeSpec) -> LayerId {
        let spec = spec.normalized();
        let bitmap = shape::rasterize_shape(&spec);
        let id = self.document.insert_layer(
            &spec.layer_name(),
            LayerSource::new(bitmap),
            LayerKind::Shape(spec),
            self.fit_ratio(),
        );
        self.finish_mutation();
        id
    }

    pub fn update_shape_layer(&mut self, id: LayerId, spec: ShapeSpec) -> bool {
        if !matches!(self.document.layer(id).map(Layer::kind), Some(LayerKind::Shape(_))) {
            return false;
        }
        let spec = spec.normalized();
        let bitmap = shape::rasterize_shape(&spec);
        let changed =
            self.document
                .replace_rendered_layer(id, LayerSource::new(bitmap), LayerKind::Shape(spec));
        self.finish_if(changed)
    }

    pub fn update_layer(&mut self, id: LayerId, update: LayerUpdate) -> bool {
        let changed = self.document.update_layer(id, update);
        self.finish_if(changed)
    }

    pub fn update_primary(&mut self, update: LayerUpdate) -> bool {
        match self.document.primary() {
            Some(id) => self.update_layer(id, update),
            None => false,
        }
    }

    pub fn delete_layers(&mut self, ids: &[LayerId]) -> usize {
        let removed = self.document.delete_layers(ids);
        self.finish_if(removed > 0);
        removed
    }

    pub fn delete_selected(&mut self) -> usize {
        let removed = self.document.delete_selected();
        self.finish_if(removed > 0);
        removed
    }

    pub fn reorder_layer(&mut self, id: LayerId, new_index: usize) -> bool {
        let changed = self.document.reorder_layer(id, new_index);
        self.finish_if(changed)
    }

    pub fn move_primary(&mut self, direction: StackDirection) -> bool {
        let changed = self.document.move_primary(direction);
        self.finish_if(changed)
    }

    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        let copy = self
            .document
            .duplicate_layer(id, self.config.duplicate_offset)?;
        self.finish_mutation();
        Some(copy)
    }

    pub fn duplicate_primary(&mut self) -> Option<LayerId> {
        let id = self.document.primary()?;
        self.duplicate_layer(id)
    }

    pub fn select_layer(&mut self, id: LayerId, additive: bool) -> bool {
        let changed = self.document.select_layer(id, additive);
        self.finish_if(changed)
    }

    pub fn clear_selection(&mut self) {
        self.document.clear_selection();
        self.finish_mutation();
    }

    pub fn select_all(&mut self) {
        self.document.select_all();
        self.finish_mutation();
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> bool {
        let changed = self.document.toggle_visibility(id);
        self.finish_if(changed)
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> CanvasSize {
        let canvas = self.document.set_canvas_size(width, height);
        self.finish_mutation();
        canvas
    }

    /// Switching tools abandons any gesture in progress. It is not an edit on its own.
    pub fn set_active_tool(&mut self, tool: ToolKind) {
        if self.gestures.state().is_active() {
            self.cancel_gesture();
        }
        self.document.set_active_tool(tool);
        self.revision += 1;
    }

    pub fn align_selection(&mut self, alignment: Alignment) -> bool {
        let changed = self.document.align_selection(alignment);
        self.finish_if(changed)
    }

    pub fn nudge(&mut self, direction: NudgeDirection, large: bool) -> bool {
        let step = if large {
            self.config.nudge_step_large
        } else {
            self.config.nudge_step
        };
        let (x, y) = direction.unit();
        let changed = self.document.nudge_selection(x * step, y * step);
        self.finish_if(changed)
    }

    pub fn replace_layer_source(&mut self, id: LayerId, pixels: RgbaImage) -> bool {
        let changed = self
            .document
            .replace_layer_source(id, LayerSource::new(pixels));
        self.finish_if(changed)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.document.viewport_mut().set_zoom(zoom);
        self.finish_mutation();
    }

    pub fn zoom_in(&mut self) {
        let step = self.config.zoom_step;
        self.document.viewport_mut().zoom_in(step);
        self.finish_mutation();
    }

    pub fn zoom_out(&mut self) {
        let step = self.config.zoom_step;
        self.document.viewport_mut().zoom_out(step);
        self.finish_mutation();
    }

    pub fn zoom_to_fit(&mut self, viewport_width: f64, viewport_height: f64) {
        let canvas = self.document.canvas();
        self.document
            .viewport_mut()
            .zoom_to_fit(canvas, viewport_width, viewport_height);
        self.finish_mutation();
    }

    pub fn zoom_actual_size(&mut self) {
        self.document.viewport_mut().set_actual_size();
        self.finish_mutation();
    }

    /// Pans the view. Pan is presentational, so it rides along with the next commit.
    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        self.document.viewport_mut().pan_by(delta_x, delta_y);
        self.revision += 1;
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&mut self, action: HistoryAction) -> bool {
        if self.gestures.state().is_active() {
            self.cancel_gesture();
        }
        let Some(snapshot) = self.history.step(action) else {
            return false;
        };
        self.history.begin_restore();
        self.document.restore(snapshot);
        self.finish_mutation();
        self.history.end_restore();
        true
    }

    /// Resize or rotate handle of the primary layer under `point`.
    pub fn handle_at(&self, point: DocPoint) -> Option<(LayerId, Handle)> {
        let primary = self.document.primary_layer()?;
        hit_test::handle_at_point(
            &primary.frame(),
            point,
            self.config.handle_radius,
            self.config.rotation_handle_offset,
        )
        .map(|handle| (primary.id(), handle))
    }

    pub fn layer_at(&self, point: DocPoint) -> Option<LayerId> {
        hit_test::top_layer_at_point(self.document.layers(), point)
    }

    /// Starts a resize, rotate or drag under the select tool. A press on empty space
    /// without `additive` clears the selection.
    pub fn pointer_down(&mut self, position: ScreenPoint, additive: bool) -> GestureState {
        if self.document.active_tool() != ToolKind::Select || self.gestures.state().is_active() {
            return self.gestures.state();
        }
        let point = self.document.viewport().to_document(position);

        if let Some((layer, handle)) = self.handle_at(point) {
            if let Some(reference) = self.document.layer(layer).map(Layer::frame) {
                let capture = if handle.is_rotate() {
                    GestureCapture::Rotate {
                        layer,
                        start: point,
                        reference,
                    }
                } else {
                    GestureCapture::Resize {
                        layer,
                        handle,
                        start: point,
                        reference,
                    }
                };
                return self.begin_gesture(capture);
            }
        }

        let Some(hit) = self.layer_at(point) else {
            if !additive && !self.document.selection().is_empty() {
                self.clear_selection();
            }
            return self.gestures.state();
        };
        if additive || !self.document.is_selected(hit) {
            self.document.select_layer(hit, additive);
            self.revision += 1;
        }
        if !self.document.is_selected(hit) {
            self.finish_mutation();
            return self.gestures.state();
        }

        let origins = self
            .document
            .selection()
            .iter()
            .filter_map(|id| self.document.layer(*id))
            .map(|layer| {
                let (x, y) = layer.position();
                (layer.id(), x, y)
            })
            .collect();
        self.begin_gesture(GestureCapture::Drag {
            start: point,
            origins,
        })
    }

    fn begin_gesture(&mut self, capture: GestureCapture) -> GestureState {
        if let Err(err) = self.gestures.begin(capture) {
            tracing::warn!(%err, "gesture not started");
        }
        self.gestures.state()
    }

    /// Updates the live document from the gesture's captured reference. Outside a
    /// gesture nothing changes.
    pub fn pointer_move(&mut self, position: ScreenPoint) -> bool {
        let point = self.document.viewport().to_document(position);
        let Some(capture) = self.gestures.capture() else {
            return false;
        };
        let changed = apply_gesture(
            &mut self.document,
            capture,
            point,
            self.aspect_lock,
            self.config.min_gesture_size,
        );
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Ends the gesture and commits its result as one history entry.
    pub fn pointer_up(&mut self) -> bool {
        if !self.gestures.state().is_active() {
            return false;
        }
        match self.gestures.release() {
            Ok(_) => {
                self.finish_mutation();
                true
            }
            Err(err) => {
                tracing::warn!(%err, "gesture release rejected");
                false
            }
        }
    }

    /// Abandons the gesture, putting every touched layer back to its captured geometry.
    /// Nothing is committed.
    pub fn cancel_gesture(&mut self) -> bool {
        if !self.gestures.state().is_active() {
            return false;
        }
        let capture = match self.gestures.cancel() {
            Ok(Some(capture)) => capture,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(%err, "gesture cancel rejected");
                return false;
            }
        };
        match capture {
            GestureCapture::Drag { origins, .. } => {
                for (id, x, y) in origins {
                    if let Some(layer) = self.document.layer_mut(id) {
                        layer.x = x;
                        layer.y = y;
                    }
                }
            }
            GestureCapture::Resize {
                layer, reference, ..
            }
            | GestureCapture::Rotate {
                layer, reference, ..
            } => {
                if let Some(layer) = self.document.layer_mut(layer) {
                    layer.set_frame(reference);
                }
            }
        }
        self.revision += 1;
        true
    }

    pub fn render(&self, target: &mut RgbaImage, mode: RenderMode) {
        self.compositor.render(target, &self.document, mode);
    }

    pub fn render_preview(&self) -> RgbaImage {
        self.compositor
            .render_to_image(&self.document, RenderMode::Preview)
    }

    pub fn export(&self, request: &ExportRequest) -> ExportOutcome {
        export_document(&self.compositor, &self.document, request)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

fn apply_gesture(
    document: &mut Document,
    capture: &GestureCapture,
    point: DocPoint,
    keep_aspect: bool,
    min_dimension: f64,
) -> bool {
    match capture {
        GestureCapture::Drag { start, origins } => {
            let delta_x = point.x - start.x;
            let delta_y = point.y - start.y;
            for (id, x, y) in origins {
                if let Some(layer) = document.layer_mut(*id) {
                    layer.x = x + delta_x;
                    layer.y = y + delta_y;
                }
            }
            true
        }
        GestureCapture::Resize {
            layer,
            handle,
            start,
            reference,
        } => {
            let frame = hit_test::resized_frame_from_handle(
                reference,
                *handle,
                *start,
                point,
                keep_aspect,
                min_dimension,
            );
            document
                .layer_mut(*layer)
                .map(|layer| layer.set_frame(frame))
                .is_some()
        }
        GestureCapture::Rotate {
            layer,
            start,
            reference,
        } => {
            let frame = hit_test::rotated_frame(reference, *start, point);
            document
                .layer_mut(*layer)
                .map(|layer| layer.set_rotation(frame.rotation))
                .is_some()
        }
    }
}
