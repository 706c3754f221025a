use crate::geometry::CanvasSize;

use super::layer::{Layer, LayerId, LayerKind, LayerSource};
use super::tools::ToolKind;
use super::update::LayerUpdate;
use super::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    HorizontalCenter,
    Right,
    Top,
    VerticalCenter,
    Bottom,
}

impl Alignment {
    pub const ALL: [Alignment; 6] = [
        Self::Left,
        Self::HorizontalCenter,
        Self::Right,
        Self::Top,
        Self::VerticalCenter,
        Self::Bottom,
    ];

    /// New top-left coordinate on the aligned axis for a box of `size` placed
    /// against an anchor spanning `anchor_start..anchor_start + anchor_size`.
    fn aligned(self, anchor_start: f64, anchor_size: f64, size: f64) -> f64 {
        match self {
            Self::Left | Self::Top => anchor_start,
            Self::HorizontalCenter | Self::VerticalCenter => {
                anchor_start + anchor_size / 2.0 - size / 2.0
            }
            Self::Right | Self::Bottom => anchor_start + anchor_size - size,
        }
    }

    const fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::HorizontalCenter | Self::Right)
    }
}

/// Direction in the z-order; the list is stored bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackDirection {
    Up,
    Down,
}

/// Everything an undo step restores. The id allocator is deliberately outside it so
/// ids stay unique across undo.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub canvas: CanvasSize,
    pub layers: Vec<Layer>,
    pub selection: Vec<LayerId>,
    pub primary: Option<LayerId>,
    pub viewport: Viewport,
    pub active_tool: ToolKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    canvas: CanvasSize,
    layers: Vec<Layer>,
    selection: Vec<LayerId>,
    primary: Option<LayerId>,
    viewport: Viewport,
    active_tool: ToolKind,
    next_id: LayerId,
}

impl Document {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas: CanvasSize::clamped(canvas.width, canvas.height),
            layers: Vec::new(),
            selection: Vec::new(),
            primary: None,
            viewport: Viewport::new(),
            active_tool: ToolKind::Select,
            next_id: 1,
        }
    }

    pub const fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Layers from bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn selection(&self) -> &[LayerId] {
        &self.selection
    }

    pub fn is_selected(&self, id: LayerId) -> bool {
        self.selection.contains(&id)
    }

    pub const fn primary(&self) -> Option<LayerId> {
        self.primary
    }

    pub fn primary_layer(&self) -> Option<&Layer> {
        self.primary.and_then(|id| self.layer(id))
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub const fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn has_visible_layers(&self) -> bool {
        self.layers.iter().any(Layer::is_visible)
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Adds a layer on top of the stack, fits it to `fit_ratio` of the shorter canvas
    /// side and makes it the only selected layer.
    pub fn insert_layer(
        &mut self,
        name: &str,
        source: LayerSource,
        kind: LayerKind,
        fit_ratio: f64,
    ) -> LayerId {
        let id = self.allocate_id();
        let mut layer = Layer::new(id, name, source, kind);
        layer.fit_within(f64::from(self.canvas.shorter_side()) * fit_ratio);
        tracing::info!(id, name = layer.name(), "layer created");
        self.layers.push(layer);
        self.selection = vec![id];
        self.primary = Some(id);
        id
    }

    pub fn update_layer(&mut self, id: LayerId, update: LayerUpdate) -> bool {
        let canvas = self.canvas;
        let Some(layer) = self.layer_mut(id) else {
            tracing::debug!(id, "update ignored for missing layer");
            return false;
        };
        layer.apply_update(update, canvas);
        true
    }

    /// Removes every listed layer that exists and returns how many were removed.
    /// When the selection empties, the most recently created remaining layer is selected.
    pub fn delete_layers(&mut self, ids: &[LayerId]) -> usize {
        let before = self.layers.len();
        self.layers.retain(|layer| !ids.contains(&layer.id));
        let removed = before - self.layers.len();
        if removed == 0 {
            return 0;
        }
        tracing::info!(removed, "layers deleted");

        let layers = &self.layers;
        self.selection
            .retain(|id| layers.iter().any(|layer| layer.id == *id));
        if self.selection.is_empty() {
            if let Some(newest) = self.layers.iter().map(|layer| layer.id).max() {
                self.selection.push(newest);
            }
        }
        if self.primary.map_or(true, |id| !self.selection.contains(&id)) {
            self.primary = self.selection.first().copied();
        }
        removed
    }

    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selection.clone();
        self.delete_layers(&ids)
    }

    /// Moves a layer to `new_index` (clamped to the stack), shifting the others.
    pub fn reorder_layer(&mut self, id: LayerId, new_index: usize) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let target = new_index.min(self.layers.len() - 1);
        if target == index {
            return false;
        }
        let layer = self.layers.remove(index);
        self.layers.insert(target, layer);
        true
    }

    /// Moves the primary layer one step in the z-order.
    pub fn move_primary(&mut self, direction: StackDirection) -> bool {
        let Some(index) = self.primary.and_then(|id| self.index_of(id)) else {
            return false;
        };
        let target = match direction {
            StackDirection::Up => index + 1,
            StackDirection::Down => match index.checked_sub(1) {
                Some(target) => target,
                None => return false,
            },
        };
        if target >= self.layers.len() {
            return false;
        }
        self.layers.swap(index, target);
        true
    }

    /// Copies a layer directly above the original, offset by `offset` on both axes,
    /// and makes the copy the only selection.
    pub fn duplicate_layer(&mut self, id: LayerId, offset: f64) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let copy_id = self.allocate_id();
        let copy = self.layers[index].duplicate_as(copy_id, offset);
        tracing::info!(source = id, id = copy_id, "layer duplicated");
        self.layers.insert(index + 1, copy);
        self.selection = vec![copy_id];
        self.primary = Some(copy_id);
        Some(copy_id)
    }

    /// Single-selects `id`, or toggles its membership when `additive`.
    pub fn select_layer(&mut self, id: LayerId, additive: bool) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        if !additive {
            self.selection = vec![id];
            self.primary = Some(id);
            return true;
        }
        if let Some(position) = self.selection.iter().position(|selected| *selected == id) {
            self.selection.remove(position);
            if self.primary == Some(id) {
                self.primary = self.selection.first().copied();
            }
        } else {
            self.selection.push(id);
            self.primary = Some(id);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.primary = None;
    }

    pub fn select_all(&mut self) {
        self.selection = self.layers.iter().map(|layer| layer.id).collect();
        if self.primary.map_or(true, |id| !self.selection.contains(&id)) {
            self.primary = self.selection.last().copied();
        }
    }

    /// Flips visibility of `id`, or of the whole selection when `id` is part of it.
    pub fn toggle_visibility(&mut self, id: LayerId) -> bool {
        let targets = if self.is_selected(id) {
            self.selection.clone()
        } else {
            vec![id]
        };
        let mut changed = false;
        for target in targets {
            if let Some(layer) = self.layer_mut(target) {
                layer.visible = !layer.visible;
                changed = true;
            }
        }
        changed
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> CanvasSize {
        self.canvas = CanvasSize::clamped(width, height);
        self.canvas
    }

    pub fn set_active_tool(&mut self, tool: ToolKind) {
        self.active_tool = tool;
    }

    /// With two or more selected layers, aligns them to the primary layer; with
    /// exactly one, aligns it to the canvas.
    pub fn align_selection(&mut self, alignment: Alignment) -> bool {
        let Some(primary) = self.primary_layer() else {
            return false;
        };
        let anchor = if self.selection.len() >= 2 {
            (primary.x, primary.y, primary.width, primary.height)
        } else {
            (
                0.0,
                0.0,
                f64::from(self.canvas.width),
                f64::from(self.canvas.height),
            )
        };
        let (anchor_x, anchor_y, anchor_width, anchor_height) = anchor;
        let targets: Vec<LayerId> = if self.selection.len() >= 2 {
            self.selection
                .iter()
                .copied()
                .filter(|id| Some(*id) != self.primary)
                .collect()
        } else {
            vec![primary.id]
        };

        let mut changed = false;
        for id in targets {
            let Some(layer) = self.layer_mut(id) else {
                continue;
            };
            if alignment.is_horizontal() {
                layer.x = alignment.aligned(anchor_x, anchor_width, layer.width);
            } else {
                layer.y = alignment.aligned(anchor_y, anchor_height, layer.height);
            }
            changed = true;
        }
        changed
    }

    pub fn nudge_selection(&mut self, delta_x: f64, delta_y: f64) -> bool {
        if !delta_x.is_finite() || !delta_y.is_finite() || self.selection.is_empty() {
            return false;
        }
        for id in self.selection.clone() {
            if let Some(layer) = self.layer_mut(id) {
                layer.x += delta_x;
                layer.y += delta_y;
            }
        }
        true
    }

    /// Replaces the bitmap of a raster layer, keeping its display width.
    pub fn replace_layer_source(&mut self, id: LayerId, source: LayerSource) -> bool {
        let canvas = self.canvas;
        let Some(layer) = self.layer_mut(id) else {
            return false;
        };
        if !matches!(layer.kind, LayerKind::Raster) || source.is_empty() {
            tracing::warn!(id, "source replacement only applies to raster layers with pixels");
            return false;
        }
        layer.replace_source_keep_width(source, canvas);
        true
    }

    /// Swaps the rendered bitmap and generating parameters of a text or shape layer.
    pub(crate) fn replace_rendered_layer(
        &mut self,
        id: LayerId,
        source: LayerSource,
        kind: LayerKind,
    ) -> bool {
        let Some(layer) = self.layer_mut(id) else {
            return false;
        };
        if !layer.kind.is_rendered_buffer() || !kind.is_rendered_buffer() || source.is_empty() {
            return false;
        }
        layer.name = match &kind {
            LayerKind::Text(spec) => spec.layer_name(),
            LayerKind::Shape(spec) => spec.layer_name(),
            LayerKind::Raster => layer.name.clone(),
        };
        layer.replace_rendered_source(source, kind);
        true
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            canvas: self.canvas,
            layers: self.layers.clone(),
            selection: self.selection.clone(),
            primary: self.primary,
            viewport: self.viewport,
            active_tool: self.active_tool,
        }
    }

    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.canvas = snapshot.canvas;
        self.layers = snapshot.layers;
        self.selection = snapshot.selection;
        self.primary = snapshot.primary;
        self.viewport = snapshot.viewport;
        self.active_tool = snapshot.active_tool;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(CanvasSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const FIT: f64 = 0.75;

    fn source(width: u32, height: u32) -> LayerSource {
        LayerSource::new(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])))
    }

    fn document_with(count: usize) -> (Document, Vec<LayerId>) {
        let mut document = Document::default();
        let ids = (0..count)
            .map(|index| {
                document.insert_layer(
                    &format!("layer {index}"),
                    source(100, 80),
                    LayerKind::Raster,
                    FIT,
                )
            })
            .collect();
        (document, ids)
    }

    fn order(document: &Document) -> Vec<LayerId> {
        document.layers().iter().map(Layer::id).collect()
    }

    #[test]
    fn insert_places_layer_on_top_and_selects_it() {
        let (document, ids) = document_with(2);
        assert_eq!(order(&document), ids);
        assert_eq!(document.selection(), &[ids[1]]);
        assert_eq!(document.primary(), Some(ids[1]));
        let layer = document.layer(ids[1]).expect("layer should exist");
        assert_eq!(layer.position(), (50.0, 50.0));
    }

    #[test]
    fn insert_fits_large_sources_to_canvas_ratio() {
        let mut document = Document::new(CanvasSize::clamped(1000, 800));
        let id = document.insert_layer("big", source(1200, 600), LayerKind::Raster, FIT);
        let layer = document.layer(id).expect("layer should exist");
        assert_eq!(layer.size(), (600.0, 300.0));
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let (mut document, ids) = document_with(2);
        document.delete_layers(&[ids[1]]);
        let next = document.insert_layer("again", source(10, 10), LayerKind::Raster, FIT);
        assert!(next > ids[1]);
    }

    #[test]
    fn delete_falls_back_to_newest_remaining_layer() {
        let (mut document, ids) = document_with(3);
        document.select_layer(ids[1], false);
        assert_eq!(document.delete_selected(), 1);
        assert_eq!(order(&document), vec![ids[0], ids[2]]);
        assert_eq!(document.selection(), &[ids[2]]);
        assert_eq!(document.primary(), Some(ids[2]));
    }

    #[test]
    fn delete_of_everything_leaves_no_selection() {
        let (mut document, ids) = document_with(2);
        assert_eq!(document.delete_layers(&ids), 2);
        assert!(document.is_empty());
        assert!(document.selection().is_empty());
        assert_eq!(document.primary(), None);
    }

    #[test]
    fn delete_of_missing_id_is_a_no_op() {
        let (mut document, ids) = document_with(1);
        assert_eq!(document.delete_layers(&[999]), 0);
        assert_eq!(order(&document), ids);
    }

    #[test]
    fn reorder_clamps_target_index() {
        let (mut document, ids) = document_with(3);
        assert!(document.reorder_layer(ids[0], 10));
        assert_eq!(order(&document), vec![ids[1], ids[2], ids[0]]);
        assert!(!document.reorder_layer(ids[0], 2));
        assert!(!document.reorder_layer(42, 0));
    }

    #[test]
    fn move_primary_steps_through_z_order() {
        let (mut document, ids) = document_with(3);
        document.select_layer(ids[0], false);
        assert!(document.move_primary(StackDirection::Up));
        assert_eq!(order(&document), vec![ids[1], ids[0], ids[2]]);
        assert!(document.move_primary(StackDirection::Down));
        assert!(!document.move_primary(StackDirection::Down));
        assert_eq!(order(&document), ids);
    }

    #[test]
    fn duplicate_is_inserted_above_original_and_offset() {
        let (mut document, ids) = document_with(2);
        let copy = document
            .duplicate_layer(ids[0], 10.0)
            .expect("duplicate should succeed");
        assert_eq!(order(&document), vec![ids[0], copy, ids[1]]);
        let layer = document.layer(copy).expect("copy should exist");
        assert_eq!(layer.position(), (60.0, 60.0));
        assert_eq!(layer.name(), "layer 0 Copy");
        assert_eq!(document.primary(), Some(copy));
    }

    #[test]
    fn additive_select_toggles_and_moves_primary() {
        let (mut document, ids) = document_with(3);
        document.select_layer(ids[0], false);
        document.select_layer(ids[2], true);
        assert_eq!(document.selection(), &[ids[0], ids[2]]);
        assert_eq!(document.primary(), Some(ids[2]));

        document.select_layer(ids[2], true);
        assert_eq!(document.selection(), &[ids[0]]);
        assert_eq!(document.primary(), Some(ids[0]));

        document.select_layer(ids[0], true);
        assert!(document.selection().is_empty());
        assert_eq!(document.primary(), None);
        assert!(!document.select_layer(77, false));
    }

    #[test]
    fn toggle_visibility_covers_selection_only_when_target_selected() {
        let (mut document, ids) = document_with(3);
        document.select_layer(ids[0], false);
        document.select_layer(ids[1], true);

        assert!(document.toggle_visibility(ids[1]));
        assert!(!document.layer(ids[0]).expect("layer").is_visible());
        assert!(!document.layer(ids[1]).expect("layer").is_visible());
        assert!(document.layer(ids[2]).expect("layer").is_visible());

        assert!(document.toggle_visibility(ids[2]));
        assert!(!document.layer(ids[2]).expect("layer").is_visible());
        assert!(!document.layer(ids[0]).expect("layer").is_visible());
    }

    #[test]
    fn canvas_size_is_clamped() {
        let mut document = Document::default();
        assert_eq!(document.set_canvas_size(50, 9000), CanvasSize::clamped(100, 4096));
        assert_eq!(document.set_canvas_size(200, 200).width, 200);
    }

    #[test]
    fn align_multiple_layers_to_primary() {
        let (mut document, ids) = document_with(2);
        document.update_layer(ids[0], LayerUpdate::Position { x: 300.0, y: 200.0 });
        document.select_layer(ids[1], false);
        document.select_layer(ids[0], true);

        assert!(document.align_selection(Alignment::Right));
        assert!(document.align_selection(Alignment::VerticalCenter));
        let moved = document.layer(ids[1]).expect("layer should exist");
        assert_eq!(moved.position(), (300.0, 200.0));
        let anchor = document.layer(ids[0]).expect("layer should exist");
        assert_eq!(anchor.position(), (300.0, 200.0));
    }

    #[test]
    fn align_single_layer_to_canvas() {
        let (mut document, ids) = document_with(1);
        document.align_selection(Alignment::HorizontalCenter);
        document.align_selection(Alignment::Bottom);
        let layer = document.layer(ids[0]).expect("layer should exist");
        assert_eq!(layer.position(), (462.0, 944.0));
    }

    #[test]
    fn nudge_moves_every_selected_layer() {
        let (mut document, ids) = document_with(2);
        document.select_all();
        assert!(document.nudge_selection(-10.0, 1.0));
        for id in ids {
            assert_eq!(
                document.layer(id).expect("layer should exist").position(),
                (40.0, 51.0)
            );
        }
        document.clear_selection();
        assert!(!document.nudge_selection(1.0, 1.0));
    }

    #[test]
    fn replace_source_keeps_width_and_resets_crop() {
        let (mut document, ids) = document_with(1);
        assert!(document.replace_layer_source(ids[0], source(50, 100)));
        let layer = document.layer(ids[0]).expect("layer should exist");
        assert_eq!(layer.size(), (100.0, 200.0));
        assert_eq!(layer.crop().width, 50);
        assert_eq!(layer.crop().height, 100);
    }

    #[test]
    fn snapshot_restore_round_trips_state_but_not_allocator() {
        let (mut document, ids) = document_with(2);
        let snapshot = document.snapshot();
        document.delete_layers(&ids);
        document.set_active_tool(ToolKind::Crop);
        document.restore(snapshot.clone());
        assert_eq!(document.snapshot(), snapshot);

        let next = document.insert_layer("fresh", source(10, 10), LayerKind::Raster, FIT);
        assert!(next > ids[1]);
    }
}
