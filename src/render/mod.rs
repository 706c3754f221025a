//! Composites a document into an RGBA surface. Preview and export share every
//! pixel-producing step; only the checker background and selection adornments differ.

pub mod effects;
pub mod raster;

use image::imageops;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tiny_skia::Pixmap;

use crate::config::EditorConfig;
use crate::editor::document::Document;
use crate::editor::hit_test::{handle_positions, Handle};
use crate::editor::layer::Layer;
use crate::geometry::Color;

use effects::EffectResult;
use raster::{
    copy_into_image, draw_handle, draw_layer_pixels, faded_color, fill_checkerboard, fill_frame,
    fill_frame_vignette, pixmap_from_image, stroke_frame_outline, stroke_segment, HandleShape,
    LayerClip, Placement,
};

const CHECKER_EVEN: Color = Color::rgb(0xcc, 0xcc, 0xcc);
const CHECKER_ODD: Color = Color::WHITE;
const PRIMARY_OUTLINE_WIDTH: f32 = 2.0;
const SECONDARY_OUTLINE_WIDTH: f32 = 1.0;
const SECONDARY_OUTLINE_COLOR: Color = Color::rgba(0, 100, 255, 128);
const HANDLE_FILL: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive view: checker background plus selection outline and handles.
    Preview,
    /// Flattened output at document resolution with no adornments.
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compositor {
    checker_tile_size: u32,
    selection_color: Color,
    handle_size: f32,
    rotation_handle_offset: f64,
}

impl Compositor {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            checker_tile_size: config.checker_tile_size.max(1),
            selection_color: config.selection_color(),
            handle_size: config.handle_radius as f32,
            rotation_handle_offset: config.rotation_handle_offset,
        }
    }

    /// Allocates a canvas-sized surface and renders into it.
    pub fn render_to_image(&self, document: &Document, mode: RenderMode) -> RgbaImage {
        let canvas = document.canvas();
        let mut target = RgbaImage::new(canvas.width, canvas.height);
        self.render(&mut target, document, mode);
        target
    }

    pub fn render(&self, target: &mut RgbaImage, document: &Document, mode: RenderMode) {
        tracing::debug!(
            ?mode,
            layers = document.layers().len(),
            width = target.width(),
            height = target.height(),
            "render pass"
        );
        let Some(mut surface) = Pixmap::new(target.width(), target.height()) else {
            tracing::warn!(
                width = target.width(),
                height = target.height(),
                "render target has no area"
            );
            return;
        };
        if mode == RenderMode::Preview {
            fill_checkerboard(&mut surface, self.checker_tile_size, CHECKER_EVEN, CHECKER_ODD);
        }

        for layer in document.layers().iter().filter(|layer| layer.is_visible()) {
            self.draw_layer(&mut surface, layer);
        }

        if mode == RenderMode::Preview {
            self.draw_adornments(&mut surface, document);
        }
        copy_into_image(&surface, target);
    }

    fn draw_layer(&self, surface: &mut Pixmap, layer: &Layer) {
        let (flip_horizontal, flip_vertical) = layer.flips();
        let placement = Placement {
            frame: layer.frame(),
            flip_horizontal,
            flip_vertical,
            clip: layer.crop_shape(),
        };
        if !placement.overlaps(surface.width(), surface.height()) {
            return;
        }
        let clip = placement.clip(surface.width(), surface.height());
        if matches!(clip, LayerClip::Hidden) {
            return;
        }
        let Some(processed) = process_layer(layer) else {
            return;
        };
        let Some(pixels) = pixmap_from_image(&processed) else {
            return;
        };
        let opacity = layer.opacity();
        let mask = clip.mask();
        draw_layer_pixels(surface, pixels.as_ref(), &placement, opacity, mask);

        let tint = layer.tint();
        if tint.is_active() {
            let color = faded_color(tint.color, opacity * tint.strength);
            fill_frame(surface, &placement, color, mask);
        }

        let vignette = layer.vignette();
        if vignette.is_active() {
            let ramp_start = effects::vignette_ramp_start(vignette.extent, vignette.softness);
            if ramp_start < 1.0 {
                fill_frame_vignette(
                    surface,
                    &placement,
                    vignette.color,
                    opacity * vignette.strength,
                    ramp_start,
                    mask,
                );
            }
        }
    }

    /// Outlines every visible selected layer and, for the primary, its handles.
    fn draw_adornments(&self, surface: &mut Pixmap, document: &Document) {
        let primary = document.primary();
        let secondaries = document
            .selection()
            .iter()
            .filter(|id| Some(**id) != primary)
            .filter_map(|id| document.layer(*id))
            .filter(|layer| layer.is_visible());
        for layer in secondaries {
            stroke_frame_outline(
                surface,
                &layer.frame(),
                SECONDARY_OUTLINE_COLOR,
                SECONDARY_OUTLINE_WIDTH,
            );
        }

        let Some(primary) = document.primary_layer().filter(|layer| layer.is_visible()) else {
            return;
        };
        let frame = primary.frame();
        stroke_frame_outline(surface, &frame, self.selection_color, PRIMARY_OUTLINE_WIDTH);
        if !document.active_tool().shows_handles() {
            return;
        }
        let handles = handle_positions(&frame, self.rotation_handle_offset);
        let anchor = handles.iter().find(|(handle, _)| *handle == Handle::TopMiddle);
        let knob = handles.iter().find(|(handle, _)| handle.is_rotate());
        if let (Some((_, from)), Some((_, to))) = (anchor, knob) {
            stroke_segment(surface, *from, *to, self.selection_color, 1.0);
        }
        for (handle, center) in handles {
            let shape = if handle.is_rotate() {
                HandleShape::Round
            } else {
                HandleShape::Square
            };
            draw_handle(
                surface,
                center,
                self.handle_size,
                frame.rotation,
                shape,
                HANDLE_FILL,
                self.selection_color,
            );
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

/// Runs one stage, keeping the previous buffer when the stage fails.
fn run_stage(
    layer: &Layer,
    stage: &str,
    current: RgbaImage,
    effect: impl FnOnce(&RgbaImage) -> EffectResult<RgbaImage>,
) -> RgbaImage {
    match effect(&current) {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(id = layer.id(), stage, %err, "effect failed; passing region through");
            current
        }
    }
}

/// Produces the layer's pixels at crop resolution: crop, then curves, gradient map,
/// noise and pixelate, then the combined filter pass. The drawn size comes from the
/// layer frame when the result is blitted.
pub fn process_layer(layer: &Layer) -> Option<RgbaImage> {
    let source = layer.source();
    let crop = layer.crop().clamped_to(source.width(), source.height());
    if crop.width == 0 || crop.height == 0 {
        tracing::warn!(id = layer.id(), "crop region is empty; skipping layer");
        return None;
    }
    let (display_width, _) = layer.size();
    let blur_scale = (f64::from(crop.width) / display_width) as f32;
    let blur_scale = if blur_scale.is_finite() && blur_scale > 0.0 {
        blur_scale
    } else {
        1.0
    };

    let mut current =
        imageops::crop_imm(source.pixels(), crop.x, crop.y, crop.width, crop.height).to_image();

    let curves = layer.curves();
    if curves.is_active() {
        current = run_stage(layer, "curves", current, |image| {
            effects::apply_curves(image, &curves.points)
        });
    }
    let gradient_map = layer.gradient_map();
    if gradient_map.is_active() {
        current = run_stage(layer, "gradient map", current, |image| {
            effects::apply_gradient_map(image, gradient_map.stops())
        });
    }
    let filters = layer.filters();
    if filters.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(layer.noise_seed());
        current = run_stage(layer, "noise", current, |image| {
            effects::apply_noise(image, filters.noise, &mut rng)
        });
    }
    if layer.pixelate() > 1 {
        current = run_stage(layer, "pixelate", current, |image| {
            effects::apply_pixelate(image, layer.pixelate())
        });
    }
    Some(run_stage(layer, "filter chain", current, |image| {
        effects::apply_filter_chain(image, filters, blur_scale)
    }))
}
