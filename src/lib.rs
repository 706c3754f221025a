//! Layer compositing engine with snapshot undo/redo for non-destructive raster editing.

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod render;
pub mod state;

pub use config::EditorConfig;
pub use editor::{Editor, LayerId, LayerUpdate, ToolKind};
pub use error::{AppError, AppResult};
pub use export::{ExportFormat, ExportOutcome, ExportRequest};
pub use render::{Compositor, RenderMode};

/// Flattens `images` as stacked layers onto a canvas sized to the largest one and
/// encodes the result.
pub fn flatten_images(
    images: Vec<(String, image::RgbaImage)>,
    format: ExportFormat,
) -> AppResult<Option<Vec<u8>>> {
    let mut editor = Editor::from_user_config();
    let (width, height) = images.iter().fold((0, 0), |(width, height), (_, image)| {
        (width.max(image.width()), height.max(image.height()))
    });
    editor.set_canvas_size(width, height);

    for (name, image) in images {
        let natural_width = f64::from(image.width());
        let id = editor.add_layer(&name, image);
        editor.update_layer(
            id,
            LayerUpdate::Width {
                value: natural_width,
                keep_aspect: true,
            },
        );
        editor.update_layer(id, LayerUpdate::Position { x: 0.0, y: 0.0 });
    }
    tracing::info!(layers = editor.document().layers().len(), "layers stacked");

    match editor.export(&ExportRequest::new(format)) {
        ExportOutcome::Rendered(image) => Ok(Some(image.encode()?)),
        ExportOutcome::NothingToRender => Ok(None),
    }
}
