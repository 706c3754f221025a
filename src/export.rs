use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use thiserror::Error;

use crate::editor::document::Document;
use crate::geometry::Color;
use crate::render::{Compositor, RenderMode};

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{format} output is packaged outside the engine")]
    UnsupportedFormat { format: &'static str },
    #[error("failed to encode {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
}

pub const DEFAULT_JPEG_QUALITY: u8 = 92;
const EXPORT_FILE_STEM: &str = "transformed-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg { quality: u8 },
    WebP,
    Pdf,
}

impl ExportFormat {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpeg",
            Self::WebP => "webp",
            Self::Pdf => "pdf",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            }),
            "webp" => Some(Self::WebP),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Formats without an alpha channel are flattened over a background first.
    pub const fn supports_alpha(self) -> bool {
        matches!(self, Self::Png | Self::WebP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Fill placed under the composite. `None` keeps transparency where the format allows
    /// it and uses white otherwise.
    pub background: Option<Color>,
}

impl ExportRequest {
    pub const fn new(format: ExportFormat) -> Self {
        Self {
            format,
            background: None,
        }
    }

    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pixels: RgbaImage,
    format: ExportFormat,
}

impl ExportedImage {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn suggested_file_name(&self) -> String {
        let extension = match self.format {
            ExportFormat::Jpeg { .. } => "jpg",
            other => other.label(),
        };
        format!("{EXPORT_FILE_STEM}.{extension}")
    }

    pub fn encode(&self) -> ExportResult<Vec<u8>> {
        let format = self.format.label();
        let (width, height) = self.pixels.dimensions();
        let mut bytes = Vec::new();
        let encoded = match self.format {
            ExportFormat::Png => PngEncoder::new(&mut bytes).write_image(
                self.pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            ExportFormat::WebP => WebPEncoder::new_lossless(&mut bytes).write_image(
                self.pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            ExportFormat::Jpeg { quality } => {
                let rgb = drop_alpha(&self.pixels);
                JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            ExportFormat::Pdf => return Err(ExportError::UnsupportedFormat { format }),
        };
        encoded.map_err(|source| ExportError::Encode { format, source })?;
        tracing::info!(format, bytes = bytes.len(), "export encoded");
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Rendered(ExportedImage),
    /// The document has no visible layer, so there is nothing to flatten.
    NothingToRender,
}

/// Flattens `document` at full canvas resolution, ignoring the viewport.
pub fn export_document(
    compositor: &Compositor,
    document: &Document,
    request: &ExportRequest,
) -> ExportOutcome {
    if !document.has_visible_layers() {
        tracing::info!("export requested for a document with nothing visible");
        return ExportOutcome::NothingToRender;
    }
    let composite = compositor.render_to_image(document, RenderMode::Export);
    let background = request.background.or(if request.format.supports_alpha() {
        None
    } else {
        Some(Color::WHITE)
    });
    let pixels = match background {
        Some(color) => flatten_over(&composite, color),
        None => composite,
    };
    tracing::info!(
        format = request.format.label(),
        width = pixels.width(),
        height = pixels.height(),
        "document exported"
    );
    ExportOutcome::Rendered(ExportedImage {
        pixels,
        format: request.format,
    })
}

fn flatten_over(composite: &RgbaImage, background: Color) -> RgbaImage {
    let mut flattened = RgbaImage::from_pixel(
        composite.width(),
        composite.height(),
        image::Rgba(background.to_rgba()),
    );
    image::imageops::overlay(&mut flattened, composite, 0, 0);
    flattened
}

fn drop_alpha(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, _] = pixels.get_pixel(x, y).0;
        image::Rgb([r, g, b])
    })
}
