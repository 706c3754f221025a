//! Pure per-layer pixel transforms. Effects run on the cropped source at its own
//! resolution; scaling to the display size happens when the layer is drawn.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rand::Rng;
use thiserror::Error;

use crate::editor::layer::{CurvePoint, FilterParams, GradientStop};

pub type EffectResult<T> = std::result::Result<T, EffectError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("effect region has no area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("gradient map needs at least two stops, got {count}")]
    TooFewStops { count: usize },
    #[error("curve adjustment has no control points")]
    EmptyCurve,
}

const LUMA_RED: f32 = 0.299;
const LUMA_GREEN: f32 = 0.587;
const LUMA_BLUE: f32 = 0.114;
const NOISE_INTENSITY_PER_UNIT: f32 = 2.55;

fn ensure_area(source: &RgbaImage) -> EffectResult<()> {
    if source.width() == 0 || source.height() == 0 {
        return Err(EffectError::ZeroArea {
            width: source.width(),
            height: source.height(),
        });
    }
    Ok(())
}

/// Builds the 256-entry lookup table shared by the red, green and blue channels.
pub fn curve_lut(points: &[CurvePoint]) -> EffectResult<[u8; 256]> {
    if points.is_empty() {
        return Err(EffectError::EmptyCurve);
    }
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|point| point.input);

    let first = sorted[0];
    if first.input != 0 {
        sorted.insert(0, CurvePoint::new(0, first.output));
    }
    let last = sorted[sorted.len() - 1];
    if last.input != 255 {
        sorted.push(CurvePoint::new(255, last.output));
    }

    // Later duplicates of the same input win.
    let mut unique: Vec<CurvePoint> = Vec::with_capacity(sorted.len());
    for point in sorted {
        match unique.last_mut() {
            Some(previous) if previous.input == point.input => *previous = point,
            _ => unique.push(point),
        }
    }

    let mut lut = [0u8; 256];
    let mut segment = 0;
    for (value, slot) in lut.iter_mut().enumerate() {
        while segment + 1 < unique.len() && value > usize::from(unique[segment + 1].input) {
            segment += 1;
        }
        let start = unique[segment];
        let end = unique.get(segment + 1).copied().unwrap_or(start);
        let output = if start.input == end.input || value <= usize::from(start.input) {
            f32::from(start.output)
        } else {
            let t = (value as f32 - f32::from(start.input))
                / (f32::from(end.input) - f32::from(start.input));
            f32::from(start.output) + (f32::from(end.output) - f32::from(start.output)) * t
        };
        *slot = output.round().clamp(0.0, 255.0) as u8;
    }
    Ok(lut)
}

pub fn apply_curves(source: &RgbaImage, points: &[CurvePoint]) -> EffectResult<RgbaImage> {
    ensure_area(source)?;
    let lut = curve_lut(points)?;
    let mut output = source.clone();
    for pixel in output.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        for channel in 0..3 {
            pixel[channel] = lut[usize::from(pixel[channel])];
        }
    }
    Ok(output)
}

fn luminance(pixel: &Rgba<u8>) -> f32 {
    (LUMA_RED * f32::from(pixel[0]) + LUMA_GREEN * f32::from(pixel[1])
        + LUMA_BLUE * f32::from(pixel[2]))
        / 255.0
}

fn gradient_color_at(stops: &[GradientStop], position: f32) -> [u8; 3] {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if position <= first.position {
        return [first.color.r, first.color.g, first.color.b];
    }
    if position >= last.position {
        return [last.color.r, last.color.g, last.color.b];
    }
    let (start, end) = stops
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .find(|(start, end)| position >= start.position && position <= end.position)
        .unwrap_or((first, last));
    let span = end.position - start.position;
    let t = if span > 0.0 {
        (position - start.position) / span
    } else {
        0.0
    };
    let mix = |from: u8, to: u8| {
        (f32::from(from) + (f32::from(to) - f32::from(from)) * t)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    [
        mix(start.color.r, end.color.r),
        mix(start.color.g, end.color.g),
        mix(start.color.b, end.color.b),
    ]
}

/// Recolors each opaque pixel by its luminance through the stop ramp. `stops` must be sorted.
pub fn apply_gradient_map(source: &RgbaImage, stops: &[GradientStop]) -> EffectResult<RgbaImage> {
    ensure_area(source)?;
    if stops.len() < 2 {
        return Err(EffectError::TooFewStops { count: stops.len() });
    }
    let mut output = source.clone();
    for pixel in output.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        let [r, g, b] = gradient_color_at(stops, luminance(pixel));
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
    Ok(output)
}

/// Adds one random offset per pixel to all three color channels.
pub fn apply_noise(
    source: &RgbaImage,
    amount: f32,
    rng: &mut impl Rng,
) -> EffectResult<RgbaImage> {
    ensure_area(source)?;
    let mut output = source.clone();
    let half_range = amount.max(0.0) * NOISE_INTENSITY_PER_UNIT / 2.0;
    if half_range <= 0.0 {
        return Ok(output);
    }
    for pixel in output.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        let delta: f32 = rng.gen_range(-half_range..=half_range);
        for channel in 0..3 {
            pixel[channel] = (f32::from(pixel[channel]) + delta).clamp(0.0, 255.0) as u8;
        }
    }
    Ok(output)
}

pub fn apply_pixelate(source: &RgbaImage, block_size: u32) -> EffectResult<RgbaImage> {
    ensure_area(source)?;
    if block_size <= 1 {
        return Ok(source.clone());
    }
    let (width, height) = source.dimensions();
    let small_width = (width / block_size).max(1);
    let small_height = (height / block_size).max(1);
    let small = imageops::resize(source, small_width, small_height, FilterType::Nearest);
    Ok(imageops::resize(&small, width, height, FilterType::Nearest))
}

type ColorMatrix = [[f32; 3]; 3];

fn saturate_matrix(amount: f32) -> ColorMatrix {
    let s = amount;
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn grayscale_matrix(amount: f32) -> ColorMatrix {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
        [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
        [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
    ]
}

fn sepia_matrix(amount: f32) -> ColorMatrix {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
        [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
    ]
}

fn apply_matrix(rgb: [f32; 3], matrix: &ColorMatrix) -> [f32; 3] {
    (*matrix).map(|row| (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0))
}

fn brightness(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    rgb.map(|value| (value * factor).clamp(0.0, 1.0))
}

fn contrast(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    rgb.map(|value| ((value - 0.5) * factor + 0.5).clamp(0.0, 1.0))
}

fn invert(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    rgb.map(|value| value * (1.0 - amount) + (1.0 - value) * amount)
}

fn map_rgb(image: &mut RgbaImage, mut transform: impl FnMut([f32; 3]) -> [f32; 3]) {
    for pixel in image.pixels_mut() {
        let rgb = [
            f32::from(pixel[0]) / 255.0,
            f32::from(pixel[1]) / 255.0,
            f32::from(pixel[2]) / 255.0,
        ];
        let [r, g, b] = transform(rgb);
        pixel[0] = (r * 255.0).round() as u8;
        pixel[1] = (g * 255.0).round() as u8;
        pixel[2] = (b * 255.0).round() as u8;
    }
}

/// Gaussian blur on premultiplied colors so transparent edges do not darken.
fn blur_premultiplied(image: &RgbaImage, sigma: f32) -> RgbaImage {
    let mut premultiplied = image.clone();
    for pixel in premultiplied.pixels_mut() {
        let alpha = f32::from(pixel[3]) / 255.0;
        for channel in 0..3 {
            pixel[channel] = (f32::from(pixel[channel]) * alpha).round() as u8;
        }
    }
    let mut blurred = imageops::blur(&premultiplied, sigma);
    for pixel in blurred.pixels_mut() {
        let alpha = f32::from(pixel[3]) / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        for channel in 0..3 {
            pixel[channel] = (f32::from(pixel[channel]) / alpha).round().clamp(0.0, 255.0) as u8;
        }
    }
    blurred
}

/// Combined filter pass: brightness, contrast, saturate, grayscale, sepia, invert, blur,
/// then sharpen as a contrast and brightness compensation pair. The blur radius is given
/// in display pixels; `blur_scale` converts it to source pixels.
pub fn apply_filter_chain(
    source: &RgbaImage,
    filters: &FilterParams,
    blur_scale: f32,
) -> EffectResult<RgbaImage> {
    ensure_area(source)?;
    let mut output = source.clone();
    if filters.is_identity_chain() {
        return Ok(output);
    }

    let brightness_factor = filters.brightness / 100.0;
    let contrast_factor = filters.contrast / 100.0;
    let saturate = saturate_matrix(filters.saturate / 100.0);
    let grayscale = grayscale_matrix(filters.grayscale / 100.0);
    let sepia = sepia_matrix(filters.sepia / 100.0);
    let invert_amount = filters.invert / 100.0;
    map_rgb(&mut output, |rgb| {
        let rgb = brightness(rgb, brightness_factor);
        let rgb = contrast(rgb, contrast_factor);
        let rgb = apply_matrix(rgb, &saturate);
        let rgb = apply_matrix(rgb, &grayscale);
        let rgb = apply_matrix(rgb, &sepia);
        invert(rgb, invert_amount)
    });

    let sigma = filters.blur * blur_scale;
    if sigma > 0.0 && sigma.is_finite() {
        output = blur_premultiplied(&output, sigma);
    }

    if filters.sharpen > 0.0 {
        let sharpen_contrast = (100.0 + filters.sharpen / 2.0) / 100.0;
        let sharpen_brightness = (100.0 - filters.sharpen / 10.0) / 100.0;
        map_rgb(&mut output, |rgb| {
            brightness(contrast(rgb, sharpen_contrast), sharpen_brightness)
        });
    }
    Ok(output)
}

/// Where the vignette ramp starts, as a fraction of the half diagonal. The ramp is
/// transparent up to this radius and reaches full strength at the corners.
pub fn vignette_ramp_start(extent: f32, softness: f32) -> f32 {
    let inner = 1.0 - extent.clamp(0.0, 1.0);
    inner + softness.clamp(0.0, 1.0) * (1.0 - inner)
}
