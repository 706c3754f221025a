use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::editor::hit_test::{HANDLE_HIT_RADIUS, MIN_GESTURE_DIMENSION, ROTATION_HANDLE_OFFSET};
use crate::editor::viewport::VIEWPORT_ZOOM_STEP;
use crate::error::{AppError, AppResult};
use crate::geometry::{CanvasSize, Color};
use crate::history::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "layerkit";
const APP_CONFIG_FILE: &str = "config.json";
const MAX_HISTORY_CAPACITY: usize = 1000;
const DEFAULT_SELECTION_COLOR: Color = Color::rgb(0, 0, 255);

/// Editor settings from `config.json`. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_capacity: usize,
    pub default_canvas_width: u32,
    pub default_canvas_height: u32,
    pub duplicate_offset: f64,
    pub handle_radius: f64,
    pub rotation_handle_offset: f64,
    pub min_gesture_size: f64,
    pub auto_fit_ratio: f64,
    pub zoom_step: f64,
    pub nudge_step: f64,
    pub nudge_step_large: f64,
    pub checker_tile_size: u32,
    pub selection_color: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_canvas_width: 1024,
            default_canvas_height: 1024,
            duplicate_offset: 10.0,
            handle_radius: HANDLE_HIT_RADIUS,
            rotation_handle_offset: ROTATION_HANDLE_OFFSET,
            min_gesture_size: MIN_GESTURE_DIMENSION,
            auto_fit_ratio: 0.75,
            zoom_step: VIEWPORT_ZOOM_STEP,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            checker_tile_size: 20,
            selection_color: None,
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl EditorConfig {
    /// Pulls every value back into a usable range.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            history_capacity: self.history_capacity.clamp(1, MAX_HISTORY_CAPACITY),
            duplicate_offset: finite_or(self.duplicate_offset, defaults.duplicate_offset),
            handle_radius: finite_or(self.handle_radius, defaults.handle_radius).max(1.0),
            rotation_handle_offset: finite_or(
                self.rotation_handle_offset,
                defaults.rotation_handle_offset,
            )
            .max(0.0),
            min_gesture_size: finite_or(self.min_gesture_size, defaults.min_gesture_size)
                .max(1.0),
            auto_fit_ratio: finite_or(self.auto_fit_ratio, defaults.auto_fit_ratio)
                .clamp(0.05, 1.0),
            zoom_step: finite_or(self.zoom_step, defaults.zoom_step).clamp(0.01, 1.0),
            nudge_step: finite_or(self.nudge_step, defaults.nudge_step).abs(),
            nudge_step_large: finite_or(self.nudge_step_large, defaults.nudge_step_large).abs(),
            checker_tile_size: self.checker_tile_size.max(1),
            ..self
        }
    }

    pub fn default_canvas(&self) -> CanvasSize {
        CanvasSize::clamped(self.default_canvas_width, self.default_canvas_height)
    }

    pub fn selection_color(&self) -> Color {
        self.selection_color
            .as_deref()
            .and_then(Color::from_hex)
            .unwrap_or(DEFAULT_SELECTION_COLOR)
    }
}

pub fn load_editor_config() -> EditorConfig {
    let xdg_config_home = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    load_editor_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_editor_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> EditorConfig {
    match read_editor_config(xdg_config_home, home) {
        Ok(Some(config)) => config,
        Ok(None) => EditorConfig::default(),
        Err(AppError::ConfigPath(err)) => {
            tracing::debug!(%err, "no config directory; using default editor config");
            EditorConfig::default()
        }
        Err(err) => {
            tracing::warn!(%err, "failed to load config.json; using defaults");
            EditorConfig::default()
        }
    }
}

/// Reads and parses the config file. A missing file is `Ok(None)`.
pub fn read_editor_config(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> AppResult<Option<EditorConfig>> {
    let path = editor_config_path(xdg_config_home, home)?;
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)?;
    let config = parse_editor_config(&contents)?;
    tracing::debug!(?path, "editor config loaded");
    Ok(Some(config))
}

pub fn parse_editor_config(contents: &str) -> serde_json::Result<EditorConfig> {
    serde_json::from_str::<EditorConfig>(contents).map(EditorConfig::sanitized)
}

/// `$XDG_CONFIG_HOME/layerkit/config.json`, or `$HOME/.config/layerkit/config.json`
/// when `XDG_CONFIG_HOME` is unset or empty.
pub fn editor_config_path(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let root = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home
            .ok_or(ConfigPathError::MissingHomeDirectory)?
            .join(".config"),
    };
    Ok(root.join(APP_DIR).join(APP_CONFIG_FILE))
}
