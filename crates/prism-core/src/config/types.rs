//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

use crate::limits;
use crate::pipeline::{FitMode, OutputFormat, TextAlign};

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum decoded size of any base64 image payload, in bytes
    pub max_image_size_bytes: u64,

    /// Maximum width or height a resize may request
    pub max_image_dimension: u32,

    /// Minimum width or height a resize may request
    pub min_image_dimension: u32,

    /// Maximum layers per composite step
    pub max_layers: usize,

    /// Maximum steps per pipeline
    pub max_pipeline_steps: usize,

    /// Wall-clock budget for a whole request in milliseconds
    pub timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_size_bytes: limits::MAX_IMAGE_SIZE_BYTES,
            max_image_dimension: limits::MAX_IMAGE_DIMENSION,
            min_image_dimension: limits::MIN_IMAGE_DIMENSION,
            max_layers: limits::MAX_LAYERS,
            max_pipeline_steps: limits::MAX_PIPELINE_STEPS,
            timeout_ms: limits::DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Defaults applied when a request omits an optional field.
///
/// Every entry point resolves its optional fields against this one struct,
/// so all of them agree on font, color, quality and fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Output format when the request has none
    pub format: OutputFormat,

    /// Output quality (1-100)
    pub quality: u8,

    /// Resize fit mode
    pub fit: FitMode,

    /// Font alias or family for text
    pub font_family: String,

    /// Font size in pixels
    pub font_size: f32,

    /// Text fill color (any CSS color)
    pub color: String,

    /// Horizontal text alignment
    pub align: TextAlign,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: limits::DEFAULT_QUALITY,
            fit: FitMode::Cover,
            font_family: limits::DEFAULT_FONT_FAMILY.to_string(),
            font_size: limits::DEFAULT_FONT_SIZE,
            color: limits::DEFAULT_TEXT_COLOR.to_string(),
            align: TextAlign::Left,
        }
    }
}

/// A font face that must be registered at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontFaceConfig {
    /// Name requests use to refer to this face (e.g. "Roboto-Bold")
    pub alias: String,

    /// File name relative to the font directory
    pub file: String,
}

impl FontFaceConfig {
    fn new(alias: &str, file: &str) -> Self {
        Self {
            alias: alias.to_string(),
            file: file.to_string(),
        }
    }
}

/// Font registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Directory containing the font files
    pub dir: String,

    /// Faces registered under an alias
    pub faces: Vec<FontFaceConfig>,

    /// Fail start-up when a listed face is missing or unusable
    pub require_all: bool,

    /// Also register the fonts installed on the host
    pub load_system_fonts: bool,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dir: "./fonts".to_string(),
            faces: vec![
                FontFaceConfig::new("Roboto-Regular", "Roboto-Regular.ttf"),
                FontFaceConfig::new("Roboto-Bold", "Roboto-Bold.ttf"),
            ],
            require_all: true,
            load_system_fonts: false,
        }
    }
}

/// Marketing template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Canvas width when the request has none
    pub width: u32,

    /// Canvas height when the request has none
    pub height: u32,

    /// Diagonal gradient stops (top-left, bottom-right)
    pub gradient_colors: Vec<String>,

    /// Title font alias
    pub title_font: String,

    /// Title font size in pixels
    pub title_font_size: f32,

    /// Title fill color
    pub title_color: String,

    /// Title offset from the vertical center
    pub title_offset: f32,

    /// Subtitle font alias
    pub subtitle_font: String,

    /// Subtitle font size in pixels
    pub subtitle_font_size: f32,

    /// Subtitle fill color
    pub subtitle_color: String,

    /// Subtitle offset from the vertical center
    pub subtitle_offset: f32,

    /// Logo box size (the logo is fit with `contain`)
    pub logo_size: u32,

    /// Logo left offset
    pub logo_x: i64,

    /// Logo top offset
    pub logo_y: i64,

    /// Output quality when the request has none
    pub quality: u8,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
            gradient_colors: vec!["#4A90E2".to_string(), "#8E2DE2".to_string()],
            title_font: "Roboto-Bold".to_string(),
            title_font_size: 72.0,
            title_color: "#FFFFFF".to_string(),
            title_offset: -50.0,
            subtitle_font: "Roboto-Regular".to_string(),
            subtitle_font_size: 36.0,
            subtitle_color: "#E0E0E0".to_string(),
            subtitle_offset: 50.0,
            logo_size: 200,
            logo_x: 50,
            logo_y: 50,
            quality: 90,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
