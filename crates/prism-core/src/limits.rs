//! Process-wide limits and defaults.
//!
//! These constants are the single source for every ceiling the engine
//! enforces. [`LimitsConfig`](crate::config::LimitsConfig) takes its defaults
//! from here; nothing mutates them at runtime.

/// Maximum decoded payload size for any base64 image (5 MiB).
pub const MAX_IMAGE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Largest width or height a resize may request.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// Smallest width or height a resize may request.
pub const MIN_IMAGE_DIMENSION: u32 = 10;

/// Maximum number of layers in a single composite step.
pub const MAX_LAYERS: usize = 10;

/// Maximum number of steps in a pipeline plan.
pub const MAX_PIPELINE_STEPS: usize = 20;

/// Wall-clock budget for a whole request, kept below common serverless limits.
pub const DEFAULT_TIMEOUT_MS: u64 = 25_000;

/// Quality used for lossy output when the request does not specify one.
pub const DEFAULT_QUALITY: u8 = 85;

/// Maximum length of sanitized text, in UTF-16 code units.
pub const MAX_TEXT_LENGTH: usize = 500;

/// Default font alias for text steps.
pub const DEFAULT_FONT_FAMILY: &str = "Roboto-Regular";

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: f32 = 48.0;

/// Default text fill.
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
