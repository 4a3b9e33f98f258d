//! Error types for the Prism image transformation pipeline.
//!
//! [`PipelineError`] is the request-facing taxonomy: every variant maps to a
//! stable machine-readable code and an HTTP-style status through [`ErrorKind`].
//! Errors raised while validating or executing a specific step are wrapped in
//! [`PipelineError::Step`] so the offending index travels with the cause.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Font registry start-up errors
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    /// Request validation or execution errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while building the font registry at start-up.
#[derive(Error, Debug)]
pub enum FontError {
    /// A required font file is not on disk
    #[error("Required font '{alias}' not found at {path}")]
    Missing { alias: String, path: PathBuf },

    /// The file exists but contains no usable face
    #[error("Font file {path} for '{alias}' contains no usable face")]
    Unusable { alias: String, path: PathBuf },

    /// Reading the font file failed
    #[error("Failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by a raster adapter capability.
///
/// These never reach the caller directly: the executor converts them into
/// [`PipelineError::Processing`], attributed to the step that was running.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The bytes could not be decoded as a supported image
    #[error("Cannot decode image: {0}")]
    Decode(String),

    /// Encoding to the target format failed
    #[error("Cannot encode {format}: {message}")]
    Encode { format: String, message: String },

    /// A composite layer could not be placed over the base image
    #[error("Composite failed: {0}")]
    Composite(String),

    /// Text layer construction or rasterization failed
    #[error("Text rendering failed: {0}")]
    Text(String),

    /// Parameters reached the adapter in a state it cannot process
    #[error("{0}")]
    Unsupported(String),

    /// The blocking task running the adapter panicked or was cancelled
    #[error("Raster task aborted: {0}")]
    Aborted(String),
}

/// Request-facing error taxonomy.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed base64, wrong primitive types, or malformed descriptor shape
    #[error("{0}")]
    InvalidInput(String),

    /// Decoded payload exceeds the byte ceiling
    #[error("Image too large: {size_bytes} bytes (max {max_bytes} bytes)")]
    ImageTooLarge { size_bytes: u64, max_bytes: u64 },

    /// Width/height outside the allowed range or not numeric
    #[error("{0}")]
    InvalidDimension(String),

    /// Unsupported output format
    #[error("Invalid format '{0}'. Supported: jpeg, jpg, png, webp")]
    InvalidFormat(String),

    /// A required field is absent for the given operation
    #[error("{0}")]
    MissingParameter(String),

    /// Composite layer count exceeds the bound
    #[error("Too many layers: {count} (max {max})")]
    TooManyLayers { count: usize, max: usize },

    /// Pipeline step count exceeds the bound
    #[error("Too many steps: {count} (max {max})")]
    TooManySteps { count: usize, max: usize },

    /// Unknown step tag
    #[error("Invalid operation '{op}'. Valid: resize, add-text, composite")]
    InvalidOperation { op: String },

    /// The raster adapter failed on otherwise well-shaped input
    #[error("Processing failed: {0}")]
    Processing(#[from] RasterError),

    /// The whole run exceeded its deadline
    #[error("Operation exceeded the time limit of {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// An error attributed to a specific step of the plan
    #[error("Step {index}: {source}")]
    Step {
        index: usize,
        #[source]
        source: Box<PipelineError>,
    },
}

/// Machine-readable error classes exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    ImageTooLarge,
    InvalidDimension,
    InvalidFormat,
    MissingParameter,
    TooManyLayers,
    TooManySteps,
    InvalidOperation,
    ProcessingError,
    Timeout,
}

impl ErrorKind {
    /// Stable code string used in the response envelope.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::ImageTooLarge => "IMAGE_TOO_LARGE",
            ErrorKind::InvalidDimension => "INVALID_DIMENSION",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::MissingParameter => "MISSING_PARAMETER",
            ErrorKind::TooManyLayers => "TOO_MANY_LAYERS",
            ErrorKind::TooManySteps => "TOO_MANY_STEPS",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::ProcessingError => "PROCESSING_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
        }
    }

    /// HTTP-style status for this class.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::ImageTooLarge => 413,
            ErrorKind::ProcessingError => 500,
            ErrorKind::Timeout => 504,
            _ => 400,
        }
    }
}

impl PipelineError {
    /// Wrap this error with the index of the step that raised it.
    ///
    /// An error that already carries an index is returned unchanged.
    pub fn at_step(self, index: usize) -> Self {
        match self {
            PipelineError::Step { .. } => self,
            other => PipelineError::Step {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Classify the error, looking through any step wrapper.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) => ErrorKind::InvalidInput,
            PipelineError::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
            PipelineError::InvalidDimension(_) => ErrorKind::InvalidDimension,
            PipelineError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            PipelineError::MissingParameter(_) => ErrorKind::MissingParameter,
            PipelineError::TooManyLayers { .. } => ErrorKind::TooManyLayers,
            PipelineError::TooManySteps { .. } => ErrorKind::TooManySteps,
            PipelineError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            PipelineError::Processing(_) => ErrorKind::ProcessingError,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Step { source, .. } => source.kind(),
        }
    }

    /// Index of the offending step, if the error is attributed to one.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            PipelineError::Step { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Shorthand for `self.kind().code()`.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Shorthand for `self.kind().status()`.
    pub fn status(&self) -> u16 {
        self.kind().status()
    }
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
