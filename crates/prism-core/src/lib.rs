//! Prism Core - Embeddable declarative image transformation library.
//!
//! Prism takes a base image plus an ordered list of steps (resize, add-text,
//! composite), validates the whole list up front, folds the image through
//! every step under one deadline, and encodes the result once.
//!
//! # Architecture
//!
//! ```text
//! JSON body → Validate (Plan) → Decode → Step 0 … Step n → Encode → Envelope
//! ```
//!
//! Pixel work sits behind [`RasterAdapter`]; the default [`ImageRaster`]
//! uses `image` for bitmaps and `resvg` for text and gradients.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, Operation, Prism};
//!
//! #[tokio::main]
//! async fn main() -> prism_core::Result<()> {
//!     let prism = Prism::new(Config::load()?)?;
//!     let response = prism.handle_json(Operation::Pipeline, &body).await;
//!     println!("{}", response.status);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod codec;
pub mod config;
pub mod error;
pub mod fonts;
pub mod limits;
pub mod output;
pub mod pipeline;
pub mod raster;

use std::sync::Arc;

use serde_json::Value;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, ErrorKind, FontError, PipelineError, PipelineResult, PrismError, RasterError,
    Result,
};
pub use fonts::FontRegistry;
pub use output::ResponseWriter;
pub use pipeline::{
    Envelope, Operation, OutputFormat, Plan, RequestProcessor, Response, ResponseData,
    StepValidator,
};
pub use raster::{ImageBuffer, ImageInfo, ImageRaster, RasterAdapter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prism engine - the main entry point for transformation requests.
///
/// Holds the start-up state shared by every request: configuration, the
/// font registry and the raster adapter. Requests never mutate it.
pub struct Prism {
    config: Config,
    fonts: Arc<FontRegistry>,
    processor: RequestProcessor,
}

impl Prism {
    /// Create an engine, loading the font registry.
    ///
    /// A required font that cannot be loaded is fatal here.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing Prism v{}", VERSION);
        config.validate()?;
        let fonts = Arc::new(FontRegistry::load(&config)?);
        let raster = Arc::new(ImageRaster::new(Arc::clone(&fonts)));
        Ok(Self::with_parts(config, fonts, raster))
    }

    /// Assemble an engine around an existing registry and adapter.
    pub fn with_parts(
        config: Config,
        fonts: Arc<FontRegistry>,
        raster: Arc<dyn RasterAdapter>,
    ) -> Self {
        let processor = RequestProcessor::new(&config, raster);
        Self {
            config,
            fonts,
            processor,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the shared font registry.
    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    /// Run one request and wrap the outcome in an envelope.
    pub async fn handle(&self, op: Operation, body: &Value) -> Response {
        self.processor.handle(op, body).await
    }

    /// Run one request from raw JSON text.
    pub async fn handle_json(&self, op: Operation, body: &str) -> Response {
        self.processor.handle_json(op, body).await
    }

    /// `{ baseImage, steps, format?, quality? }`
    pub async fn pipeline(&self, body: &Value) -> PipelineResult<ResponseData> {
        self.processor.pipeline(body).await
    }

    /// `{ image, width, height, fit?, format?, quality? }`
    pub async fn resize(&self, body: &Value) -> PipelineResult<ResponseData> {
        self.processor.resize(body).await
    }

    /// `{ image, text, format?, quality? }`
    pub async fn add_text(&self, body: &Value) -> PipelineResult<ResponseData> {
        self.processor.add_text(body).await
    }

    /// `{ baseImage, layers, format?, quality? }`
    pub async fn composite(&self, body: &Value) -> PipelineResult<ResponseData> {
        self.processor.composite(body).await
    }

    /// `{ title?, subtitle?, logo?, gradientColors?, width?, height?, format?, quality? }`
    pub async fn marketing(&self, body: &Value) -> PipelineResult<ResponseData> {
        self.processor.marketing(body).await
    }
}
