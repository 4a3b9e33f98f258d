//! Raster capability boundary.
//!
//! The executor never touches pixels itself. Every decode, resize,
//! composite, text draw and encode goes through a [`RasterAdapter`], which
//! lets tests substitute slow or failing adapters and keeps the codec stack
//! (`image` for bitmaps, `resvg` for text and gradients) behind one seam.
//!
//! Buffers crossing the boundary are always *encoded* images. Intermediate
//! results use [`OutputDescriptor::INTERMEDIATE`] (lossless PNG) so a chain
//! of steps never compounds lossy re-encodes.

mod fit;
pub(crate) mod image_raster;
mod vector;

pub use image_raster::ImageRaster;

use std::fmt;

use crate::error::RasterError;
use crate::pipeline::{Color, FitMode, Layer, OutputDescriptor, TextSpec};

/// Header-level facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Detected container format ("png", "jpeg", ...)
    pub format: String,
    pub channels: u8,
    pub has_alpha: bool,
    /// "srgb" for color images, "b-w" for grayscale
    pub color_space: &'static str,
}

/// An encoded image plus its decoded metadata.
///
/// Immutable once produced: each step consumes one buffer and returns a new
/// one.
#[derive(Clone)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    info: ImageInfo,
}

impl ImageBuffer {
    pub fn new(bytes: Vec<u8>, info: ImageInfo) -> Self {
        Self { bytes, info }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("len", &self.bytes.len())
            .field("info", &self.info)
            .finish()
    }
}

/// Pixel-level capabilities the pipeline delegates to.
///
/// Methods are synchronous and CPU-bound; the executor runs them on the
/// blocking pool. Implementations must be shareable across requests.
pub trait RasterAdapter: Send + Sync {
    /// Read dimensions and pixel layout without decoding pixel data.
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, RasterError>;

    /// Scale `input` into a `width`×`height` box according to `fit`.
    fn resize(
        &self,
        input: &ImageBuffer,
        width: u32,
        height: u32,
        fit: FitMode,
    ) -> Result<ImageBuffer, RasterError>;

    /// Draw `layers` over `base` in order; later layers land on top.
    fn composite(&self, base: &ImageBuffer, layers: &[Layer]) -> Result<ImageBuffer, RasterError>;

    /// Draw a text run over `input`, keeping its dimensions.
    fn draw_text(&self, input: &ImageBuffer, text: &TextSpec) -> Result<ImageBuffer, RasterError>;

    /// Render a diagonal (top-left to bottom-right) gradient canvas.
    fn gradient(&self, width: u32, height: u32, colors: &[Color])
        -> Result<ImageBuffer, RasterError>;

    /// Re-encode `input` with the given format and quality.
    fn encode(
        &self,
        input: &ImageBuffer,
        output: OutputDescriptor,
    ) -> Result<ImageBuffer, RasterError>;
}
