//! Default raster adapter backed by `image` and `resvg`.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{imageops, ColorType, DynamicImage, ImageDecoder as _, ImageFormat, ImageReader};

use super::{fit, vector, ImageBuffer, ImageInfo, RasterAdapter};
use crate::error::RasterError;
use crate::fonts::FontRegistry;
use crate::pipeline::{Color, FitMode, Layer, OutputDescriptor, OutputFormat, TextSpec};

/// Raster adapter using `image` for bitmaps and `resvg` for text/gradients.
pub struct ImageRaster {
    fonts: Arc<FontRegistry>,
}

impl ImageRaster {
    pub fn new(fonts: Arc<FontRegistry>) -> Self {
        Self { fonts }
    }

    fn load(bytes: &[u8]) -> Result<DynamicImage, RasterError> {
        image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))
    }

    /// Encode a decoded image and describe the result.
    fn pack(img: &DynamicImage, output: OutputDescriptor) -> Result<ImageBuffer, RasterError> {
        let bytes = encode_image(img, output)?;
        let info = ImageInfo {
            width: img.width(),
            height: img.height(),
            format: output.format.as_str().to_string(),
            channels: match output.format {
                OutputFormat::Jpeg => 3,
                _ => img.color().channel_count(),
            },
            has_alpha: output.format != OutputFormat::Jpeg && img.color().has_alpha(),
            color_space: color_space(img.color()),
        };
        Ok(ImageBuffer::new(bytes, info))
    }
}

/// Convert an `ImageFormat` to a string representation.
pub(crate) fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

fn color_space(color: ColorType) -> &'static str {
    if color.has_color() {
        "srgb"
    } else {
        "b-w"
    }
}

fn encode_image(img: &DynamicImage, output: OutputDescriptor) -> Result<Vec<u8>, RasterError> {
    let mut cursor = Cursor::new(Vec::new());
    let fail = |e: image::ImageError| RasterError::Encode {
        format: output.format.as_str().to_string(),
        message: e.to_string(),
    };

    match output.format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut cursor, output.quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(fail)?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut cursor, CompressionType::Default, PngFilter::Adaptive);
            match img.color() {
                // PNG has no float samples
                ColorType::Rgb32F | ColorType::Rgba32F => DynamicImage::ImageRgba8(img.to_rgba8())
                    .write_with_encoder(encoder)
                    .map_err(fail)?,
                _ => img.write_with_encoder(encoder).map_err(fail)?,
            }
        }
        OutputFormat::Webp => {
            // Lossless only; quality has no effect here.
            let encoder = WebPEncoder::new_lossless(&mut cursor);
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            img.write_with_encoder(encoder).map_err(fail)?;
        }
    }
    Ok(cursor.into_inner())
}

impl RasterAdapter for ImageRaster {
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, RasterError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RasterError::Decode(format!("cannot detect image format: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| RasterError::Decode("unrecognized image format".to_string()))?;
        let decoder = reader
            .into_decoder()
            .map_err(|e| RasterError::Decode(e.to_string()))?;

        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        Ok(ImageInfo {
            width,
            height,
            format: format_to_string(format),
            channels: color.channel_count(),
            has_alpha: color.has_alpha(),
            color_space: color_space(color),
        })
    }

    fn resize(
        &self,
        input: &ImageBuffer,
        width: u32,
        height: u32,
        fit: FitMode,
    ) -> Result<ImageBuffer, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Unsupported(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        let img = Self::load(input.bytes())?;
        let resized = fit::apply(&img, width, height, fit)?;
        Self::pack(&resized, OutputDescriptor::INTERMEDIATE)
    }

    fn composite(&self, base: &ImageBuffer, layers: &[Layer]) -> Result<ImageBuffer, RasterError> {
        let mut canvas = Self::load(base.bytes())?.to_rgba8();
        for (i, layer) in layers.iter().enumerate() {
            let top = Self::load(&layer.image)
                .map_err(|e| RasterError::Composite(format!("layer {i}: {e}")))?
                .to_rgba8();
            if top.width() > canvas.width() || top.height() > canvas.height() {
                return Err(RasterError::Composite(format!(
                    "layer {i} ({}x{}) is larger than the base image ({}x{})",
                    top.width(),
                    top.height(),
                    canvas.width(),
                    canvas.height()
                )));
            }
            imageops::overlay(&mut canvas, &top, layer.x, layer.y);
        }
        Self::pack(&DynamicImage::ImageRgba8(canvas), OutputDescriptor::INTERMEDIATE)
    }

    fn draw_text(&self, input: &ImageBuffer, text: &TextSpec) -> Result<ImageBuffer, RasterError> {
        let info = self.decode(input.bytes())?;
        let mut canvas = Self::load(input.bytes())?.to_rgba8();

        let svg = vector::text_document(info.width, info.height, text, &self.fonts);
        let layer = vector::rasterize(&svg, info.width, info.height, &self.fonts)?;
        imageops::overlay(&mut canvas, &layer, 0, 0);

        Self::pack(&DynamicImage::ImageRgba8(canvas), OutputDescriptor::INTERMEDIATE)
    }

    fn gradient(
        &self,
        width: u32,
        height: u32,
        colors: &[Color],
    ) -> Result<ImageBuffer, RasterError> {
        if colors.len() < 2 {
            return Err(RasterError::Unsupported(
                "a gradient needs at least two colors".to_string(),
            ));
        }
        let svg = vector::gradient_document(width, height, colors);
        let canvas = vector::rasterize(&svg, width, height, &self.fonts)?;
        Self::pack(&DynamicImage::ImageRgba8(canvas), OutputDescriptor::INTERMEDIATE)
    }

    fn encode(
        &self,
        input: &ImageBuffer,
        output: OutputDescriptor,
    ) -> Result<ImageBuffer, RasterError> {
        let img = Self::load(input.bytes())?;
        Self::pack(&img, output)
    }
}
