//! Typed pipeline vocabulary: steps, plans and output descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Parse a format name (case-insensitive, `jpg` is an alias of `jpeg`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// MIME type used in data URIs.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a resize maps the source onto the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to cover the box, then center-crop
    Cover,
    /// Scale to fit inside the box, then letterbox
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio
    Fill,
    /// Scale to fit inside the box, no padding
    Inside,
    /// Scale to cover the box, no cropping
    Outside,
}

impl FitMode {
    pub const ALL: [FitMode; 5] = [
        FitMode::Cover,
        FitMode::Contain,
        FitMode::Fill,
        FitMode::Inside,
        FitMode::Outside,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Cover => "cover",
            FitMode::Contain => "contain",
            FitMode::Fill => "fill",
            FitMode::Inside => "inside",
            FitMode::Outside => "outside",
        }
    }
}

/// Horizontal anchor of a text run relative to its `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Vertical anchor of a text run relative to its `y`.
///
/// Pipeline text always uses `Top`; the marketing template centers its
/// title lines on `Middle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    #[default]
    Top,
    Middle,
}

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Parse any CSS color: hex, `rgb()`/`rgba()`, `hsl()`, or a named color.
    pub fn parse(s: &str) -> Option<Self> {
        let c = svgtypes::Color::from_str(s.trim()).ok()?;
        Some(Self {
            r: c.red,
            g: c.green,
            b: c.blue,
            a: c.alpha,
        })
    }
}

/// A fully-resolved text draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    /// Already-sanitized text
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font_family: String,
    pub color: Color,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

/// A secondary image drawn over the base at an offset.
#[derive(Clone, PartialEq, Eq)]
pub struct Layer {
    /// Decoded (still encoded-format) image bytes
    pub image: Vec<u8>,
    pub x: i64,
    pub y: i64,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("image", &format_args!("<{} bytes>", self.image.len()))
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

/// One validated operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    Resize {
        width: u32,
        height: u32,
        fit: FitMode,
    },
    AddText(TextSpec),
    Composite {
        layers: Vec<Layer>,
    },
}

impl PipelineStep {
    /// Wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            PipelineStep::Resize { .. } => "resize",
            PipelineStep::AddText(_) => "add-text",
            PipelineStep::Composite { .. } => "composite",
        }
    }
}

/// An ordered, bounded, validated sequence of steps.
///
/// Only the validator constructs plans, so holding one means every step has
/// already passed shape checking.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    steps: Vec<PipelineStep>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<PipelineStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<PipelineStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Final encoding, applied once after every step has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub format: OutputFormat,
    /// 1-100; ignored by lossless encoders
    pub quality: u8,
}

impl OutputDescriptor {
    /// Lossless encoding used between steps.
    pub const INTERMEDIATE: OutputDescriptor = OutputDescriptor {
        format: OutputFormat::Png,
        quality: 100,
    };
}
