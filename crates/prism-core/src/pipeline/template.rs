//! Marketing banner template.
//!
//! A fixed two-step recipe on top of the executor: render a gradient canvas
//! with a centred title and subtitle (step 0), then optionally composite a
//! logo resized into a square box (step 1).

use serde_json::{Map, Value};

use crate::config::TemplateConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::raster::ImageBuffer;

use super::executor::Executor;
use super::step::{Color, FitMode, Layer, PipelineStep, TextAlign, TextBaseline, TextSpec};
use super::validate::{sanitize_text, StepValidator};

/// A validated marketing request.
#[derive(Debug, Clone)]
pub struct MarketingTemplate {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub gradient: Vec<Color>,
    /// Decoded logo bytes
    pub logo: Option<Vec<u8>>,
}

fn optional_text(fields: &Map<String, Value>, name: &str) -> PipelineResult<Option<String>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let clean = sanitize_text(s);
            Ok((!clean.is_empty()).then_some(clean))
        }
        Some(_) => Err(PipelineError::InvalidInput(format!(
            "'{name}' must be a string"
        ))),
    }
}

fn parse_colors(raw: &[Value]) -> PipelineResult<Vec<Color>> {
    if raw.len() < 2 {
        return Err(PipelineError::InvalidInput(
            "'gradientColors' needs at least two colors".to_string(),
        ));
    }
    raw.iter()
        .map(|v| {
            v.as_str().and_then(Color::parse).ok_or_else(|| {
                PipelineError::InvalidInput(format!("'{v}' is not a valid gradient color"))
            })
        })
        .collect()
}

fn config_color(value: &str) -> PipelineResult<Color> {
    Color::parse(value).ok_or_else(|| {
        PipelineError::InvalidInput(format!("template color '{value}' is not valid"))
    })
}

impl MarketingTemplate {
    /// Validate a marketing request body, filling gaps from `[template]`.
    pub fn parse(
        fields: &Map<String, Value>,
        validator: &StepValidator,
        template: &TemplateConfig,
    ) -> PipelineResult<Self> {
        let width = fields
            .get("width")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::from(template.width));
        let height = fields
            .get("height")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::from(template.height));
        let (width, height) = validator
            .validate_dimensions(Some(&width), Some(&height))
            .map_err(|e| match e {
                PipelineError::MissingParameter(_) => PipelineError::InvalidDimension(
                    "width and height must be numbers".to_string(),
                ),
                other => other,
            })?;

        let gradient = match fields.get("gradientColors") {
            None | Some(Value::Null) => template
                .gradient_colors
                .iter()
                .map(|c| config_color(c))
                .collect::<PipelineResult<Vec<_>>>()?,
            Some(Value::Array(items)) => parse_colors(items)?,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "'gradientColors' must be an array of colors".to_string(),
                ))
            }
        };

        let logo = match fields.get("logo") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(crate::codec::decode_base64(s, validator.limits())?),
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "'logo' must be a base64 string".to_string(),
                ))
            }
        };

        Ok(Self {
            width,
            height,
            title: optional_text(fields, "title")?,
            subtitle: optional_text(fields, "subtitle")?,
            gradient,
            logo,
        })
    }

    /// Title and subtitle draws, centred on the canvas.
    pub fn text_steps(&self, template: &TemplateConfig) -> PipelineResult<Vec<PipelineStep>> {
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;
        let lines = [
            (
                &self.title,
                template.title_offset,
                &template.title_font,
                template.title_font_size,
                &template.title_color,
            ),
            (
                &self.subtitle,
                template.subtitle_offset,
                &template.subtitle_font,
                template.subtitle_font_size,
                &template.subtitle_color,
            ),
        ];

        let mut steps = Vec::new();
        for (text, offset, font, size, color) in lines {
            let Some(text) = text else { continue };
            steps.push(PipelineStep::AddText(TextSpec {
                text: text.clone(),
                x: cx,
                y: cy + offset,
                font_size: size,
                font_family: font.clone(),
                color: config_color(color)?,
                align: TextAlign::Center,
                baseline: TextBaseline::Middle,
            }));
        }
        Ok(steps)
    }

    /// Run the recipe and return the unencoded result.
    pub async fn render(
        self,
        executor: &Executor,
        template: &TemplateConfig,
    ) -> PipelineResult<ImageBuffer> {
        let texts = self.text_steps(template)?;
        let background = async {
            let mut canvas = executor
                .gradient(self.width, self.height, self.gradient.clone())
                .await?;
            for text in texts {
                canvas = executor.apply(text, canvas).await?;
            }
            Ok::<_, PipelineError>(canvas)
        }
        .await
        .map_err(|e| e.at_step(0))?;

        let Some(logo) = self.logo else {
            return Ok(background);
        };

        async {
            let logo = executor.load(logo).await?;
            let resized = executor
                .apply(
                    PipelineStep::Resize {
                        width: template.logo_size,
                        height: template.logo_size,
                        fit: FitMode::Contain,
                    },
                    logo,
                )
                .await?;
            let layer = Layer {
                image: resized.into_bytes(),
                x: template.logo_x,
                y: template.logo_y,
            };
            executor
                .apply(PipelineStep::Composite { layers: vec![layer] }, background)
                .await
        }
        .await
        .map_err(|e| e.at_step(1))
    }
}
