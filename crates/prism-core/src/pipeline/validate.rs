//! Step validation: untyped descriptors in, a typed [`Plan`] out.
//!
//! Validation is all-or-nothing. Every descriptor is parsed before anything
//! executes, and the first failure is reported with the index of its step.
//! Text is sanitized here, so plans only ever carry cleaned text.

use serde_json::{Map, Value};

use crate::codec;
use crate::config::{Config, DefaultsConfig, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::limits::MAX_TEXT_LENGTH;

use super::step::{
    Color, FitMode, Layer, OutputDescriptor, OutputFormat, PipelineStep, Plan, TextAlign,
    TextBaseline, TextSpec,
};

/// Operations a pipeline step may name.
pub const OPERATIONS: [&str; 3] = ["resize", "add-text", "composite"];

/// Strip angle brackets, trim, and cap at [`MAX_TEXT_LENGTH`] UTF-16 units.
///
/// A character that would straddle the cap is dropped whole.
pub fn sanitize_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '<' && *c != '>').collect();
    let mut units = 0;
    stripped
        .trim()
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= MAX_TEXT_LENGTH
        })
        .collect()
}

/// Check a requested size against the dimension limits.
pub fn check_dimensions(limits: &LimitsConfig, width: u32, height: u32) -> PipelineResult<()> {
    let range = limits.min_image_dimension..=limits.max_image_dimension;
    for (name, value) in [("width", width), ("height", height)] {
        if !range.contains(&value) {
            return Err(PipelineError::InvalidDimension(format!(
                "{name} must be between {}px and {}px, got {value}",
                limits.min_image_dimension, limits.max_image_dimension
            )));
        }
    }
    Ok(())
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// Parses raw request fields into typed pipeline values.
pub struct StepValidator {
    limits: LimitsConfig,
    defaults: DefaultsConfig,
}

impl StepValidator {
    /// Create a validator with the given limits and defaults.
    pub fn new(config: &Config) -> Self {
        Self {
            limits: config.limits.clone(),
            defaults: config.defaults.clone(),
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Parse a raw step list into a plan.
    ///
    /// Fails with `InvalidInput` for a non-list or empty list,
    /// `TooManySteps` above the bound, and otherwise with the first step
    /// error, wrapped with that step's index.
    pub fn validate(&self, raw: &Value) -> PipelineResult<Plan> {
        let Value::Array(items) = raw else {
            return Err(PipelineError::InvalidInput(
                "'steps' must be an array".to_string(),
            ));
        };
        if items.is_empty() {
            return Err(PipelineError::InvalidInput(
                "At least one step is required".to_string(),
            ));
        }
        if items.len() > self.limits.max_pipeline_steps {
            return Err(PipelineError::TooManySteps {
                count: items.len(),
                max: self.limits.max_pipeline_steps,
            });
        }

        let steps = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.validate_step(item).map_err(|e| e.at_step(index)))
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Plan::new(steps))
    }

    /// Parse one step descriptor.
    pub fn validate_step(&self, raw: &Value) -> PipelineResult<PipelineStep> {
        let op = raw.get("op");
        let fields = match (raw.as_object(), op.and_then(Value::as_str)) {
            (Some(fields), Some(name)) if OPERATIONS.contains(&name) => fields,
            _ => {
                return Err(PipelineError::InvalidOperation {
                    op: match op {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => "<missing>".to_string(),
                    },
                })
            }
        };

        match fields.get("op").and_then(Value::as_str) {
            Some("resize") => self.validate_resize(fields),
            Some("add-text") => self.validate_text(fields).map(PipelineStep::AddText),
            _ => {
                let layers = self.validate_layers(fields.get("layers"))?;
                Ok(PipelineStep::Composite { layers })
            }
        }
    }

    /// Parse `width`, `height` and `fit` from a resize descriptor.
    pub fn validate_resize(&self, fields: &Map<String, Value>) -> PipelineResult<PipelineStep> {
        let (width, height) = self.validate_dimensions(fields.get("width"), fields.get("height"))?;
        let fit = self.resolve_fit(fields.get("fit"))?;
        Ok(PipelineStep::Resize { width, height, fit })
    }

    /// Parse a required width/height pair and check it against the limits.
    pub fn validate_dimensions(
        &self,
        width: Option<&Value>,
        height: Option<&Value>,
    ) -> PipelineResult<(u32, u32)> {
        let (Some(w), Some(h)) = (number(width), number(height)) else {
            return Err(PipelineError::MissingParameter(
                "resize requires numeric 'width' and 'height'".to_string(),
            ));
        };
        if w.fract() != 0.0 || h.fract() != 0.0 {
            return Err(PipelineError::InvalidDimension(
                "width and height must be whole pixels".to_string(),
            ));
        }
        let clamp = |n: f64| n.clamp(0.0, u32::MAX as f64) as u32;
        let (width, height) = (clamp(w), clamp(h));
        check_dimensions(&self.limits, width, height)?;
        Ok((width, height))
    }

    /// Resolve the text configuration of an add-text descriptor.
    ///
    /// `text` may be a nested object (`{ text, x, y, ... }`) or a plain
    /// string with the other fields beside it.
    pub fn validate_text(&self, fields: &Map<String, Value>) -> PipelineResult<TextSpec> {
        let config = match fields.get("text") {
            None | Some(Value::Null) => {
                return Err(PipelineError::MissingParameter(
                    "add-text requires a 'text' configuration".to_string(),
                ))
            }
            Some(Value::Object(nested)) => nested,
            Some(Value::String(_)) => fields,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "'text' must be an object or a string".to_string(),
                ))
            }
        };

        let text = match config.get("text") {
            Some(Value::String(s)) if !s.is_empty() => sanitize_text(s),
            _ => {
                return Err(PipelineError::MissingParameter(
                    "text is required and must be a string".to_string(),
                ))
            }
        };

        let (Some(x), Some(y)) = (number(config.get("x")), number(config.get("y"))) else {
            return Err(PipelineError::MissingParameter(
                "text position 'x' and 'y' are required and must be numbers".to_string(),
            ));
        };

        let font_size = match config.get("fontSize") {
            None | Some(Value::Null) => self.defaults.font_size,
            v => number(v)
                .filter(|n| *n > 0.0)
                .map(|n| n as f32)
                .ok_or_else(|| {
                    PipelineError::InvalidInput("fontSize must be a positive number".to_string())
                })?,
        };

        let font_family = match config.get("fontFamily") {
            None | Some(Value::Null) => self.defaults.font_family.clone(),
            Some(Value::String(s)) if s.trim().is_empty() => self.defaults.font_family.clone(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "fontFamily must be a string".to_string(),
                ))
            }
        };

        let color = match config.get("color") {
            None | Some(Value::Null) => self.default_color()?,
            Some(Value::String(s)) if s.is_empty() => self.default_color()?,
            Some(Value::String(s)) => Color::parse(s).ok_or_else(|| {
                PipelineError::InvalidInput(format!("'{s}' is not a valid color"))
            })?,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "color must be a string".to_string(),
                ))
            }
        };

        let align = match config.get("align") {
            None | Some(Value::Null) => self.defaults.align,
            Some(Value::String(s)) => TextAlign::parse(s).ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "Invalid align '{s}'. Supported: left, center, right"
                ))
            })?,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "align must be a string".to_string(),
                ))
            }
        };

        Ok(TextSpec {
            text,
            x: x as f32,
            y: y as f32,
            font_size,
            font_family,
            color,
            align,
            baseline: TextBaseline::Top,
        })
    }

    fn default_color(&self) -> PipelineResult<Color> {
        Color::parse(&self.defaults.color).ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "default color '{}' is not valid",
                self.defaults.color
            ))
        })
    }

    /// Parse a composite layer list, decoding every layer payload.
    pub fn validate_layers(&self, raw: Option<&Value>) -> PipelineResult<Vec<Layer>> {
        let items = match raw {
            None | Some(Value::Null) => {
                return Err(PipelineError::MissingParameter(
                    "composite requires 'layers'".to_string(),
                ))
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "'layers' must be an array".to_string(),
                ))
            }
        };
        if items.is_empty() {
            return Err(PipelineError::InvalidInput(
                "At least one layer is required".to_string(),
            ));
        }
        if items.len() > self.limits.max_layers {
            return Err(PipelineError::TooManyLayers {
                count: items.len(),
                max: self.limits.max_layers,
            });
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.validate_layer(i, item))
            .collect()
    }

    fn validate_layer(&self, index: usize, raw: &Value) -> PipelineResult<Layer> {
        let Some(fields) = raw.as_object() else {
            return Err(PipelineError::InvalidInput(format!(
                "layer {index}: must be an object"
            )));
        };
        let image = match fields.get("image") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(v) if !v.is_null() => {
                return Err(PipelineError::InvalidInput(format!(
                    "layer {index}: image must be a base64 string"
                )))
            }
            _ => {
                return Err(PipelineError::MissingParameter(format!(
                    "layer {index}: image is required"
                )))
            }
        };
        let (Some(x), Some(y)) = (number(fields.get("x")), number(fields.get("y"))) else {
            return Err(PipelineError::MissingParameter(format!(
                "layer {index}: numeric x and y are required"
            )));
        };

        let image = codec::decode_base64(image, &self.limits).map_err(|e| match e {
            PipelineError::InvalidInput(msg) => {
                PipelineError::InvalidInput(format!("layer {index}: {msg}"))
            }
            other => other,
        })?;

        Ok(Layer {
            image,
            x: x.round() as i64,
            y: y.round() as i64,
        })
    }

    /// Resolve an optional fit mode.
    pub fn resolve_fit(&self, raw: Option<&Value>) -> PipelineResult<FitMode> {
        match raw {
            None | Some(Value::Null) => Ok(self.defaults.fit),
            Some(Value::String(s)) if s.is_empty() => Ok(self.defaults.fit),
            Some(Value::String(s)) => FitMode::parse(s).ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "Invalid fit mode '{s}'. Supported: cover, contain, fill, inside, outside"
                ))
            }),
            Some(other) => Err(PipelineError::InvalidInput(format!(
                "Invalid fit mode {other}"
            ))),
        }
    }

    /// Resolve an optional output format.
    pub fn resolve_format(&self, raw: Option<&Value>) -> PipelineResult<OutputFormat> {
        match raw {
            None | Some(Value::Null) => Ok(self.defaults.format),
            Some(Value::String(s)) if s.is_empty() => Ok(self.defaults.format),
            Some(Value::String(s)) => {
                OutputFormat::parse(s).ok_or_else(|| PipelineError::InvalidFormat(s.clone()))
            }
            Some(other) => Err(PipelineError::InvalidFormat(other.to_string())),
        }
    }

    /// Resolve an optional quality; numeric strings are accepted.
    pub fn resolve_quality(&self, raw: Option<&Value>, default: u8) -> PipelineResult<u8> {
        let q = match raw {
            None | Some(Value::Null) => return Ok(default),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match q {
            Some(q) if (1.0..=100.0).contains(&q) => Ok(q.round() as u8),
            _ => Err(PipelineError::InvalidInput(
                "quality must be between 1 and 100".to_string(),
            )),
        }
    }

    /// Resolve the final encoding from optional `format` and `quality` fields.
    pub fn output_descriptor(
        &self,
        format: Option<&Value>,
        quality: Option<&Value>,
        default_quality: u8,
    ) -> PipelineResult<OutputDescriptor> {
        Ok(OutputDescriptor {
            format: self.resolve_format(format)?,
            quality: self.resolve_quality(quality, default_quality)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    // 1x1 transparent PNG
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn validator() -> StepValidator {
        StepValidator::new(&Config::default())
    }

    fn layer(x: i64, y: i64) -> Value {
        json!({ "image": PIXEL, "x": x, "y": y })
    }

    #[test]
    fn test_sanitize_strips_angle_brackets() {
        assert_eq!(
            sanitize_text("<script>alert(1)</script>"),
            "scriptalert(1)/script"
        );
        assert_eq!(sanitize_text("  padded  "), "padded");
    }

    #[test]
    fn test_sanitize_truncates_to_utf16_units() {
        let long = "a".repeat(600);
        assert_eq!(sanitize_text(&long).len(), 500);

        // Each emoji is two UTF-16 units; 251 of them would be 502.
        let emoji = "😀".repeat(251);
        let out = sanitize_text(&emoji);
        assert_eq!(out.chars().count(), 250);
        assert_eq!(out.encode_utf16().count(), 500);
    }

    #[test]
    fn test_validate_rejects_non_array_and_empty() {
        let v = validator();
        let err = v.validate(&json!({"op": "resize"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = v.validate(&json!([])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_rejects_too_many_steps() {
        let steps: Vec<Value> = (0..21)
            .map(|_| json!({"op": "resize", "width": 100, "height": 100}))
            .collect();
        let err = validator().validate(&Value::Array(steps)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManySteps);
        assert_eq!(err.step_index(), None);
    }

    #[test]
    fn test_validate_accepts_max_steps() {
        let steps: Vec<Value> = (0..20)
            .map(|_| json!({"op": "resize", "width": 100, "height": 100}))
            .collect();
        let plan = validator().validate(&Value::Array(steps)).unwrap();
        assert_eq!(plan.len(), 20);
    }

    #[test]
    fn test_unknown_op_names_index() {
        let steps = json!([
            {"op": "resize", "width": 100, "height": 100},
            {"op": "resize", "width": 100, "height": 100},
            {"op": "blur", "radius": 3}
        ]);
        let err = validator().validate(&steps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.step_index(), Some(2));
        assert!(err.to_string().contains("blur"));
    }

    #[test]
    fn test_missing_op_and_non_object_step() {
        let err = validator().validate(&json!([{"width": 10}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let err = validator().validate(&json!(["resize"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.step_index(), Some(0));
    }

    #[test]
    fn test_resize_missing_dimension() {
        let err = validator()
            .validate(&json!([{"op": "resize", "width": 100}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let err = validator()
            .validate(&json!([{"op": "resize", "width": "100", "height": 100}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn test_resize_dimension_out_of_range() {
        let err = validator()
            .validate(&json!([{"op": "resize", "width": 5, "height": 100}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);

        let err = validator()
            .validate(&json!([{"op": "resize", "width": 100, "height": 4097}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);

        let err = validator()
            .validate(&json!([{"op": "resize", "width": 100.5, "height": 100}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);
    }

    #[test]
    fn test_resize_fit_default_and_invalid() {
        let plan = validator()
            .validate(&json!([{"op": "resize", "width": 200, "height": 100}]))
            .unwrap();
        assert_eq!(
            plan.steps()[0],
            PipelineStep::Resize {
                width: 200,
                height: 100,
                fit: FitMode::Cover
            }
        );

        let err = validator()
            .validate(&json!([{"op": "resize", "width": 200, "height": 100, "fit": "stretch"}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_text_nested_shape_with_defaults() {
        let plan = validator()
            .validate(&json!([{"op": "add-text", "text": {"text": "<b>Hi</b>", "x": 10, "y": 20}}]))
            .unwrap();
        let PipelineStep::AddText(spec) = &plan.steps()[0] else {
            panic!("expected add-text");
        };
        assert_eq!(spec.text, "bHi/b");
        assert_eq!((spec.x, spec.y), (10.0, 20.0));
        assert_eq!(spec.font_size, 48.0);
        assert_eq!(spec.font_family, "Roboto-Regular");
        assert_eq!(spec.color, Color::parse("#FFFFFF").unwrap());
        assert_eq!(spec.align, TextAlign::Left);
        assert_eq!(spec.baseline, TextBaseline::Top);
    }

    #[test]
    fn test_text_flat_shape() {
        let plan = validator()
            .validate(&json!([{
                "op": "add-text", "text": "Hi", "x": 1, "y": 2,
                "fontSize": 20, "color": "red", "align": "center"
            }]))
            .unwrap();
        let PipelineStep::AddText(spec) = &plan.steps()[0] else {
            panic!("expected add-text");
        };
        assert_eq!(spec.text, "Hi");
        assert_eq!(spec.font_size, 20.0);
        assert_eq!(spec.align, TextAlign::Center);
        assert_eq!(spec.color.r, 255);
    }

    #[test]
    fn test_text_null_optionals_use_defaults() {
        let plan = validator()
            .validate(&json!([{"op": "add-text", "text": {
                "text": "Hi", "x": 1, "y": 2,
                "fontSize": null, "fontFamily": null, "color": null, "align": null
            }}]))
            .unwrap();
        let PipelineStep::AddText(spec) = &plan.steps()[0] else {
            panic!("expected add-text");
        };
        assert_eq!(spec.font_size, 48.0);
        assert_eq!(spec.font_family, "Roboto-Regular");
        assert_eq!(spec.color, Color::parse("#FFFFFF").unwrap());
        assert_eq!(spec.align, TextAlign::Left);
    }

    #[test]
    fn test_text_wrong_optional_types() {
        let v = validator();
        for (field, value) in [
            ("fontFamily", json!(7)),
            ("color", json!(true)),
            ("align", json!(["left"])),
            ("fontSize", json!(-3)),
        ] {
            let mut text = json!({"text": "Hi", "x": 1, "y": 2});
            text[field] = value;
            let err = v
                .validate(&json!([{"op": "add-text", "text": text}]))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{field}");
        }
    }

    #[test]
    fn test_text_missing_fields() {
        let v = validator();
        let err = v.validate(&json!([{"op": "add-text"}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let err = v
            .validate(&json!([{"op": "add-text", "text": {"text": "Hi", "x": 1}}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let err = v
            .validate(&json!([{"op": "add-text", "text": {"x": 1, "y": 1}}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn test_text_bad_color() {
        let err = validator()
            .validate(&json!([{"op": "add-text", "text": {"text": "Hi", "x": 1, "y": 1, "color": "nope"}}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_composite_layers() {
        let plan = validator()
            .validate(&json!([{"op": "composite", "layers": [layer(5, 5), layer(-3, 7)]}]))
            .unwrap();
        let PipelineStep::Composite { layers } = &plan.steps()[0] else {
            panic!("expected composite");
        };
        assert_eq!(layers.len(), 2);
        assert_eq!((layers[1].x, layers[1].y), (-3, 7));
        assert!(layers[0].image.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_composite_too_many_layers() {
        let layers: Vec<Value> = (0..11).map(|i| layer(i, i)).collect();
        let err = validator()
            .validate(&json!([{"op": "composite", "layers": layers}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyLayers);
        assert_eq!(err.step_index(), Some(0));
    }

    #[test]
    fn test_composite_layer_errors() {
        let v = validator();
        let err = v.validate(&json!([{"op": "composite"}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let err = v
            .validate(&json!([{"op": "composite", "layers": []}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = v
            .validate(&json!([{"op": "composite", "layers": [{"image": PIXEL, "x": 1}]}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);

        let err = v
            .validate(&json!([{"op": "composite", "layers": [{"image": "@@@", "x": 1, "y": 1}]}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("layer 0"));
    }

    #[test]
    fn test_validation_stops_at_first_bad_step() {
        let steps = json!([
            {"op": "resize", "width": 100, "height": 100},
            {"op": "resize", "width": 3, "height": 100},
            {"op": "nope"}
        ]);
        let err = validator().validate(&steps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);
        assert_eq!(err.step_index(), Some(1));
    }

    #[test]
    fn test_resolve_format() {
        let v = validator();
        assert_eq!(v.resolve_format(None).unwrap(), OutputFormat::Jpeg);
        assert_eq!(v.resolve_format(Some(&json!("JPG"))).unwrap(), OutputFormat::Jpeg);
        assert_eq!(v.resolve_format(Some(&json!("png"))).unwrap(), OutputFormat::Png);
        let err = v.resolve_format(Some(&json!("gif"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        let err = v.resolve_format(Some(&json!(7))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_resolve_quality() {
        let v = validator();
        assert_eq!(v.resolve_quality(None, 85).unwrap(), 85);
        assert_eq!(v.resolve_quality(Some(&json!(90)), 85).unwrap(), 90);
        assert_eq!(v.resolve_quality(Some(&json!("70")), 85).unwrap(), 70);
        for bad in [json!(0), json!(101), json!("abc"), json!(true)] {
            let err = v.resolve_quality(Some(&bad), 85).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }
}
