//! Request orchestration: wire body in, response data out.
//!
//! Each entry point follows the same shape: check required top-level
//! fields, decode payloads, validate into a plan, then execute and encode
//! under one deadline.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::codec;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::raster::{ImageBuffer, RasterAdapter};

use super::deadline::run_with_deadline;
use super::executor::Executor;
use super::report::{Response, ResponseData};
use super::step::{OutputDescriptor, PipelineStep, Plan};
use super::template::MarketingTemplate;
use super::validate::StepValidator;

/// Request kinds the processor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pipeline,
    Resize,
    AddText,
    Composite,
    Marketing,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pipeline" => Some(Self::Pipeline),
            "resize" => Some(Self::Resize),
            "add-text" => Some(Self::AddText),
            "composite" => Some(Self::Composite),
            "marketing" => Some(Self::Marketing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Resize => "resize",
            Self::AddText => "add-text",
            Self::Composite => "composite",
            Self::Marketing => "marketing",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn as_object(body: &Value) -> PipelineResult<&Map<String, Value>> {
    body.as_object().ok_or_else(|| {
        PipelineError::InvalidInput("Request body must be a JSON object".to_string())
    })
}

fn require<'a>(fields: &'a Map<String, Value>, name: &str) -> PipelineResult<&'a Value> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(PipelineError::MissingParameter(format!(
            "'{name}' is required"
        ))),
        Some(v) => Ok(v),
    }
}

/// Validates and executes requests against one raster adapter.
pub struct RequestProcessor {
    config: Config,
    validator: StepValidator,
    executor: Executor,
}

impl RequestProcessor {
    pub fn new(config: &Config, raster: Arc<dyn RasterAdapter>) -> Self {
        Self {
            config: config.clone(),
            validator: StepValidator::new(config),
            executor: Executor::new(raster, config.limits.clone()),
        }
    }

    /// Dispatch a parsed body and wrap the outcome in an envelope.
    pub async fn handle(&self, op: Operation, body: &Value) -> Response {
        tracing::debug!("Handling {} request", op);
        let result = match op {
            Operation::Pipeline => self.pipeline(body).await,
            Operation::Resize => self.resize(body).await,
            Operation::AddText => self.add_text(body).await,
            Operation::Composite => self.composite(body).await,
            Operation::Marketing => self.marketing(body).await,
        };
        Response::from_result(result)
    }

    /// Like [`handle`](Self::handle), starting from raw JSON text.
    pub async fn handle_json(&self, op: Operation, body: &str) -> Response {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => self.handle(op, &value).await,
            Err(e) => Response::failure(&PipelineError::InvalidInput(format!(
                "Malformed JSON body: {e}"
            ))),
        }
    }

    fn output(
        &self,
        fields: &Map<String, Value>,
        default_quality: u8,
    ) -> PipelineResult<OutputDescriptor> {
        self.validator
            .output_descriptor(fields.get("format"), fields.get("quality"), default_quality)
    }

    /// Decode `bytes`, run `plan` over it and encode once, under the deadline.
    async fn run_plan(
        &self,
        plan: Plan,
        bytes: Vec<u8>,
        output: OutputDescriptor,
    ) -> PipelineResult<ImageBuffer> {
        run_with_deadline(
            async {
                let initial = self.executor.load(bytes).await.map_err(|e| e.at_step(0))?;
                let run = self.executor.execute(plan, initial).await?;
                self.executor.finish(run.buffer, output).await
            },
            self.config.limits.timeout_ms,
        )
        .await
    }

    /// `{ baseImage, steps, format?, quality? }`
    pub async fn pipeline(&self, body: &Value) -> PipelineResult<ResponseData> {
        let fields = as_object(body)?;
        let base = require(fields, "baseImage")?;
        let steps = require(fields, "steps")?;

        let bytes = codec::decode_image_field(Some(base), "baseImage", self.validator.limits())?;
        let plan = self.validator.validate(steps)?;
        let output = self.output(fields, self.config.defaults.quality)?;

        let count = plan.len();
        tracing::debug!("Pipeline: {} step(s) -> {}", count, output.format);
        let encoded = self.run_plan(plan, bytes, output).await?;
        Ok(ResponseData::new(&encoded, output.format).with_steps(count))
    }

    /// `{ image, width, height, fit?, format?, quality? }`
    pub async fn resize(&self, body: &Value) -> PipelineResult<ResponseData> {
        let fields = as_object(body)?;
        let image = require(fields, "image")?;
        require(fields, "width")?;
        require(fields, "height")?;

        let bytes = codec::decode_image_field(Some(image), "image", self.validator.limits())?;
        let step = self.validator.validate_resize(fields)?;
        let output = self.output(fields, self.config.defaults.quality)?;

        let encoded = self.run_plan(Plan::new(vec![step]), bytes, output).await?;
        Ok(ResponseData::new(&encoded, output.format)
            .with_dimensions(encoded.width(), encoded.height()))
    }

    /// `{ image, text, format?, quality? }`
    pub async fn add_text(&self, body: &Value) -> PipelineResult<ResponseData> {
        let fields = as_object(body)?;
        let image = require(fields, "image")?;
        require(fields, "text")?;

        let bytes = codec::decode_image_field(Some(image), "image", self.validator.limits())?;
        let text = self.validator.validate_text(fields)?;
        let output = self.output(fields, self.config.defaults.quality)?;

        let plan = Plan::new(vec![PipelineStep::AddText(text)]);
        let encoded = self.run_plan(plan, bytes, output).await?;
        Ok(ResponseData::new(&encoded, output.format))
    }

    /// `{ baseImage, layers, format?, quality? }`
    pub async fn composite(&self, body: &Value) -> PipelineResult<ResponseData> {
        let fields = as_object(body)?;
        let base = require(fields, "baseImage")?;
        require(fields, "layers")?;

        let bytes = codec::decode_image_field(Some(base), "baseImage", self.validator.limits())?;
        let layers = self.validator.validate_layers(fields.get("layers"))?;
        let output = self.output(fields, self.config.defaults.quality)?;

        let count = layers.len();
        let plan = Plan::new(vec![PipelineStep::Composite { layers }]);
        let encoded = self.run_plan(plan, bytes, output).await?;
        Ok(ResponseData::new(&encoded, output.format).with_layers(count))
    }

    /// `{ title?, subtitle?, logo?, gradientColors?, width?, height?, format?, quality? }`
    pub async fn marketing(&self, body: &Value) -> PipelineResult<ResponseData> {
        let fields = as_object(body)?;
        let template = &self.config.template;
        let request = MarketingTemplate::parse(fields, &self.validator, template)?;
        let output = self.output(fields, template.quality)?;

        let encoded = run_with_deadline(
            async {
                let buffer = request.render(&self.executor, template).await?;
                self.executor.finish(buffer, output).await
            },
            self.config.limits.timeout_ms,
        )
        .await?;
        Ok(ResponseData::new(&encoded, output.format)
            .with_dimensions(encoded.width(), encoded.height()))
    }
}
