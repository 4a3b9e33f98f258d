//! Response envelopes.
//!
//! Every request ends in exactly one [`Response`]: either
//! `{ "success": true, "data": {...} }` with status 200, or
//! `{ "success": false, "error": { "code", "message" } }` with the status of
//! the error class.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{PipelineError, PipelineResult};
use crate::raster::ImageBuffer;

use super::step::OutputFormat;

/// Payload of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// `data:<mime>;base64,...`
    pub image: String,
    pub format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_executed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers_count: Option<usize>,
}

impl ResponseData {
    /// Wrap a final buffer as a data URI of `format`.
    pub fn new(buffer: &ImageBuffer, format: OutputFormat) -> Self {
        Self {
            image: codec::encode_data_uri(buffer.bytes(), format),
            format,
            width: None,
            height: None,
            steps_executed: None,
            layers_count: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps_executed = Some(steps);
        self
    }

    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers_count = Some(layers);
        self
    }
}

/// Error payload: a stable code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// An envelope plus the status it is delivered with.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Envelope,
}

impl Response {
    pub fn success(data: ResponseData) -> Self {
        Self {
            status: 200,
            body: Envelope {
                success: true,
                data: Some(data),
                error: None,
            },
        }
    }

    /// Map an error to its envelope and status.
    ///
    /// Server-side failures are logged at `error`, client errors at `debug`.
    pub fn failure(err: &PipelineError) -> Self {
        let status = err.status();
        if status >= 500 {
            tracing::error!("{} ({}): {}", err.code(), status, err);
        } else {
            tracing::debug!("{} ({}): {}", err.code(), status, err);
        }
        Self {
            status,
            body: Envelope {
                success: false,
                data: None,
                error: Some(ErrorBody {
                    code: err.code().to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }

    pub fn from_result(result: PipelineResult<ResponseData>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterError;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let data = ResponseData {
            image: "data:image/png;base64,AAAA".to_string(),
            format: OutputFormat::Png,
            width: None,
            height: None,
            steps_executed: None,
            layers_count: None,
        }
        .with_steps(3);
        let response = Response::success(data);
        assert_eq!(response.status, 200);
        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({
                "success": true,
                "data": {
                    "image": "data:image/png;base64,AAAA",
                    "format": "png",
                    "stepsExecuted": 3
                }
            })
        );
    }

    #[test]
    fn test_failure_shape() {
        let err = PipelineError::Processing(RasterError::Text("no font".into())).at_step(1);
        let response = Response::failure(&err);
        assert_eq!(response.status, 500);
        let value = serde_json::to_value(&response.body).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["code"], json!("PROCESSING_ERROR"));
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Step 1: "));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_too_large_is_413() {
        let err = PipelineError::ImageTooLarge {
            size_bytes: 10,
            max_bytes: 5,
        };
        assert_eq!(Response::failure(&err).status, 413);
    }
}
