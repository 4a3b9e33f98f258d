//! Declarative transformation pipeline.
//!
//! - **step**: typed vocabulary (steps, plans, output descriptors)
//! - **validate**: untyped descriptors to a [`Plan`], all-or-nothing
//! - **executor**: folds a buffer through a plan via the raster adapter
//! - **deadline**: one wall-clock budget per request
//! - **template**: the marketing banner recipe
//! - **report**: response envelopes
//! - **processor**: the request entry points tying it together

pub mod deadline;
pub mod executor;
pub mod processor;
pub mod report;
pub mod step;
pub mod template;
pub mod validate;

// Re-exports for convenient access
pub use deadline::run_with_deadline;
pub use executor::{Execution, Executor};
pub use processor::{Operation, RequestProcessor};
pub use report::{Envelope, ErrorBody, Response, ResponseData};
pub use step::{
    Color, FitMode, Layer, OutputDescriptor, OutputFormat, PipelineStep, Plan, TextAlign,
    TextBaseline, TextSpec,
};
pub use template::MarketingTemplate;
pub use validate::{sanitize_text, StepValidator};
