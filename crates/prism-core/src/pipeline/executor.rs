//! Plan execution: folds the image buffer through each step in order.
//!
//! Every adapter call runs on the blocking pool. Steps are strictly
//! sequential; step *i+1* sees exactly the buffer step *i* produced. The first
//! failure stops the run and no later step starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult, RasterError};
use crate::raster::{ImageBuffer, RasterAdapter};

use super::step::{Color, OutputDescriptor, PipelineStep, Plan};
use super::validate::check_dimensions;

/// Result of running a plan.
#[derive(Debug)]
pub struct Execution {
    /// Buffer produced by the last step, still in intermediate encoding
    pub buffer: ImageBuffer,
    pub steps_executed: usize,
    pub elapsed: Duration,
}

/// Runs validated plans against a raster adapter.
pub struct Executor {
    raster: Arc<dyn RasterAdapter>,
    limits: LimitsConfig,
}

impl Executor {
    pub fn new(raster: Arc<dyn RasterAdapter>, limits: LimitsConfig) -> Self {
        Self { raster, limits }
    }

    /// Run `f` against the adapter on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&dyn RasterAdapter) -> Result<T, RasterError> + Send + 'static,
        T: Send + 'static,
    {
        let raster = Arc::clone(&self.raster);
        tokio::task::spawn_blocking(move || f(raster.as_ref()))
            .await
            .map_err(|e| RasterError::Aborted(e.to_string()))?
            .map_err(PipelineError::from)
    }

    /// Probe raw request bytes and wrap them as the initial buffer.
    pub async fn load(&self, bytes: Vec<u8>) -> PipelineResult<ImageBuffer> {
        self.blocking(move |raster| {
            let info = raster.decode(&bytes)?;
            Ok(ImageBuffer::new(bytes, info))
        })
        .await
    }

    /// Render a gradient canvas as a starting buffer.
    pub async fn gradient(
        &self,
        width: u32,
        height: u32,
        colors: Vec<Color>,
    ) -> PipelineResult<ImageBuffer> {
        check_dimensions(&self.limits, width, height)?;
        self.blocking(move |raster| raster.gradient(width, height, &colors))
            .await
    }

    /// Apply a single step, without index attribution.
    pub async fn apply(
        &self,
        step: PipelineStep,
        buffer: ImageBuffer,
    ) -> PipelineResult<ImageBuffer> {
        if let PipelineStep::Resize { width, height, .. } = &step {
            check_dimensions(&self.limits, *width, *height)?;
        }

        self.blocking(move |raster| match step {
            PipelineStep::Resize { width, height, fit } => {
                raster.resize(&buffer, width, height, fit)
            }
            PipelineStep::AddText(text) => raster.draw_text(&buffer, &text),
            PipelineStep::Composite { layers } => raster.composite(&buffer, &layers),
        })
        .await
    }

    /// Consume a plan, folding `initial` through every step.
    pub async fn execute(&self, plan: Plan, initial: ImageBuffer) -> PipelineResult<Execution> {
        self.run_steps(plan.into_steps(), initial).await
    }

    /// Fold `initial` through `steps`, attributing failures by index.
    async fn run_steps(
        &self,
        steps: Vec<PipelineStep>,
        initial: ImageBuffer,
    ) -> PipelineResult<Execution> {
        let start = Instant::now();
        let total = steps.len();
        tracing::debug!(
            "Executing {} step(s) on {}x{} {}",
            total,
            initial.width(),
            initial.height(),
            initial.info().format
        );

        let mut buffer = initial;
        for (index, step) in steps.into_iter().enumerate() {
            let step_start = Instant::now();
            let op = step.op();
            buffer = self
                .apply(step, buffer)
                .await
                .map_err(|e| e.at_step(index))?;
            tracing::trace!(
                "  Step {} ({}): {:?} -> {}x{}",
                index,
                op,
                step_start.elapsed(),
                buffer.width(),
                buffer.height()
            );
        }

        let elapsed = start.elapsed();
        tracing::debug!("Executed {} step(s) in {:?}", total, elapsed);
        Ok(Execution {
            buffer,
            steps_executed: total,
            elapsed,
        })
    }

    /// Encode the final buffer once, in the requested format.
    pub async fn finish(
        &self,
        buffer: ImageBuffer,
        output: OutputDescriptor,
    ) -> PipelineResult<ImageBuffer> {
        self.blocking(move |raster| raster.encode(&buffer, output))
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::{FitMode, Layer, OutputFormat, TextSpec};
    use crate::raster::image_raster::tests::{png_bytes, raster};
    use crate::raster::ImageInfo;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to the real adapter, sleeping before every resize.
    pub(crate) struct SlowRaster {
        pub(crate) delay: Duration,
        pub(crate) resizes: AtomicUsize,
    }

    impl SlowRaster {
        pub(crate) fn new(delay: Duration) -> Self {
            Self {
                delay,
                resizes: AtomicUsize::new(0),
            }
        }
    }

    impl RasterAdapter for SlowRaster {
        fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, RasterError> {
            raster().decode(bytes)
        }

        fn resize(
            &self,
            input: &ImageBuffer,
            width: u32,
            height: u32,
            fit: FitMode,
        ) -> Result<ImageBuffer, RasterError> {
            std::thread::sleep(self.delay);
            self.resizes.fetch_add(1, Ordering::SeqCst);
            raster().resize(input, width, height, fit)
        }

        fn composite(
            &self,
            base: &ImageBuffer,
            layers: &[Layer],
        ) -> Result<ImageBuffer, RasterError> {
            raster().composite(base, layers)
        }

        fn draw_text(
            &self,
            input: &ImageBuffer,
            text: &TextSpec,
        ) -> Result<ImageBuffer, RasterError> {
            raster().draw_text(input, text)
        }

        fn gradient(
            &self,
            width: u32,
            height: u32,
            colors: &[Color],
        ) -> Result<ImageBuffer, RasterError> {
            raster().gradient(width, height, colors)
        }

        fn encode(
            &self,
            input: &ImageBuffer,
            output: OutputDescriptor,
        ) -> Result<ImageBuffer, RasterError> {
            raster().encode(input, output)
        }
    }

    /// Delegates to the real adapter, but every text draw fails.
    pub(crate) struct BrokenTextRaster;

    impl RasterAdapter for BrokenTextRaster {
        fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, RasterError> {
            raster().decode(bytes)
        }

        fn resize(
            &self,
            input: &ImageBuffer,
            width: u32,
            height: u32,
            fit: FitMode,
        ) -> Result<ImageBuffer, RasterError> {
            raster().resize(input, width, height, fit)
        }

        fn composite(
            &self,
            base: &ImageBuffer,
            layers: &[Layer],
        ) -> Result<ImageBuffer, RasterError> {
            raster().composite(base, layers)
        }

        fn draw_text(&self, _: &ImageBuffer, _: &TextSpec) -> Result<ImageBuffer, RasterError> {
            Err(RasterError::Text("font engine unavailable".to_string()))
        }

        fn gradient(
            &self,
            width: u32,
            height: u32,
            colors: &[Color],
        ) -> Result<ImageBuffer, RasterError> {
            raster().gradient(width, height, colors)
        }

        fn encode(
            &self,
            input: &ImageBuffer,
            output: OutputDescriptor,
        ) -> Result<ImageBuffer, RasterError> {
            raster().encode(input, output)
        }
    }

    fn executor() -> Executor {
        Executor::new(Arc::new(raster()), LimitsConfig::default())
    }

    fn text(s: &str) -> TextSpec {
        TextSpec {
            text: s.to_string(),
            x: 5.0,
            y: 5.0,
            font_size: 16.0,
            font_family: "Roboto-Regular".to_string(),
            color: Color {
                r: 255,
                g: 255,
                b: 255,
                a: 255,
            },
            align: Default::default(),
            baseline: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_steps_fold_in_order() {
        let exec = executor();
        let initial = exec
            .load(png_bytes(&DynamicImage::new_rgb8(400, 400)))
            .await
            .unwrap();
        let plan = Plan::new(vec![
            PipelineStep::Resize {
                width: 200,
                height: 200,
                fit: FitMode::Cover,
            },
            PipelineStep::AddText(text("Hi")),
            PipelineStep::Resize {
                width: 100,
                height: 50,
                fit: FitMode::Fill,
            },
        ]);

        let run = exec.execute(plan, initial).await.unwrap();
        assert_eq!(run.steps_executed, 3);
        assert_eq!((run.buffer.width(), run.buffer.height()), (100, 50));

        let out = exec
            .finish(
                run.buffer,
                OutputDescriptor {
                    format: OutputFormat::Jpeg,
                    quality: 85,
                },
            )
            .await
            .unwrap();
        assert_eq!(out.info().format, "jpeg");
        assert_eq!(&out.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let err = executor().load(b"nope".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingError);
    }

    #[tokio::test]
    async fn test_failure_is_attributed_and_stops_run() {
        let exec = Executor::new(Arc::new(BrokenTextRaster), LimitsConfig::default());
        let initial = exec
            .load(png_bytes(&DynamicImage::new_rgb8(64, 64)))
            .await
            .unwrap();
        let steps = vec![
            PipelineStep::Resize {
                width: 32,
                height: 32,
                fit: FitMode::Fill,
            },
            PipelineStep::AddText(text("boom")),
            PipelineStep::Resize {
                width: 16,
                height: 16,
                fit: FitMode::Fill,
            },
        ];

        let err = exec.run_steps(steps, initial).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingError);
        assert_eq!(err.step_index(), Some(1));
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn test_resize_bounds_rechecked() {
        let exec = executor();
        let initial = exec
            .load(png_bytes(&DynamicImage::new_rgb8(64, 64)))
            .await
            .unwrap();
        let steps = vec![PipelineStep::Resize {
            width: 5,
            height: 64,
            fit: FitMode::Fill,
        }];
        let err = exec.run_steps(steps, initial).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);
        assert_eq!(err.step_index(), Some(0));
    }

    #[tokio::test]
    async fn test_corrupt_layer_is_processing_error() {
        let exec = executor();
        let initial = exec
            .load(png_bytes(&DynamicImage::new_rgb8(64, 64)))
            .await
            .unwrap();
        let steps = vec![PipelineStep::Composite {
            layers: vec![Layer {
                image: b"garbage".to_vec(),
                x: 0,
                y: 0,
            }],
        }];
        let err = exec.run_steps(steps, initial).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingError);
        assert_eq!(err.step_index(), Some(0));
    }

    #[tokio::test]
    async fn test_empty_step_list_passes_through() {
        let exec = executor();
        let initial = exec
            .load(png_bytes(&DynamicImage::new_rgb8(20, 30)))
            .await
            .unwrap();
        let run = exec.run_steps(Vec::new(), initial).await.unwrap();
        assert_eq!(run.steps_executed, 0);
        assert_eq!((run.buffer.width(), run.buffer.height()), (20, 30));
    }
}
