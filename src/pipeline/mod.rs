//! Stage runner
//!
//! Each stage reads its inputs from disk and writes its outputs to the
//! artifact layout of [`PipelineConfig`], so stages can run together or one
//! at a time:
//!
//! 1. Data transformation: `train.csv`, `test.csv`, `train_resampled.csv`,
//!    `preprocessor.json`
//! 2. Model trainer: `model.json`
//! 3. Model evaluation: `metrics.json`

mod evaluation;
mod trainer;
mod transformation;

pub use evaluation::ModelEvaluation;
pub use trainer::ModelTrainer;
pub use transformation::{DataTransformation, TransformationArtifacts};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::training::MetricsRecord;
use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{error, info};

pub const STAGE_TRANSFORMATION: &str = "Data Transformation";
pub const STAGE_TRAINER: &str = "Model Trainer";
pub const STAGE_EVALUATION: &str = "Model Evaluation";

/// Outcome of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub artifacts: TransformationArtifacts,
    pub metrics: MetricsRecord,
    pub elapsed_secs: f64,
}

/// Runs the stages in order against one configuration
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on the configured raw CSV
    pub fn run(&self) -> Result<PipelineReport> {
        self.prepare()?;
        let start = Instant::now();
        let artifacts = self.run_transformation()?;
        self.finish(artifacts, start)
    }

    /// Run every stage on an in-memory raw frame
    pub fn run_frame(&self, raw: &DataFrame) -> Result<PipelineReport> {
        self.prepare()?;
        let start = Instant::now();
        let artifacts = run_stage(STAGE_TRANSFORMATION, || {
            DataTransformation::new(&self.config).run_frame(raw)
        })?;
        self.finish(artifacts, start)
    }

    pub fn run_transformation(&self) -> Result<TransformationArtifacts> {
        self.prepare()?;
        run_stage(STAGE_TRANSFORMATION, || {
            DataTransformation::new(&self.config).run()
        })
    }

    pub fn run_training(&self) -> Result<()> {
        self.prepare()?;
        run_stage(STAGE_TRAINER, || {
            ModelTrainer::new(&self.config).train().map(|_| ())
        })
    }

    pub fn run_evaluation(&self) -> Result<MetricsRecord> {
        self.prepare()?;
        run_stage(STAGE_EVALUATION, || {
            ModelEvaluation::new(&self.config).evaluate_model()
        })
    }

    fn prepare(&self) -> Result<()> {
        self.config.validate()?;
        self.config.create_directories()
    }

    fn finish(&self, artifacts: TransformationArtifacts, start: Instant) -> Result<PipelineReport> {
        self.run_training()?;
        let metrics = self.run_evaluation()?;
        Ok(PipelineReport {
            artifacts,
            metrics,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Wrap a stage with start/finish logging; failures are logged and returned
pub fn run_stage<T>(name: &str, stage: impl FnOnce() -> Result<T>) -> Result<T> {
    info!(">>>> Stage {} Started <<<<", name);
    match stage() {
        Ok(out) => {
            info!(">>>> Stage {} Completed <<<<\n\nx==========x", name);
            Ok(out)
        }
        Err(e) => {
            error!("Stage {} failed: {}", name, e);
            Err(e)
        }
    }
}
