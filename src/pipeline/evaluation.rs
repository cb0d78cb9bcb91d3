//! Model evaluation stage

use crate::config::{ModelEvaluationConfig, PipelineConfig};
use crate::error::Result;
use crate::training::{MetricsRecord, TrainEngine};
use crate::utils::DataLoader;
use tracing::info;

/// Scores the persisted model on the held-out split
pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
}

impl ModelEvaluation {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.model_evaluation.clone(),
        }
    }

    pub fn evaluate_model(&self) -> Result<MetricsRecord> {
        let test_data = DataLoader::new().load_csv(&self.config.test_data_path)?;
        let engine = TrainEngine::load(&self.config.model_path)?;

        let metrics = engine.evaluate_frame(&test_data, &self.config.target_column)?;
        metrics.save(&self.config.metric_file_name)?;

        info!(
            f1_score = metrics.f1_score,
            accuracy_score = metrics.accuracy_score,
            "Metrics written to {}",
            self.config.metric_file_name.display()
        );
        Ok(metrics)
    }
}
