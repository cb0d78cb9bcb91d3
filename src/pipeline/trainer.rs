//! Model training stage

use crate::config::{ModelTrainerConfig, PipelineConfig};
use crate::error::{Result, SeverityError};
use crate::training::TrainEngine;
use crate::utils::DataLoader;
use tracing::info;

/// Fits the booster on the resampled training split and persists it
pub struct ModelTrainer {
    config: ModelTrainerConfig,
    random_state: u64,
}

impl ModelTrainer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.model_trainer.clone(),
            random_state: config.random_state,
        }
    }

    pub fn train(&self) -> Result<TrainEngine> {
        let loader = DataLoader::new();
        let train_data = loader.load_csv(&self.config.train_data_path)?;

        // Both splits come from the same preprocessor, so their headers must agree
        if self.config.test_data_path.exists() {
            let test_data = loader.load_csv(&self.config.test_data_path)?;
            if test_data.get_column_names() != train_data.get_column_names() {
                return Err(SeverityError::SchemaError(format!(
                    "train and test columns differ: {} vs {}",
                    self.config.train_data_path.display(),
                    self.config.test_data_path.display()
                )));
            }
        }

        let mut engine = TrainEngine::new(self.config.xgboost_config(self.random_state));
        engine.fit_frame(&train_data, &self.config.target_column)?;

        let top: Vec<String> = engine
            .ranked_importances()
            .into_iter()
            .take(5)
            .map(|(name, score)| format!("{}={:.3}", name, score))
            .collect();
        info!("Top features: {}", top.join(", "));

        let model_path = self.config.model_path();
        engine.save(&model_path)?;
        info!("Model saved to {}", model_path.display());

        Ok(engine)
    }
}
