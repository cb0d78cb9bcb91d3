//! Training engine implementation

use super::metrics::MetricsRecord;
use super::xgboost::{XGBoostClassifier, XGBoostConfig};
use crate::data::{FeatureTargetSplitter, Severity};
use crate::error::{Result, SeverityError};
use crate::utils::frame_to_matrix;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Fitted severity model together with the feature layout it expects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainEngine {
    config: XGBoostConfig,
    feature_names: Vec<String>,
    model: Option<XGBoostClassifier>,
    training_time_secs: Option<f64>,
    n_samples: usize,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            feature_names: Vec::new(),
            model: None,
            training_time_secs: None,
            n_samples: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Fit on an encoded matrix whose columns are named by `feature_names`
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<i64>,
        feature_names: Vec<String>,
    ) -> Result<&mut Self> {
        if feature_names.len() != x.ncols() {
            return Err(SeverityError::TrainingError(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                x.ncols()
            )));
        }

        let start = Instant::now();
        let mut model = XGBoostClassifier::new(self.config.clone(), Severity::N_CLASSES);
        model.fit(x, y)?;

        self.training_time_secs = Some(start.elapsed().as_secs_f64());
        self.n_samples = x.nrows();
        self.feature_names = feature_names;
        self.model = Some(model);

        info!(
            rows = x.nrows(),
            features = x.ncols(),
            rounds = self.config.n_estimators,
            secs = self.training_time_secs.unwrap_or_default(),
            "Trained gradient boosted classifier"
        );
        Ok(self)
    }

    /// Fit on an encoded frame: every column but `target_column` is a feature
    pub fn fit_frame(&mut self, df: &DataFrame, target_column: &str) -> Result<&mut Self> {
        let (x, y, names) = Self::split_encoded_frame(df, target_column)?;
        self.fit(&x, &y, names)
    }

    /// Most probable class code per row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        self.model()?.predict(x)
    }

    /// Class probabilities per row, columns in class-code order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.model()?.predict_proba(x)
    }

    /// Predict on an encoded frame, reading the fitted feature columns by name
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<i64>> {
        let x = frame_to_matrix(df, &self.feature_names)?;
        self.predict(&x)
    }

    /// Score on an encoded frame that carries the target column
    pub fn evaluate_frame(&self, df: &DataFrame, target_column: &str) -> Result<MetricsRecord> {
        let (features, y_true) = FeatureTargetSplitter::new(target_column).split_encoded(df)?;
        let y_pred = self.predict_frame(&features)?;
        MetricsRecord::compute(&y_true, &y_pred, Severity::N_CLASSES)
    }

    /// Get feature names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature names paired with split-count importance, most important first
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let Some(importances) = self.model.as_ref().and_then(|m| m.feature_importances()) else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn training_time_secs(&self) -> Option<f64> {
        self.training_time_secs
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Save the engine to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved model");
        Ok(())
    }

    /// Load an engine from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let engine: Self = serde_json::from_str(&json)?;
        Ok(engine)
    }

    fn model(&self) -> Result<&XGBoostClassifier> {
        self.model.as_ref().ok_or_else(|| {
            SeverityError::StateError("model must be trained before predicting".to_string())
        })
    }

    /// Split an encoded artifact frame into matrix, target and feature names
    fn split_encoded_frame(
        df: &DataFrame,
        target_column: &str,
    ) -> Result<(Array2<f64>, Array1<i64>, Vec<String>)> {
        let (features, y) = FeatureTargetSplitter::new(target_column).split_encoded(df)?;
        let names: Vec<String> = features
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        let x = frame_to_matrix(&features, &names)?;
        Ok((x, y, names))
    }
}

impl Default for TrainEngine {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}
