//! Pipeline configuration
//!
//! One [`PipelineConfig`] parameterizes every stage. It can be built in code,
//! rooted at an arbitrary artifact directory, or loaded from YAML where
//! missing keys fall back to their defaults.

use crate::data::TARGET_COLUMN;
use crate::error::{Result, SeverityError};
use crate::synthetic::SAMPLING_STRATEGY_RANGE;
use crate::training::XGBoostConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// File names shared by the stages
pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";
pub const RESAMPLED_FILE: &str = "train_resampled.csv";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const RAW_DATA_FILE: &str = "RTA Dataset.csv";

/// Data transformation stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTransformationConfig {
    /// Directory receiving the split CSVs and the fitted preprocessor
    pub root_dir: PathBuf,
    /// Raw accident report CSV
    pub data_path: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Keep class proportions in both splits
    pub stratify: bool,
}

impl DataTransformationConfig {
    fn rooted_at(root: &Path) -> Self {
        Self {
            root_dir: root.join("data_transformation"),
            data_path: root.join("data_ingestion").join(RAW_DATA_FILE),
            test_size: 0.25,
            stratify: true,
        }
    }

    pub fn train_path(&self) -> PathBuf {
        self.root_dir.join(TRAIN_FILE)
    }

    pub fn test_path(&self) -> PathBuf {
        self.root_dir.join(TEST_FILE)
    }

    pub fn resampled_path(&self) -> PathBuf {
        self.root_dir.join(RESAMPLED_FILE)
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.root_dir.join(PREPROCESSOR_FILE)
    }
}

impl Default for DataTransformationConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("artifacts"))
    }
}

/// Minority oversampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImbalanceConfig {
    pub k_neighbors: usize,
    /// Every class is raised to this fraction of the majority count
    pub target_ratio: f64,
}

impl Default for ImbalanceConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            target_ratio: 1.0,
        }
    }
}

/// Model training stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTrainerConfig {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub model_name: String,
    pub target_column: String,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
}

impl ModelTrainerConfig {
    fn rooted_at(root: &Path) -> Self {
        let booster = XGBoostConfig::default();
        let transformation = root.join("data_transformation");
        Self {
            root_dir: root.join("model_trainer"),
            train_data_path: transformation.join(RESAMPLED_FILE),
            test_data_path: transformation.join(TEST_FILE),
            model_name: MODEL_FILE.to_string(),
            target_column: TARGET_COLUMN.to_string(),
            n_estimators: booster.n_estimators,
            max_depth: booster.max_depth,
            learning_rate: booster.learning_rate,
            reg_lambda: booster.reg_lambda,
            gamma: booster.gamma,
            min_child_weight: booster.min_child_weight,
            subsample: booster.subsample,
            colsample_bytree: booster.colsample_bytree,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.root_dir.join(&self.model_name)
    }

    /// Booster hyperparameters seeded with the pipeline seed
    pub fn xgboost_config(&self, random_state: u64) -> XGBoostConfig {
        XGBoostConfig {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            reg_alpha: 0.0,
            gamma: self.gamma,
            subsample: self.subsample,
            colsample_bytree: self.colsample_bytree,
            random_state: Some(random_state),
        }
    }
}

impl Default for ModelTrainerConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("artifacts"))
    }
}

/// Model evaluation stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEvaluationConfig {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    /// Full path of the metrics JSON
    pub metric_file_name: PathBuf,
    pub target_column: String,
}

impl ModelEvaluationConfig {
    fn rooted_at(root: &Path) -> Self {
        let eval_root = root.join("model_evaluation");
        Self {
            metric_file_name: eval_root.join(METRICS_FILE),
            root_dir: eval_root,
            test_data_path: root.join("data_transformation").join(TEST_FILE),
            model_path: root.join("model_trainer").join(MODEL_FILE),
            target_column: TARGET_COLUMN.to_string(),
        }
    }
}

impl Default for ModelEvaluationConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("artifacts"))
    }
}

/// Configuration for the whole training pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub artifacts_root: PathBuf,
    /// Seed for the split, the oversampler and the booster
    pub random_state: u64,
    pub data_transformation: DataTransformationConfig,
    pub imbalance: ImbalanceConfig,
    pub model_trainer: ModelTrainerConfig,
    pub model_evaluation: ModelEvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::rooted_at("artifacts")
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default layout with every stage directory under `root`
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            artifacts_root: root.to_path_buf(),
            random_state: 42,
            data_transformation: DataTransformationConfig::rooted_at(root),
            imbalance: ImbalanceConfig::default(),
            model_trainer: ModelTrainerConfig::rooted_at(root),
            model_evaluation: ModelEvaluationConfig::rooted_at(root),
        }
    }

    /// Builder method to set the raw data path
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_transformation.data_path = path.into();
        self
    }

    /// Builder method to set the pipeline seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the number of boosting rounds
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.model_trainer.n_estimators = n;
        self
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            SeverityError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject out-of-range settings
    pub fn validate(&self) -> Result<()> {
        let dt = &self.data_transformation;
        if !(dt.test_size > 0.0 && dt.test_size < 1.0) {
            return Err(invalid("data_transformation.test_size", "must be in (0, 1)"));
        }

        if self.imbalance.k_neighbors == 0 {
            return Err(invalid("imbalance.k_neighbors", "must be at least 1"));
        }
        let (min_ratio, max_ratio) = SAMPLING_STRATEGY_RANGE;
        let ratio = self.imbalance.target_ratio;
        if !(ratio >= min_ratio && ratio <= max_ratio) {
            return Err(invalid(
                "imbalance.target_ratio",
                &format!("must be in [{}, {}]", min_ratio, max_ratio),
            ));
        }

        let mt = &self.model_trainer;
        if mt.n_estimators == 0 {
            return Err(invalid("model_trainer.n_estimators", "must be at least 1"));
        }
        if mt.max_depth == 0 {
            return Err(invalid("model_trainer.max_depth", "must be at least 1"));
        }
        if !(mt.learning_rate > 0.0 && mt.learning_rate.is_finite()) {
            return Err(invalid("model_trainer.learning_rate", "must be positive"));
        }
        if mt.reg_lambda < 0.0 || mt.gamma < 0.0 || mt.min_child_weight < 0.0 {
            return Err(invalid(
                "model_trainer",
                "reg_lambda, gamma and min_child_weight must be non-negative",
            ));
        }
        if !(mt.subsample > 0.0 && mt.subsample <= 1.0) {
            return Err(invalid("model_trainer.subsample", "must be in (0, 1]"));
        }
        if !(mt.colsample_bytree > 0.0 && mt.colsample_bytree <= 1.0) {
            return Err(invalid("model_trainer.colsample_bytree", "must be in (0, 1]"));
        }
        if mt.model_name.trim().is_empty() {
            return Err(invalid("model_trainer.model_name", "must not be empty"));
        }
        if mt.target_column.is_empty() || self.model_evaluation.target_column.is_empty() {
            return Err(invalid("target_column", "must not be empty"));
        }

        Ok(())
    }

    /// Create the stage output directories
    pub fn create_directories(&self) -> Result<()> {
        for dir in [
            &self.artifacts_root,
            &self.data_transformation.root_dir,
            &self.model_trainer.root_dir,
            &self.model_evaluation.root_dir,
        ] {
            std::fs::create_dir_all(dir)?;
            info!("Created directory at: {}", dir.display());
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> SeverityError {
    SeverityError::ConfigError(format!("{} {}", key, reason))
}
