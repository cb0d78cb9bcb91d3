//! Accident severity - road accident severity classification
//!
//! This crate trains and serves a three-class severity model
//! (slight, serious, fatal injury) from accident report fields:
//! - Column renaming and target encoding
//! - Imputation, robust scaling and ordinal encoding
//! - SMOTE oversampling of the training split
//! - Multiclass gradient boosted trees
//! - Weighted F1 and accuracy evaluation
//!
//! # Modules
//!
//! ## Pipeline
//! - [`data`] - Canonical schema, target encoding, train/test split
//! - [`preprocessing`] - Fitted column preprocessor
//! - [`synthetic`] - Class-imbalance correction (SMOTE)
//! - [`training`] - Gradient boosted classifier and metrics
//! - [`pipeline`] - Stage runner over on-disk artifacts
//!
//! ## Serving
//! - [`inference`] - Predictor over the persisted preprocessor and model
//! - [`cli`] - Command-line interface
//!
//! ## Support
//! - [`config`] - Pipeline configuration (YAML)
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;
pub mod config;

// Pipeline modules
pub mod data;
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod pipeline;

// Serving
pub mod inference;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{Result, SeverityError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SeverityError};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::data::{ColumnRenamer, FeatureTargetSplitter, Severity, TrainTestSplitter};

    // Preprocessing
    pub use crate::preprocessing::{DataPreprocessor, PreprocessingConfig};

    // Synthetic data
    pub use crate::synthetic::{Sampler, SMOTE};

    // Training
    pub use crate::training::{MetricsRecord, TrainEngine, XGBoostConfig};

    // Pipeline
    pub use crate::pipeline::{PipelineReport, TrainingPipeline};

    // Inference
    pub use crate::inference::{FeatureRecord, Prediction, SeverityPredictor};
}
