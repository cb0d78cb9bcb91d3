//! Model training module
//!
//! Provides the severity classifier and its scoring:
//! - Multiclass XGBoost-style gradient boosted trees
//! - A training engine that owns the fitted model and its feature layout
//! - Accuracy and support-weighted F1

mod engine;
pub mod metrics;
pub mod xgboost;

pub use engine::TrainEngine;
pub use metrics::{accuracy, confusion_matrix, per_class_scores, weighted_f1, ClassScore, MetricsRecord};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
