//! Inference over persisted artifacts
//!
//! [`SeverityPredictor`] loads the fitted preprocessor and the trained model
//! once and scores single records, in-memory frames, or CSV files.

mod engine;

pub use engine::{FeatureRecord, FieldValue, Prediction, SeverityPredictor};
