//! Severity predictor
//!
//! Routes raw feature records through the persisted preprocessor and model.
//! Both artifacts are loaded once and shared behind `Arc`, so a predictor can
//! be cloned cheaply into any front-end.

use crate::config::PipelineConfig;
use crate::data::{ColumnRenamer, Severity, TARGET_COLUMN};
use crate::error::{Result, SeverityError};
use crate::preprocessing::{ColumnType, DataPreprocessor};
use crate::training::TrainEngine;
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A single field value supplied by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{}", *v as i64),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One accident report to score, keyed by canonical column name.
/// Fields left out are treated as missing and imputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse `name=value` pairs; values stay text until matched to a column type
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut record = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                SeverityError::SchemaError(format!("expected name=value, got '{}'", pair))
            })?;
            record.insert(name.trim(), value.trim());
        }
        Ok(record)
    }
}

/// Predicted class with its probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub severity: Severity,
    /// Probability per class, indexed by class code
    pub probabilities: Vec<f64>,
}

impl Prediction {
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.severity.code() as usize)
            .copied()
            .unwrap_or_default()
    }
}

/// Scores accident reports with a fitted preprocessor and model
#[derive(Debug, Clone)]
pub struct SeverityPredictor {
    preprocessor: Arc<DataPreprocessor>,
    model: Arc<TrainEngine>,
}

impl SeverityPredictor {
    /// Pair a fitted preprocessor with a model trained on its output
    pub fn new(preprocessor: DataPreprocessor, model: TrainEngine) -> Result<Self> {
        if !preprocessor.is_fitted() {
            return Err(SeverityError::StateError(
                "preprocessor must be fitted".to_string(),
            ));
        }
        if !model.is_fitted() {
            return Err(SeverityError::StateError("model must be trained".to_string()));
        }
        if preprocessor.output_columns() != model.feature_names() {
            return Err(SeverityError::SchemaError(
                "model features do not match the preprocessor output columns".to_string(),
            ));
        }

        Ok(Self {
            preprocessor: Arc::new(preprocessor),
            model: Arc::new(model),
        })
    }

    /// Load both artifacts from disk
    pub fn from_paths(
        preprocessor_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let preprocessor = DataPreprocessor::load(preprocessor_path.as_ref())?;
        let model = TrainEngine::load(model_path.as_ref())?;
        info!(
            preprocessor = %preprocessor_path.as_ref().display(),
            model = %model_path.as_ref().display(),
            "Loaded prediction artifacts"
        );
        Self::new(preprocessor, model)
    }

    /// Load the artifacts a pipeline run wrote under `config`
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::from_paths(
            config.data_transformation.preprocessor_path(),
            config.model_trainer.model_path(),
        )
    }

    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainEngine {
        &self.model
    }

    /// Columns the preprocessor reads, in output order
    pub fn expected_fields(&self) -> Vec<String> {
        self.preprocessor.output_columns()
    }

    /// Build a one-row frame; absent fields become nulls
    pub fn record_to_frame(&self, record: &FeatureRecord) -> Result<DataFrame> {
        let expected = self.expected_fields();
        if let Some(unknown) = record.fields.keys().find(|k| !expected.contains(k)) {
            return Err(SeverityError::SchemaError(format!(
                "unknown field '{}'",
                unknown
            )));
        }

        let mut columns = Vec::with_capacity(expected.len());
        for name in &expected {
            let value = record.get(name);
            let column = match self.preprocessor.column_type(name) {
                Some(ColumnType::Numeric) => {
                    let number = match value {
                        None => None,
                        Some(FieldValue::Number(v)) => Some(*v),
                        Some(FieldValue::Text(s)) if s.trim().is_empty() => None,
                        Some(FieldValue::Text(s)) => Some(s.trim().parse::<f64>().map_err(|_| {
                            SeverityError::SchemaError(format!(
                                "field '{}' must be numeric, got '{}'",
                                name, s
                            ))
                        })?),
                    };
                    Column::new(name.as_str().into(), [number])
                }
                _ => {
                    let text = value.map(|v| v.to_string());
                    Column::new(name.as_str().into(), [text])
                }
            };
            columns.push(column);
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Predict the severity of one record
    pub fn predict_record(&self, record: &FeatureRecord) -> Result<Prediction> {
        let probabilities = self.predict_proba_record(record)?;
        Ok(Self::to_prediction(probabilities))
    }

    /// Class probabilities of one record, indexed by class code
    pub fn predict_proba_record(&self, record: &FeatureRecord) -> Result<Vec<f64>> {
        let frame = self.record_to_frame(record)?;
        let proba = self.proba_for_features(&frame)?;
        Ok(proba.row(0).to_vec())
    }

    /// Predict every row of a frame.
    ///
    /// Raw report headers are renamed; a target column, if present, is ignored.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        let start = Instant::now();
        let mut features = ColumnRenamer::new().lenient().rename(df)?;
        if features.get_column_index(TARGET_COLUMN).is_some() {
            features = features.drop(TARGET_COLUMN)?;
        }

        let proba = self.proba_for_features(&features)?;
        let predictions: Vec<Prediction> = proba
            .axis_iter(Axis(0))
            .map(|row| Self::to_prediction(row.to_vec()))
            .collect();

        debug!(
            rows = predictions.len(),
            ms = start.elapsed().as_secs_f64() * 1000.0,
            "Predicted batch"
        );
        Ok(predictions)
    }

    /// Score a CSV and write it back with `predicted_severity` and
    /// `confidence` columns appended. Returns the row count.
    pub fn predict_csv(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<usize> {
        let mut df = DataLoader::new().load_csv(input)?;
        let predictions = self.predict_frame(&df)?;

        let labels: Vec<&str> = predictions.iter().map(|p| p.severity.label()).collect();
        let confidence: Vec<f64> = predictions.iter().map(Prediction::confidence).collect();
        df.with_column(Column::new("predicted_severity".into(), labels))?;
        df.with_column(Column::new("confidence".into(), confidence))?;

        DataSaver::save_csv(&mut df, output.as_ref())?;
        info!(rows = predictions.len(), output = %output.as_ref().display(), "Wrote predictions");
        Ok(predictions.len())
    }

    fn proba_for_features(&self, features: &DataFrame) -> Result<Array2<f64>> {
        let x = self.preprocessor.transform(features)?;
        self.model.predict_proba(&x)
    }

    fn to_prediction(probabilities: Vec<f64>) -> Prediction {
        let mut best = 0usize;
        for (c, &p) in probabilities.iter().enumerate() {
            if p > probabilities[best] {
                best = c;
            }
        }
        Prediction {
            severity: Severity::from_code(best as i64).unwrap_or(Severity::Slight),
            probabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::XGBoostConfig;

    fn fitted_predictor() -> SeverityPredictor {
        let n = 40;
        let features = df!(
            "casualties" => (0..n).map(|i| (i % 4) as f64 + 1.0).collect::<Vec<_>>(),
            "driver_age" => (0..n).map(|i| if i % 4 == 0 { "18-30" } else { "31-50" }).collect::<Vec<_>>(),
            "light_condition" => (0..n).map(|i| if i < 30 { "Daylight" } else { "Darkness" }).collect::<Vec<_>>()
        )
        .unwrap();
        let y = ndarray::Array1::from_iter((0..n).map(|i| if i < 30 { 0 } else if i < 36 { 1 } else { 2 }));

        let mut preprocessor = DataPreprocessor::new();
        let x = preprocessor.fit_transform(&features).unwrap();

        let mut model = TrainEngine::new(XGBoostConfig {
            n_estimators: 15,
            max_depth: 3,
            ..Default::default()
        });
        model.fit(&x, &y, preprocessor.output_columns()).unwrap();

        SeverityPredictor::new(preprocessor, model).unwrap()
    }

    #[test]
    fn test_predict_record() {
        let predictor = fitted_predictor();
        let record = FeatureRecord::new()
            .with("casualties", 2.0)
            .with("driver_age", "31-50")
            .with("light_condition", "Daylight");

        let prediction = predictor.predict_record(&record).unwrap();
        assert_eq!(prediction.probabilities.len(), Severity::N_CLASSES);
        assert!((prediction.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(prediction.confidence() >= 1.0 / 3.0);
    }

    #[test]
    fn test_missing_fields_are_imputed() {
        let predictor = fitted_predictor();
        let record = FeatureRecord::new().with("driver_age", "18-30");
        assert!(predictor.predict_record(&record).is_ok());
        assert!(predictor.predict_record(&FeatureRecord::new()).is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let predictor = fitted_predictor();
        let record = FeatureRecord::new().with("wind_speed", 3.0);
        let err = predictor.predict_record(&record).unwrap_err();
        assert!(matches!(err, SeverityError::SchemaError(_)));
    }

    #[test]
    fn test_unseen_category_rejected() {
        let predictor = fitted_predictor();
        let record = FeatureRecord::new().with("light_condition", "Fog");
        let err = predictor.predict_record(&record).unwrap_err();
        assert!(matches!(err, SeverityError::UnseenCategory { .. }));
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        let predictor = fitted_predictor();
        let parsed = FeatureRecord::from_pairs(&["casualties=3", "driver_age = 18-30"]).unwrap();
        let typed = FeatureRecord::new().with("casualties", 3i64).with("driver_age", "18-30");
        assert_eq!(
            predictor.predict_proba_record(&parsed).unwrap(),
            predictor.predict_proba_record(&typed).unwrap()
        );

        let bad = FeatureRecord::from_pairs(&["casualties=many"]).unwrap();
        assert!(matches!(
            predictor.predict_record(&bad),
            Err(SeverityError::SchemaError(_))
        ));
        assert!(FeatureRecord::from_pairs(&["casualties"]).is_err());
    }

    #[test]
    fn test_predict_frame_matches_records() {
        let predictor = fitted_predictor();
        let raw = df!(
            "Number_of_casualties" => &[1.0, 4.0],
            "Age_band_of_driver" => &["18-30", "31-50"],
            "Light_conditions" => &["Darkness", "Daylight"],
            "Accident_severity" => &["Fatal injury", "Slight Injury"]
        )
        .unwrap();

        let batch = predictor.predict_frame(&raw).unwrap();
        assert_eq!(batch.len(), 2);

        let single = predictor
            .predict_record(
                &FeatureRecord::new()
                    .with("casualties", 4.0)
                    .with("driver_age", "31-50")
                    .with("light_condition", "Daylight"),
            )
            .unwrap();
        assert_eq!(batch[1], single);
    }

    #[test]
    fn test_mismatched_artifacts() {
        let predictor = fitted_predictor();
        let mut model = TrainEngine::new(XGBoostConfig {
            n_estimators: 2,
            ..Default::default()
        });
        let x = Array2::from_shape_fn((6, 1), |(i, _)| i as f64);
        let y = ndarray::Array1::from_vec(vec![0, 0, 1, 1, 2, 2]);
        model.fit(&x, &y, vec!["casualties".to_string()]).unwrap();

        let err = SeverityPredictor::new(predictor.preprocessor().clone(), model).unwrap_err();
        assert!(matches!(err, SeverityError::SchemaError(_)));
    }

    #[test]
    fn test_predict_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports.csv");
        let output = dir.path().join("out").join("predictions.csv");
        std::fs::write(
            &input,
            "casualties,driver_age,light_condition\n1,18-30,Daylight\n3,31-50,Darkness\n",
        )
        .unwrap();

        let predictor = fitted_predictor();
        assert_eq!(predictor.predict_csv(&input, &output).unwrap(), 2);

        let written = DataLoader::new().load_csv(&output).unwrap();
        assert_eq!(written.height(), 2);
        assert!(written.column("predicted_severity").is_ok());
        assert!(written.column("confidence").is_ok());
    }
}
