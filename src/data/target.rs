//! Severity target encoding

use crate::error::{Result, SeverityError};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accident severity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Slight,
    Serious,
    Fatal,
}

impl Severity {
    /// All classes in code order
    pub const ALL: [Severity; 3] = [Severity::Slight, Severity::Serious, Severity::Fatal];

    /// Number of target classes
    pub const N_CLASSES: usize = 3;

    /// Report label as it appears in the source data
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Slight => "Slight Injury",
            Severity::Serious => "Serious Injury",
            Severity::Fatal => "Fatal injury",
        }
    }

    /// Integer code used by the model
    pub fn code(&self) -> i64 {
        match self {
            Severity::Slight => 0,
            Severity::Serious => 1,
            Severity::Fatal => 2,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Separates the target column from the features and encodes it
#[derive(Debug, Clone)]
pub struct FeatureTargetSplitter {
    target_column: String,
}

impl FeatureTargetSplitter {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
        }
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Split a canonical frame whose target holds report labels.
    ///
    /// Every label must be one of the three known strings; anything else,
    /// including a missing value, is rejected.
    pub fn split(&self, df: &DataFrame) -> Result<(DataFrame, Array1<i64>)> {
        let series = self.target_series(df)?;
        let labels = series.str().map_err(|_| {
            SeverityError::SchemaError(format!(
                "target column '{}' must hold string labels, found {}",
                self.target_column,
                series.dtype()
            ))
        })?;

        let mut codes = Vec::with_capacity(labels.len());
        for (row, value) in labels.into_iter().enumerate() {
            let severity = value.and_then(Severity::from_label).ok_or_else(|| {
                SeverityError::UnknownLabel {
                    label: value.unwrap_or("<missing>").to_string(),
                    row,
                }
            })?;
            codes.push(severity.code());
        }

        let features = df.drop(&self.target_column)?;
        Ok((features, Array1::from_vec(codes)))
    }

    /// Split a frame whose target already holds integer codes (the CSV
    /// artifacts written by the transformation stage).
    pub fn split_encoded(&self, df: &DataFrame) -> Result<(DataFrame, Array1<i64>)> {
        let series = self.target_series(df)?;
        // Fractional codes must not truncate onto a valid class
        let casted = series.cast(&DataType::Float64)?;
        let values = casted.f64()?;

        let mut codes = Vec::with_capacity(values.len());
        for (row, value) in values.into_iter().enumerate() {
            let code = value
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i64);
            match code.and_then(Severity::from_code) {
                Some(severity) => codes.push(severity.code()),
                None => {
                    let label = series
                        .get(row)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|_| "<missing>".to_string());
                    return Err(SeverityError::UnknownLabel { label, row });
                }
            }
        }

        let features = df.drop(&self.target_column)?;
        Ok((features, Array1::from_vec(codes)))
    }

    fn target_series<'a>(&self, df: &'a DataFrame) -> Result<&'a Series> {
        df.column(&self.target_column)
            .map(|c| c.as_materialized_series())
            .map_err(|_| {
                SeverityError::SchemaError(format!(
                    "target column '{}' is missing",
                    self.target_column
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_is_bijective() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_label(severity.label()), Some(severity));
            assert_eq!(Severity::from_code(severity.code()), Some(severity));
        }
        let codes: Vec<i64> = Severity::ALL.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![0, 1, 2]);
        // Label matching is exact, including case
        assert_eq!(Severity::from_label("Fatal Injury"), None);
    }

    #[test]
    fn test_split_encodes_target() {
        let df = df!(
            "casualties" => &[1i64, 2, 3],
            "accident_severity" => &["Slight Injury", "Serious Injury", "Fatal injury"]
        )
        .unwrap();

        let (features, target) = FeatureTargetSplitter::new("accident_severity")
            .split(&df)
            .unwrap();

        assert_eq!(features.width(), 1);
        assert!(features.column("accident_severity").is_err());
        assert_eq!(target.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let df = df!(
            "casualties" => &[1i64, 2],
            "accident_severity" => &["Slight Injury", "Minor Injury"]
        )
        .unwrap();

        let err = FeatureTargetSplitter::new("accident_severity").split(&df).unwrap_err();
        match err {
            SeverityError::UnknownLabel { label, row } => {
                assert_eq!(label, "Minor Injury");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_label_is_rejected() {
        let df = df!(
            "casualties" => &[1i64, 2],
            "accident_severity" => &[Some("Slight Injury"), None]
        )
        .unwrap();

        let err = FeatureTargetSplitter::new("accident_severity").split(&df).unwrap_err();
        assert!(matches!(err, SeverityError::UnknownLabel { row: 1, .. }));
    }

    #[test]
    fn test_split_encoded_validates_codes() {
        let df = df!(
            "f" => &[0.5, 0.1, 0.2],
            "accident_severity" => &[0i64, 2, 1]
        )
        .unwrap();
        let (_, target) = FeatureTargetSplitter::new("accident_severity")
            .split_encoded(&df)
            .unwrap();
        assert_eq!(target.to_vec(), vec![0, 2, 1]);

        let bad = df!(
            "f" => &[0.5],
            "accident_severity" => &[7i64]
        )
        .unwrap();
        let err = FeatureTargetSplitter::new("accident_severity")
            .split_encoded(&bad)
            .unwrap_err();
        assert!(matches!(err, SeverityError::UnknownLabel { .. }));
    }

    #[test]
    fn test_split_encoded_rejects_fractional_codes() {
        let df = df!(
            "f" => &[0.5, 0.1],
            "accident_severity" => &[0.0, 1.7]
        )
        .unwrap();
        let err = FeatureTargetSplitter::new("accident_severity")
            .split_encoded(&df)
            .unwrap_err();
        assert!(matches!(err, SeverityError::UnknownLabel { row: 1, .. }));

        let whole = df!(
            "f" => &[0.5, 0.1],
            "accident_severity" => &[2.0, 1.0]
        )
        .unwrap();
        let (_, target) = FeatureTargetSplitter::new("accident_severity")
            .split_encoded(&whole)
            .unwrap();
        assert_eq!(target.to_vec(), vec![2, 1]);
    }
}
