//! Classification metrics

use crate::error::{Result, SeverityError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub f1_score: f64,
    pub accuracy_score: f64,
}

impl MetricsRecord {
    /// Score predictions against the truth
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>, n_classes: usize) -> Result<Self> {
        Ok(Self {
            f1_score: weighted_f1(y_true, y_pred, n_classes)?,
            accuracy_score: accuracy(y_true, y_pred)?,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn check_lengths(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(SeverityError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(SeverityError::DataError(
            "cannot score an empty label set".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of exact matches
pub fn accuracy(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Confusion matrix with truth on rows and predictions on columns.
/// Labels outside `0..n_classes` are not counted.
pub fn confusion_matrix(
    y_true: &Array1<i64>,
    y_pred: &Array1<i64>,
    n_classes: usize,
) -> Result<Array2<usize>> {
    check_lengths(y_true, y_pred)?;
    let mut cm = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if (0..n_classes as i64).contains(&t) && (0..n_classes as i64).contains(&p) {
            cm[[t as usize, p as usize]] += 1;
        }
    }
    Ok(cm)
}

/// Per-class scores; a zero denominator gives zero
pub fn per_class_scores(
    y_true: &Array1<i64>,
    y_pred: &Array1<i64>,
    n_classes: usize,
) -> Result<Vec<ClassScore>> {
    let cm = confusion_matrix(y_true, y_pred, n_classes)?;

    Ok((0..n_classes)
        .map(|c| {
            let tp = cm[[c, c]] as f64;
            let predicted: usize = cm.column(c).sum();
            let support: usize = cm.row(c).sum();

            let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassScore {
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect())
}

/// F1 averaged over classes, weighted by true-class support
pub fn weighted_f1(y_true: &Array1<i64>, y_pred: &Array1<i64>, n_classes: usize) -> Result<f64> {
    let scores = per_class_scores(y_true, y_pred, n_classes)?;
    let total: usize = scores.iter().map(|s| s.support).sum();
    if total == 0 {
        return Ok(0.0);
    }
    let weighted: f64 = scores.iter().map(|s| s.f1 * s.support as f64).sum();
    Ok(weighted / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = Array1::from_vec(vec![0, 1, 2, 0, 0, 1]);
        let record = MetricsRecord::compute(&y, &y, 3).unwrap();
        assert_eq!(record.f1_score, 1.0);
        assert_eq!(record.accuracy_score, 1.0);
    }

    #[test]
    fn test_weighted_f1_known_value() {
        // class 0: p=2/3 r=1 f1=0.8, support 2
        // class 1: p=1 r=0.5 f1=2/3, support 2
        let y_true = Array1::from_vec(vec![0, 0, 1, 1]);
        let y_pred = Array1::from_vec(vec![0, 0, 0, 1]);
        let f1 = weighted_f1(&y_true, &y_pred, 3).unwrap();
        let expected = (0.8 * 2.0 + (2.0 / 3.0) * 2.0) / 4.0;
        assert!((f1 - expected).abs() < 1e-12);
        assert_eq!(accuracy(&y_true, &y_pred).unwrap(), 0.75);
    }

    #[test]
    fn test_never_predicted_class_scores_zero() {
        let y_true = Array1::from_vec(vec![0, 2]);
        let y_pred = Array1::from_vec(vec![0, 0]);
        let scores = per_class_scores(&y_true, &y_pred, 3).unwrap();
        assert_eq!(scores[2].f1, 0.0);
        assert_eq!(scores[1].support, 0);
    }

    #[test]
    fn test_length_mismatch() {
        let y_true = Array1::from_vec(vec![0, 1]);
        let y_pred = Array1::from_vec(vec![0]);
        assert!(accuracy(&y_true, &y_pred).is_err());
    }

    #[test]
    fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let record = MetricsRecord {
            f1_score: 0.8125,
            accuracy_score: 0.84,
        };
        record.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("f1_score").is_some());
        assert!(raw.get("accuracy_score").is_some());
        assert_eq!(MetricsRecord::load(&path).unwrap(), record);
    }
}
