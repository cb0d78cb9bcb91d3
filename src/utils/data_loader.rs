//! CSV loading and saving for raw reports and encoded artifacts

use crate::error::{Result, SeverityError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// CSV data loader
pub struct DataLoader {
    /// Rows scanned to infer column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 10_000,
        }
    }

    /// Set number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SeverityError::DataError(format!(
                "input file not found: {}",
                path.display()
            )));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
        Ok(df)
    }
}

/// Writes frames and encoded matrices to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header and no index column
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Saved CSV");
        Ok(())
    }

    /// Save an encoded feature matrix plus its target column
    pub fn save_matrix(
        x: &Array2<f64>,
        feature_names: &[String],
        y: &Array1<i64>,
        target_column: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let mut df = matrix_to_frame(x, feature_names, y, target_column)?;
        Self::save_csv(&mut df, path)
    }
}

/// Build a frame from an encoded matrix, appending the target column last
pub fn matrix_to_frame(
    x: &Array2<f64>,
    feature_names: &[String],
    y: &Array1<i64>,
    target_column: &str,
) -> Result<DataFrame> {
    if x.ncols() != feature_names.len() {
        return Err(SeverityError::ShapeError {
            expected: format!("{} feature columns", feature_names.len()),
            actual: format!("{} columns", x.ncols()),
        });
    }
    if x.nrows() != y.len() {
        return Err(SeverityError::ShapeError {
            expected: format!("{} target values", x.nrows()),
            actual: format!("{} target values", y.len()),
        });
    }

    let mut columns: Vec<Column> = feature_names
        .iter()
        .zip(x.columns())
        .map(|(name, values)| Column::new(name.as_str().into(), values.to_vec()))
        .collect();
    columns.push(Column::new(target_column.into(), y.to_vec()));

    Ok(DataFrame::new(columns)?)
}

/// Extract the named columns of a frame as an `f64` matrix.
///
/// Every value must be present; encoded artifacts never hold nulls.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| SeverityError::SchemaError(format!("column '{}' is missing", name)))?;
        let casted = column.as_materialized_series().cast(&DataType::Float64)?;
        let values = casted.f64()?;

        for (i, value) in values.into_iter().enumerate() {
            x[[i, j]] = value.ok_or_else(|| {
                SeverityError::DataError(format!("missing value in column '{}' at row {}", name, i))
            })?;
        }
    }

    Ok(x)
}

/// Per-column summary of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape, column summary and target distribution of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnInfo>,
    pub target_distribution: Option<BTreeMap<String, usize>>,
}

impl DatasetInfo {
    pub fn from_frame(df: &DataFrame, target_column: Option<&str>) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                dtype: c.dtype().to_string(),
                null_count: c.null_count(),
            })
            .collect();

        let target_distribution = target_column
            .and_then(|name| df.column(name).ok())
            .map(|column| {
                let mut counts = BTreeMap::new();
                let series = column.as_materialized_series();
                for i in 0..series.len() {
                    let key = match series.get(i) {
                        Ok(AnyValue::Null) | Err(_) => "<missing>".to_string(),
                        Ok(AnyValue::String(s)) => s.to_string(),
                        Ok(other) => other.to_string(),
                    };
                    *counts.entry(key).or_insert(0) += 1;
                }
                counts
            });

        Self {
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            target_distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_frame_round_trip() {
        let x = Array2::from_shape_vec((3, 2), vec![0.5, -1.25, 2.0, 3.0, 0.1, 7.75]).unwrap();
        let y = Array1::from_vec(vec![0i64, 2, 1]);
        let names = vec!["casualties".to_string(), "lanes".to_string()];

        let df = matrix_to_frame(&x, &names, &y, "accident_severity").unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(
            df.get_column_names().last().map(|s| s.as_str()),
            Some("accident_severity")
        );

        let back = frame_to_matrix(&df, &names).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn test_save_and_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("train.csv");

        let x = Array2::from_shape_vec((2, 1), vec![1.5, -0.5]).unwrap();
        let y = Array1::from_vec(vec![1i64, 0]);
        DataSaver::save_matrix(&x, &["casualties".to_string()], &y, "accident_severity", &path)
            .unwrap();

        let df = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new().load_csv("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, SeverityError::DataError(_)));
    }

    #[test]
    fn test_dataset_info() {
        let df = df!(
            "casualties" => &[Some(1i64), None, Some(3)],
            "accident_severity" => &["Slight Injury", "Slight Injury", "Fatal injury"]
        )
        .unwrap();
        let info = DatasetInfo::from_frame(&df, Some("accident_severity"));
        assert_eq!(info.n_rows, 3);
        assert_eq!(info.columns[0].null_count, 1);
        let dist = info.target_distribution.unwrap();
        assert_eq!(dist.get("Slight Injury"), Some(&2));
        assert_eq!(dist.get("Fatal injury"), Some(&1));
    }
}
