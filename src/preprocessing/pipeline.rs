//! Data preprocessing pipeline

use super::{
    config::PreprocessingConfig, encoder::OrdinalEncoder, imputer::Imputer, scaler::Scaler,
    ColumnType,
};
use crate::error::{Result, SeverityError};
use crate::utils::frame_to_matrix;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Column-type-aware transformer from a feature frame to a numeric matrix.
///
/// Numeric columns are imputed then scaled; categorical columns are imputed
/// then ordinally encoded. Everything is learned in [`DataPreprocessor::fit`]
/// and the same fitted state serves training, evaluation and inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Option<Imputer>,
    categorical_imputer: Option<Imputer>,
    scaler: Option<Scaler>,
    encoder: Option<OrdinalEncoder>,
    is_fitted: bool,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
    /// Rows seen by fit
    samples_processed: usize,
}

impl DataPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            numeric_imputer: None,
            categorical_imputer: None,
            scaler: None,
            encoder: None,
            is_fitted: false,
            fit_time: None,
            samples_processed: 0,
        }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit the preprocessor to the data.
    ///
    /// Fitted state is replaced only when every step succeeds; a failed
    /// refit leaves the previous state untouched.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let (numeric_columns, categorical_columns) = Self::detect_column_types(df);
        let prepared = Self::prepare_columns(df, &numeric_columns, &categorical_columns)?;

        let mut numeric_imputer = None;
        let mut scaler = None;
        if !numeric_columns.is_empty() {
            let cols: Vec<&str> = numeric_columns.iter().map(String::as_str).collect();

            let mut imputer = Imputer::new(self.config.numeric_impute_strategy.clone());
            let imputed = imputer.fit_transform(&prepared, &cols)?;

            // Scaling statistics come from the imputed column
            let mut fitted_scaler = Scaler::new(self.config.scaler_type.clone());
            fitted_scaler.fit(&imputed, &cols)?;

            numeric_imputer = Some(imputer);
            scaler = Some(fitted_scaler);
        }

        let mut categorical_imputer = None;
        let mut encoder = None;
        if !categorical_columns.is_empty() {
            let cols: Vec<&str> = categorical_columns.iter().map(String::as_str).collect();

            let mut imputer = Imputer::new(self.config.categorical_impute_strategy.clone());
            let imputed = imputer.fit_transform(&prepared, &cols)?;

            let mut fitted_encoder = OrdinalEncoder::new();
            fitted_encoder.fit(&imputed, &cols)?;

            categorical_imputer = Some(imputer);
            encoder = Some(fitted_encoder);
        }

        self.numeric_columns = numeric_columns;
        self.categorical_columns = categorical_columns;
        self.numeric_imputer = numeric_imputer;
        self.categorical_imputer = categorical_imputer;
        self.scaler = scaler;
        self.encoder = encoder;
        self.is_fitted = true;
        self.samples_processed = df.height();
        self.fit_time = Some(start.elapsed().as_secs_f64());

        info!(
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            rows = df.height(),
            "Fitted preprocessor"
        );
        Ok(self)
    }

    /// Transform the data into a matrix with one column per output feature
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SeverityError::StateError(
                "preprocessor must be fitted before transform".to_string(),
            ));
        }

        let mut result = self.prepare(df)?;

        if let Some(ref imputer) = self.numeric_imputer {
            result = imputer.transform(&result)?;
        }
        if let Some(ref imputer) = self.categorical_imputer {
            result = imputer.transform(&result)?;
        }
        if let Some(ref scaler) = self.scaler {
            result = scaler.transform(&result)?;
        }
        if let Some(ref encoder) = self.encoder {
            result = encoder.transform(&result)?;
        }

        let x = frame_to_matrix(&result, &self.output_columns())?;
        debug!(rows = x.nrows(), cols = x.ncols(), "Transformed frame");
        Ok(x)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Output column order: numeric columns, then categorical columns
    pub fn output_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .cloned()
            .collect()
    }

    /// Alias of [`DataPreprocessor::output_columns`]
    pub fn feature_names(&self) -> Vec<String> {
        self.output_columns()
    }

    /// Get numeric column names
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Get categorical column names
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Type a column was fitted as
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        if self.numeric_columns.iter().any(|c| c == column) {
            Some(ColumnType::Numeric)
        } else if self.categorical_columns.iter().any(|c| c == column) {
            Some(ColumnType::Categorical)
        } else {
            None
        }
    }

    /// Categories learned for a categorical column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.encoder.as_ref().and_then(|e| e.categories(column))
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Save the preprocessor to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved preprocessor");
        Ok(())
    }

    /// Load a preprocessor from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preprocessor: Self = serde_json::from_str(&json)?;
        Ok(preprocessor)
    }

    /// Numeric and categorical column names, in frame order
    fn detect_column_types(df: &DataFrame) -> (Vec<String>, Vec<String>) {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            match ColumnType::of(col.dtype()) {
                ColumnType::Numeric => numeric.push(name),
                ColumnType::Categorical => categorical.push(name),
            }
        }
        (numeric, categorical)
    }

    /// Select the fitted columns in output order, numeric ones as Float64
    /// with NaN turned into null, categorical ones as String.
    fn prepare(&self, df: &DataFrame) -> Result<DataFrame> {
        Self::prepare_columns(df, &self.numeric_columns, &self.categorical_columns)
    }

    fn prepare_columns(
        df: &DataFrame,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> Result<DataFrame> {
        let mut columns: Vec<Column> =
            Vec::with_capacity(numeric_columns.len() + categorical_columns.len());

        for name in numeric_columns {
            let series = Self::fetch(df, name)?;
            let casted = series.strict_cast(&DataType::Float64).map_err(|_| {
                SeverityError::SchemaError(format!(
                    "column '{}' must be numeric, found {}",
                    name,
                    series.dtype()
                ))
            })?;
            let cleaned: Float64Chunked = casted
                .f64()?
                .into_iter()
                .map(|opt| opt.filter(|v| !v.is_nan()))
                .collect();
            columns.push(Column::from(cleaned.with_name(name.as_str().into()).into_series()));
        }

        for name in categorical_columns {
            let series = Self::fetch(df, name)?;
            let casted = series.cast(&DataType::String)?;
            columns.push(Column::from(casted.with_name(name.as_str().into())));
        }

        Ok(DataFrame::new(columns)?)
    }

    fn fetch<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
        df.column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| SeverityError::SchemaError(format!("expected column '{}' is missing", name)))
    }
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "driver_age" => &[Some("18-30"), Some("31-50"), None, Some("18-30"), Some("Over 51")],
            "casualties" => &[Some(1i64), Some(2), Some(1), None, Some(4)],
            "light_condition" => &["Daylight", "Darkness", "Daylight", "Daylight", "Darkness"],
            "vehicles_involved" => &[2.0, 1.0, 3.0, 2.0, 2.0]
        )
        .unwrap()
    }

    #[test]
    fn test_preprocessor_creation() {
        let preprocessor = DataPreprocessor::new();
        assert!(!preprocessor.is_fitted());
    }

    #[test]
    fn test_column_detection_and_order() {
        let df = create_test_dataframe();
        let mut preprocessor = DataPreprocessor::new();
        preprocessor.fit(&df).unwrap();

        assert_eq!(preprocessor.numeric_columns(), &["casualties", "vehicles_involved"]);
        assert_eq!(preprocessor.categorical_columns(), &["driver_age", "light_condition"]);
        assert_eq!(
            preprocessor.output_columns(),
            vec!["casualties", "vehicles_involved", "driver_age", "light_condition"]
        );
        assert_eq!(preprocessor.column_type("casualties"), Some(ColumnType::Numeric));
        assert_eq!(preprocessor.column_type("nope"), None);
    }

    #[test]
    fn test_fit_transform_matches_transform() {
        let df = create_test_dataframe();
        let mut preprocessor = DataPreprocessor::new();

        let fitted = preprocessor.fit_transform(&df).unwrap();
        let again = preprocessor.transform(&df).unwrap();

        assert_eq!(fitted.dim(), (5, 4));
        assert_eq!(fitted, again);
        assert!(fitted.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_values_are_filled() {
        let df = create_test_dataframe();
        let mut preprocessor = DataPreprocessor::new();
        let x = preprocessor.fit_transform(&df).unwrap();

        // casualties median of [1, 2, 1, 4] is 1.5, which is also the scaling center
        assert_eq!(x[[3, 0]], 0.0);
        // driver_age mode is "18-30", code 0 among ["18-30", "31-50", "Over 51"]
        assert_eq!(x[[2, 2]], 0.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let preprocessor = DataPreprocessor::new();
        let err = preprocessor.transform(&create_test_dataframe()).unwrap_err();
        assert!(matches!(err, SeverityError::StateError(_)));
    }

    #[test]
    fn test_missing_column_at_transform() {
        let mut preprocessor = DataPreprocessor::new();
        preprocessor.fit(&create_test_dataframe()).unwrap();

        let partial = df!("casualties" => &[1i64]).unwrap();
        let err = preprocessor.transform(&partial).unwrap_err();
        assert!(matches!(err, SeverityError::SchemaError(_)));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let df = create_test_dataframe();
        let mut preprocessor = DataPreprocessor::new();
        let base = preprocessor.fit_transform(&df).unwrap();

        let mut wider = df.clone();
        wider
            .with_column(Column::new("unused".into(), vec!["x"; 5]))
            .unwrap();
        assert_eq!(preprocessor.transform(&wider).unwrap(), base);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");

        let df = create_test_dataframe();
        let mut preprocessor = DataPreprocessor::new();
        let expected = preprocessor.fit_transform(&df).unwrap();
        preprocessor.save(&path).unwrap();

        let loaded = DataPreprocessor::load(&path).unwrap();
        assert_eq!(loaded.output_columns(), preprocessor.output_columns());
        assert_eq!(loaded.transform(&df).unwrap(), expected);
    }

    #[test]
    fn test_failed_refit_keeps_fitted_state() {
        let df = df!(
            "casualties" => &[1.0, 2.0, 3.0],
            "light_condition" => &["Daylight", "Darkness", "Daylight"]
        )
        .unwrap();
        let mut preprocessor = DataPreprocessor::new();
        let expected = preprocessor.fit_transform(&df).unwrap();

        let unusable = df!(
            "casualties" => &[None::<f64>, None, None],
            "light_condition" => &["1", "2", "3"]
        )
        .unwrap();
        let err = preprocessor.fit(&unusable).unwrap_err();
        assert!(matches!(err, SeverityError::DataError(_)));

        assert!(preprocessor.is_fitted());
        assert_eq!(preprocessor.samples_processed(), 3);
        assert_eq!(preprocessor.transform(&df).unwrap(), expected);

        let unseen = df!("casualties" => &[1.0], "light_condition" => &["7"]).unwrap();
        assert!(matches!(
            preprocessor.transform(&unseen),
            Err(SeverityError::UnseenCategory { .. })
        ));
    }
}
