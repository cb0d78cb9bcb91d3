//! Feature scaling implementations

use crate::error::{Result, SeverityError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of scaler to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Robust scaling using median and IQR: (x - median) / (q3 - q1)
    Robust,
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// median, mean or min
    pub center: f64,
    /// IQR, std or range; never zero
    pub scale: f64,
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: BTreeMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: BTreeMap::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> &ScalerType {
        &self.scaler_type
    }

    /// Fitted parameters of a column
    pub fn params(&self, column: &str) -> Option<ScalerParams> {
        self.params.get(column).copied()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.params.clear();

        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                SeverityError::SchemaError(format!("column '{}' is missing", col_name))
            })?;
            let series = column.as_materialized_series().cast(&DataType::Float64)?;

            let params = self.compute_params(col_name, &series)?;
            self.params.insert(col_name.to_string(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data.
    /// Builds all replacement columns first, then applies them in one pass.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(SeverityError::StateError(
                "scaler must be fitted before transform".to_string(),
            ));
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|(col_name, params)| {
                let column = df.column(col_name).map_err(|_| {
                    SeverityError::SchemaError(format!("column '{}' is missing", col_name))
                })?;
                Self::scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    fn compute_params(&self, name: &str, series: &Series) -> Result<ScalerParams> {
        let ca = series.f64()?;
        if ca.len() == ca.null_count() {
            return Err(SeverityError::DataError(format!(
                "column '{}' has no values to fit a scaler on",
                name
            )));
        }

        let (center, scale) = match self.scaler_type {
            ScalerType::Robust => {
                let median = ca.median().unwrap_or(0.0);
                let q1 = ca.quantile(0.25, QuantileMethod::Linear)?.unwrap_or(0.0);
                let q3 = ca.quantile(0.75, QuantileMethod::Linear)?.unwrap_or(0.0);
                (median, q3 - q1)
            }
            ScalerType::Standard => (ca.mean().unwrap_or(0.0), ca.std(1).unwrap_or(0.0)),
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(0.0);
                (min, max - min)
            }
            ScalerType::None => (0.0, 1.0),
        };

        Ok(ScalerParams {
            center,
            scale: if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale },
        })
    }

    fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
        let casted = series.cast(&DataType::Float64)?;
        let scaled: Float64Chunked = casted
            .f64()?
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.center) / params.scale))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }
}
