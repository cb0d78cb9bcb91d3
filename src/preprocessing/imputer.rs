//! Missing value imputation strategies

use crate::error::{Result, SeverityError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode; ties go to the smallest value
    MostFrequent,
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant string (categorical)
    ConstantString(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values.
///
/// Fill values are learned once in [`Imputer::fit`] and reused verbatim by
/// every later [`Imputer::transform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: BTreeMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    /// Fit the imputer to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.fill_values.clear();

        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                SeverityError::SchemaError(format!("column '{}' is missing", col_name))
            })?;

            let fill_value = self.compute_fill_value(col_name, column.as_materialized_series())?;
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by imputing missing values in the fitted columns
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(SeverityError::StateError(
                "imputer must be fitted before transform".to_string(),
            ));
        }

        let mut result = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            let column = df.column(col_name).map_err(|_| {
                SeverityError::SchemaError(format!("column '{}' is missing", col_name))
            })?;
            let filled = Self::fill_series(column.as_materialized_series(), fill_value)?;
            result.with_column(filled)?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Numeric fill value learned for a column
    pub fn numeric_fill(&self, column: &str) -> Option<f64> {
        match self.fill_values.get(column) {
            Some(ImputeValue::Numeric(v)) => Some(*v),
            _ => None,
        }
    }

    /// String fill value learned for a column
    pub fn string_fill(&self, column: &str) -> Option<&str> {
        match self.fill_values.get(column) {
            Some(ImputeValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    fn is_numeric_dtype(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }

    /// Mode of a numeric series
    fn compute_mode_numeric(values: &Float64Chunked) -> Option<f64> {
        let mut sorted: Vec<f64> = values.into_iter().flatten().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut best: Option<(f64, usize)> = None;
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            let run = j - i;
            if best.map_or(true, |(_, count)| run > count) {
                best = Some((sorted[i], run));
            }
            i = j;
        }

        best.map(|(value, _)| value)
    }

    /// Mode of a string series
    fn compute_mode_string(values: &StringChunked) -> Option<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for val in values.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        // BTreeMap iterates in ascending order, so strict `>` keeps the
        // smallest value among equally frequent ones.
        let mut best: Option<(&str, usize)> = None;
        for (value, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }

        best.map(|(value, _)| value.to_string())
    }

    fn compute_fill_value(&self, name: &str, series: &Series) -> Result<ImputeValue> {
        let no_values = || {
            SeverityError::DataError(format!(
                "column '{}' has no observed values to impute from",
                name
            ))
        };

        match &self.strategy {
            ImputeStrategy::Mean => {
                let casted = series.cast(&DataType::Float64)?;
                let mean = casted.f64()?.mean().ok_or_else(no_values)?;
                Ok(ImputeValue::Numeric(mean))
            }
            ImputeStrategy::Median => {
                let casted = series.cast(&DataType::Float64)?;
                let median = casted.f64()?.median().ok_or_else(no_values)?;
                Ok(ImputeValue::Numeric(median))
            }
            ImputeStrategy::MostFrequent => {
                if Self::is_numeric_dtype(series.dtype()) {
                    let casted = series.cast(&DataType::Float64)?;
                    let mode = Self::compute_mode_numeric(casted.f64()?).ok_or_else(no_values)?;
                    Ok(ImputeValue::Numeric(mode))
                } else {
                    let casted = series.cast(&DataType::String)?;
                    let mode = Self::compute_mode_string(casted.str()?).ok_or_else(no_values)?;
                    Ok(ImputeValue::String(mode))
                }
            }
            ImputeStrategy::Constant(val) => Ok(ImputeValue::Numeric(*val)),
            ImputeStrategy::ConstantString(val) => Ok(ImputeValue::String(val.clone())),
        }
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(fill) => {
                let casted = series.cast(&DataType::Float64)?;
                let filled: Float64Chunked = casted
                    .f64()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*fill)))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::String(fill) => {
                let casted = series.cast(&DataType::String)?;
                let filled: StringChunked = casted
                    .str()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(fill.as_str())))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}
