//! Data preprocessing module
//!
//! Turns a canonical feature frame into a fixed-width numeric matrix:
//! - Missing value imputation (median for numeric, mode for categorical)
//! - Robust scaling of numeric columns
//! - Ordinal encoding of categorical columns
//!
//! The fitted [`DataPreprocessor`] is the artifact shared by training and
//! inference; its output column order is numeric columns followed by
//! categorical columns, each in input order.

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::PreprocessingConfig;
pub use encoder::OrdinalEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::DataPreprocessor;
pub use scaler::{Scaler, ScalerType};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    /// Integer and float columns are numeric; everything else is categorical
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => ColumnType::Numeric,
            _ => ColumnType::Categorical,
        }
    }
}
