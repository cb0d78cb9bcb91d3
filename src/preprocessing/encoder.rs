//! Ordinal encoding of categorical columns

use crate::error::{Result, SeverityError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maps each category of a column to its rank in the sorted category list.
///
/// Categories are collected from the fit data, sorted lexicographically and
/// numbered from zero. A value not seen during fit is rejected with
/// [`SeverityError::UnseenCategory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl OrdinalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.categories.clear();

        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                SeverityError::SchemaError(format!("column '{}' is missing", col_name))
            })?;
            let casted = column.as_materialized_series().cast(&DataType::String)?;

            let seen: BTreeSet<&str> = casted.str()?.into_iter().flatten().collect();
            let sorted = seen.into_iter().map(str::to_string).collect();
            self.categories.insert(col_name.to_string(), sorted);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Sorted categories learned for a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Code of a single value
    pub fn encode(&self, column: &str, value: &str) -> Result<f64> {
        let categories = self.categories.get(column).ok_or_else(|| {
            SeverityError::SchemaError(format!("column '{}' was not fitted", column))
        })?;

        categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as f64)
            .map_err(|_| SeverityError::UnseenCategory {
                column: column.to_string(),
                value: value.to_string(),
            })
    }

    /// Encode every fitted column of the frame into float codes
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(SeverityError::StateError(
                "encoder must be fitted before transform".to_string(),
            ));
        }

        let mut result = df.clone();

        for col_name in self.categories.keys() {
            let column = df.column(col_name).map_err(|_| {
                SeverityError::SchemaError(format!("column '{}' is missing", col_name))
            })?;
            let casted = column.as_materialized_series().cast(&DataType::String)?;

            let codes = casted
                .str()?
                .into_iter()
                .map(|opt| match opt {
                    Some(value) => self.encode(col_name, value).map(Some),
                    None => Ok(None),
                })
                .collect::<Result<Vec<Option<f64>>>>()?;

            let encoded: Float64Chunked = codes.into_iter().collect();
            result.with_column(encoded.with_name(col_name.as_str().into()).into_series())?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_sorted_order() {
        let df = df!("light" => &["Daylight", "Darkness", "Daylight", "Dusk"]).unwrap();

        let mut encoder = OrdinalEncoder::new();
        let result = encoder.fit_transform(&df, &["light"]).unwrap();

        assert_eq!(
            encoder.categories("light").unwrap(),
            &["Darkness".to_string(), "Daylight".to_string(), "Dusk".to_string()]
        );
        let col = result.column("light").unwrap().f64().unwrap();
        let codes: Vec<Option<f64>> = col.into_iter().collect();
        assert_eq!(codes, vec![Some(1.0), Some(0.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_unseen_category() {
        let train = df!("light" => &["Daylight", "Darkness"]).unwrap();
        let test = df!("light" => &["Moonlight"]).unwrap();

        let mut encoder = OrdinalEncoder::new();
        encoder.fit(&train, &["light"]).unwrap();

        match encoder.transform(&test).unwrap_err() {
            SeverityError::UnseenCategory { column, value } => {
                assert_eq!(column, "light");
                assert_eq!(value, "Moonlight");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_single_value() {
        let df = df!("sex" => &["Male", "Female"]).unwrap();
        let mut encoder = OrdinalEncoder::new();
        encoder.fit(&df, &["sex"]).unwrap();

        assert_eq!(encoder.encode("sex", "Female").unwrap(), 0.0);
        assert_eq!(encoder.encode("sex", "Male").unwrap(), 1.0);
    }
}
