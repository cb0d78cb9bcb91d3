//! Integration test: preprocessing accident reports end-to-end

mod common;

use accident_severity::data::{ColumnRenamer, FeatureTargetSplitter, TARGET_COLUMN};
use accident_severity::error::SeverityError;
use accident_severity::preprocessing::{
    ColumnType, DataPreprocessor, PreprocessingConfig, ScalerType,
};
use polars::prelude::*;

fn report_features() -> DataFrame {
    let canonical = ColumnRenamer::new().rename(&common::raw_reports()).unwrap();
    let (features, _) = FeatureTargetSplitter::new(TARGET_COLUMN).split(&canonical).unwrap();
    features
}

fn column_index(preprocessor: &DataPreprocessor, name: &str) -> usize {
    preprocessor
        .output_columns()
        .iter()
        .position(|c| c == name)
        .unwrap()
}

#[test]
fn test_fit_transform_reports() {
    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    let x = preprocessor.fit_transform(&features).unwrap();

    assert_eq!(x.dim(), (common::N_ROWS, 9));
    assert!(x.iter().all(|v| v.is_finite()), "no missing values survive");

    assert_eq!(preprocessor.numeric_columns(), &["vehicles_involved", "casualties"]);
    assert_eq!(&preprocessor.output_columns()[..2], &["vehicles_involved", "casualties"]);
    assert_eq!(preprocessor.column_type("driver_age"), Some(ColumnType::Categorical));
    assert_eq!(preprocessor.samples_processed(), common::N_ROWS);
}

#[test]
fn test_categorical_codes_follow_sorted_vocabulary() {
    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    let x = preprocessor.fit_transform(&features).unwrap();

    assert_eq!(
        preprocessor.categories("light_condition").unwrap(),
        &["Darkness - lights lit", "Darkness - no lighting", "Daylight"]
    );
    let light = column_index(&preprocessor, "light_condition");
    assert_eq!(x[[7, light]], 1.0);
    assert_eq!(x[[0, light]], 2.0);

    // Missing service years take the most frequent value; ties go to the smallest
    let service = column_index(&preprocessor, "service_year");
    assert_eq!(preprocessor.categories("service_year").unwrap()[0], "1-2yr");
    assert_eq!(x[[0, service]], 0.0);
    assert_eq!(x[[9, service]], 0.0);

    for row in x.rows() {
        for &code in row.iter().skip(2) {
            assert_eq!(code.fract(), 0.0);
        }
    }
}

#[test]
fn test_transform_matches_fit_transform_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessor.json");

    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    let fitted = preprocessor.fit_transform(&features).unwrap();
    preprocessor.save(&path).unwrap();

    let loaded = DataPreprocessor::load(&path).unwrap();
    assert_eq!(loaded.output_columns(), preprocessor.output_columns());
    assert_eq!(loaded.transform(&features).unwrap(), fitted);
}

#[test]
fn test_row_order_does_not_change_encoding() {
    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    let x = preprocessor.fit_transform(&features).unwrap();

    let reversed = features.reverse();
    let mut other = DataPreprocessor::new();
    let x_rev = other.fit_transform(&reversed).unwrap();

    for i in 0..common::N_ROWS {
        assert_eq!(x.row(i), x_rev.row(common::N_ROWS - 1 - i));
    }
}

#[test]
fn test_unseen_category_at_inference() {
    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    preprocessor.fit(&features).unwrap();

    let mut row = features.slice(0, 1);
    row.with_column(Column::new("lanes".into(), ["Roundabout"])).unwrap();

    let err = preprocessor.transform(&row).unwrap_err();
    match err {
        SeverityError::UnseenCategory { column, value } => {
            assert_eq!(column, "lanes");
            assert_eq!(value, "Roundabout");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_column_at_inference() {
    let features = report_features();
    let mut preprocessor = DataPreprocessor::new();
    preprocessor.fit(&features).unwrap();

    let partial = features.drop("driver_sex").unwrap();
    let err = preprocessor.transform(&partial).unwrap_err();
    assert!(matches!(err, SeverityError::SchemaError(_)));
}

#[test]
fn test_standard_scaler_config() {
    let features = report_features();
    let config = PreprocessingConfig::default().with_scaler(ScalerType::Standard);
    let mut preprocessor = DataPreprocessor::with_config(config);
    let x = preprocessor.fit_transform(&features).unwrap();

    let vehicles = x.column(0);
    let mean = vehicles.sum() / vehicles.len() as f64;
    assert!(mean.abs() < 1e-9);
}
