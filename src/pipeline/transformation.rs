//! Data transformation stage: raw CSV to encoded, split and resampled artifacts

use crate::config::{DataTransformationConfig, ImbalanceConfig, PipelineConfig};
use crate::data::{ColumnRenamer, FeatureTargetSplitter, TrainTestSplit, TrainTestSplitter};
use crate::error::{Result, SeverityError};
use crate::preprocessing::DataPreprocessor;
use crate::synthetic::{class_counts, Sampler, SMOTE};
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::info;

/// Paths and sizes produced by a transformation run
#[derive(Debug, Clone)]
pub struct TransformationArtifacts {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub resampled_path: PathBuf,
    pub preprocessor_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
    pub n_resampled: usize,
}

/// Renames, encodes, splits and rebalances the raw accident reports.
///
/// The three steps must run in order; calling one before its predecessor
/// yields [`SeverityError::StateError`].
pub struct DataTransformation {
    config: DataTransformationConfig,
    imbalance: ImbalanceConfig,
    target_column: String,
    random_state: u64,
    preprocessor: Option<DataPreprocessor>,
    encoded: Option<(Array2<f64>, Array1<i64>)>,
    split: Option<TrainTestSplit>,
}

impl DataTransformation {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.data_transformation.clone(),
            imbalance: config.imbalance.clone(),
            target_column: config.model_trainer.target_column.clone(),
            random_state: config.random_state,
            preprocessor: None,
            encoded: None,
            split: None,
        }
    }

    /// Load the raw CSV and encode it
    pub fn get_data_transformation(&mut self) -> Result<()> {
        let raw = DataLoader::new().load_csv(&self.config.data_path)?;
        self.transform_frame(&raw)
    }

    /// Encode an already loaded raw frame, fitting the preprocessor on every row
    pub fn transform_frame(&mut self, raw: &DataFrame) -> Result<()> {
        let canonical = ColumnRenamer::new().rename(raw)?;
        let (features, y) = FeatureTargetSplitter::new(&self.target_column).split(&canonical)?;

        let mut preprocessor = DataPreprocessor::new();
        let x = preprocessor.fit_transform(&features)?;

        info!("Numerical columns: {:?}", preprocessor.numeric_columns());
        info!("Categorical columns: {:?}", preprocessor.categorical_columns());
        info!(rows = x.nrows(), cols = x.ncols(), "Data preprocessing completed");

        self.preprocessor = Some(preprocessor);
        self.encoded = Some((x, y));
        self.split = None;
        Ok(())
    }

    /// Split the encoded rows and write `train.csv`, `test.csv` and the preprocessor
    pub fn train_test_split(&mut self) -> Result<()> {
        let (preprocessor, (x, y)) = match (&self.preprocessor, &self.encoded) {
            (Some(p), Some(encoded)) => (p, encoded),
            _ => {
                return Err(SeverityError::StateError(
                    "preprocessor is not available, call get_data_transformation first"
                        .to_string(),
                ))
            }
        };

        let split = TrainTestSplitter::new(self.config.test_size)
            .with_stratify(self.config.stratify)
            .with_random_state(self.random_state)
            .split(x, y)?;

        let names = preprocessor.output_columns();
        DataSaver::save_matrix(
            &split.x_train,
            &names,
            &split.y_train,
            &self.target_column,
            self.config.train_path(),
        )?;
        DataSaver::save_matrix(
            &split.x_test,
            &names,
            &split.y_test,
            &self.target_column,
            self.config.test_path(),
        )?;
        preprocessor.save(self.config.preprocessor_path())?;

        info!("Split the data into train and test set");
        info!("Shape of train data: {:?}", split.x_train.dim());
        info!("Shape of test data: {:?}", split.x_test.dim());

        self.split = Some(split);
        Ok(())
    }

    /// Oversample the training split and write `train_resampled.csv`.
    /// The test split is left untouched.
    pub fn handle_data_imbalance(&mut self) -> Result<usize> {
        let (split, preprocessor) = match (&self.split, &self.preprocessor) {
            (Some(s), Some(p)) => (s, p),
            _ => {
                return Err(SeverityError::StateError(
                    "train split is not available, call train_test_split first".to_string(),
                ))
            }
        };

        info!("Class counts before resampling: {:?}", class_counts(&split.y_train));

        let mut smote = SMOTE::new()
            .with_k_neighbors(self.imbalance.k_neighbors)
            .with_sampling_strategy(self.imbalance.target_ratio)
            .with_seed(self.random_state);
        let resampled = smote.fit_resample(&split.x_train, &split.y_train)?;

        info!("Class counts after resampling: {:?}", class_counts(&resampled.y));

        DataSaver::save_matrix(
            &resampled.x,
            &preprocessor.output_columns(),
            &resampled.y,
            &self.target_column,
            self.config.resampled_path(),
        )?;

        Ok(resampled.y.len())
    }

    /// Run all three steps
    pub fn run(&mut self) -> Result<TransformationArtifacts> {
        self.get_data_transformation()?;
        self.finish()
    }

    /// Run all three steps on an in-memory raw frame
    pub fn run_frame(&mut self, raw: &DataFrame) -> Result<TransformationArtifacts> {
        self.transform_frame(raw)?;
        self.finish()
    }

    fn finish(&mut self) -> Result<TransformationArtifacts> {
        self.train_test_split()?;
        let n_resampled = self.handle_data_imbalance()?;

        let (n_train, n_test) = self
            .split
            .as_ref()
            .map(|s| (s.y_train.len(), s.y_test.len()))
            .unwrap_or_default();

        Ok(TransformationArtifacts {
            train_path: self.config.train_path(),
            test_path: self.config.test_path(),
            resampled_path: self.config.resampled_path(),
            preprocessor_path: self.config.preprocessor_path(),
            n_train,
            n_test,
            n_resampled,
        })
    }

    pub fn preprocessor(&self) -> Option<&DataPreprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn split(&self) -> Option<&TrainTestSplit> {
        self.split.as_ref()
    }
}
