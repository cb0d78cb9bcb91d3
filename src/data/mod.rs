//! Dataset shaping ahead of preprocessing
//!
//! - [`ColumnRenamer`] maps raw report headers to canonical snake_case names
//! - [`FeatureTargetSplitter`] separates and encodes the severity target
//! - [`TrainTestSplitter`] partitions encoded rows into train and test sets

mod schema;
mod split;
mod target;

pub use schema::{
    ColumnRenamer, COLUMN_MAP, DROPPED_COLUMN, TARGET_COLUMN, USER_FACING_FIELDS,
};
pub use split::{TrainTestSplit, TrainTestSplitter};
pub use target::{FeatureTargetSplitter, Severity};
