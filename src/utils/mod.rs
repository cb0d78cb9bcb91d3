//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    frame_to_matrix, matrix_to_frame, ColumnInfo, DataLoader, DataSaver, DatasetInfo,
};
