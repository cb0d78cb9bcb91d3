//! Canonical column naming for accident reports

use crate::error::{Result, SeverityError};
use polars::prelude::*;
use tracing::debug;

/// Canonical name of the severity target column
pub const TARGET_COLUMN: &str = "accident_severity";

/// Canonical name of the column removed after renaming
pub const DROPPED_COLUMN: &str = "time";

/// Raw report header -> canonical column name
pub const COLUMN_MAP: [(&str, &str); 32] = [
    ("Time", "time"),
    ("Day_of_week", "day_of_week"),
    ("Age_band_of_driver", "driver_age"),
    ("Sex_of_driver", "driver_sex"),
    ("Educational_level", "educational_level"),
    ("Vehicle_driver_relation", "vehicle_driver_relation"),
    ("Driving_experience", "driving_experience"),
    ("Type_of_vehicle", "vehicle_type"),
    ("Owner_of_vehicle", "vehicle_owner"),
    ("Service_year_of_vehicle", "service_year"),
    ("Defect_of_vehicle", "vehicle_defect"),
    ("Area_accident_occured", "accident_area"),
    ("Lanes_or_Medians", "lanes"),
    ("Road_allignment", "road_allignment"),
    ("Types_of_Junction", "junction_type"),
    ("Road_surface_type", "surface_type"),
    ("Road_surface_conditions", "road_surface_conditions"),
    ("Light_conditions", "light_condition"),
    ("Weather_conditions", "weather_condition"),
    ("Type_of_collision", "collision_type"),
    ("Number_of_vehicles_involved", "vehicles_involved"),
    ("Number_of_casualties", "casualties"),
    ("Vehicle_movement", "vehicle_movement"),
    ("Casualty_class", "casualty_class"),
    ("Sex_of_casualty", "casualty_sex"),
    ("Age_band_of_casualty", "casualty_age"),
    ("Casualty_severity", "casualty_severity"),
    ("Work_of_casuality", "casualty_work"),
    ("Fitness_of_casuality", "casualty_fitness"),
    ("Pedestrian_movement", "pedestrian_movement"),
    ("Cause_of_accident", "accident_cause"),
    ("Accident_severity", "accident_severity"),
];

/// The ten fields the interactive prediction form asks for
pub const USER_FACING_FIELDS: [&str; 10] = [
    "driver_age",
    "vehicle_owner",
    "vehicle_defect",
    "accident_area",
    "lanes",
    "surface_type",
    "light_condition",
    "casualty_sex",
    "casualty_work",
    "pedestrian_movement",
];

/// Renames raw report columns to their canonical names and drops `time`.
///
/// In strict mode (the default) both `time` and the target must be present
/// after renaming. Lenient mode is for inference inputs, which carry neither
/// guarantee.
#[derive(Debug, Clone)]
pub struct ColumnRenamer {
    mapping: Vec<(String, String)>,
    dropped: Vec<String>,
    target_column: Option<String>,
    strict: bool,
}

impl ColumnRenamer {
    /// Renamer over the fixed accident report schema
    pub fn new() -> Self {
        Self {
            mapping: COLUMN_MAP
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
            dropped: vec![DROPPED_COLUMN.to_string()],
            target_column: Some(TARGET_COLUMN.to_string()),
            strict: true,
        }
    }

    /// Skip the presence checks for `time` and the target column
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Canonical name for a raw header, if the header is known
    pub fn canonical_name(raw: &str) -> Option<&'static str> {
        COLUMN_MAP
            .iter()
            .find(|(source, _)| *source == raw)
            .map(|(_, canonical)| *canonical)
    }

    /// Canonical columns that survive renaming, in report order
    pub fn canonical_columns() -> Vec<&'static str> {
        COLUMN_MAP
            .iter()
            .map(|(_, canonical)| *canonical)
            .filter(|name| *name != DROPPED_COLUMN)
            .collect()
    }

    /// Apply the name map, then drop the irrelevant columns.
    ///
    /// Columns not in the map pass through untouched.
    pub fn rename(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for (raw, canonical) in &self.mapping {
            if raw == canonical || result.get_column_index(raw).is_none() {
                continue;
            }
            if result.get_column_index(canonical).is_some() {
                return Err(SeverityError::SchemaError(format!(
                    "cannot rename '{}': column '{}' already exists",
                    raw, canonical
                )));
            }
            result.rename(raw, canonical.as_str().into())?;
        }

        for column in &self.dropped {
            if result.get_column_index(column).is_some() {
                result = result.drop(column)?;
            } else if self.strict {
                return Err(SeverityError::SchemaError(format!(
                    "expected column '{}' is missing",
                    column
                )));
            }
        }

        if self.strict {
            if let Some(target) = &self.target_column {
                if result.get_column_index(target).is_none() {
                    return Err(SeverityError::SchemaError(format!(
                        "target column '{}' is missing",
                        target
                    )));
                }
            }
        }

        debug!(columns = result.width(), rows = result.height(), "Renamed columns");
        Ok(result)
    }
}

impl Default for ColumnRenamer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "Time" => &["17:02:00", "17:05:00"],
            "Day_of_week" => &["Monday", "Sunday"],
            "Number_of_casualties" => &[1i64, 2],
            "Accident_severity" => &["Slight Injury", "Fatal injury"],
            "extra_notes" => &["a", "b"]
        )
        .unwrap()
    }

    #[test]
    fn test_column_map_is_complete() {
        assert_eq!(COLUMN_MAP.len(), 32);
        assert_eq!(ColumnRenamer::canonical_columns().len(), 31);
        assert!(!ColumnRenamer::canonical_columns().contains(&"time"));
    }

    #[test]
    fn test_rename_and_drop_time() {
        let renamed = ColumnRenamer::new().rename(&raw_frame()).unwrap();
        let names: Vec<String> = renamed
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            names,
            vec!["day_of_week", "casualties", "accident_severity", "extra_notes"]
        );
        assert_eq!(renamed.height(), 2);
    }

    #[test]
    fn test_missing_time_is_schema_error() {
        let df = raw_frame().drop("Time").unwrap();
        let err = ColumnRenamer::new().rename(&df).unwrap_err();
        assert!(matches!(err, SeverityError::SchemaError(_)));
    }

    #[test]
    fn test_missing_target_is_schema_error() {
        let df = raw_frame().drop("Accident_severity").unwrap();
        let err = ColumnRenamer::new().rename(&df).unwrap_err();
        assert!(matches!(err, SeverityError::SchemaError(_)));
    }

    #[test]
    fn test_lenient_allows_inference_frames() {
        let df = df!("Age_band_of_driver" => &["18-30"]).unwrap();
        let renamed = ColumnRenamer::new().lenient().rename(&df).unwrap();
        assert!(renamed.column("driver_age").is_ok());
    }

    #[test]
    fn test_canonical_name_lookup() {
        assert_eq!(ColumnRenamer::canonical_name("Work_of_casuality"), Some("casualty_work"));
        assert_eq!(ColumnRenamer::canonical_name("Unknown_column"), None);
    }
}
