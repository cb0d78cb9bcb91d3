//! Shared accident report fixtures

#![allow(dead_code)]

use accident_severity::data::COLUMN_MAP;
use accident_severity::utils::DataSaver;
use polars::prelude::*;
use std::path::{Path, PathBuf};

pub const N_ROWS: usize = 100;

const DAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Severity label of fixture row `i`: 90 slight, 8 serious, 2 fatal
pub fn severity_of(i: usize) -> &'static str {
    if i == 7 || i == 57 {
        "Fatal injury"
    } else if i % 12 == 5 {
        "Serious Injury"
    } else {
        "Slight Injury"
    }
}

/// Raw accident reports with the original headers, `Time` included
pub fn raw_reports() -> DataFrame {
    let severe = |i: usize| severity_of(i) != "Slight Injury";

    let time: Vec<String> = (0..N_ROWS).map(|i| format!("{:02}:{:02}:00", i % 24, i % 60)).collect();
    let day: Vec<&str> = (0..N_ROWS).map(|i| DAYS[i % 7]).collect();
    let driver_age: Vec<&str> = (0..N_ROWS)
        .map(|i| if severe(i) { "Under 18" } else { ["18-30", "31-50", "Over 51"][i % 3] })
        .collect();
    let driver_sex: Vec<&str> = (0..N_ROWS)
        .map(|i| if i % 4 == 0 { "Female" } else { "Male" })
        .collect();
    let service_year: Vec<Option<&str>> = (0..N_ROWS)
        .map(|i| {
            if i % 9 == 0 {
                None
            } else {
                Some(["Above 10yr", "5-10yrs", "1-2yr"][i % 3])
            }
        })
        .collect();
    let area: Vec<&str> = (0..N_ROWS)
        .map(|i| ["Office areas", "Residential areas", "Other"][i % 3])
        .collect();
    let lanes: Vec<&str> = (0..N_ROWS)
        .map(|i| if i % 2 == 0 { "Undivided Two way" } else { "One way" })
        .collect();
    let light: Vec<&str> = (0..N_ROWS)
        .map(|i| match severity_of(i) {
            "Fatal injury" => "Darkness - no lighting",
            "Serious Injury" => "Darkness - lights lit",
            _ => "Daylight",
        })
        .collect();
    let vehicles: Vec<i64> = (0..N_ROWS).map(|i| (i % 4) as i64 + 1).collect();
    let casualties: Vec<Option<i64>> = (0..N_ROWS)
        .map(|i| {
            if i % 11 == 0 {
                None
            } else if severe(i) {
                Some(4)
            } else {
                Some((i % 3) as i64 + 1)
            }
        })
        .collect();
    let severity: Vec<&str> = (0..N_ROWS).map(severity_of).collect();

    df!(
        "Time" => time,
        "Day_of_week" => day,
        "Age_band_of_driver" => driver_age,
        "Sex_of_driver" => driver_sex,
        "Service_year_of_vehicle" => service_year,
        "Area_accident_occured" => area,
        "Lanes_or_Medians" => lanes,
        "Light_conditions" => light,
        "Number_of_vehicles_involved" => vehicles,
        "Number_of_casualties" => casualties,
        "Accident_severity" => severity
    )
    .unwrap()
}

/// Write the raw fixture as CSV under `dir`
pub fn write_raw_csv(dir: &Path) -> PathBuf {
    let path = dir.join("RTA Dataset.csv");
    let mut df = raw_reports();
    DataSaver::save_csv(&mut df, &path).unwrap();
    path
}

/// Raw reports carrying every header of the column map, target included
pub fn full_width_reports() -> DataFrame {
    let severe = |i: usize| severity_of(i) != "Slight Injury";

    let columns: Vec<Column> = COLUMN_MAP
        .iter()
        .enumerate()
        .map(|(k, (raw, canonical))| match *raw {
            "Time" => {
                let values: Vec<String> =
                    (0..N_ROWS).map(|i| format!("{:02}:{:02}:00", i % 24, i % 60)).collect();
                Column::new((*raw).into(), values)
            }
            "Accident_severity" => {
                let values: Vec<&str> = (0..N_ROWS).map(severity_of).collect();
                Column::new((*raw).into(), values)
            }
            "Number_of_vehicles_involved" | "Number_of_casualties" => {
                let values: Vec<Option<i64>> = (0..N_ROWS)
                    .map(|i| match i % (k + 3) {
                        0 => None,
                        _ if severe(i) => Some(5),
                        r => Some((r % 4) as i64 + 1),
                    })
                    .collect();
                Column::new((*raw).into(), values)
            }
            _ => {
                let values: Vec<Option<String>> = (0..N_ROWS)
                    .map(|i| {
                        if i % 13 == k % 13 {
                            None
                        } else if severe(i) && k % 4 == 0 {
                            Some(format!("{}_severe", canonical))
                        } else {
                            Some(format!("{}_{}", canonical, (i + k) % 3))
                        }
                    })
                    .collect();
                Column::new((*raw).into(), values)
            }
        })
        .collect();

    DataFrame::new(columns).unwrap()
}
