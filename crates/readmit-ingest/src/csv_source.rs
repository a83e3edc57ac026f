use std::path::Path;

use csv::ReaderBuilder;
use serde_json::Value;

use readmit_model::PatientRecord;

use crate::error::{DataSourceError, Result};

/// Cell spellings treated as "no value".
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#NA", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "-nan",
    "-NaN",
];

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Type a raw CSV cell: integers and floats become numbers, NA spellings become null.
fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if NA_VALUES.contains(&trimmed) {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
        return Value::Null;
    }
    Value::String(trimmed.to_string())
}

/// Read a CSV file into patient records, one per data row.
pub fn read_csv_records(path: &Path) -> Result<Vec<PatientRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| DataSourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DataSourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| DataSourceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let record: PatientRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(index, header)| {
                let value = row.get(index).map_or(Value::Null, cell_value);
                (header.clone(), value)
            })
            .collect();
        records.push(record);
    }
    tracing::debug!(path = %path.display(), rows = records.len(), "read csv records");
    Ok(records)
}
