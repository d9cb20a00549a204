//! Raw form input sources.
//!
//! - JSON object file: `{"Gender": "Female", "Age": 24, ...}` (numbers or strings)
//! - `NAME=VALUE` assignments from the command line
//! - CSV with a header row of feature names, one request per row (batch mode)
//!
//! Values are kept as strings; interpretation belongs to the encoder.

use std::fs::File;
use std::path::Path;

use serde_json::Value;

use crate::domain::RawInput;
use crate::error::AppError;

/// Read a JSON object of feature name → value.
pub fn read_input_json(path: &Path) -> Result<RawInput, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open input JSON '{}': {e}", path.display())))?;
    let value: Value = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid input JSON '{}': {e}", path.display())))?;
    raw_input_from_json(&value)
}

/// Convert a JSON object into `RawInput`.
///
/// Strings are taken verbatim, numbers in their JSON spelling. Anything else is
/// rejected so a malformed file is not mistaken for an unrecognized category.
pub fn raw_input_from_json(value: &Value) -> Result<RawInput, AppError> {
    let Value::Object(map) = value else {
        return Err(AppError::new(2, "Input JSON must be an object of feature name -> value."));
    };

    let mut raw = RawInput::new();
    for (name, v) in map {
        let text = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(AppError::new(
                    2,
                    format!("Input JSON field '{name}' must be a string or number, got {other}"),
                ));
            }
        };
        raw.insert(name.clone(), text);
    }
    Ok(raw)
}

/// Parse `NAME=VALUE` (clap value parser for `--set`).
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Read batch rows from a CSV file with a header of feature names.
pub fn read_input_csv(path: &Path) -> Result<Vec<RawInput>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open input CSV '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::new(2, format!("Failed to read CSV row {}: {e}", i + 1)))?;
        let raw: RawInput = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .collect();
        rows.push(raw);
    }

    if rows.is_empty() {
        return Err(AppError::new(2, format!("Input CSV '{}' has no rows.", path.display())));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_numbers_and_strings_become_raw_strings() {
        let value = serde_json::json!({"Gender": "Male", "Age": 31, "Height": 180.5});
        let raw = raw_input_from_json(&value).unwrap();
        assert_eq!(raw.get("Gender"), Some("Male"));
        assert_eq!(raw.get("Age"), Some("31"));
        assert_eq!(raw.get("Height"), Some("180.5"));
    }

    #[test]
    fn json_rejects_non_scalar_values() {
        let value = serde_json::json!({"Gender": ["Male"]});
        let err = raw_input_from_json(&value).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(raw_input_from_json(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("MTRANS=Public_Transportation").unwrap(),
            ("MTRANS".to_string(), "Public_Transportation".to_string())
        );
        assert_eq!(parse_assignment("X=a=b").unwrap().1, "a=b");
        assert!(parse_assignment("Age").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn csv_rows_map_headers_to_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Gender,Age,MTRANS").unwrap();
        writeln!(file, "Female, 24 ,Bike").unwrap();
        writeln!(file, "Male,,Walking").unwrap();

        let rows = read_input_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Age"), Some("24"));
        assert_eq!(rows[0].get("MTRANS"), Some("Bike"));
        // Empty cells count as missing, not as an empty value.
        assert_eq!(rows[1].get("Age"), None);
    }
}
