//! Export prediction results.
//!
//! - single prediction → JSON record with run metadata
//! - batch → CSV, one line per input row (failures included)

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::pipeline::Prediction;
use crate::domain::{EncodeWarning, FEATURE_SPEC, LABEL_SET, ObesityClass};
use crate::engine::Backend;
use crate::error::{AppError, PredictError};

/// Portable record of one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub encoding_version: &'static str,
    pub backend: Backend,
    pub class: ObesityClass,
    pub label: &'static str,
    pub localized_label: &'static str,
    pub confidence: f64,
    pub probabilities: Vec<ClassProbability>,
    pub warnings: &'a [EncodeWarning],
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassProbability {
    pub class: ObesityClass,
    pub probability: f32,
}

impl<'a> PredictionRecord<'a> {
    pub fn new(prediction: &'a Prediction, backend: Backend, generated_at: DateTime<Utc>) -> Self {
        let result = &prediction.result;
        Self {
            tool: "obp",
            generated_at,
            encoding_version: FEATURE_SPEC.version(),
            backend,
            class: result.class,
            label: result.label(),
            localized_label: result.class.localized_name(),
            confidence: result.confidence,
            probabilities: LABEL_SET
                .iter()
                .zip(&result.probabilities)
                .map(|(class, &probability)| ClassProbability { class, probability })
                .collect(),
            warnings: &prediction.warnings,
        }
    }
}

/// Write a single prediction as pretty JSON.
pub fn write_prediction_json(path: &Path, record: &PredictionRecord<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, record)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Write per-row batch outcomes to CSV.
pub fn write_batch_csv(
    path: &Path,
    results: &[Result<Prediction, PredictError>],
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["row", "class", "confidence", "warnings", "error"];
    header.extend(LABEL_SET.iter().map(|c| c.key()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (i, outcome) in results.iter().enumerate() {
        let mut record = vec![(i + 1).to_string()];
        match outcome {
            Ok(p) => {
                record.push(p.result.class.key().to_string());
                record.push(format!("{:.4}", p.result.confidence));
                record.push(
                    p.warnings
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                );
                record.push(String::new());
                record.extend(p.result.probabilities.iter().map(|v| format!("{v:.6}")));
            }
            Err(e) => {
                record.extend([String::new(), String::new(), String::new(), e.to_string()]);
                record.extend(LABEL_SET.iter().map(|_| String::new()));
            }
        }
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictionResult;

    fn sample_prediction() -> Prediction {
        Prediction {
            result: PredictionResult {
                index: 2,
                class: ObesityClass::ObesityTypeI,
                confidence: 80.0,
                probabilities: vec![0.0, 0.1, 0.8, 0.1, 0.0, 0.0, 0.0],
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn json_record_lists_every_class() {
        let prediction = sample_prediction();
        let record = PredictionRecord::new(&prediction, Backend::Uniform, Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["class"], "Obesity_Type_I");
        assert_eq!(value["backend"], "uniform");
        assert_eq!(value["localized_label"], "Obezite Tip 1");
        assert_eq!(value["encoding_version"], "matlab-alpha-v1");
        assert_eq!(value["probabilities"].as_array().unwrap().len(), 7);
        assert_eq!(value["probabilities"][2]["class"], "Obesity_Type_I");
    }

    #[test]
    fn batch_csv_has_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let results = vec![
            Ok(sample_prediction()),
            Err(PredictError::MissingFeature { feature: "Age" }),
        ];
        write_batch_csv(&path, &results).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("row,class,confidence,warnings,error,Insufficient_Weight"));
        assert!(lines[1].starts_with("1,Obesity_Type_I,80.0000"));
        assert!(lines[2].contains("missing value for feature 'Age'"));
    }
}
