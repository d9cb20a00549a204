//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the encoder/pipeline code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::Prediction;
use crate::domain::{
    EncodeOutput, FEATURE_SPEC, FeatureKind, LABEL_SET, NORMALIZATION_STATS, RawInput,
};
use crate::error::PredictError;

/// Width of the probability bars.
const BAR_WIDTH: usize = 30;

/// Format one prediction: winning class, per-class probabilities, warnings.
pub fn format_prediction(prediction: &Prediction) -> String {
    let result = &prediction.result;
    let mut out = String::new();

    out.push_str(&format!(
        "Result: {} ({:.2}%)\n\n",
        result.label(),
        result.confidence
    ));

    out.push_str(&format!("{:<22} {:>8}\n", "class", "prob"));
    out.push_str(&format!("{:-<22} {:-<8}\n", "", ""));
    for (i, class) in LABEL_SET.iter().enumerate() {
        let p = result.probabilities.get(i).copied().unwrap_or(0.0);
        let marker = if i == result.index { "*" } else { " " };
        out.push_str(
            format!(
                "{marker}{:<21} {:>7.2}% {}\n",
                class.display_name(),
                f64::from(p) * 100.0,
                bar(p)
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if !prediction.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &prediction.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

/// Format the encoder output next to the raw values it came from.
pub fn format_encoding(raw: &RawInput, encoded: &EncodeOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!("Encoding table: {}\n\n", FEATURE_SPEC.version()));
    out.push_str(&format!(
        "{:>2} {:<16} {:<22} {:>10}\n",
        "#", "feature", "raw", "z"
    ));
    out.push_str(&format!("{:-<2} {:-<16} {:-<22} {:-<10}\n", "", "", "", ""));

    for (i, slot) in FEATURE_SPEC.slots().iter().enumerate() {
        let z = encoded.vector.get(i).unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{i:>2} {:<16} {:<22} {z:>10.4}\n",
            slot.name,
            truncate(raw.get(slot.name).unwrap_or("").trim(), 22),
        ));
    }

    if !encoded.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &encoded.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

/// Format the canonical tables (slots, codes, statistics, labels).
pub fn format_tables() -> String {
    let mut out = String::new();
    out.push_str(&format!("Encoding table: {}\n\n", FEATURE_SPEC.version()));

    out.push_str(&format!(
        "{:>2} {:<16} {:>9} {:>9}  {}\n",
        "#", "feature", "mean", "std", "encoding"
    ));
    out.push_str(&format!("{:-<2} {:-<16} {:-<9} {:-<9}  {:-<8}\n", "", "", "", "", ""));
    for (i, slot) in FEATURE_SPEC.slots().iter().enumerate() {
        let encoding = match slot.kind {
            FeatureKind::Categorical(categories) => categories
                .iter()
                .map(|c| format!("{}={}", c.label, c.code))
                .collect::<Vec<_>>()
                .join(", "),
            FeatureKind::Continuous(Some(_)) => "number, cm -> m".to_string(),
            FeatureKind::Continuous(None) => "number".to_string(),
        };
        out.push_str(&format!(
            "{i:>2} {:<16} {:>9.4} {:>9.4}  {encoding}\n",
            slot.name,
            NORMALIZATION_STATS.mean(i),
            NORMALIZATION_STATS.std(i),
        ));
    }

    out.push_str("\nLabels:\n");
    for (i, class) in LABEL_SET.iter().enumerate() {
        out.push_str(&format!("{i:>2} {:<20} {}\n", class.key(), class.bilingual_name()));
    }

    out
}

/// One line per batch row plus a class histogram.
pub fn format_batch_summary(results: &[Result<Prediction, PredictError>]) -> String {
    let mut out = String::new();
    let mut counts = vec![0usize; LABEL_SET.len()];
    let mut failed = 0usize;

    for (i, outcome) in results.iter().enumerate() {
        match outcome {
            Ok(p) => {
                if let Some(c) = counts.get_mut(p.result.index) {
                    *c += 1;
                }
                let flag = if p.warnings.is_empty() { "" } else { " (fallback used)" };
                out.push_str(&format!(
                    "{:>5}  {:<22} {:>7.2}%{flag}\n",
                    i + 1,
                    p.result.label(),
                    p.result.confidence
                ));
            }
            Err(e) => {
                failed += 1;
                out.push_str(&format!("{:>5}  {}\n", i + 1, e.status_message()));
            }
        }
    }

    out.push_str(&format!(
        "\nRows: {} | ok: {} | failed: {failed}\n",
        results.len(),
        results.len() - failed
    ));
    for (class, count) in LABEL_SET.iter().zip(&counts) {
        if *count > 0 {
            out.push_str(&format!("  {:<22} {count}\n", class.display_name()));
        }
    }
    out
}

fn bar(p: f32) -> String {
    let filled = (f64::from(p.clamp(0.0, 1.0)) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EncodingPolicy, ObesityClass, PredictionResult};
    use crate::encode::{FeatureEncoder, example_input};

    fn prediction() -> Prediction {
        Prediction {
            result: PredictionResult {
                index: 5,
                class: ObesityClass::OverweightLevelI,
                confidence: 62.5,
                probabilities: vec![0.0, 0.1, 0.0, 0.0, 0.0, 0.625, 0.275],
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn prediction_headline_and_marker() {
        let text = format_prediction(&prediction());
        assert!(text.starts_with("Result: Overweight Level I (62.50%)"));
        let marked: Vec<_> = text.lines().filter(|l| l.starts_with('*')).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].contains("Overweight Level I"));
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn encoding_lists_every_slot() {
        let raw = example_input();
        let encoded = FeatureEncoder::canonical(EncodingPolicy::Lenient)
            .encode(&raw)
            .unwrap();
        let text = format_encoding(&raw, &encoded);
        for name in FEATURE_SPEC.names() {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("Public_Transportation"));
    }

    #[test]
    fn tables_show_version_and_codes() {
        let text = format_tables();
        assert!(text.contains("matlab-alpha-v1"));
        assert!(text.contains("Always=1, Frequently=2, Sometimes=3, no=4"));
        assert!(text.contains("Obesity_Type_III"));
        assert!(text.contains("Obezite Tip 3 (Obesity Type III)"));
    }

    #[test]
    fn batch_summary_counts_failures() {
        let results = vec![
            Ok(prediction()),
            Err(PredictError::MissingFeature { feature: "Age" }),
            Ok(prediction()),
        ];
        let text = format_batch_summary(&results);
        assert!(text.contains("Rows: 3 | ok: 2 | failed: 1"));
        assert!(text.contains("Overweight Level I     2"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
