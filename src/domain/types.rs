//! Shared domain types.
//!
//! The feature schema, normalization constants and label set are modeled as
//! plain `'static` data so the encoder and every fixture read the same table
//! (see `domain::tables`). Per-request values (`RawInput`, `EncodedVector`,
//! `PredictionResult`) are lightweight and serializable for exports.

use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 16;

/// Number of classes in the model output.
pub const CLASS_COUNT: usize = 7;

/// Tensor shape the model accepts: batch, channel, features, width.
pub const INPUT_SHAPE: [usize; 4] = [1, 1, FEATURE_COUNT, 1];

/// How the encoder treats a categorical value that is not in the slot's enumeration.
///
/// Numeric parse failures are always errors regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPolicy {
    /// Substitute the first declared category and emit a warning.
    #[default]
    Lenient,
    /// Reject the request.
    Strict,
}

/// Unit conversion applied to a continuous value before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitConversion {
    /// The form collects centimeters; the statistics are in meters.
    CentimetersToMeters,
}

impl UnitConversion {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnitConversion::CentimetersToMeters => value / 100.0,
        }
    }
}

/// One entry of a categorical enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub label: &'static str,
    /// 1-based code used at training time.
    pub code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Declared categories, in declaration order. The first entry is the fallback.
    Categorical(&'static [Category]),
    Continuous(Option<UnitConversion>),
}

/// A named input dimension of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSlot {
    pub name: &'static str,
    /// Human-readable prompt for form front-ends.
    pub description: &'static str,
    pub kind: FeatureKind,
}

impl FeatureSlot {
    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FeatureKind::Categorical(_))
    }

    /// Declared categories (empty for continuous slots).
    pub fn categories(&self) -> &'static [Category] {
        match self.kind {
            FeatureKind::Categorical(categories) => categories,
            FeatureKind::Continuous(_) => &[],
        }
    }

    /// Exact lookup of a category label.
    pub fn category(&self, label: &str) -> Option<Category> {
        self.categories().iter().copied().find(|c| c.label == label)
    }

    /// The category substituted for unrecognized values.
    pub fn fallback_category(&self) -> Option<Category> {
        self.categories().first().copied()
    }

    pub fn unit(&self) -> Option<UnitConversion> {
        match self.kind {
            FeatureKind::Continuous(unit) => unit,
            FeatureKind::Categorical(_) => None,
        }
    }
}

/// Ordered model input schema.
///
/// Slot order is the column order the model was trained on.
#[derive(Debug)]
pub struct FeatureSpec {
    version: &'static str,
    slots: [FeatureSlot; FEATURE_COUNT],
}

impl FeatureSpec {
    pub const fn new(version: &'static str, slots: [FeatureSlot; FEATURE_COUNT]) -> Self {
        Self { version, slots }
    }

    /// Version tag of the encoding table.
    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn slots(&self) -> &[FeatureSlot; FEATURE_COUNT] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|s| s.name)
    }
}

/// Per-slot (mean, std) used for z-score normalization, aligned with `FeatureSpec`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    mean: [f64; FEATURE_COUNT],
    std: [f64; FEATURE_COUNT],
}

impl NormalizationStats {
    pub const fn new(mean: [f64; FEATURE_COUNT], std: [f64; FEATURE_COUNT]) -> Self {
        Self { mean, std }
    }

    pub fn mean(&self, slot: usize) -> f64 {
        self.mean[slot]
    }

    pub fn std(&self, slot: usize) -> f64 {
        self.std[slot]
    }

    pub fn means(&self) -> SVector<f64, FEATURE_COUNT> {
        SVector::from(self.mean)
    }

    pub fn stds(&self) -> SVector<f64, FEATURE_COUNT> {
        SVector::from(self.std)
    }

    /// Every std is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.std.iter().all(|s| s.is_finite() && *s > 0.0)
            && self.mean.iter().all(|m| m.is_finite())
    }
}

/// Output classes of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObesityClass {
    #[serde(rename = "Insufficient_Weight")]
    InsufficientWeight,
    #[serde(rename = "Normal_Weight")]
    NormalWeight,
    #[serde(rename = "Obesity_Type_I")]
    ObesityTypeI,
    #[serde(rename = "Obesity_Type_II")]
    ObesityTypeII,
    #[serde(rename = "Obesity_Type_III")]
    ObesityTypeIII,
    #[serde(rename = "Overweight_Level_I")]
    OverweightLevelI,
    #[serde(rename = "Overweight_Level_II")]
    OverweightLevelII,
}

impl ObesityClass {
    /// Dataset key, as used in the training labels.
    pub fn key(self) -> &'static str {
        match self {
            ObesityClass::InsufficientWeight => "Insufficient_Weight",
            ObesityClass::NormalWeight => "Normal_Weight",
            ObesityClass::ObesityTypeI => "Obesity_Type_I",
            ObesityClass::ObesityTypeII => "Obesity_Type_II",
            ObesityClass::ObesityTypeIII => "Obesity_Type_III",
            ObesityClass::OverweightLevelI => "Overweight_Level_I",
            ObesityClass::OverweightLevelII => "Overweight_Level_II",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ObesityClass::InsufficientWeight => "Insufficient Weight",
            ObesityClass::NormalWeight => "Normal Weight",
            ObesityClass::ObesityTypeI => "Obesity Type I",
            ObesityClass::ObesityTypeII => "Obesity Type II",
            ObesityClass::ObesityTypeIII => "Obesity Type III",
            ObesityClass::OverweightLevelI => "Overweight Level I",
            ObesityClass::OverweightLevelII => "Overweight Level II",
        }
    }
}

impl ObesityClass {
    /// Turkish label shown next to the English one.
    pub fn localized_name(self) -> &'static str {
        match self {
            ObesityClass::InsufficientWeight => "Yetersiz Ağırlık",
            ObesityClass::NormalWeight => "Normal Ağırlık",
            ObesityClass::ObesityTypeI => "Obezite Tip 1",
            ObesityClass::ObesityTypeII => "Obezite Tip 2",
            ObesityClass::ObesityTypeIII => "Obezite Tip 3",
            ObesityClass::OverweightLevelI => "Fazla Kilolu Seviye 1",
            ObesityClass::OverweightLevelII => "Fazla Kilolu Seviye 2",
        }
    }

    /// `"<Turkish> (<English>)"`, the form's original result text.
    pub fn bilingual_name(self) -> String {
        format!("{} ({})", self.localized_name(), self.display_name())
    }
}

impl fmt::Display for ObesityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Class labels positionally aligned with the model output.
#[derive(Debug)]
pub struct LabelSet {
    labels: [ObesityClass; CLASS_COUNT],
}

impl LabelSet {
    pub const fn new(labels: [ObesityClass; CLASS_COUNT]) -> Self {
        Self { labels }
    }

    pub fn get(&self, index: usize) -> Option<ObesityClass> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObesityClass> + '_ {
        self.labels.iter().copied()
    }
}

/// Raw form values keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    values: HashMap<String, String>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(&mut self, other: RawInput) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Normalized model input, in slot order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedVector(SVector<f64, FEATURE_COUNT>);

impl EncodedVector {
    pub fn new(values: SVector<f64, FEATURE_COUNT>) -> Self {
        Self(values)
    }

    pub fn get(&self, slot: usize) -> Option<f64> {
        self.0.get(slot).copied()
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

/// Signal raised when a categorical value was replaced by the fallback category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeWarning {
    pub feature: &'static str,
    pub value: String,
    pub fallback: Category,
}

impl fmt::Display for EncodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: unrecognized value '{}', using '{}' (code {})",
            self.feature, self.value, self.fallback.label, self.fallback.code
        )
    }
}

/// Encoder output: the vector plus any fallback warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutput {
    pub vector: EncodedVector,
    pub warnings: Vec<EncodeWarning>,
}

/// Outcome of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub index: usize,
    pub class: ObesityClass,
    /// Winning probability, in percent.
    pub confidence: f64,
    pub probabilities: Vec<f32>,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        self.class.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_input_merge_overrides_existing_keys() {
        let mut base: RawInput = [("Age", "20"), ("Gender", "Male")].into_iter().collect();
        let overlay: RawInput = [("Age", "31")].into_iter().collect();
        base.merge(overlay);
        assert_eq!(base.get("Age"), Some("31"));
        assert_eq!(base.get("Gender"), Some("Male"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn classes_carry_turkish_and_english_names() {
        assert_eq!(
            ObesityClass::InsufficientWeight.bilingual_name(),
            "Yetersiz Ağırlık (Insufficient Weight)"
        );
        assert_eq!(
            ObesityClass::OverweightLevelII.bilingual_name(),
            "Fazla Kilolu Seviye 2 (Overweight Level II)"
        );
    }

    #[test]
    fn height_conversion_is_centimeters_to_meters() {
        let h = UnitConversion::CentimetersToMeters.apply(170.0);
        assert!((h - 1.7).abs() < 1e-12);
    }

    #[test]
    fn class_serializes_as_dataset_key() {
        let json = serde_json::to_string(&ObesityClass::OverweightLevelII).unwrap();
        assert_eq!(json, "\"Overweight_Level_II\"");
        assert_eq!(ObesityClass::ObesityTypeI.to_string(), "Obesity Type I");
    }
}
