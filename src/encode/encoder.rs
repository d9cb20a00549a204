//! Feature encoder.
//!
//! For every slot of the feature schema, in order:
//! 1. look up the raw string by feature name (absent → `MissingFeature`)
//! 2. categorical: map the label to its 1-based code
//!    continuous: parse the number and apply the slot's unit conversion
//! 3. z-score with the slot's training-time statistics
//!
//! Unrecognized categorical values follow the configured `EncodingPolicy`.
//! Numeric parse failures are always errors.

use nalgebra::SVector;
use tracing::{debug, warn};

use crate::domain::{
    EncodeOutput, EncodeWarning, EncodedVector, EncodingPolicy, FEATURE_COUNT, FEATURE_SPEC,
    FeatureKind, FeatureSlot, FeatureSpec, NORMALIZATION_STATS, NormalizationStats, RawInput,
};
use crate::error::PredictError;
use crate::math::standardize;

/// Maps raw form values to the normalized model input.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder<'a> {
    spec: &'a FeatureSpec,
    stats: &'a NormalizationStats,
    policy: EncodingPolicy,
}

impl FeatureEncoder<'static> {
    /// Encoder over the canonical tables.
    pub fn canonical(policy: EncodingPolicy) -> Self {
        Self::new(&FEATURE_SPEC, &NORMALIZATION_STATS, policy)
    }
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(spec: &'a FeatureSpec, stats: &'a NormalizationStats, policy: EncodingPolicy) -> Self {
        Self { spec, stats, policy }
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    /// Encode one request.
    pub fn encode(&self, raw: &RawInput) -> Result<EncodeOutput, PredictError> {
        let mut values = [0.0_f64; FEATURE_COUNT];
        let mut warnings = Vec::new();

        for (i, slot) in self.spec.slots().iter().enumerate() {
            let value = raw
                .get(slot.name)
                .ok_or(PredictError::MissingFeature { feature: slot.name })?;
            values[i] = self.slot_value(slot, value, &mut warnings)?;
        }

        let coded = SVector::from(values);
        let normalized = standardize(&coded, &self.stats.means(), &self.stats.stds());
        debug!(raw = ?coded.as_slice(), normalized = ?normalized.as_slice(), "encoded features");

        Ok(EncodeOutput {
            vector: EncodedVector::new(normalized),
            warnings,
        })
    }

    /// Numeric value of one slot before normalization.
    fn slot_value(
        &self,
        slot: &FeatureSlot,
        raw: &str,
        warnings: &mut Vec<EncodeWarning>,
    ) -> Result<f64, PredictError> {
        let value = raw.trim();
        match slot.kind {
            FeatureKind::Categorical(_) => self.category_code(slot, value, warnings).map(f64::from),
            FeatureKind::Continuous(unit) => {
                let parsed = parse_number(slot.name, value)?;
                Ok(unit.map_or(parsed, |u| u.apply(parsed)))
            }
        }
    }

    fn category_code(
        &self,
        slot: &FeatureSlot,
        value: &str,
        warnings: &mut Vec<EncodeWarning>,
    ) -> Result<u8, PredictError> {
        if let Some(category) = slot.category(value) {
            return Ok(category.code);
        }

        let fallback = match (self.policy, slot.fallback_category()) {
            (EncodingPolicy::Lenient, Some(fallback)) => fallback,
            _ => {
                return Err(PredictError::UnrecognizedCategory {
                    feature: slot.name,
                    value: value.to_string(),
                    expected: slot
                        .categories()
                        .iter()
                        .map(|c| c.label)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        };

        warn!(
            feature = slot.name,
            value,
            fallback = fallback.label,
            code = fallback.code,
            "unrecognized categorical value, using first declared category"
        );
        warnings.push(EncodeWarning {
            feature: slot.name,
            value: value.to_string(),
            fallback,
        });
        Ok(fallback.code)
    }
}

/// Strict float parse: the whole string must be a finite number.
fn parse_number(feature: &'static str, value: &str) -> Result<f64, PredictError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PredictError::InvalidNumericValue {
            feature,
            value: value.to_string(),
        })
}

/// A complete, valid form: a 24-year-old woman whose continuous answers sit at
/// the training means. Used as the TUI starting point and in tests.
pub fn example_input() -> RawInput {
    [
        ("Gender", "Female"),
        ("Age", "24.3126"),
        ("Height", "170.1677"),
        ("Weight", "86.586058"),
        ("family_history", "yes"),
        ("FAVC", "yes"),
        ("FCVC", "2.419043"),
        ("NCP", "2.685628"),
        ("CAEC", "no"),
        ("SMOKE", "no"),
        ("CH2O", "2.008011"),
        ("SCC", "no"),
        ("FAF", "1.010298"),
        ("TUE", "0.657866"),
        ("CALC", "no"),
        ("MTRANS", "Public_Transportation"),
    ]
    .into_iter()
    .collect()
}
