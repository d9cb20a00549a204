//! Canonical encoding tables.
//!
//! These constants must match the offline training export exactly: categories
//! were coded 1-based in alphabetical order, and every column (categorical codes
//! included) was z-scored with the statistics below. There is one table in the
//! crate; fixtures and self-tests read it from here.

use super::types::{
    Category, FeatureKind, FeatureSlot, FeatureSpec, LabelSet, NormalizationStats, ObesityClass,
    UnitConversion,
};

/// Version tag of the tables below.
pub const ENCODING_VERSION: &str = "matlab-alpha-v1";

const GENDER: &[Category] = &[
    Category { label: "Female", code: 1 },
    Category { label: "Male", code: 2 },
];

const NO_YES: &[Category] = &[
    Category { label: "no", code: 1 },
    Category { label: "yes", code: 2 },
];

const FREQUENCY: &[Category] = &[
    Category { label: "Always", code: 1 },
    Category { label: "Frequently", code: 2 },
    Category { label: "Sometimes", code: 3 },
    Category { label: "no", code: 4 },
];

const TRANSPORT: &[Category] = &[
    Category { label: "Automobile", code: 1 },
    Category { label: "Bike", code: 2 },
    Category { label: "Motorbike", code: 3 },
    Category { label: "Public_Transportation", code: 4 },
    Category { label: "Walking", code: 5 },
];

const fn categorical(
    name: &'static str,
    description: &'static str,
    categories: &'static [Category],
) -> FeatureSlot {
    FeatureSlot {
        name,
        description,
        kind: FeatureKind::Categorical(categories),
    }
}

const fn continuous(name: &'static str, description: &'static str) -> FeatureSlot {
    FeatureSlot {
        name,
        description,
        kind: FeatureKind::Continuous(None),
    }
}

pub static FEATURE_SPEC: FeatureSpec = FeatureSpec::new(
    ENCODING_VERSION,
    [
        categorical("Gender", "Gender", GENDER),
        continuous("Age", "Age (years)"),
        FeatureSlot {
            name: "Height",
            description: "Height (cm)",
            kind: FeatureKind::Continuous(Some(UnitConversion::CentimetersToMeters)),
        },
        continuous("Weight", "Weight (kg)"),
        categorical("family_history", "Family history of overweight", NO_YES),
        categorical("FAVC", "Frequent high-calorie food", NO_YES),
        continuous("FCVC", "Vegetables in meals (1-3)"),
        continuous("NCP", "Main meals per day (1-4)"),
        categorical("CAEC", "Food between meals", FREQUENCY),
        categorical("SMOKE", "Smokes", NO_YES),
        continuous("CH2O", "Water per day (1-3)"),
        categorical("SCC", "Monitors calories", NO_YES),
        continuous("FAF", "Physical activity frequency (0-3)"),
        continuous("TUE", "Time on devices (0-2)"),
        categorical("CALC", "Alcohol consumption", FREQUENCY),
        categorical("MTRANS", "Usual transportation", TRANSPORT),
    ],
);

pub static NORMALIZATION_STATS: NormalizationStats = NormalizationStats::new(
    [
        1.5059, 24.3126, 1.7017, 86.5861, 1.8176, 1.8839, 2.4190, 2.6856, 2.8593, 1.0208, 2.0080,
        1.0455, 1.0103, 0.6579, 3.2686, 3.3652,
    ],
    [
        0.5001, 6.3460, 0.0933, 26.1912, 0.3862, 0.3204, 0.5339, 0.7780, 0.4685, 0.1429, 0.6130,
        0.2084, 0.8506, 0.6089, 0.5155, 1.2614,
    ],
);

/// Training-time class order (alphabetical by dataset key).
pub static LABEL_SET: LabelSet = LabelSet::new([
    ObesityClass::InsufficientWeight,
    ObesityClass::NormalWeight,
    ObesityClass::ObesityTypeI,
    ObesityClass::ObesityTypeII,
    ObesityClass::ObesityTypeIII,
    ObesityClass::OverweightLevelI,
    ObesityClass::OverweightLevelII,
]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CLASS_COUNT, FEATURE_COUNT};

    #[test]
    fn tables_have_fixed_sizes() {
        assert_eq!(FEATURE_SPEC.len(), FEATURE_COUNT);
        assert_eq!(LABEL_SET.len(), CLASS_COUNT);
        assert_eq!(FEATURE_SPEC.version(), ENCODING_VERSION);
    }

    #[test]
    fn stds_are_positive() {
        assert!(NORMALIZATION_STATS.is_valid());
    }

    #[test]
    fn slot_names_are_unique_and_in_training_order() {
        let names: Vec<_> = FEATURE_SPEC.names().collect();
        assert_eq!(
            names,
            [
                "Gender", "Age", "Height", "Weight", "family_history", "FAVC", "FCVC", "NCP",
                "CAEC", "SMOKE", "CH2O", "SCC", "FAF", "TUE", "CALC", "MTRANS"
            ]
        );
    }

    #[test]
    fn category_codes_are_one_based_and_contiguous() {
        for slot in FEATURE_SPEC.slots().iter().filter(|s| s.is_categorical()) {
            for (i, category) in slot.categories().iter().enumerate() {
                assert_eq!(category.code as usize, i + 1, "{}:{}", slot.name, category.label);
            }
        }
    }

    #[test]
    fn labels_are_alphabetical_by_key() {
        let keys: Vec<_> = LABEL_SET.iter().map(|c| c.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn only_height_converts_units() {
        let converting: Vec<_> = FEATURE_SPEC
            .slots()
            .iter()
            .filter(|s| s.unit().is_some())
            .map(|s| s.name)
            .collect();
        assert_eq!(converting, ["Height"]);
    }
}
