//! Arg-max with a fixed tie-break.
//!
//! The scan is left to right with a strict `>` comparison, so the first index
//! reaching the maximum wins. Predictions must be reproducible across runs and
//! across front-ends, so this rule is part of the output contract.

/// Index of the largest element, or `None` for an empty slice.
///
/// `NaN` entries never win (every comparison against them is false) unless the
/// first element is `NaN` and nothing compares greater.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let (&first, rest) = values.split_first()?;
    let mut best = first;
    let mut best_index = 0;
    for (i, &v) in rest.iter().enumerate() {
        if v > best {
            best = v;
            best_index = i + 1;
        }
    }
    Some(best_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_maximum_wins() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5, 0.1, 0.0, 0.0, 0.0]), Some(1));
    }

    #[test]
    fn uniform_selects_index_zero() {
        assert_eq!(argmax(&[1.0 / 7.0; 7]), Some(0));
    }

    #[test]
    fn picks_last_when_strictly_largest() {
        assert_eq!(argmax(&[0.1, 0.2, 0.3]), Some(2));
    }

    #[test]
    fn empty_has_no_maximum() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn nan_entries_are_skipped() {
        assert_eq!(argmax(&[0.1, f32::NAN, 0.3, 0.2]), Some(2));
    }
}
