// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Helpers turning per-sample metadata columns into label matrices and
//! stratification groups.

use crate::window::Grouping;
use crate::{DataError, Result};
use ndarray::Array2;
use tracing::warn;

/// `(N, 1)` labels: `1.0` where the category equals `positive`, else `0.0`.
pub fn binary_categories<S: AsRef<str>>(values: &[S], positive: &str) -> Array2<f32> {
    Array2::from_shape_fn((values.len(), 1), |(row, _)| {
        if values[row].as_ref() == positive {
            1.0
        } else {
            0.0
        }
    })
}

/// `(N, 1)` regression labels.
pub fn scalar_labels(values: &[f32]) -> Array2<f32> {
    Array2::from_shape_fn((values.len(), 1), |(row, _)| values[row])
}

/// Age bands `[i - step, i)` for `i` in `min_age..=max_age` stepping by
/// `step`. Each non-empty band becomes one group of sample indices; empty
/// bands are skipped because they cannot be tiled.
pub fn age_band_grouping(ages: &[f32], step: usize, min_age: usize, max_age: usize) -> Result<Grouping> {
    if step == 0 {
        return Err(DataError::InvalidConfig("age band step must be > 0".into()));
    }
    let mut groups = Vec::new();
    for upper in (min_age..=max_age).step_by(step) {
        let lower = upper as f32 - step as f32;
        let upper = upper as f32;
        let members: Vec<usize> = ages
            .iter()
            .enumerate()
            .filter(|(_, &age)| age >= lower && age < upper)
            .map(|(idx, _)| idx)
            .collect();
        if members.is_empty() {
            warn!(lower, upper, "skipping empty age band");
            continue;
        }
        groups.push(members);
    }
    Grouping::new(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_binary_columns() {
        let labels = binary_categories(&["high", "low", "high"], "high");
        assert_eq!(labels.dim(), (3, 1));
        assert_eq!(labels.column(0).to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn scalar_labels_are_columns() {
        let labels = scalar_labels(&[30.0, 41.5]);
        assert_eq!(labels.dim(), (2, 1));
        assert_eq!(labels[[1, 0]], 41.5);
    }

    #[test]
    fn age_bands_follow_half_open_intervals() {
        let ages = [10.0, 24.9, 25.0, 49.0, 80.0, 99.0, 100.0];
        let grouping = age_band_grouping(&ages, 25, 25, 100).unwrap();
        assert_eq!(
            grouping.groups(),
            &[vec![0, 1], vec![2, 3], vec![4, 5]][..],
            "[0,25) [25,50) [75,100); [50,75) is empty and 100 falls outside"
        );
    }

    #[test]
    fn all_empty_bands_fail() {
        assert!(age_band_grouping(&[200.0], 25, 25, 100).is_err());
        assert!(age_band_grouping(&[30.0], 0, 25, 100).is_err());
    }
}
