// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! In-memory sample × taxon observation tables and the taxon → nucleotide
//! lookup that the encoder consumes. Parsing biom/TSV files stays with the
//! caller; these types only hold what the pipeline needs.

use crate::{DataError, Result};
use ndarray::{Array2, Axis};
use std::collections::{HashMap, HashSet};

/// Indices into [`ObservationTable::taxon_ids`] of the taxa present in one
/// sample, in table order.
pub type ObservationIndexList = Vec<usize>;

/// Dense sample × taxon count table.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationTable {
    sample_ids: Vec<String>,
    taxon_ids: Vec<String>,
    counts: Array2<f32>,
}

impl ObservationTable {
    /// `counts` is laid out as `(samples, taxa)`.
    pub fn new(sample_ids: Vec<String>, taxon_ids: Vec<String>, counts: Array2<f32>) -> Result<Self> {
        let (rows, cols) = counts.dim();
        if rows != sample_ids.len() {
            return Err(DataError::ShapeMismatch {
                context: "observation table rows",
                expected: sample_ids.len(),
                got: rows,
            });
        }
        if cols != taxon_ids.len() {
            return Err(DataError::ShapeMismatch {
                context: "observation table columns",
                expected: taxon_ids.len(),
                got: cols,
            });
        }
        Ok(Self {
            sample_ids,
            taxon_ids,
            counts,
        })
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn taxon_ids(&self) -> &[String] {
        &self.taxon_ids
    }

    pub fn counts(&self) -> &Array2<f32> {
        &self.counts
    }

    pub fn num_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn num_taxa(&self) -> usize {
        self.taxon_ids.len()
    }

    /// Taxa whose count in `sample` is strictly above `threshold`.
    pub fn present_taxa(&self, sample: usize, threshold: f32) -> ObservationIndexList {
        self.counts
            .row(sample)
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > threshold)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// One [`ObservationIndexList`] per sample.
    pub fn observation_lists(&self, threshold: f32) -> Vec<ObservationIndexList> {
        (0..self.num_samples())
            .map(|sample| self.present_taxa(sample, threshold))
            .collect()
    }

    /// Keeps the samples named in `ids`, preserving table order. Unknown ids
    /// are an error so that metadata and table cannot silently drift apart.
    pub fn filter_samples<S: AsRef<str>>(&self, ids: &[S]) -> Result<Self> {
        let wanted: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let known: HashSet<&str> = self.sample_ids.iter().map(String::as_str).collect();
        if let Some(missing) = wanted.iter().find(|id| !known.contains(*id)) {
            return Err(DataError::UnknownSample((*missing).to_string()));
        }
        let keep: Vec<usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| wanted.contains(id.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        Ok(Self {
            sample_ids: keep.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            taxon_ids: self.taxon_ids.clone(),
            counts: self.counts.select(Axis(0), &keep),
        })
    }

    /// Drops samples and taxa whose total count is zero.
    pub fn remove_empty(&self) -> Self {
        let sample_totals = self.counts.sum_axis(Axis(1));
        let taxon_totals = self.counts.sum_axis(Axis(0));
        let samples: Vec<usize> = (0..self.num_samples())
            .filter(|&i| sample_totals[i] != 0.0)
            .collect();
        let taxa: Vec<usize> = (0..self.num_taxa())
            .filter(|&j| taxon_totals[j] != 0.0)
            .collect();
        Self {
            sample_ids: samples.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            taxon_ids: taxa.iter().map(|&j| self.taxon_ids[j].clone()).collect(),
            counts: self
                .counts
                .select(Axis(0), &samples)
                .select(Axis(1), &taxa),
        }
    }
}

/// Taxon id → nucleotide sequence lookup.
#[derive(Clone, Debug, Default)]
pub enum TaxonSequences {
    /// The taxon id is itself the ASV sequence, as in deblurred tables.
    #[default]
    IdIsSequence,
    /// Explicit mapping.
    Mapped(HashMap<String, String>),
}

impl TaxonSequences {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        TaxonSequences::Mapped(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn sequence<'a>(&'a self, taxon: &'a str) -> Option<&'a str> {
        match self {
            TaxonSequences::IdIsSequence => Some(taxon),
            TaxonSequences::Mapped(map) => map.get(taxon).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn table() -> ObservationTable {
        ObservationTable::new(
            ids("s", 3),
            ids("t", 4),
            array![
                [0.0, 2.0, 0.4, 1.0],
                [0.0, 0.0, 0.0, 0.0],
                [3.0, 0.0, 0.6, 0.0]
            ],
        )
        .unwrap()
    }

    #[test]
    fn observation_lists_respect_threshold() {
        let table = table();
        assert_eq!(table.observation_lists(0.0), vec![vec![1, 2, 3], vec![], vec![0, 2]]);
        assert_eq!(table.observation_lists(0.5), vec![vec![1, 3], vec![], vec![0, 2]]);
    }

    #[test]
    fn remove_empty_drops_zero_rows_and_columns() {
        let table = ObservationTable::new(
            ids("s", 2),
            ids("t", 3),
            array![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        )
        .unwrap()
        .remove_empty();
        assert_eq!(table.sample_ids(), ["s0".to_string()]);
        assert_eq!(table.taxon_ids(), ["t0".to_string()]);
        assert_eq!(table.counts(), &array![[1.0]]);
    }

    #[test]
    fn filter_keeps_table_order_and_rejects_unknown_ids() {
        let table = table();
        let filtered = table.filter_samples(&["s2", "s0"]).unwrap();
        assert_eq!(filtered.sample_ids(), ["s0".to_string(), "s2".to_string()]);
        assert_eq!(filtered.counts().row(1).to_vec(), vec![3.0, 0.0, 0.6, 0.0]);
        assert!(matches!(
            table.filter_samples(&["missing"]),
            Err(DataError::UnknownSample(id)) if id == "missing"
        ));
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let err = ObservationTable::new(ids("s", 2), ids("t", 2), Array2::zeros((3, 2)));
        assert!(matches!(err, Err(DataError::ShapeMismatch { .. })));
    }

    #[test]
    fn lookup_modes() {
        assert_eq!(TaxonSequences::IdIsSequence.sequence("ACGT"), Some("ACGT"));
        let mapped = TaxonSequences::from_pairs([("t0", "AC")]);
        assert_eq!(mapped.sequence("t0"), Some("AC"));
        assert_eq!(mapped.sequence("t1"), None);
    }
}
