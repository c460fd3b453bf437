// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::config::EncoderConfig;
use crate::table::{ObservationTable, TaxonSequences};
use crate::{DataError, Result};
use ndarray::{Array2, Axis};

/// Code reserved for padding and masking.
pub const MASK_CODE: i32 = 0;

/// Alphabet in channel order; a nucleotide's code is its channel index + 1.
pub const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Integer code for one nucleotide, or `None` outside the alphabet.
pub fn nucleotide_code(base: char) -> Option<i32> {
    NUCLEOTIDES
        .iter()
        .position(|&candidate| candidate == base)
        .map(|channel| channel as i32 + 1)
}

/// Maps ASV nucleotide strings onto the `{0: mask, A: 1, C: 2, G: 3, T: 4}`
/// vocabulary.
#[derive(Clone, Copy, Debug)]
pub struct SequenceEncoder {
    config: EncoderConfig,
}

impl SequenceEncoder {
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes one sequence. `taxon` only labels errors.
    pub fn encode_sequence(&self, taxon: &str, sequence: &str) -> Result<Vec<i32>> {
        let codes = sequence
            .chars()
            .enumerate()
            .map(|(position, base)| {
                nucleotide_code(base).ok_or_else(|| DataError::InvalidNucleotide {
                    taxon: taxon.to_string(),
                    position,
                    found: base,
                })
            })
            .collect::<Result<Vec<i32>>>()?;
        if codes.len() != self.config.seq_len {
            return Err(DataError::ShapeMismatch {
                context: "nucleotide sequence length",
                expected: self.config.seq_len,
                got: codes.len(),
            });
        }
        Ok(codes)
    }

    /// Encodes every taxon once; row `i` belongs to `taxon_ids[i]`.
    pub fn encode_taxa(&self, taxon_ids: &[String], lookup: &TaxonSequences) -> Result<Array2<i32>> {
        self.encode_rows(taxon_ids, lookup, |_| true)
    }

    /// Like [`encode_taxa`](Self::encode_taxa), but only rows where `wanted`
    /// holds are looked up; the rest stay zero.
    fn encode_rows(
        &self,
        taxon_ids: &[String],
        lookup: &TaxonSequences,
        wanted: impl Fn(usize) -> bool,
    ) -> Result<Array2<i32>> {
        let width = self.config.seq_len;
        let mut encoded = Array2::<i32>::zeros((taxon_ids.len(), width));
        for (row, taxon) in taxon_ids.iter().enumerate() {
            if !wanted(row) {
                continue;
            }
            let sequence = lookup
                .sequence(taxon)
                .ok_or_else(|| DataError::MissingTaxon(taxon.clone()))?;
            let codes = self.encode_sequence(taxon, sequence)?;
            for (col, code) in codes.into_iter().enumerate() {
                encoded[[row, col]] = code;
            }
        }
        Ok(encoded)
    }

    /// Selects the rows of `encoded_taxa` named by one observation list.
    pub fn encode_sample(&self, encoded_taxa: &Array2<i32>, indices: &[usize]) -> Result<Array2<i32>> {
        if encoded_taxa.ncols() != self.config.seq_len {
            return Err(DataError::ShapeMismatch {
                context: "encoded taxa width",
                expected: self.config.seq_len,
                got: encoded_taxa.ncols(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= encoded_taxa.nrows()) {
            return Err(DataError::ShapeMismatch {
                context: "observation index",
                expected: encoded_taxa.nrows(),
                got: bad,
            });
        }
        Ok(encoded_taxa.select(Axis(0), indices))
    }

    /// Full table transform: one encoded array per sample, rows in table
    /// order of the present taxa. Taxa no sample observes are never looked up.
    pub fn encode_table(
        &self,
        table: &ObservationTable,
        lookup: &TaxonSequences,
        threshold: f32,
    ) -> Result<Vec<Array2<i32>>> {
        let lists = table.observation_lists(threshold);
        let mut observed = vec![false; table.num_taxa()];
        for &taxon in lists.iter().flatten() {
            observed[taxon] = true;
        }
        let encoded_taxa = self.encode_rows(table.taxon_ids(), lookup, |row| observed[row])?;
        lists
            .iter()
            .map(|indices| self.encode_sample(&encoded_taxa, indices))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn encoder(seq_len: usize) -> SequenceEncoder {
        SequenceEncoder::new(EncoderConfig {
            seq_len,
            max_num_per_seq: seq_len,
        })
        .unwrap()
    }

    #[test]
    fn codes_reserve_zero_for_mask() {
        assert_eq!(nucleotide_code('A'), Some(1));
        assert_eq!(nucleotide_code('T'), Some(4));
        assert_eq!(nucleotide_code('N'), None);
        assert_eq!(encoder(4).encode_sequence("t", "TGCA").unwrap(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn unknown_bases_are_rejected_with_position() {
        let err = encoder(4).encode_sequence("t7", "ACNT").unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidNucleotide { ref taxon, position: 2, found: 'N' } if taxon == "t7"
        ));
        assert!(encoder(4).encode_sequence("t7", "acgt").is_err());
    }

    #[test]
    fn length_must_match_configuration() {
        assert!(matches!(
            encoder(5).encode_sequence("t", "ACGT"),
            Err(DataError::ShapeMismatch { expected: 5, got: 4, .. })
        ));
    }

    #[test]
    fn table_is_encoded_per_sample() {
        let table = ObservationTable::new(
            vec!["s0".into(), "s1".into()],
            vec!["AAC".into(), "GGT".into(), "CTA".into()],
            array![[1.0, 0.0, 2.0], [0.0, 5.0, 0.0]],
        )
        .unwrap();
        let encoded = encoder(3)
            .encode_table(&table, &TaxonSequences::IdIsSequence, 0.0)
            .unwrap();
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0], array![[1, 1, 2], [2, 4, 1]]);
        assert_eq!(encoded[1], array![[3, 3, 4]]);
    }

    #[test]
    fn unobserved_taxa_are_not_encoded() {
        let table = ObservationTable::new(
            vec!["s0".into(), "s1".into()],
            vec!["t0".into(), "t1".into(), "t2".into()],
            array![[1.0, 0.0, 0.0], [3.0, 0.0, 0.5]],
        )
        .unwrap();
        let lookup = TaxonSequences::from_pairs([("t0", "ACG"), ("t2", "ANG")]);
        let encoded = encoder(3).encode_table(&table, &lookup, 0.5).unwrap();
        assert_eq!(encoded[0], array![[1, 2, 3]]);
        assert_eq!(encoded[1], array![[1, 2, 3]]);

        let err = encoder(3).encode_table(&table, &lookup, 0.0).unwrap_err();
        assert!(matches!(err, DataError::InvalidNucleotide { ref taxon, .. } if taxon == "t2"));
    }

    #[test]
    fn missing_lookup_entries_fail() {
        let lookup = TaxonSequences::from_pairs([("t0", "ACG")]);
        let err = encoder(3)
            .encode_taxa(&["t0".to_string(), "t1".to_string()], &lookup)
            .unwrap_err();
        assert!(matches!(err, DataError::MissingTaxon(id) if id == "t1"));
    }

    #[test]
    fn out_of_range_index_is_a_shape_error() {
        let taxa = array![[1, 2], [3, 4]];
        assert!(encoder(2).encode_sample(&taxa, &[0, 2]).is_err());
        assert_eq!(encoder(2).encode_sample(&taxa, &[1]).unwrap(), array![[3, 4]]);
    }
}
