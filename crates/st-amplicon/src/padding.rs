// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::config::EncoderConfig;
use crate::{DataError, Result};
use ndarray::{s, Array3, ArrayView2};

/// Stacks variable-row encoded samples into one zero-padded
/// `(batch, max_rows, width)` tensor.
#[derive(Clone, Copy, Debug)]
pub struct PaddingAssembler {
    seq_len: usize,
    width: usize,
}

impl PaddingAssembler {
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            seq_len: config.seq_len,
            width: config.max_num_per_seq,
        })
    }

    /// Width of the padded slot (`max_num_per_seq`).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn assemble(&self, batch: &[ArrayView2<'_, i32>]) -> Result<Array3<i32>> {
        if batch.is_empty() {
            return Err(DataError::ShapeMismatch {
                context: "padding batch size",
                expected: 1,
                got: 0,
            });
        }
        if let Some(bad) = batch.iter().find(|sample| sample.ncols() != self.seq_len) {
            return Err(DataError::ShapeMismatch {
                context: "encoded sequence width",
                expected: self.seq_len,
                got: bad.ncols(),
            });
        }
        let max_rows = batch.iter().map(|sample| sample.nrows()).max().unwrap_or(0);
        let mut out = Array3::<i32>::zeros((batch.len(), max_rows, self.width));
        for (slot, sample) in batch.iter().enumerate() {
            out.slice_mut(s![slot, ..sample.nrows(), ..self.seq_len])
                .assign(sample);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn assembler(seq_len: usize, max_num_per_seq: usize) -> PaddingAssembler {
        PaddingAssembler::new(&EncoderConfig {
            seq_len,
            max_num_per_seq,
        })
        .unwrap()
    }

    #[test]
    fn pads_rows_to_batch_maximum() {
        let a = array![[1, 2], [3, 4], [1, 1]];
        let b = array![[4, 4]];
        let out = assembler(2, 2).assemble(&[a.view(), b.view()]).unwrap();
        assert_eq!(out.dim(), (2, 3, 2));
        assert_eq!(out.slice(s![0, .., ..]), a);
        assert_eq!(out.slice(s![1, 0, ..]), array![4, 4]);
        assert!(out.slice(s![1, 1.., ..]).iter().all(|&v| v == 0));
    }

    #[test]
    fn pads_columns_to_slot_width() {
        let a = array![[1, 2]];
        let out = assembler(2, 5).assemble(&[a.view()]).unwrap();
        assert_eq!(out.dim(), (1, 1, 5));
        assert_eq!(out.slice(s![0, 0, ..]), array![1, 2, 0, 0, 0]);
    }

    #[test]
    fn empty_samples_still_produce_a_rectangle() {
        let empty = Array2::<i32>::zeros((0, 3));
        let out = assembler(3, 3).assemble(&[empty.view(), empty.view()]).unwrap();
        assert_eq!(out.dim(), (2, 0, 3));
    }

    #[test]
    fn width_mismatch_is_fatal() {
        let a = array![[1, 2, 3]];
        assert!(matches!(
            assembler(2, 2).assemble(&[a.view()]),
            Err(DataError::ShapeMismatch { expected: 2, got: 3, .. })
        ));
        assert!(assembler(2, 2).assemble(&[]).is_err());
    }

    #[test]
    fn assembly_is_stable() {
        let a = array![[1, 2], [3, 4]];
        let b = array![[2, 2]];
        let pad = assembler(2, 4);
        let first = pad.assemble(&[a.view(), b.view()]).unwrap();
        let second = pad.assemble(&[a.view(), b.view()]).unwrap();
        assert_eq!(first, second);
    }
}
