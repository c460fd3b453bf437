// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Fixed-size external memory with cosine content addressing.
//!
//! Weights are laid out `(heads, rows)`, keys and erase/add vectors
//! `(heads, width)`. Every operation returns fresh arrays; a bank is only
//! replaced, never mutated, so a step can be replayed from any saved state.

use crate::{MemoryError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

fn softmax_rows(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    logits
}

fn row_norms(matrix: ArrayView2<'_, f32>, epsilon: f32) -> Array1<f32> {
    matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt() + epsilon)
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryBank {
    content: Array2<f32>,
    epsilon: f32,
}

impl MemoryBank {
    pub fn zeros(rows: usize, width: usize, epsilon: f32) -> Self {
        Self {
            content: Array2::zeros((rows, width)),
            epsilon,
        }
    }

    pub fn from_content(content: Array2<f32>, epsilon: f32) -> Self {
        Self { content, epsilon }
    }

    pub fn content(&self) -> &Array2<f32> {
        &self.content
    }

    pub fn rows(&self) -> usize {
        self.content.nrows()
    }

    pub fn width(&self) -> usize {
        self.content.ncols()
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn check(&self, context: &'static str, array: ArrayView2<'_, f32>, heads: usize, cols: usize) -> Result<()> {
        if array.dim() != (heads, cols) {
            return Err(MemoryError::shape(
                context,
                &[heads, cols],
                &[array.nrows(), array.ncols()],
            ));
        }
        Ok(())
    }

    /// Cosine similarity of each head's key against every row, with
    /// `epsilon` added to both norms.
    pub fn similarity(&self, keys: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.check("addressing keys", keys, keys.nrows(), self.width())?;
        let key_norms = row_norms(keys, self.epsilon);
        let memory_norms = row_norms(self.content.view(), self.epsilon);
        let mut scores = keys.dot(&self.content.t());
        Zip::indexed(&mut scores).for_each(|(head, row), score| {
            *score /= key_norms[head] * memory_norms[row];
        });
        Ok(scores)
    }

    /// Softmax over rows of the cosine similarities; one weight row per head.
    pub fn address(&self, keys: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        Ok(softmax_rows(self.similarity(keys)?))
    }

    /// Like [`MemoryBank::address`] with each head's similarities scaled by
    /// its key strength before the softmax.
    pub fn address_with_strength(
        &self,
        keys: ArrayView2<'_, f32>,
        strengths: ArrayView1<'_, f32>,
    ) -> Result<Array2<f32>> {
        if strengths.len() != keys.nrows() {
            return Err(MemoryError::shape(
                "key strengths",
                &[keys.nrows()],
                &[strengths.len()],
            ));
        }
        let mut scores = self.similarity(keys)?;
        for (mut row, &beta) in scores.axis_iter_mut(Axis(0)).zip(strengths.iter()) {
            row *= beta;
        }
        Ok(softmax_rows(scores))
    }

    /// Erase-then-add: `M'[n, m] = M[n, m] * Π_h clamp(1 - w_e[h, n] e[h, m], 0, 1)
    /// + Σ_h w_a[h, n] a[h, m]`.
    pub fn write(
        &self,
        erase_weights: ArrayView2<'_, f32>,
        add_weights: ArrayView2<'_, f32>,
        erase: ArrayView2<'_, f32>,
        add: ArrayView2<'_, f32>,
    ) -> Result<MemoryBank> {
        let heads = erase_weights.nrows();
        let (rows, width) = (self.rows(), self.width());
        self.check("erase weights", erase_weights, heads, rows)?;
        self.check("add weights", add_weights, heads, rows)?;
        self.check("erase vectors", erase, heads, width)?;
        self.check("add vectors", add, heads, width)?;

        let mut retain = Array2::<f32>::ones((rows, width));
        for head in 0..heads {
            let w = erase_weights.row(head);
            let e = erase.row(head);
            Zip::indexed(&mut retain).for_each(|(n, m), keep| {
                *keep *= (1.0 - w[n] * e[m]).clamp(0.0, 1.0);
            });
        }
        let content = &self.content * &retain + add_weights.t().dot(&add);
        Ok(MemoryBank {
            content,
            epsilon: self.epsilon,
        })
    }

    /// Weighted sum of rows per head, `(heads, width)`.
    pub fn read(&self, weights: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.check("read weights", weights, weights.nrows(), self.rows())?;
        Ok(weights.dot(&self.content))
    }
}
