// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::projection::sigmoid;
use crate::{MemoryError, Result};
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

/// Single LSTM step. Gates are packed `[i, f, g, o]` along the output axis
/// of both weight matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct LstmCell {
    input_dim: usize,
    hidden_dim: usize,
    weight_ih: Array2<f32>,
    weight_hh: Array2<f32>,
    bias: Array1<f32>,
}

impl LstmCell {
    /// Glorot-normal input weights, scaled-normal recurrent weights and a
    /// forget-gate bias of one.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, hidden_dim: usize, rng: &mut R) -> Self {
        let gates = 4 * hidden_dim;
        let ih_std = (2.0 / (input_dim + gates) as f32).sqrt();
        let hh_std = (1.0 / hidden_dim as f32).sqrt();
        let weight_ih = Array2::from_shape_fn((input_dim, gates), |_| {
            ih_std * rng.sample::<f32, _>(StandardNormal)
        });
        let weight_hh = Array2::from_shape_fn((hidden_dim, gates), |_| {
            hh_std * rng.sample::<f32, _>(StandardNormal)
        });
        let mut bias = Array1::zeros(gates);
        bias.slice_mut(s![hidden_dim..2 * hidden_dim]).fill(1.0);
        Self {
            input_dim,
            hidden_dim,
            weight_ih,
            weight_hh,
            bias,
        }
    }

    pub fn from_parts(weight_ih: Array2<f32>, weight_hh: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        let hidden_dim = weight_hh.nrows();
        let gates = 4 * hidden_dim;
        if weight_hh.ncols() != gates {
            return Err(MemoryError::shape(
                "lstm recurrent weights",
                &[hidden_dim, gates],
                &[weight_hh.nrows(), weight_hh.ncols()],
            ));
        }
        if weight_ih.ncols() != gates {
            return Err(MemoryError::shape(
                "lstm input weights",
                &[weight_ih.nrows(), gates],
                &[weight_ih.nrows(), weight_ih.ncols()],
            ));
        }
        if bias.len() != gates {
            return Err(MemoryError::shape("lstm bias", &[gates], &[bias.len()]));
        }
        Ok(Self {
            input_dim: weight_ih.nrows(),
            hidden_dim,
            weight_ih,
            weight_hh,
            bias,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Returns the next `(hidden, cell)` pair.
    pub fn step(
        &self,
        input: ArrayView1<'_, f32>,
        hidden: ArrayView1<'_, f32>,
        cell: ArrayView1<'_, f32>,
    ) -> Result<(Array1<f32>, Array1<f32>)> {
        if input.len() != self.input_dim {
            return Err(MemoryError::shape("lstm input", &[self.input_dim], &[input.len()]));
        }
        if hidden.len() != self.hidden_dim || cell.len() != self.hidden_dim {
            return Err(MemoryError::shape(
                "lstm state",
                &[self.hidden_dim, self.hidden_dim],
                &[hidden.len(), cell.len()],
            ));
        }
        let gates = input.dot(&self.weight_ih) + hidden.dot(&self.weight_hh) + &self.bias;
        let h = self.hidden_dim;
        let mut next_hidden = Array1::zeros(h);
        let mut next_cell = Array1::zeros(h);
        for unit in 0..h {
            let gi = sigmoid(gates[unit]);
            let gf = sigmoid(gates[h + unit]);
            let gg = gates[2 * h + unit].tanh();
            let go = sigmoid(gates[3 * h + unit]);
            let c = gf * cell[unit] + gi * gg;
            next_cell[unit] = c;
            next_hidden[unit] = go * c.tanh();
        }
        Ok((next_hidden, next_cell))
    }
}
