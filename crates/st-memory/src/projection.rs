// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::{MemoryError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

pub(crate) fn sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}

pub(crate) fn softplus(value: f32) -> f32 {
    if value > 20.0 {
        value
    } else {
        value.exp().ln_1p()
    }
}

/// Dense affine map `y = x W + b` with `W` laid out as `(inputs, outputs)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    /// Glorot-normal weights and a zero bias.
    pub fn glorot<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let std = (2.0 / (inputs + outputs) as f32).sqrt();
        let weight = Array2::from_shape_fn((inputs, outputs), |_| {
            let sample: f32 = rng.sample(StandardNormal);
            sample * std
        });
        Self {
            weight,
            bias: Array1::zeros(outputs),
        }
    }

    pub fn from_parts(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if weight.ncols() != bias.len() {
            return Err(MemoryError::shape(
                "linear bias",
                &[weight.ncols()],
                &[bias.len()],
            ));
        }
        Ok(Self { weight, bias })
    }

    pub fn inputs(&self) -> usize {
        self.weight.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weight.ncols()
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn forward(&self, input: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        if input.len() != self.inputs() {
            return Err(MemoryError::shape(
                "linear input",
                &[self.inputs()],
                &[input.len()],
            ));
        }
        Ok(input.dot(&self.weight) + &self.bias)
    }

    /// Forward pass reshaped to `(heads, width)`.
    pub(crate) fn forward_heads(&self, input: ArrayView1<'_, f32>, heads: usize) -> Result<Array2<f32>> {
        let flat = self.forward(input)?;
        let width = flat.len() / heads;
        flat.into_shape((heads, width))
            .map_err(|_| MemoryError::shape("head projection", &[heads, width], &[self.outputs()]))
    }
}
