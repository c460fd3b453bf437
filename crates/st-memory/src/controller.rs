// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::bank::MemoryBank;
use crate::config::MemoryConfig;
use crate::lstm::LstmCell;
use crate::projection::{sigmoid, softplus, Linear};
use crate::{MemoryError, Result};
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use spiral_config::determinism;
use tracing::{debug, info};

fn flatten(matrix: &Array2<f32>) -> Array1<f32> {
    matrix.iter().copied().collect()
}

fn concat(parts: &[ArrayView1<'_, f32>]) -> Result<Array1<f32>> {
    concatenate(Axis(0), parts)
        .map_err(|_| MemoryError::InvalidConfig("cannot concatenate controller input".into()))
}

fn strength_projection<R: Rng + ?Sized>(config: &MemoryConfig, rng: &mut R) -> Option<Linear> {
    if config.sharpen_keys {
        Some(Linear::glorot(config.head_input_dim(), config.num_heads, rng))
    } else {
        None
    }
}

/// Learned parameters of the controller. Write and read heads each project
/// from the same controller input `x_t`, optionally extended by their own
/// previous addressing weights.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerWeights {
    pub write_key: Linear,
    /// Passed through a sigmoid.
    pub write_erase: Linear,
    /// Used as is; add content is unconstrained in sign.
    pub write_add: Linear,
    pub write_strength: Option<Linear>,
    pub read_key: Linear,
    pub read_strength: Option<Linear>,
    pub lstm: LstmCell,
}

impl ControllerWeights {
    pub fn init<R: Rng + ?Sized>(config: &MemoryConfig, rng: &mut R) -> Self {
        let inputs = config.head_input_dim();
        let projected = config.read_width();
        let write_key = Linear::glorot(inputs, projected, rng);
        let write_erase = Linear::glorot(inputs, projected, rng);
        let write_add = Linear::glorot(inputs, projected, rng);
        let write_strength = strength_projection(config, rng);
        let read_key = Linear::glorot(inputs, projected, rng);
        let read_strength = strength_projection(config, rng);
        let lstm = LstmCell::new(config.read_width(), config.controller_units, rng);
        Self {
            write_key,
            write_erase,
            write_add,
            write_strength,
            read_key,
            read_strength,
            lstm,
        }
    }

    fn validate(&self, config: &MemoryConfig) -> Result<()> {
        let inputs = config.head_input_dim();
        let projected = config.read_width();
        let projections = [
            ("write key projection", &self.write_key, projected),
            ("erase projection", &self.write_erase, projected),
            ("add projection", &self.write_add, projected),
            ("read key projection", &self.read_key, projected),
        ];
        let strengths = [
            ("write strength projection", self.write_strength.as_ref()),
            ("read strength projection", self.read_strength.as_ref()),
        ];
        for (context, linear, outputs) in projections.into_iter().chain(
            strengths
                .into_iter()
                .filter_map(|(context, linear)| linear.map(|l| (context, l, config.num_heads))),
        ) {
            if (linear.inputs(), linear.outputs()) != (inputs, outputs) {
                return Err(MemoryError::shape(
                    context,
                    &[inputs, outputs],
                    &[linear.inputs(), linear.outputs()],
                ));
            }
        }
        if config.sharpen_keys != self.write_strength.is_some()
            || config.sharpen_keys != self.read_strength.is_some()
        {
            return Err(MemoryError::InvalidConfig(
                "key strength projections must be present exactly when sharpen_keys is set".into(),
            ));
        }
        if (self.lstm.input_dim(), self.lstm.hidden_dim()) != (projected, config.controller_units) {
            return Err(MemoryError::shape(
                "lstm controller",
                &[projected, config.controller_units],
                &[self.lstm.input_dim(), self.lstm.hidden_dim()],
            ));
        }
        Ok(())
    }
}

/// Everything carried from one time step to the next. Owned by the caller;
/// [`MemoryController::step`] consumes a borrowed state and returns a new
/// one.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerState {
    pub bank: MemoryBank,
    /// `(heads, rows)` weights used by the last write.
    pub write_weights: Array2<f32>,
    /// `(heads, rows)` weights used by the last read.
    pub read_weights: Array2<f32>,
    pub prev_output: Array1<f32>,
    /// Concatenated per-head reads, `heads * mem_vec_size`.
    pub prev_read: Array1<f32>,
    pub hidden: Array1<f32>,
    pub cell: Array1<f32>,
}

impl ControllerState {
    pub fn zeros(config: &MemoryConfig) -> Self {
        let units = config.controller_units;
        Self {
            bank: MemoryBank::zeros(config.mem_rows, config.mem_vec_size, config.epsilon),
            write_weights: Array2::zeros((config.num_heads, config.mem_rows)),
            read_weights: Array2::zeros((config.num_heads, config.mem_rows)),
            prev_output: Array1::zeros(units),
            prev_read: Array1::zeros(config.read_width()),
            hidden: Array1::zeros(units),
            cell: Array1::zeros(units),
        }
    }
}

/// NTM-style recurrent cell: a write head and a read head over one
/// [`MemoryBank`], feeding an LSTM controller.
#[derive(Clone, Debug)]
pub struct MemoryController {
    config: MemoryConfig,
    weights: ControllerWeights,
}

impl MemoryController {
    /// Random initialisation seeded from `config.seed` or the process-wide
    /// determinism settings.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = determinism::rng_from_optional(config.seed, "st-memory.init");
        let weights = ControllerWeights::init(&config, &mut rng);
        info!(
            heads = config.num_heads,
            rows = config.mem_rows,
            width = config.mem_vec_size,
            units = config.controller_units,
            sharpen_keys = config.sharpen_keys,
            "initialised memory controller"
        );
        Ok(Self { config, weights })
    }

    pub fn with_weights(config: MemoryConfig, weights: ControllerWeights) -> Result<Self> {
        config.validate()?;
        weights.validate(&config)?;
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn weights(&self) -> &ControllerWeights {
        &self.weights
    }

    pub fn output_dim(&self) -> usize {
        self.config.controller_units
    }

    fn head_input(&self, x: &Array1<f32>, prior: &Array2<f32>) -> Result<Array1<f32>> {
        if self.config.condition_on_prior_weights {
            concat(&[x.view(), flatten(prior).view()])
        } else {
            Ok(x.clone())
        }
    }

    fn address(
        &self,
        bank: &MemoryBank,
        key: &Linear,
        strength: Option<&Linear>,
        input: &Array1<f32>,
    ) -> Result<Array2<f32>> {
        let keys = key.forward_heads(input.view(), self.config.num_heads)?;
        match strength {
            Some(projection) => {
                let beta = projection.forward(input.view())?.mapv(|v| 1.0 + softplus(v));
                bank.address_with_strength(keys.view(), beta.view())
            }
            None => bank.address(keys.view()),
        }
    }

    fn check_state(&self, state: &ControllerState) -> Result<()> {
        let config = &self.config;
        let heads_by_rows = (config.num_heads, config.mem_rows);
        let shapes = [
            ("bank", state.bank.content().dim(), (config.mem_rows, config.mem_vec_size)),
            ("write weights", state.write_weights.dim(), heads_by_rows),
            ("read weights", state.read_weights.dim(), heads_by_rows),
        ];
        for (context, got, want) in shapes {
            if got != want {
                return Err(MemoryError::shape(context, &[want.0, want.1], &[got.0, got.1]));
            }
        }
        let units = config.controller_units;
        let vectors = [
            ("previous output", state.prev_output.len(), units),
            ("previous read", state.prev_read.len(), config.read_width()),
            ("hidden state", state.hidden.len(), units),
            ("cell state", state.cell.len(), units),
        ];
        for (context, got, want) in vectors {
            if got != want {
                return Err(MemoryError::shape(context, &[want], &[got]));
            }
        }
        Ok(())
    }

    /// One time step: write on the current bank, read from the updated bank,
    /// advance the LSTM. `state` is left untouched.
    pub fn step(&self, state: &ControllerState, input: ArrayView1<'_, f32>) -> Result<ControllerState> {
        if input.len() != self.config.input_dim {
            return Err(MemoryError::shape(
                "step input",
                &[self.config.input_dim],
                &[input.len()],
            ));
        }
        self.check_state(state)?;
        let heads = self.config.num_heads;
        let w = &self.weights;
        let x = concat(&[input.reborrow(), state.prev_output.view(), state.prev_read.view()])?;

        let write_input = self.head_input(&x, &state.write_weights)?;
        let write_weights = self.address(
            &state.bank,
            &w.write_key,
            w.write_strength.as_ref(),
            &write_input,
        )?;
        let erase = w
            .write_erase
            .forward_heads(write_input.view(), heads)?
            .mapv(sigmoid);
        let add = w.write_add.forward_heads(write_input.view(), heads)?;
        let bank = state
            .bank
            .write(write_weights.view(), write_weights.view(), erase.view(), add.view())?;

        let read_input = self.head_input(&x, &state.read_weights)?;
        let read_weights = self.address(&bank, &w.read_key, w.read_strength.as_ref(), &read_input)?;
        let read = flatten(&bank.read(read_weights.view())?);

        let (hidden, cell) = w.lstm.step(read.view(), state.hidden.view(), state.cell.view())?;
        Ok(ControllerState {
            bank,
            write_weights,
            read_weights,
            prev_output: hidden.clone(),
            prev_read: read,
            hidden,
            cell,
        })
    }

    /// Runs one `(time, features)` sequence from a zeroed state and returns
    /// the final state.
    pub fn run_sequence(&self, sequence: ArrayView2<'_, f32>) -> Result<ControllerState> {
        if sequence.ncols() != self.config.input_dim {
            return Err(MemoryError::shape(
                "sequence features",
                &[sequence.nrows(), self.config.input_dim],
                &[sequence.nrows(), sequence.ncols()],
            ));
        }
        sequence
            .rows()
            .into_iter()
            .try_fold(ControllerState::zeros(&self.config), |state, row| {
                self.step(&state, row)
            })
    }

    /// `(batch, time, features)` → `(batch, controller_units)`: the last
    /// output of each sequence, every sequence starting from zeros.
    pub fn forward(&self, batch: ArrayView3<'_, f32>) -> Result<Array2<f32>> {
        let (samples, steps, features) = batch.dim();
        if features != self.config.input_dim {
            return Err(MemoryError::shape(
                "batch features",
                &[samples, steps, self.config.input_dim],
                &[samples, steps, features],
            ));
        }
        let mut out = Array2::zeros((samples, self.output_dim()));
        for (sample, sequence) in batch.outer_iter().enumerate() {
            let state = self.run_sequence(sequence)?;
            out.row_mut(sample).assign(&state.prev_output);
        }
        debug!(samples, steps, "memory controller forward");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> MemoryConfig {
        MemoryConfig::new(3, 2, 4, 5).with_controller_units(6).with_seed(17)
    }

    #[test]
    fn step_leaves_the_input_state_untouched() {
        let controller = MemoryController::new(config()).unwrap();
        let state = ControllerState::zeros(controller.config());
        let snapshot = state.clone();
        let next = controller.step(&state, array![1.0, -0.5, 2.0].view()).unwrap();
        assert_eq!(state, snapshot);
        assert_ne!(next.bank, state.bank);
        assert_eq!(next.prev_output, next.hidden);
        assert_eq!(next.prev_read.len(), 10);
        for weights in [&next.write_weights, &next.read_weights] {
            for row in weights.rows() {
                assert!((row.sum() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn seeded_controllers_agree() {
        let a = MemoryController::new(config()).unwrap();
        let b = MemoryController::new(config()).unwrap();
        assert_eq!(a.weights(), b.weights());
        let sequence = Array2::from_shape_fn((5, 3), |(t, f)| (t as f32 - f as f32) * 0.3);
        assert_eq!(
            a.run_sequence(sequence.view()).unwrap(),
            b.run_sequence(sequence.view()).unwrap()
        );
    }

    #[test]
    fn forward_starts_each_sequence_from_zero() {
        let controller = MemoryController::new(config()).unwrap();
        let batch = Array3::from_shape_fn((3, 4, 3), |(b, t, f)| ((b * 7 + t * 3 + f) % 5) as f32 - 2.0);
        let out = controller.forward(batch.view()).unwrap();
        assert_eq!(out.dim(), (3, 6));
        for sample in 0..3 {
            let alone = controller
                .run_sequence(batch.index_axis(Axis(0), sample))
                .unwrap();
            assert_eq!(out.row(sample), alone.prev_output);
        }
    }

    #[test]
    fn optional_heads_are_wired() {
        let mut config = config();
        config.sharpen_keys = true;
        config.condition_on_prior_weights = true;
        let controller = MemoryController::new(config).unwrap();
        assert!(controller.weights().write_strength.is_some());
        assert_eq!(controller.weights().read_key.inputs(), 3 + 6 + 10 + 8);
        let state = controller
            .run_sequence(Array2::ones((3, 3)).view())
            .unwrap();
        assert!(state.hidden.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn foreign_weights_are_validated() {
        let mut rng = StdRng::seed_from_u64(0);
        let weights = ControllerWeights::init(&config(), &mut rng);
        let wider = MemoryConfig::new(4, 2, 4, 5).with_controller_units(6);
        assert!(matches!(
            MemoryController::with_weights(wider, weights.clone()),
            Err(MemoryError::ShapeMismatch { .. })
        ));
        let mut sharp = config();
        sharp.sharpen_keys = true;
        assert!(MemoryController::with_weights(sharp, weights.clone()).is_err());
        assert!(MemoryController::with_weights(config(), weights).is_ok());
    }

    #[test]
    fn bad_inputs_are_shape_errors() {
        let controller = MemoryController::new(config()).unwrap();
        let state = ControllerState::zeros(controller.config());
        assert!(controller.step(&state, array![1.0].view()).is_err());
        let other = ControllerState::zeros(&MemoryConfig::new(3, 1, 4, 5).with_controller_units(6));
        assert!(controller.step(&other, array![1.0, 2.0, 3.0].view()).is_err());
        assert!(controller.forward(Array3::zeros((2, 3, 4)).view()).is_err());
    }

    #[test]
    fn mismatched_state_names_the_offending_part() {
        let controller = MemoryController::new(config()).unwrap();
        let input = array![1.0, 2.0, 3.0];
        let wide_rows = ControllerState::zeros(&MemoryConfig::new(3, 2, 4, 7).with_controller_units(6));
        assert!(matches!(
            controller.step(&wide_rows, input.view()),
            Err(MemoryError::ShapeMismatch { context: "bank", .. })
        ));
        let mut short_cell = ControllerState::zeros(controller.config());
        short_cell.cell = Array1::zeros(5);
        assert!(matches!(
            controller.step(&short_cell, input.view()),
            Err(MemoryError::ShapeMismatch { context: "cell state", .. })
        ));
    }
}
