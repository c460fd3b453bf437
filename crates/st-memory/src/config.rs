// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::{MemoryError, Result};
use serde::Deserialize;
use std::path::Path;

fn default_controller_units() -> usize {
    32
}

fn default_epsilon() -> f32 {
    1e-6
}

/// Dimensions and switches of one memory cell.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Feature width of each time step fed to the cell.
    pub input_dim: usize,
    pub num_heads: usize,
    pub mem_rows: usize,
    pub mem_vec_size: usize,
    /// Hidden width of the LSTM controller and of the cell's output.
    #[serde(default = "default_controller_units")]
    pub controller_units: usize,
    /// Floor added to every norm in cosine addressing.
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Appends the previous step's addressing weights to each head's input.
    #[serde(default)]
    pub condition_on_prior_weights: bool,
    /// Learns a per-head key strength `1 + softplus(.)` applied before the
    /// addressing softmax.
    #[serde(default)]
    pub sharpen_keys: bool,
    /// Initialiser seed; falls back to [`spiral_config::determinism`].
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MemoryConfig {
    pub fn new(input_dim: usize, num_heads: usize, mem_rows: usize, mem_vec_size: usize) -> Self {
        Self {
            input_dim,
            num_heads,
            mem_rows,
            mem_vec_size,
            controller_units: default_controller_units(),
            epsilon: default_epsilon(),
            condition_on_prior_weights: false,
            sharpen_keys: false,
            seed: None,
        }
    }

    pub fn with_controller_units(mut self, units: usize) -> Self {
        self.controller_units = units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Loads the `[memory]` section of a TOML or JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: MemoryConfig = spiral_config::load_section(path, &["memory"])?
            .ok_or_else(|| {
                MemoryError::InvalidConfig(format!("{} has no [memory] section", path.display()))
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("input_dim", self.input_dim),
            ("num_heads", self.num_heads),
            ("mem_rows", self.mem_rows),
            ("mem_vec_size", self.mem_vec_size),
            ("controller_units", self.controller_units),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, value)| *value == 0) {
            return Err(MemoryError::InvalidConfig(format!("{name} must be > 0")));
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(MemoryError::InvalidConfig(format!(
                "epsilon must be a positive finite value, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    /// Width of the concatenated multi-head read vector.
    pub fn read_width(&self) -> usize {
        self.num_heads * self.mem_vec_size
    }

    /// Width of `x_t = [input, prev_output, prev_read]`.
    pub fn controller_input_dim(&self) -> usize {
        self.input_dim + self.controller_units + self.read_width()
    }

    /// Width of the vector each head projects from.
    pub fn head_input_dim(&self) -> usize {
        let prior = if self.condition_on_prior_weights {
            self.num_heads * self.mem_rows
        } else {
            0
        };
        self.controller_input_dim() + prior
    }
}
