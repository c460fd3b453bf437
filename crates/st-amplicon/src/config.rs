// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::{DataError, Result};
use serde::Deserialize;
use std::path::Path;

/// Layout of encoded nucleotide rows.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    /// Number of nucleotides per taxon sequence.
    pub seq_len: usize,
    /// Width of the padded per-taxon slot; must be at least `seq_len`.
    pub max_num_per_seq: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            seq_len: 100,
            max_num_per_seq: 100,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.seq_len == 0 {
            return Err(DataError::InvalidConfig("seq_len must be > 0".into()));
        }
        if self.max_num_per_seq < self.seq_len {
            return Err(DataError::InvalidConfig(format!(
                "max_num_per_seq ({}) must be >= seq_len ({})",
                self.max_num_per_seq, self.seq_len
            )));
        }
        Ok(())
    }
}

/// Number of passes an epoch cycle makes over its windows.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Finite: stops after the given number of passes.
    Times(usize),
    /// Unbounded: only stops when the consumer stops pulling.
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Times(1)
    }
}

fn default_limit_fraction() -> f32 {
    1.0
}

/// Options shared by every windowing mode.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WindowOptions {
    pub batch_size: usize,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default)]
    pub repeat: Repeat,
    /// Fraction of the universe visited per plain pass.
    #[serde(default = "default_limit_fraction")]
    pub limit_fraction: f32,
    /// Explicit shuffle seed; falls back to [`spiral_config::determinism`].
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WindowOptions {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            randomize: false,
            repeat: Repeat::default(),
            limit_fraction: default_limit_fraction(),
            seed: None,
        }
    }

    pub fn randomized(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn limit_fraction(mut self, fraction: f32) -> Self {
        self.limit_fraction = fraction;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidConfig("batch_size must be > 0".into()));
        }
        if !(self.limit_fraction > 0.0 && self.limit_fraction <= 1.0) {
            return Err(DataError::InvalidConfig(format!(
                "limit_fraction must lie in (0, 1], got {}",
                self.limit_fraction
            )));
        }
        if self.repeat == Repeat::Times(0) {
            return Err(DataError::InvalidConfig(
                "repeat must be at least one pass".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a training driver needs to turn a table into batch streams.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,
    pub window: WindowOptions,
    /// Counts strictly above this value mark a taxon as present.
    #[serde(default)]
    pub presence_threshold: f32,
    /// When set, this fraction of samples is held out for validation.
    #[serde(default)]
    pub held_out_fraction: Option<f32>,
}

impl PipelineConfig {
    /// Loads the `[pipeline]` section of a TOML or JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: PipelineConfig = spiral_config::load_section(path, &["pipeline"])?
            .ok_or_else(|| {
                DataError::InvalidConfig(format!("{} has no [pipeline] section", path.display()))
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.encoder.validate()?;
        self.window.validate()?;
        if let Some(fraction) = self.held_out_fraction {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(DataError::InvalidConfig(format!(
                    "held_out_fraction must lie in (0, 1), got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn pipeline_section_loads_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "[pipeline]\nheld_out_fraction = 0.2\n\n[pipeline.window]\nbatch_size = 16\nrandomize = true\nrepeat = \"forever\"\n",
        )
        .unwrap();
        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.encoder, EncoderConfig::default());
        assert_eq!(config.window.batch_size, 16);
        assert_eq!(config.window.repeat, Repeat::Forever);
        assert_eq!(config.window.limit_fraction, 1.0);
        assert_eq!(config.held_out_fraction, Some(0.2));
    }

    #[test]
    fn finite_repeat_parses_from_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "[pipeline.window]\nbatch_size = 4\nrepeat = { times = 3 }\n",
        )
        .unwrap();
        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.window.repeat, Repeat::Times(3));
    }

    #[test]
    fn narrow_slot_is_rejected() {
        let config = EncoderConfig {
            seq_len: 150,
            max_num_per_seq: 100,
        };
        assert!(matches!(config.validate(), Err(DataError::InvalidConfig(_))));
    }

    #[test]
    fn window_options_reject_degenerate_values() {
        assert!(WindowOptions::new(0).validate().is_err());
        assert!(WindowOptions::new(4).limit_fraction(0.0).validate().is_err());
        assert!(WindowOptions::new(4)
            .repeat(Repeat::Times(0))
            .validate()
            .is_err());
        assert!(WindowOptions::new(4).validate().is_ok());
    }
}
