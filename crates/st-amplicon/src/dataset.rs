// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::config::{EncoderConfig, PipelineConfig, Repeat, WindowOptions};
use crate::cycle::EpochCycle;
use crate::encoder::SequenceEncoder;
use crate::table::{ObservationTable, TaxonSequences};
use crate::window::{split_indices, BatchWindower, Grouping};
use crate::{DataError, Result};
use ndarray::{Array2, Axis};
use spiral_config::determinism;
use std::sync::Arc;
use tracing::{info, warn};

const DISTANCE_TOLERANCE: f32 = 1e-5;

/// Per-sample supervision paired with the encoded sequences.
#[derive(Clone, Debug, PartialEq)]
pub enum Targets {
    /// Symmetric pairwise distances `(N, N)`; batches get the `(b, b)`
    /// submatrix.
    Distances(Array2<f32>),
    /// Label rows `(N, k)`; batches get `(b, k)`.
    Labels(Array2<f32>),
}

impl Targets {
    pub fn num_samples(&self) -> usize {
        match self {
            Targets::Distances(matrix) | Targets::Labels(matrix) => matrix.nrows(),
        }
    }

    /// Selects the rows (and, for distances, the columns) named by `indices`.
    pub fn select(&self, indices: &[usize]) -> Array2<f32> {
        match self {
            Targets::Distances(matrix) => matrix
                .select(Axis(0), indices)
                .select(Axis(1), indices),
            Targets::Labels(labels) => labels.select(Axis(0), indices),
        }
    }

    fn subset(&self, indices: &[usize]) -> Self {
        match self {
            Targets::Distances(_) => Targets::Distances(self.select(indices)),
            Targets::Labels(_) => Targets::Labels(self.select(indices)),
        }
    }
}

fn validate_distances(matrix: &Array2<f32>) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(DataError::InvalidDistances(format!(
            "matrix is {rows}x{cols}, expected square"
        )));
    }
    for i in 0..rows {
        if matrix[[i, i]].abs() > DISTANCE_TOLERANCE {
            return Err(DataError::InvalidDistances(format!(
                "diagonal entry {i} is {}",
                matrix[[i, i]]
            )));
        }
        for j in (i + 1)..cols {
            let (upper, lower) = (matrix[[i, j]], matrix[[j, i]]);
            if !upper.is_finite() || upper < 0.0 {
                return Err(DataError::InvalidDistances(format!(
                    "entry ({i}, {j}) is {upper}"
                )));
            }
            if (upper - lower).abs() > DISTANCE_TOLERANCE {
                return Err(DataError::InvalidDistances(format!(
                    "entries ({i}, {j}) = {upper} and ({j}, {i}) = {lower} differ"
                )));
            }
        }
    }
    Ok(())
}

/// Encoded samples and their targets. Cloning is cheap; cycles share the
/// underlying arrays.
#[derive(Clone, Debug)]
pub struct AmpliconDataset {
    sequences: Arc<[Array2<i32>]>,
    targets: Arc<Targets>,
    encoder: EncoderConfig,
}

impl AmpliconDataset {
    pub fn new(sequences: Vec<Array2<i32>>, targets: Targets, encoder: EncoderConfig) -> Result<Self> {
        encoder.validate()?;
        if targets.num_samples() != sequences.len() {
            return Err(DataError::ShapeMismatch {
                context: "target rows",
                expected: sequences.len(),
                got: targets.num_samples(),
            });
        }
        if let Some(bad) = sequences.iter().find(|s| s.ncols() != encoder.seq_len) {
            return Err(DataError::ShapeMismatch {
                context: "encoded sequence width",
                expected: encoder.seq_len,
                got: bad.ncols(),
            });
        }
        if let Targets::Distances(matrix) = &targets {
            validate_distances(matrix)?;
        }
        Ok(Self {
            sequences: sequences.into(),
            targets: Arc::new(targets),
            encoder,
        })
    }

    /// Encodes `table` and pairs it with `targets`, which must follow the
    /// table's sample order.
    pub fn from_table(
        table: &ObservationTable,
        lookup: &TaxonSequences,
        targets: Targets,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let encoder = SequenceEncoder::new(config.encoder)?;
        let sequences = encoder.encode_table(table, lookup, config.presence_threshold)?;
        let dataset = Self::new(sequences, targets, config.encoder)?;
        info!(
            samples = dataset.len(),
            taxa = table.num_taxa(),
            max_present = dataset.max_present(),
            "encoded amplicon table"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[Array2<i32>] {
        &self.sequences
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    /// Largest number of taxa present in any sample.
    pub fn max_present(&self) -> usize {
        self.sequences.iter().map(Array2::nrows).max().unwrap_or(0)
    }

    /// New dataset over `indices`, re-indexed from zero.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= self.len()) {
            return Err(DataError::ShapeMismatch {
                context: "subset index",
                expected: self.len(),
                got: bad,
            });
        }
        Ok(Self {
            sequences: indices.iter().map(|&i| self.sequences[i].clone()).collect(),
            targets: Arc::new(self.targets.subset(indices)),
            encoder: self.encoder,
        })
    }

    /// Partitions once into `(training, validation)` with an independent
    /// permutation seeded from `seed`.
    pub fn split(&self, held_out_fraction: f32, seed: Option<u64>) -> Result<(Self, Self)> {
        let mut rng = determinism::rng_from_optional(seed, "st-amplicon.split");
        let (train, validation) = split_indices(self.len(), held_out_fraction, &mut rng)?;
        info!(
            training = train.len(),
            validation = validation.len(),
            held_out_fraction,
            "split amplicon dataset"
        );
        Ok((self.subset(&train)?, self.subset(&validation)?))
    }

    /// Plain windows over the whole dataset.
    pub fn cycle(&self, options: &WindowOptions) -> Result<EpochCycle> {
        let windower = BatchWindower::plain(self.len(), options)?;
        EpochCycle::new(self.clone(), windower, options)
    }

    /// Group-stratified windows.
    pub fn grouped_cycle(&self, grouping: &Grouping, options: &WindowOptions) -> Result<EpochCycle> {
        if grouping.universe_bound() > self.len() {
            return Err(DataError::ShapeMismatch {
                context: "grouping member index",
                expected: self.len(),
                got: grouping.universe_bound() - 1,
            });
        }
        let windower = BatchWindower::grouped(grouping, options)?;
        EpochCycle::new(self.clone(), windower, options)
    }

    /// Train/validation cycles. Training reshuffles every pass and repeats as
    /// configured; validation keeps its fixed order and makes a single pass.
    /// A held-out partition too small for one window yields no validation
    /// cycle; a training partition that small is an error.
    pub fn split_cycles(&self, held_out_fraction: f32, options: &WindowOptions) -> Result<SplitCycles> {
        let (train, validation) = self.split(held_out_fraction, options.seed)?;
        let train_options = options.clone().randomized(true);
        let validation_options = options.clone().randomized(false).repeat(Repeat::Times(1));
        let windower = BatchWindower::plain(validation.len(), &validation_options)?;
        let validation = if windower.windows_per_epoch() == 0 {
            warn!(
                samples = validation.len(),
                batch_size = options.batch_size,
                "held-out partition holds no full window"
            );
            None
        } else {
            Some(EpochCycle::new(validation, windower, &validation_options)?)
        };
        Ok(SplitCycles {
            train: train.cycle(&train_options)?,
            validation,
        })
    }

    /// Cycles described by a [`PipelineConfig`]: a train/validation pair when
    /// `held_out_fraction` is set, otherwise a single cycle over everything.
    pub fn cycles(&self, config: &PipelineConfig) -> Result<SplitCycles> {
        config.validate()?;
        if config.encoder != self.encoder {
            return Err(DataError::InvalidConfig(format!(
                "pipeline encoder {:?} does not match dataset encoder {:?}",
                config.encoder, self.encoder
            )));
        }
        match config.held_out_fraction {
            Some(fraction) => self.split_cycles(fraction, &config.window),
            None => Ok(SplitCycles {
                train: self.cycle(&config.window)?,
                validation: None,
            }),
        }
    }
}

/// Training cycle plus the optional validation cycle next to it.
pub struct SplitCycles {
    pub train: EpochCycle,
    pub validation: Option<EpochCycle>,
}
