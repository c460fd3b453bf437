// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use crate::config::{Repeat, WindowOptions};
use crate::dataset::{AmpliconDataset, Targets};
use crate::padding::PaddingAssembler;
use crate::window::BatchWindower;
use crate::{DataError, Result};
use ndarray::{Array2, Array3, ArrayView2};
use rand::rngs::StdRng;
use spiral_config::determinism;
use tracing::debug;

/// One padded window and its targets.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// `(batch, max_rows, width)`; rows past a sample's taxa are zero.
    pub sequences: Array3<i32>,
    /// `(batch, batch)` distances or `(batch, k)` labels.
    pub targets: Array2<f32>,
    /// Sample indices the window was built from.
    pub indices: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetShape {
    Pairwise,
    Labels(usize),
}

/// Shape contract of the batches a cycle yields; the row axis is dynamic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSignature {
    pub batch_size: usize,
    pub width: usize,
    pub target: TargetShape,
}

impl BatchSignature {
    /// `(batch_size, None, width)` where `None` marks the variable row axis.
    pub fn sequence_shape(&self) -> (usize, Option<usize>, usize) {
        (self.batch_size, None, self.width)
    }

    pub fn target_shape(&self) -> (usize, usize) {
        match self.target {
            TargetShape::Pairwise => (self.batch_size, self.batch_size),
            TargetShape::Labels(k) => (self.batch_size, k),
        }
    }

    pub fn accepts(&self, batch: &Batch) -> bool {
        let (b, _, w) = batch.sequences.dim();
        b == self.batch_size && w == self.width && batch.targets.dim() == self.target_shape()
    }
}

/// Lazy stream of [`Batch`] values over one or more passes. Finite cycles end
/// with `None`; `Repeat::Forever` cycles only end when the consumer stops
/// pulling.
pub struct EpochCycle {
    dataset: AmpliconDataset,
    windower: BatchWindower,
    assembler: PaddingAssembler,
    randomize: bool,
    repeat: Repeat,
    rng: StdRng,
    epoch: usize,
    position: usize,
    finished: bool,
}

impl EpochCycle {
    pub(crate) fn new(
        dataset: AmpliconDataset,
        mut windower: BatchWindower,
        options: &WindowOptions,
    ) -> Result<Self> {
        if windower.windows_per_epoch() == 0 {
            return Err(DataError::InvalidConfig(format!(
                "batch_size {} yields no full window over {} samples",
                options.batch_size,
                dataset.len()
            )));
        }
        let assembler = PaddingAssembler::new(dataset.encoder())?;
        let mut rng = determinism::rng_from_optional(options.seed, "st-amplicon.epoch");
        if options.randomize {
            windower.reshuffle(&mut rng);
        }
        debug!(
            samples = dataset.len(),
            windows = windower.windows_per_epoch(),
            grouped = windower.is_grouped(),
            randomize = options.randomize,
            "built epoch cycle"
        );
        Ok(Self {
            dataset,
            windower,
            assembler,
            randomize: options.randomize,
            repeat: options.repeat,
            rng,
            epoch: 0,
            position: 0,
            finished: false,
        })
    }

    /// Zero-based index of the pass currently being served.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn windows_per_epoch(&self) -> usize {
        self.windower.windows_per_epoch()
    }

    pub fn is_finite(&self) -> bool {
        matches!(self.repeat, Repeat::Times(_))
    }

    pub fn signature(&self) -> BatchSignature {
        let target = match self.dataset.targets() {
            Targets::Distances(_) => TargetShape::Pairwise,
            Targets::Labels(labels) => TargetShape::Labels(labels.ncols()),
        };
        BatchSignature {
            batch_size: self.windower.batch_size(),
            width: self.assembler.width(),
            target,
        }
    }

    fn assemble(&self, indices: Vec<usize>) -> Result<Batch> {
        let sequences = self.dataset.sequences();
        let views: Vec<ArrayView2<'_, i32>> = indices.iter().map(|&i| sequences[i].view()).collect();
        let padded = self.assembler.assemble(&views)?;
        let targets = self.dataset.targets().select(&indices);
        Ok(Batch {
            sequences: padded,
            targets,
            indices,
        })
    }

    fn remaining(&self) -> Option<usize> {
        match self.repeat {
            _ if self.finished => Some(0),
            Repeat::Times(passes) => {
                let per_epoch = self.windows_per_epoch();
                Some(
                    passes
                        .saturating_sub(self.epoch)
                        .saturating_mul(per_epoch)
                        .saturating_sub(self.position),
                )
            }
            Repeat::Forever => None,
        }
    }
}

impl Iterator for EpochCycle {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.position >= self.windows_per_epoch() {
            self.epoch += 1;
            if let Repeat::Times(passes) = self.repeat {
                if self.epoch >= passes {
                    self.finished = true;
                    return None;
                }
            }
            if self.randomize {
                self.windower.reshuffle(&mut self.rng);
                debug!(epoch = self.epoch, "reshuffled sample order");
            }
            self.position = 0;
        }
        let indices = self.windower.window(self.position)?;
        self.position += 1;
        Some(self.assemble(indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining() {
            Some(left) => (left, Some(left)),
            None => (usize::MAX, None),
        }
    }
}
