// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Amplicon (ASV) batching pipeline: encodes per-sample taxon sets into
//! integer nucleotide arrays, windows sample indices into plain or
//! group-stratified batches and streams zero-padded tensors with their
//! distance or label targets.

pub mod config;
pub mod cycle;
pub mod dataset;
pub mod encoder;
mod error;
pub mod metadata;
pub mod padding;
pub mod table;
pub mod window;

pub use config::{EncoderConfig, PipelineConfig, Repeat, WindowOptions};
pub use cycle::{Batch, BatchSignature, EpochCycle, TargetShape};
pub use dataset::{AmpliconDataset, SplitCycles, Targets};
pub use encoder::SequenceEncoder;
pub use error::{DataError, Result};
pub use padding::PaddingAssembler;
pub use table::{ObservationIndexList, ObservationTable, TaxonSequences};
pub use window::{BatchWindower, Grouping};
