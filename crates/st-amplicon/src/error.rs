// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use spiral_config::ConfigFileError;
use thiserror::Error;

/// Errors surfaced while encoding tables or assembling batches. All of them
/// are configuration or data errors; nothing in the pipeline is retried.
#[derive(Debug, Error)]
pub enum DataError {
    /// Array widths or counts disagree with the configured layout.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// A stratified group has no members.
    #[error("group {group} is empty; stratified batching needs at least one member per group")]
    EmptyGroup { group: usize },
    /// A nucleotide outside `{A, C, G, T}` was encountered.
    #[error("taxon {taxon:?} contains {found:?} at position {position}; expected one of A, C, G, T")]
    InvalidNucleotide {
        taxon: String,
        position: usize,
        found: char,
    },
    /// The taxon lookup has no sequence for an observed taxon.
    #[error("no nucleotide sequence registered for taxon {0:?}")]
    MissingTaxon(String),
    /// Sample or taxon ids that were expected to be present are not.
    #[error("unknown sample id {0:?}")]
    UnknownSample(String),
    /// The distance matrix violates a metric invariant.
    #[error("invalid distance matrix: {0}")]
    InvalidDistances(String),
    /// Generic configuration violation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Config(#[from] ConfigFileError),
}

pub type Result<T> = std::result::Result<T, DataError>;
