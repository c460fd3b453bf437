// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runtime configuration shared by the amplicon data pipeline and the memory
//! cell: seeded randomness, tracing bootstrap and config-file sections.

pub mod determinism;
pub mod file;
pub mod tracing;

pub use file::{load_section, ConfigFileError};
