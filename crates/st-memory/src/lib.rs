// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Differentiable external memory: a content-addressed [`MemoryBank`] read
//! and written by an LSTM-driven [`MemoryController`]. Recurrent state is a
//! plain value threaded through [`MemoryController::step`].

pub mod bank;
pub mod config;
pub mod controller;
mod error;
pub mod lstm;
pub mod projection;

pub use bank::MemoryBank;
pub use config::MemoryConfig;
pub use controller::{ControllerState, ControllerWeights, MemoryController};
pub use error::{MemoryError, Result};
pub use lstm::LstmCell;
pub use projection::Linear;
