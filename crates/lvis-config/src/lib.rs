// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runtime plumbing shared by the LVis crates: seeded randomness, tracing
//! setup and layered configuration files.

pub mod determinism;
pub mod layered;
pub mod tracing;

pub use layered::{ConfigDiffEvent, ConfigLayer, ConfigLayering, LayeredConfig, LayeredConfigError};
