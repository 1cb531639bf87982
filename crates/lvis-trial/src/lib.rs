// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dataset indexing and trial sequencing.
//!
//! [`DatasetIndex`] turns an image tree into category-ordered train/test
//! lists; [`TrialSequencer`] walks a worker's [`RowAssignment`] of one of those
//! lists trial by trial.

pub mod catalog;
pub mod counter;
pub mod error;
pub mod index;
pub mod sequencer;
pub mod shard;

pub use catalog::CategoryCatalog;
pub use counter::{Counter, Rollover, TimeScale, TrialCounters};
pub use error::{DatasetError, Result};
pub use index::{CachePaths, DatasetIndex, ImageEntry, IndexOptions, Split};
pub use sequencer::{SequencerConfig, TrialSequencer};
pub use shard::RowAssignment;
