// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Output targets and response scoring.
//!
//! [`PatternTable`] maps each category to the activation pattern the learner
//! is trained towards; [`Classifier`] ranks a response against that table and
//! [`ScoreTally`] accumulates the results over an epoch.

pub mod classify;
pub mod error;
pub mod metric;
pub mod sparse;
pub mod table;
pub mod tally;

pub use classify::{Classification, Classifier};
pub use error::{PatternError, Result};
pub use metric::Metric;
pub use sparse::SparseParams;
pub use table::{PatternConfig, PatternMode, PatternTable};
pub use tally::{ScoreSummary, ScoreTally};
