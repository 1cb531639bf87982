// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{DatasetError, Result};

/// Contiguous `[start, end)` slice of the flat image list owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAssignment {
    pub start: usize,
    pub end: usize,
}

impl RowAssignment {
    /// The unsharded case: every row.
    pub fn full(total: usize) -> Self {
        Self {
            start: 0,
            end: total,
        }
    }

    pub fn new(start: usize, end: usize, total: usize) -> Result<Self> {
        if start >= end || end > total {
            return Err(DatasetError::InvalidShard { start, end, total });
        }
        Ok(Self { start, end })
    }

    /// Splits `total` rows across `workers`; the first `total % workers`
    /// ranks receive one extra row.
    pub fn for_worker(total: usize, workers: usize, rank: usize) -> Result<Self> {
        if workers == 0 || rank >= workers {
            return Err(DatasetError::InvalidWorker { rank, workers });
        }
        let base = total / workers;
        let extra = total % workers;
        let start = rank * base + rank.min(extra);
        let len = base + usize::from(rank < extra);
        Self::new(start, start + len, total)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}
