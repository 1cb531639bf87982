// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;

/// Running per-epoch score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTally {
    trials: usize,
    errors: usize,
    errors2: usize,
    /// `confusion[truth][best]`.
    confusion: Vec<Vec<usize>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub trials: usize,
    pub pct_correct: f32,
    pub pct_correct2: f32,
}

impl ScoreTally {
    pub fn new(categories: usize) -> Self {
        Self {
            confusion: vec![vec![0; categories]; categories],
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: &Classification, truth: usize) {
        self.trials += 1;
        self.errors += usize::from(result.err);
        self.errors2 += usize::from(result.err2);
        let needed = truth.max(result.best) + 1;
        if self.confusion.len() < needed {
            for row in &mut self.confusion {
                row.resize(needed, 0);
            }
            self.confusion.resize(needed, vec![0; needed]);
        }
        self.confusion[truth][result.best] += 1;
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn pct_correct(&self) -> f32 {
        self.pct(self.errors)
    }

    /// Percent of trials where the truth was among the two nearest patterns.
    pub fn pct_correct2(&self) -> f32 {
        self.pct(self.errors2)
    }

    fn pct(&self, errors: usize) -> f32 {
        if self.trials == 0 {
            0.0
        } else {
            100.0 * (self.trials - errors) as f32 / self.trials as f32
        }
    }

    pub fn confusion(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            trials: self.trials,
            pct_correct: self.pct_correct(),
            pct_correct2: self.pct_correct2(),
        }
    }

    /// Clears counts, keeping the confusion matrix size.
    pub fn reset(&mut self) {
        let n = self.confusion.len();
        *self = Self::new(n);
    }
}
