// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Nested Run ⊃ Epoch ⊃ Trial counters plus the Row counter that walks the
//! dataset. [`TrialCounters::tick`] advances them for one trial and reports
//! every level that rolled over, so callers react to wraparound explicitly.

use serde::{Deserialize, Serialize};

/// Counter levels, outermost first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeScale {
    Run,
    Epoch,
    Trial,
    Row,
}

/// A single `(cur, max)` counter. A `max` of zero never wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub cur: i64,
    pub max: i64,
    /// Set when the last tick moved this counter by carry.
    pub changed: bool,
}

impl Counter {
    pub fn new(max: i64) -> Self {
        Self {
            cur: 0,
            max,
            changed: false,
        }
    }

    /// Increments and returns `true` when the counter wrapped back to zero.
    pub fn incr(&mut self) -> bool {
        self.cur += 1;
        if self.max > 0 && self.cur >= self.max {
            self.cur = 0;
            return true;
        }
        false
    }

    pub fn set(&mut self, cur: i64) {
        self.cur = cur;
    }
}

/// Levels that rolled over during one [`TrialCounters::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollover {
    /// Row wrapped past the end of the active rows; traversal must reshuffle.
    pub row: bool,
    /// Trial wrapped and Epoch advanced.
    pub epoch: bool,
    /// Epoch wrapped and Run advanced.
    pub run: bool,
}

/// The four sequencing counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCounters {
    pub run: Counter,
    pub epoch: Counter,
    pub trial: Counter,
    pub row: Counter,
}

impl TrialCounters {
    pub fn new(runs: i64, epochs: i64, trials: i64, rows: i64) -> Self {
        Self {
            run: Counter::new(runs),
            epoch: Counter::new(epochs),
            trial: Counter::new(trials),
            row: Counter::new(rows),
        }
    }

    /// Restarts at `run`; Row sits at -1 so the first tick lands on row 0.
    pub fn reset(&mut self, run: i64) {
        self.run.set(run);
        self.epoch.set(0);
        self.trial.set(0);
        self.row.set(-1);
        self.run.changed = false;
        self.epoch.changed = false;
    }

    /// Advances Row and Trial by one, carrying into Epoch and Run.
    pub fn tick(&mut self) -> Rollover {
        self.epoch.changed = false;
        self.run.changed = false;

        let mut rollover = Rollover {
            row: self.row.incr(),
            ..Rollover::default()
        };

        if self.trial.incr() {
            self.epoch.changed = true;
            rollover.epoch = true;
            if self.epoch.incr() {
                self.run.cur += 1;
                self.run.changed = true;
                rollover.run = true;
            }
        }
        rollover
    }

    pub fn get(&self, scale: TimeScale) -> &Counter {
        match scale {
            TimeScale::Run => &self.run,
            TimeScale::Epoch => &self.epoch,
            TimeScale::Trial => &self.trial,
            TimeScale::Row => &self.row,
        }
    }

    pub fn get_mut(&mut self, scale: TimeScale) -> &mut Counter {
        match scale {
            TimeScale::Run => &mut self.run,
            TimeScale::Epoch => &mut self.epoch,
            TimeScale::Trial => &mut self.trial,
            TimeScale::Row => &mut self.row,
        }
    }
}
