// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Trial ordering over a worker's shard of the flat image list.
//!
//! The Row counter walks the shard's active rows. Each row is first mapped to
//! its dataset index and, unless the sequencer is sequential, remapped through
//! a permutation of the *whole* dataset that is redrawn every time Row wraps.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use lvis_config::determinism;

use crate::counter::{Rollover, TrialCounters};
use crate::error::{DatasetError, Result};
use crate::index::ImageEntry;
use crate::shard::RowAssignment;

/// Sequencer knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Visit rows in order instead of through the shuffle permutation.
    pub sequential: bool,
    /// Trials per epoch; defaults to the number of active rows.
    pub trials_per_epoch: Option<usize>,
    /// Epochs per run, zero for unbounded.
    pub epochs: usize,
    /// Number of runs, zero for unbounded.
    pub runs: usize,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            sequential: false,
            trials_per_epoch: None,
            epochs: 0,
            runs: 0,
            start_row: None,
            end_row: None,
            seed: None,
        }
    }
}

impl SequencerConfig {
    /// Resolves the configured row bounds against a dataset of `total` rows.
    pub fn assignment(&self, total: usize) -> Result<RowAssignment> {
        match (self.start_row, self.end_row) {
            (None, None) => Ok(RowAssignment::full(total)),
            (start, end) => RowAssignment::new(start.unwrap_or(0), end.unwrap_or(total), total),
        }
    }
}

/// Every worker over the same dataset derives the same permutation from this
/// label, so disjoint shards stay disjoint after remapping.
fn shuffle_label(dataset_len: usize) -> String {
    format!("lvis-trial/sequencer:{dataset_len}")
}

/// Hierarchical trial counters bound to a row shard and a shuffle order.
///
/// A shuffled shard needs a permutation shared with its sibling workers: an
/// explicit seed, or label seeding via `LVIS_DETERMINISTIC`. Without either,
/// [`TrialSequencer::new`] refuses the shard.
#[derive(Debug)]
pub struct TrialSequencer {
    counters: TrialCounters,
    rows: Vec<usize>,
    order: Vec<usize>,
    sequential: bool,
    shuffles: usize,
    rng: StdRng,
}

impl TrialSequencer {
    pub fn new(
        config: &SequencerConfig,
        dataset_len: usize,
        assignment: RowAssignment,
    ) -> Result<Self> {
        if assignment.is_empty() || dataset_len == 0 {
            return Err(DatasetError::EmptyShard);
        }
        if assignment.end > dataset_len {
            return Err(DatasetError::InvalidShard {
                start: assignment.start,
                end: assignment.end,
                total: dataset_len,
            });
        }
        let sharded = assignment != RowAssignment::full(dataset_len);
        if sharded
            && !config.sequential
            && config.seed.is_none()
            && !determinism::config().enabled
        {
            return Err(DatasetError::UnseededShard {
                start: assignment.start,
                end: assignment.end,
            });
        }
        let rows: Vec<usize> = assignment.rows().collect();
        let trials = config.trials_per_epoch.unwrap_or(rows.len());
        let label = shuffle_label(dataset_len);
        let mut sequencer = Self {
            counters: TrialCounters::new(
                config.runs as i64,
                config.epochs as i64,
                trials as i64,
                rows.len() as i64,
            ),
            rows,
            order: (0..dataset_len).collect(),
            sequential: config.sequential,
            shuffles: 0,
            rng: determinism::rng_from_optional(config.seed, &label),
        };
        sequencer.init(0);
        Ok(sequencer)
    }

    /// Resets the counters for `run` and draws a fresh permutation.
    pub fn init(&mut self, run: i64) {
        self.counters.reset(run);
        self.counters.row.max = self.rows.len() as i64;
        self.permute();
        self.shuffles = 0;
        debug!(
            run,
            rows = self.rows.len(),
            sequential = self.sequential,
            "sequencer initialised"
        );
    }

    /// Advances one trial. A Row wraparound reshuffles the traversal order.
    pub fn step(&mut self) -> Rollover {
        let rollover = self.counters.tick();
        if rollover.row {
            self.reshuffle();
        }
        if rollover.epoch {
            debug!(
                run = self.counters.run.cur,
                epoch = self.counters.epoch.cur,
                "epoch advanced"
            );
        }
        rollover
    }

    /// Dataset index for the current row.
    ///
    /// Row -1 (before the first step) reads as row 0. A row past the active
    /// range is pulled back to 0 and the order reshuffled.
    pub fn current_index(&mut self) -> usize {
        if self.counters.row.cur >= self.rows.len() as i64 {
            trace!(row = self.counters.row.cur, "row out of range, wrapping");
            self.counters.row.set(0);
            self.reshuffle();
        }
        let row = self.counters.row.cur.max(0) as usize;
        let index = self.rows[row];
        if self.sequential {
            index
        } else {
            self.order[index]
        }
    }

    /// Resolves the current entry in the flat list this sequencer was built for.
    pub fn current_entry<'a>(&mut self, entries: &'a [ImageEntry]) -> Option<&'a ImageEntry> {
        let index = self.current_index();
        entries.get(index)
    }

    fn reshuffle(&mut self) {
        self.permute();
        self.shuffles += 1;
    }

    fn permute(&mut self) {
        if !self.sequential {
            self.order.shuffle(&mut self.rng);
        }
    }

    pub fn counters(&self) -> &TrialCounters {
        &self.counters
    }

    /// Mutable access for restoring checkpointed counter values.
    pub fn counters_mut(&mut self) -> &mut TrialCounters {
        &mut self.counters
    }

    /// Active dataset rows owned by this sequencer.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Current permutation over the whole dataset.
    pub fn permutation(&self) -> &[usize] {
        &self.order
    }

    /// Reshuffles since the last [`TrialSequencer::init`].
    pub fn shuffles(&self) -> usize {
        self.shuffles
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sequential: bool) -> SequencerConfig {
        SequencerConfig {
            sequential,
            seed: Some(11),
            ..SequencerConfig::default()
        }
    }

    fn is_bijection(perm: &[usize]) -> bool {
        let mut seen = vec![false; perm.len()];
        for &p in perm {
            if p >= perm.len() || seen[p] {
                return false;
            }
            seen[p] = true;
        }
        true
    }

    #[test]
    fn permutations_are_bijections() {
        for n in [1usize, 2, 7, 64, 301] {
            let mut seq =
                TrialSequencer::new(&config(false), n, RowAssignment::full(n)).unwrap();
            assert!(is_bijection(seq.permutation()));
            for _ in 0..(2 * n + 1) {
                seq.step();
                assert!(is_bijection(seq.permutation()));
            }
        }
    }

    #[test]
    fn sequential_pass_is_in_order() {
        let mut seq = TrialSequencer::new(&config(true), 20, RowAssignment::new(5, 12, 20).unwrap())
            .unwrap();
        let visited: Vec<usize> = (0..7)
            .map(|_| {
                seq.step();
                seq.current_index()
            })
            .collect();
        assert_eq!(visited, (5..12).collect::<Vec<_>>());
    }

    #[test]
    fn shuffled_pass_visits_each_row_once_and_reshuffles_once() {
        let n = 9;
        let mut seq = TrialSequencer::new(&config(false), n, RowAssignment::full(n)).unwrap();
        for pass in 0..3 {
            let mut seen = vec![0usize; n];
            for _ in 0..n {
                seq.step();
                seen[seq.counters().row.cur as usize] += 1;
                let index = seq.current_index();
                assert!(index < n);
            }
            assert!(seen.iter().all(|&count| count == 1));
            assert_eq!(seq.shuffles(), pass);
        }
    }

    #[test]
    fn shard_rows_map_through_global_permutation() {
        let mut seq =
            TrialSequencer::new(&config(false), 30, RowAssignment::new(10, 15, 30).unwrap())
                .unwrap();
        let mut indices = Vec::new();
        for _ in 0..5 {
            seq.step();
            let row = seq.counters().row.cur as usize;
            let expected = seq.permutation()[seq.rows()[row]];
            assert_eq!(seq.current_index(), expected);
            indices.push(expected);
        }
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 5);
    }

    #[test]
    fn unstarted_row_reads_as_zero() {
        let mut seq = TrialSequencer::new(&config(true), 4, RowAssignment::full(4)).unwrap();
        assert_eq!(seq.counters().row.cur, -1);
        assert_eq!(seq.current_index(), 0);
    }

    #[test]
    fn corrupted_row_is_repaired() {
        let mut seq = TrialSequencer::new(&config(false), 6, RowAssignment::full(6)).unwrap();
        seq.step();
        seq.counters_mut().row.set(42);
        let index = seq.current_index();
        assert!(index < 6);
        assert_eq!(seq.counters().row.cur, 0);
        assert_eq!(seq.shuffles(), 1);
    }

    #[test]
    fn shuffle_label_ignores_the_shard() {
        assert_eq!(shuffle_label(12), "lvis-trial/sequencer:12");
        assert_ne!(shuffle_label(12), shuffle_label(13));
    }

    #[test]
    fn unseeded_shuffled_shard_needs_determinism() {
        let config = SequencerConfig::default();
        let result = TrialSequencer::new(&config, 12, RowAssignment::new(0, 4, 12).unwrap());
        if determinism::config().enabled {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(DatasetError::UnseededShard { start: 0, end: 4 })
            ));
        }
        // the full range and sequential shards never depend on the permutation seed
        assert!(TrialSequencer::new(&config, 12, RowAssignment::full(12)).is_ok());
        let sequential = SequencerConfig {
            sequential: true,
            ..SequencerConfig::default()
        };
        assert!(TrialSequencer::new(&sequential, 12, RowAssignment::new(0, 4, 12).unwrap()).is_ok());
    }

    #[test]
    fn empty_shard_is_rejected() {
        let err = TrialSequencer::new(&config(false), 0, RowAssignment::full(0)).unwrap_err();
        assert!(matches!(err, DatasetError::EmptyShard));
    }

    #[test]
    fn bounded_row_config_resolves_assignment() {
        let cfg = SequencerConfig {
            start_row: Some(3),
            ..SequencerConfig::default()
        };
        assert_eq!(cfg.assignment(8).unwrap().rows(), 3..8);
        assert_eq!(SequencerConfig::default().assignment(8).unwrap().rows(), 0..8);
    }
}
