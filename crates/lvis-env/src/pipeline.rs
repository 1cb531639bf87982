// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The per-worker trial pipeline.
//!
//! [`PipelineState`] owns every stage: dataset index, sequencer, augmentation
//! sampler, warp buffers, filter bank and pattern table. `step` runs them in
//! order and leaves the trial's tensors in place until the next `step`.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use lvis_pattern::{Classification, Classifier, PatternTable, ScoreSummary, ScoreTally};
use lvis_trial::{DatasetIndex, RowAssignment, Split, TrialSequencer};
use lvis_vision::{
    warp_into, AugmentParams, AugmentSampler, FilterBank, ImageFrame, VisionError,
};

use crate::config::ExperimentConfig;
use crate::error::{EnvError, Result};

/// State name of the target pattern tensor.
pub const OUTPUT_STATE: &str = "Output";
/// State name of the warped RGBA image.
pub const IMAGE_STATE: &str = "Image";

/// Description of the most recent trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub run: i64,
    pub epoch: i64,
    pub trial: i64,
    pub row: i64,
    pub category: usize,
    pub category_name: String,
    pub file: PathBuf,
    pub augment: AugmentParams,
    /// Set when the image could not be produced. The target is zeroed and
    /// the image and feature tensors still hold the previous trial.
    pub voided: bool,
}

/// Explicit pipeline context for one worker.
#[derive(Debug)]
pub struct PipelineState {
    config: ExperimentConfig,
    index: DatasetIndex,
    split: Split,
    sequencer: TrialSequencer,
    sampler: AugmentSampler,
    bank: FilterBank,
    table: PatternTable,
    classifier: Classifier,
    tally: ScoreTally,
    /// The epoch that ended on the last step, not yet flushed from the tally.
    epoch_pending: bool,
    last_epoch: Option<ScoreSummary>,
    image: ImageFrame,
    target: ArrayD<f32>,
    current: Option<TrialRecord>,
}

impl PipelineState {
    /// Builds every stage from `config`, serving the configured row range.
    pub fn configure(config: ExperimentConfig) -> Result<Self> {
        let index = DatasetIndex::open(&config.dataset.index_options())?;
        let assignment = config
            .sequencer
            .assignment(index.len(config.dataset.split))?;
        Self::with_index(config, index, assignment)
    }

    /// Like [`PipelineState::configure`] for worker `rank` of `workers`.
    pub fn configure_worker(config: ExperimentConfig, workers: usize, rank: usize) -> Result<Self> {
        let index = DatasetIndex::open(&config.dataset.index_options())?;
        let total = index.len(config.dataset.split);
        let assignment = RowAssignment::for_worker(total, workers, rank)?;
        Self::with_index(config, index, assignment)
    }

    /// Builds the pipeline over an already loaded index.
    pub fn with_index(
        config: ExperimentConfig,
        index: DatasetIndex,
        assignment: RowAssignment,
    ) -> Result<Self> {
        let split = config.dataset.split;
        let total = index.len(split);
        if total == 0 {
            return Err(EnvError::EmptySplit { split });
        }
        let sequencer = TrialSequencer::new(&config.sequencer, total, assignment)?;
        let sampler = AugmentSampler::new(config.augment.clone())?;
        let bank = FilterBank::new(config.filters.clone())?;
        let table = PatternTable::build(&config.patterns, index.catalog().names())?;
        let [height, width] = config.filters.image_size;
        let image = ImageFrame::filled(height, width, [0.0, 0.0, 0.0, 1.0])?;
        let target = ArrayD::zeros(IxDyn(table.shape()));
        let tally = ScoreTally::new(table.len());

        info!(
            split = ?split,
            rows = assignment.len(),
            categories = table.len(),
            channels = bank.channel_names().count(),
            "pipeline configured"
        );
        Ok(Self {
            classifier: Classifier::new(config.metric),
            config,
            index,
            split,
            sequencer,
            sampler,
            bank,
            table,
            tally,
            epoch_pending: false,
            last_epoch: None,
            image,
            target,
            current: None,
        })
    }

    /// Starts run `run`: counters reset, fresh permutation, empty score.
    pub fn init(&mut self, run: i64) {
        self.sequencer.init(run);
        self.tally.reset();
        self.epoch_pending = false;
        self.last_epoch = None;
        self.current = None;
    }

    /// Advances one trial. Returns `false` when the trial's image could not be
    /// produced; the counters still advance and the trial should be skipped.
    ///
    /// The step that wraps Trial produces the epoch's last trial, so its score
    /// still belongs to that epoch. The tally is closed at the start of the
    /// following step.
    pub fn step(&mut self) -> bool {
        if self.epoch_pending {
            self.flush_epoch();
        }
        let rollover = self.sequencer.step();
        self.epoch_pending = rollover.epoch;

        let index = self.sequencer.current_index();
        let Some(entry) = self.index.entries(self.split).get(index).cloned() else {
            warn!(index, "sequencer produced an index outside the split");
            self.current = None;
            return false;
        };
        let counters = self.sequencer.counters();
        let mut record = TrialRecord {
            run: counters.run.cur,
            epoch: counters.epoch.cur,
            trial: counters.trial.cur,
            row: counters.row.cur,
            category: entry.category,
            category_name: self
                .index
                .catalog()
                .name(entry.category)
                .unwrap_or_default()
                .to_string(),
            file: self.index.path_of(&entry),
            augment: AugmentParams::identity(),
            voided: false,
        };

        match self.render(&mut record) {
            Ok(()) => {
                debug!(
                    row = record.row,
                    category = %record.category_name,
                    "trial ready"
                );
            }
            Err(err) => {
                if is_transient(&err) {
                    warn!(file = %record.file.display(), error = %err, "trial voided");
                } else {
                    error!(file = %record.file.display(), error = %err, "trial failed");
                }
                self.target.fill(0.0);
                record.voided = true;
            }
        }
        let ok = !record.voided;
        self.current = Some(record);
        ok
    }

    fn flush_epoch(&mut self) {
        let score = self.tally.summary();
        if score.trials > 0 {
            info!(
                trials = score.trials,
                pct_correct = score.pct_correct,
                pct_correct2 = score.pct_correct2,
                "epoch score"
            );
        }
        self.last_epoch = Some(score);
        self.tally.reset();
        self.epoch_pending = false;
    }

    fn render(&mut self, record: &mut TrialRecord) -> Result<()> {
        let [height, width] = self.config.filters.image_size;
        let source = ImageFrame::open(&record.file, Some((height, width)))?;
        record.augment = self.sampler.sample();
        warp_into(&source, &record.augment, &mut self.image)?;
        self.bank.apply(&self.image)?;
        self.table.write_into(record.category, &mut self.target)?;
        Ok(())
    }

    /// A named feature tensor, the target pattern or the warped image.
    ///
    /// After a voided trial the target reads as zeros, while the image and
    /// feature tensors keep the values of the last trial that rendered.
    pub fn state(&self, name: &str) -> Option<ArrayViewD<'_, f32>> {
        match name {
            OUTPUT_STATE => Some(self.target.view()),
            IMAGE_STATE => Some(self.image.view().into_dyn()),
            _ => self.bank.feature(name).map(|t| t.view().into_dyn()),
        }
    }

    /// Names accepted by [`PipelineState::state`].
    pub fn state_names(&self) -> Vec<String> {
        self.bank
            .channel_names()
            .map(str::to_string)
            .chain([OUTPUT_STATE.to_string(), IMAGE_STATE.to_string()])
            .collect()
    }

    /// Category name and index of the current trial.
    pub fn current_label(&self) -> Option<(&str, usize)> {
        self.current
            .as_ref()
            .map(|t| (t.category_name.as_str(), t.category))
    }

    pub fn current_trial(&self) -> Option<&TrialRecord> {
        self.current.as_ref()
    }

    /// Scores the learner's `output` for the current trial and adds it to the
    /// epoch tally.
    pub fn score(&mut self, output: &[f32]) -> Result<Classification> {
        let truth = match &self.current {
            Some(t) if !t.voided => t.category,
            _ => return Err(EnvError::NoTrial),
        };
        let result = self.classifier.classify(&self.table, output, truth)?;
        self.tally.record(&result, truth);
        Ok(result)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn sequencer(&self) -> &TrialSequencer {
        &self.sequencer
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Scores of the current epoch so far.
    pub fn tally(&self) -> &ScoreTally {
        &self.tally
    }

    /// Summary of the most recently completed epoch.
    pub fn last_epoch_score(&self) -> Option<&ScoreSummary> {
        self.last_epoch.as_ref()
    }
}

/// Unreadable image files skip one trial. Anything else means the pipeline
/// itself is misconfigured, though the trial is voided all the same.
fn is_transient(err: &EnvError) -> bool {
    matches!(err, EnvError::Vision(VisionError::Decode { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decode_failures_are_transient() {
        let decode = EnvError::Vision(VisionError::Decode {
            path: PathBuf::from("missing.png"),
            source: image::ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing.png",
            )),
        });
        assert!(is_transient(&decode));

        let mismatch = EnvError::Vision(VisionError::SizeMismatch {
            expected: (32, 32),
            got: (16, 16),
        });
        assert!(!is_transient(&mismatch));
        assert!(!is_transient(&EnvError::Vision(VisionError::SingularTransform {
            scale: 0.0
        })));
        assert!(!is_transient(&EnvError::NoTrial));
    }
}
