// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use lvis_env::{PipelineState, TrialRecord};
use lvis_pattern::{PatternMode, PatternTable};
use lvis_trial::{DatasetIndex, Split};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub name: String,
    pub train: usize,
    pub test: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexReport {
    pub root: String,
    pub n_test: usize,
    pub train: usize,
    pub test: usize,
    pub categories: Vec<CategoryCounts>,
}

impl IndexReport {
    pub fn from_index(index: &DatasetIndex) -> Self {
        let train = index.files(Split::Train);
        let test = index.files(Split::Test);
        let categories = index
            .catalog()
            .iter()
            .map(|(i, name)| CategoryCounts {
                name: name.to_string(),
                train: train.get(i).map_or(0, Vec::len),
                test: test.get(i).map_or(0, Vec::len),
            })
            .collect();
        Self {
            root: index.root().display().to_string(),
            n_test: index.n_test(),
            train: index.len(Split::Train),
            test: index.len(Split::Test),
            categories,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternReport {
    pub mode: PatternMode,
    pub shape: Vec<usize>,
    pub patterns: BTreeMap<String, Vec<f32>>,
}

impl PatternReport {
    pub fn from_table(table: &PatternTable) -> Self {
        let patterns = table
            .names()
            .iter()
            .cloned()
            .zip(table.rows().map(<[f32]>::to_vec))
            .collect();
        Self {
            mode: table.mode(),
            shape: table.shape().to_vec(),
            patterns,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialReport {
    #[serde(flatten)]
    pub trial: TrialRecord,
    /// Tensor shape per state name.
    pub shapes: BTreeMap<String, Vec<usize>>,
}

impl TrialReport {
    pub fn capture(env: &PipelineState) -> Option<Self> {
        let trial = env.current_trial()?.clone();
        let shapes = env
            .state_names()
            .into_iter()
            .filter_map(|name| {
                let shape = env.state(&name)?.shape().to_vec();
                Some((name, shape))
            })
            .collect();
        Some(Self { trial, shapes })
    }
}
