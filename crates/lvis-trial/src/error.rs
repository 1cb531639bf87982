// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while building the dataset index or sequencing trials.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset root {path:?} does not exist")]
    MissingRoot { path: PathBuf },
    #[error("no images under {root:?} match filter {filter:?}")]
    EmptyDataset { root: PathBuf, filter: Vec<String> },
    #[error("unknown category `{name}`")]
    UnknownCategory { name: String },
    #[error("category `{name}` listed twice")]
    DuplicateCategory { name: String },
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialise {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cached lists {path:?} disagree with the category list: {reason}")]
    CacheMismatch { path: PathBuf, reason: String },
    #[error("row range [{start}, {end}) is invalid for {total} rows")]
    InvalidShard {
        start: usize,
        end: usize,
        total: usize,
    },
    #[error("worker rank {rank} out of range for {workers} workers")]
    InvalidWorker { rank: usize, workers: usize },
    #[error(
        "shuffled row range [{start}, {end}) needs a sequencer seed or LVIS_DETERMINISTIC \
         so every worker draws the same permutation"
    )]
    UnseededShard { start: usize, end: usize },
    #[error("cannot sequence an empty row range")]
    EmptyShard,
}

pub type Result<T> = std::result::Result<T, DatasetError>;
