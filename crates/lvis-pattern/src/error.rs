// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern geometry: {reason}")]
    InvalidGeometry { reason: String },
    #[error("category {index} out of range for {categories} patterns")]
    CategoryOutOfRange { index: usize, categories: usize },
    #[error(
        "could not place pattern for category {category} at least {min_diff} units away \
         from the others after {attempts} attempts; loosen pct_on or min_diff"
    )]
    MinDiffUnsatisfied {
        category: usize,
        attempts: usize,
        min_diff: usize,
    },
    #[error("probe has {got} cells but patterns have {expected}")]
    ProbeSize { expected: usize, got: usize },
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed pattern cache {path:?} line {line}: {reason}")]
    CacheFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, PatternError>;
