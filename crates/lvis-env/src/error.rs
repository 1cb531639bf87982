// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use lvis_config::LayeredConfigError;
use lvis_pattern::PatternError;
use lvis_trial::{DatasetError, Split};
use lvis_vision::VisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Layered(#[from] LayeredConfigError),
    #[error("invalid `{section}` configuration: {source}")]
    Config {
        section: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("the {split:?} split has no images")]
    EmptySplit { split: Split },
    #[error("no trial has been produced yet")]
    NoTrial,
}

pub type Result<T> = std::result::Result<T, EnvError>;
