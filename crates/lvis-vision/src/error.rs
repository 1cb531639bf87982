// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("image is {got:?} (h, w) but the filter bank was built for {expected:?}")]
    SizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("invalid augmentation setting `{field}`: {reason}")]
    InvalidAugment { field: &'static str, reason: String },
    #[error("invalid filter channel `{name}`: {reason}")]
    InvalidChannel { name: String, reason: String },
    #[error("augmentation produced a singular transform (scale {scale})")]
    SingularTransform { scale: f32 },
}

pub type Result<T> = std::result::Result<T, VisionError>;
