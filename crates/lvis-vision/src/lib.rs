// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Stimulus preparation: decoding, per-trial jitter and the V1 filter bank.

pub mod augment;
pub mod bank;
pub mod error;
pub mod filters;
pub mod frame;
pub mod retina;
pub mod warp;

pub use augment::{sample_with, AugmentConfig, AugmentParams, AugmentSampler};
pub use bank::{ChannelKind, ChannelSpec, FieldOfView, FilterBank, FilterBankConfig};
pub use error::{Result, VisionError};
pub use frame::ImageFrame;
pub use retina::{OpponentPlanes, RetinaBuffers};
pub use warp::{affine_matrix, warp, warp_into};
