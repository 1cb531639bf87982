// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! LVis trial environment: configuration, the pipeline context and the
//! interface an external simulator drives.

pub mod config;
pub mod environment;
pub mod error;
pub mod layers;
pub mod pipeline;

pub use config::{DatasetConfig, ExperimentConfig};
pub use environment::Environment;
pub use error::{EnvError, Result};
pub use layers::{apply_trial_inputs, ExternalLayer, LayerKind};
pub use pipeline::{PipelineState, TrialRecord, IMAGE_STATE, OUTPUT_STATE};
