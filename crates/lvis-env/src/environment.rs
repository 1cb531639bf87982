// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::ArrayViewD;

use crate::pipeline::PipelineState;

/// What an external training loop needs from a stimulus source.
pub trait Environment {
    fn init(&mut self, run: i64);

    /// Advances one trial; `false` means no usable trial was produced.
    fn step(&mut self) -> bool;

    fn state(&self, name: &str) -> Option<ArrayViewD<'_, f32>>;

    /// `(category name, category index)` of the current trial.
    fn current_label(&self) -> Option<(&str, usize)>;
}

impl Environment for PipelineState {
    fn init(&mut self, run: i64) {
        PipelineState::init(self, run);
    }

    fn step(&mut self) -> bool {
        PipelineState::step(self)
    }

    fn state(&self, name: &str) -> Option<ArrayViewD<'_, f32>> {
        PipelineState::state(self, name)
    }

    fn current_label(&self) -> Option<(&str, usize)> {
        PipelineState::current_label(self)
    }
}
