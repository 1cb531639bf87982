// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Filter primitives shared by the channel bank.

pub mod dog;
pub mod gabor;
pub mod pool;

pub use dog::{DogKernels, DogSpec};
pub use gabor::{GaborBank, GaborSpec};
pub use pool::{max_pool_into, pooled_len};

use ndarray::{Array2, Array4};

/// Reads `plane` with coordinates clamped to its border.
pub(crate) fn sample_clamped(plane: &Array2<f32>, y: i64, x: i64) -> f32 {
    let (h, w) = plane.dim();
    let y = y.clamp(0, h as i64 - 1) as usize;
    let x = x.clamp(0, w as i64 - 1) as usize;
    plane[[y, x]]
}

/// Rescales `tensor` so its largest value is one. All-zero tensors are left alone.
pub fn normalize_max(tensor: &mut Array4<f32>) {
    let max = tensor.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        tensor.mapv_inplace(|v| v / max);
    }
}
