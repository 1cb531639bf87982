// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Colour-opponent difference of Gaussians.
//!
//! Opponent 0 is red centre against green surround, opponent 1 is blue centre
//! against yellow surround. Both Gaussians integrate to one, so an achromatic
//! field cancels exactly.

use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};

use super::sample_clamped;
use crate::retina::OpponentPlanes;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DogSpec {
    pub size: usize,
    /// Centre sigma as a fraction of `size`.
    pub on_sigma: f32,
    /// Surround sigma as a fraction of `size`.
    pub off_sigma: f32,
    pub gain: f32,
}

impl Default for DogSpec {
    fn default() -> Self {
        Self::with_size(12)
    }
}

impl DogSpec {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            on_sigma: 0.125,
            off_sigma: 0.25,
            gain: 8.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DogKernels {
    spec: DogSpec,
    on: Array2<f32>,
    off: Array2<f32>,
}

impl DogKernels {
    pub fn new(spec: DogSpec) -> Self {
        let on = gaussian(spec.size, spec.on_sigma * spec.size as f32);
        let off = gaussian(spec.size, spec.off_sigma * spec.size as f32);
        Self { spec, on, off }
    }

    pub fn spec(&self) -> &DogSpec {
        &self.spec
    }

    pub fn on(&self) -> &Array2<f32> {
        &self.on
    }

    pub fn off(&self) -> &Array2<f32> {
        &self.off
    }

    /// Writes rectified opponent responses into `out` shaped
    /// `[gy, gx, 2 opponents, 2 polarities]`.
    pub fn respond(&self, planes: &OpponentPlanes, spacing: usize, out: &mut Array4<f32>) {
        let (gy, gx, _, _) = out.dim();
        let pairs = [(&planes.red, &planes.green), (&planes.blue, &planes.yellow)];
        for y in 0..gy {
            let cy = (y * spacing + spacing / 2) as i64;
            for x in 0..gx {
                let cx = (x * spacing + spacing / 2) as i64;
                for (o, (centre, surround)) in pairs.iter().enumerate() {
                    let on = self.integrate(&self.on, centre, cy, cx);
                    let off = self.integrate(&self.off, surround, cy, cx);
                    let r = (on - off) * self.spec.gain;
                    out[[y, x, o, 0]] = r.max(0.0);
                    out[[y, x, o, 1]] = (-r).max(0.0);
                }
            }
        }
    }

    fn integrate(&self, kernel: &Array2<f32>, plane: &Array2<f32>, cy: i64, cx: i64) -> f32 {
        let half = (self.spec.size / 2) as i64;
        kernel
            .indexed_iter()
            .filter(|(_, w)| **w != 0.0)
            .map(|((ky, kx), w)| w * sample_clamped(plane, cy + ky as i64 - half, cx + kx as i64 - half))
            .sum()
    }
}

/// Circular Gaussian normalised to unit sum.
fn gaussian(size: usize, sigma: f32) -> Array2<f32> {
    let ctr = (size as f32 - 1.0) * 0.5;
    let radius = size as f32 * 0.5;
    let denom = 2.0 * sigma * sigma;
    let mut k = Array2::from_shape_fn((size, size), |(y, x)| {
        let xf = x as f32 - ctr;
        let yf = y as f32 - ctr;
        let d2 = xf * xf + yf * yf;
        if d2.sqrt() > radius || denom <= 0.0 {
            0.0
        } else {
            (-d2 / denom).exp()
        }
    });
    let total = k.sum();
    if total > 0.0 {
        k.mapv_inplace(|v| v / total);
    }
    k
}
