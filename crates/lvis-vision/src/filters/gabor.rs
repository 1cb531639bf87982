// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Oriented Gabor kernels approximating V1 simple cells.

use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::sample_clamped;

/// Geometry of one Gabor bank. Sigmas are fractions of `size`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborSpec {
    pub size: usize,
    pub wavelength: f32,
    /// Gaussian extent along the bars.
    pub sigma_length: f32,
    /// Gaussian extent across the bars.
    pub sigma_width: f32,
    pub angles: usize,
    pub gain: f32,
}

impl Default for GaborSpec {
    fn default() -> Self {
        Self::with_size(6)
    }
}

impl GaborSpec {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            wavelength: size as f32,
            sigma_length: 0.3,
            sigma_width: 0.2,
            angles: 4,
            gain: 2.0,
        }
    }
}

/// Kernels for every orientation, shaped `[angles, size, size]`.
#[derive(Clone, Debug)]
pub struct GaborBank {
    spec: GaborSpec,
    kernels: Array3<f32>,
}

impl GaborBank {
    pub fn new(spec: GaborSpec) -> Self {
        let size = spec.size;
        let mut kernels = Array3::zeros((spec.angles, size, size));
        let ctr = (size as f32 - 1.0) * 0.5;
        let radius = size as f32 * 0.5;
        let sig_len = spec.sigma_length * size as f32;
        let sig_wd = spec.sigma_width * size as f32;

        for a in 0..spec.angles {
            let angle = a as f32 * PI / spec.angles as f32;
            let (sin, cos) = angle.sin_cos();
            let mut kernel = kernels.index_axis_mut(Axis(0), a);
            for y in 0..size {
                for x in 0..size {
                    let xf = x as f32 - ctr;
                    let yf = y as f32 - ctr;
                    if (xf * xf + yf * yf).sqrt() > radius {
                        continue;
                    }
                    // u runs across the bars, v along them
                    let u = xf * cos + yf * sin;
                    let v = -xf * sin + yf * cos;
                    let envelope =
                        (-(v * v) / (2.0 * sig_len * sig_len) - (u * u) / (2.0 * sig_wd * sig_wd))
                            .exp();
                    kernel[[y, x]] = envelope * (2.0 * PI * u / spec.wavelength).cos();
                }
            }
            balance(kernel);
        }

        Self { spec, kernels }
    }

    pub fn spec(&self) -> &GaborSpec {
        &self.spec
    }

    pub fn kernel(&self, angle: usize) -> ArrayView2<'_, f32> {
        self.kernels.index_axis(Axis(0), angle)
    }

    /// Convolves `input` on a grid with the given `spacing` and writes
    /// rectified responses into `out` shaped `[gy, gx, 2, angles]`, where
    /// polarity 0 is on (positive) and 1 is off (negative).
    pub fn respond(&self, input: &Array2<f32>, spacing: usize, out: &mut Array4<f32>) {
        let (gy, gx, _, angles) = out.dim();
        let size = self.spec.size as i64;
        let half = size / 2;
        for y in 0..gy {
            let cy = (y * spacing + spacing / 2) as i64;
            for x in 0..gx {
                let cx = (x * spacing + spacing / 2) as i64;
                for a in 0..angles {
                    let kernel = self.kernel(a);
                    let mut acc = 0.0f32;
                    for ky in 0..size {
                        for kx in 0..size {
                            let w = kernel[[ky as usize, kx as usize]];
                            if w != 0.0 {
                                acc += w * sample_clamped(input, cy + ky - half, cx + kx - half);
                            }
                        }
                    }
                    let r = acc * self.spec.gain;
                    out[[y, x, 0, a]] = r.max(0.0);
                    out[[y, x, 1, a]] = (-r).max(0.0);
                }
            }
        }
    }
}

/// Removes the DC component over the kernel's support and scales so the
/// positive lobes sum to one; a uniform field then produces zero response.
pub(crate) fn balance(mut kernel: ArrayViewMut2<'_, f32>) {
    let support = kernel.iter().filter(|v| **v != 0.0).count();
    if support == 0 {
        return;
    }
    let mean = kernel.sum() / support as f32;
    kernel.mapv_inplace(|v| if v != 0.0 { v - mean } else { v });
    let pos: f32 = kernel.iter().map(|v| v.max(0.0)).sum();
    if pos > 0.0 {
        kernel.mapv_inplace(|v| v / pos);
    }
}
