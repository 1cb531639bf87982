// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::Array4;

/// Pooled length of an axis of `n` cells. An axis shorter than the window
/// still yields one (clipped) window.
pub fn pooled_len(n: usize, size: usize, stride: usize) -> usize {
    if n < size || size == 0 || stride == 0 {
        1
    } else {
        (n - size) / stride + 1
    }
}

/// Spatial max pooling over the two leading axes of `[y, x, p, a]` tensors.
pub fn max_pool_into(input: &Array4<f32>, size: usize, stride: usize, out: &mut Array4<f32>) {
    let (ny, nx, np, na) = input.dim();
    let (oy, ox, _, _) = out.dim();
    let size = size.max(1);
    let stride = stride.max(1);
    for y in 0..oy {
        let y0 = y * stride;
        let y1 = (y0 + size).min(ny);
        for x in 0..ox {
            let x0 = x * stride;
            let x1 = (x0 + size).min(nx);
            for p in 0..np {
                for a in 0..na {
                    let mut best = f32::NEG_INFINITY;
                    for iy in y0..y1 {
                        for ix in x0..x1 {
                            best = best.max(input[[iy, ix, p, a]]);
                        }
                    }
                    out[[y, x, p, a]] = if best.is_finite() { best } else { 0.0 };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_lengths() {
        assert_eq!(pooled_len(32, 2, 2), 16);
        assert_eq!(pooled_len(7, 3, 2), 3);
        assert_eq!(pooled_len(1, 2, 2), 1);
    }

    #[test]
    fn picks_window_maximum() {
        let input = Array4::from_shape_fn((4, 4, 1, 1), |(y, x, _, _)| (y * 4 + x) as f32);
        let mut out = Array4::zeros((2, 2, 1, 1));
        max_pool_into(&input, 2, 2, &mut out);
        assert_eq!(out[[0, 0, 0, 0]], 5.0);
        assert_eq!(out[[1, 1, 0, 0]], 15.0);
    }

    #[test]
    fn short_axis_uses_clipped_window() {
        let input = Array4::from_shape_fn((1, 1, 2, 1), |(_, _, p, _)| p as f32 + 1.0);
        let mut out = Array4::zeros((1, 1, 2, 1));
        max_pool_into(&input, 2, 2, &mut out);
        assert_eq!(out[[0, 0, 1, 0]], 2.0);
    }
}
