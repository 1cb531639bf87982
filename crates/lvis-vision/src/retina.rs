// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Per-trial colour planes shared by every channel.

use ndarray::Array2;

use crate::error::{Result, VisionError};
use crate::frame::ImageFrame;

/// Greyscale plus the four opponent inputs for one field of view.
#[derive(Clone, Debug)]
pub struct OpponentPlanes {
    pub grey: Array2<f32>,
    pub red: Array2<f32>,
    pub green: Array2<f32>,
    pub blue: Array2<f32>,
    /// `(red + green) / 2`.
    pub yellow: Array2<f32>,
}

impl OpponentPlanes {
    pub fn new(height: usize, width: usize) -> Self {
        let zeros = Array2::zeros((height, width));
        Self {
            grey: zeros.clone(),
            red: zeros.clone(),
            green: zeros.clone(),
            blue: zeros.clone(),
            yellow: zeros,
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        self.grey.dim()
    }

    /// Resamples the centred window covering `fraction` of `frame` onto these
    /// planes. A fraction of one copies the frame pixel for pixel.
    pub fn load(&mut self, frame: &ImageFrame, fraction: f32) {
        let (h, w) = self.dims();
        let (fh, fw) = frame.dims();
        let win_h = fh as f32 * fraction;
        let win_w = fw as f32 * fraction;
        let off_y = (fh as f32 - win_h) * 0.5;
        let off_x = (fw as f32 - win_w) * 0.5;
        let sy = win_h / h as f32;
        let sx = win_w / w as f32;

        for y in 0..h {
            let fy = off_y + (y as f32 + 0.5) * sy - 0.5;
            for x in 0..w {
                let fx = off_x + (x as f32 + 0.5) * sx - 0.5;
                let [r, g, b] = bilinear_rgb(frame, fy, fx);
                self.red[[y, x]] = r;
                self.green[[y, x]] = g;
                self.blue[[y, x]] = b;
                self.yellow[[y, x]] = (r + g) * 0.5;
                self.grey[[y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
            }
        }
    }
}

fn bilinear_rgb(frame: &ImageFrame, fy: f32, fx: f32) -> [f32; 3] {
    let (h, w) = frame.dims();
    let fy = fy.clamp(0.0, (h - 1) as f32);
    let fx = fx.clamp(0.0, (w - 1) as f32);
    let y0 = fy.floor() as usize;
    let x0 = fx.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let ty = fy - y0 as f32;
    let tx = fx - x0 as f32;

    let mut out = [0.0f32; 3];
    for (py, px, wgt) in [
        (y0, x0, (1.0 - ty) * (1.0 - tx)),
        (y0, x1, (1.0 - ty) * tx),
        (y1, x0, ty * (1.0 - tx)),
        (y1, x1, ty * tx),
    ] {
        let p = frame.pixel(py, px);
        for c in 0..3 {
            out[c] += wgt * p[c];
        }
    }
    out
}

/// Wide and narrow views of the current trial image.
#[derive(Clone, Debug)]
pub struct RetinaBuffers {
    pub wide: OpponentPlanes,
    pub narrow: OpponentPlanes,
    narrow_fraction: f32,
}

impl RetinaBuffers {
    pub fn new(height: usize, width: usize, narrow_fraction: f32) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(VisionError::InvalidDimensions { width, height });
        }
        if !(narrow_fraction > 0.0 && narrow_fraction <= 1.0) {
            return Err(VisionError::InvalidChannel {
                name: "narrow".into(),
                reason: format!("fraction {narrow_fraction} must lie in (0, 1]"),
            });
        }
        Ok(Self {
            wide: OpponentPlanes::new(height, width),
            narrow: OpponentPlanes::new(height, width),
            narrow_fraction,
        })
    }

    pub fn dims(&self) -> (usize, usize) {
        self.wide.dims()
    }

    /// Refreshes both views from `frame`, which must match the buffer size.
    pub fn load(&mut self, frame: &ImageFrame) -> Result<()> {
        if frame.dims() != self.dims() {
            return Err(VisionError::SizeMismatch {
                expected: self.dims(),
                got: frame.dims(),
            });
        }
        self.wide.load(frame, 1.0);
        self.narrow.load(frame, self.narrow_fraction);
        Ok(())
    }
}
