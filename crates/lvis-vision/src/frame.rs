// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Straight-alpha RGBA frames stored as `(height, width, 4)` arrays in `[0, 1]`.

use image::imageops::{self, FilterType};
use ndarray::{Array3, ArrayView3};
use std::path::Path;

use crate::error::{Result, VisionError};

/// An RGBA image plane with `f32` channels.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFrame {
    pixels: Array3<f32>,
}

impl ImageFrame {
    /// A frame filled with a single colour.
    pub fn filled(height: usize, width: usize, rgba: [f32; 4]) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(VisionError::InvalidDimensions { width, height });
        }
        let pixels = Array3::from_shape_fn((height, width, 4), |(_, _, c)| rgba[c]);
        Ok(Self { pixels })
    }

    /// Builds a frame from a per-pixel function of `(y, x)`.
    pub fn from_fn<F>(height: usize, width: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> [f32; 4],
    {
        let mut frame = Self::filled(height, width, [0.0; 4])?;
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(y, x, f(y, x));
            }
        }
        Ok(frame)
    }

    pub fn from_array(pixels: Array3<f32>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if height == 0 || width == 0 || channels != 4 {
            return Err(VisionError::InvalidDimensions { width, height });
        }
        Ok(Self { pixels })
    }

    /// Decodes an image file, optionally resampling it to `(height, width)`.
    pub fn open(path: &Path, size: Option<(usize, usize)>) -> Result<Self> {
        let decoded = image::open(path).map_err(|source| VisionError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let mut rgba = decoded.to_rgba32f();
        if let Some((height, width)) = size {
            if rgba.height() as usize != height || rgba.width() as usize != width {
                rgba = imageops::resize(&rgba, width as u32, height as u32, FilterType::Triangle);
            }
        }
        let (width, height) = (rgba.width() as usize, rgba.height() as usize);
        let pixels = Array3::from_shape_vec((height, width, 4), rgba.into_raw())
            .map_err(|_| VisionError::InvalidDimensions { width, height })?;
        Self::from_array(pixels)
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    /// `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn pixel(&self, y: usize, x: usize) -> [f32; 4] {
        [
            self.pixels[[y, x, 0]],
            self.pixels[[y, x, 1]],
            self.pixels[[y, x, 2]],
            self.pixels[[y, x, 3]],
        ]
    }

    pub fn set_pixel(&mut self, y: usize, x: usize, rgba: [f32; 4]) {
        for (c, value) in rgba.into_iter().enumerate() {
            self.pixels[[y, x, c]] = value;
        }
    }

    /// The top-left pixel, used as the background estimate.
    pub fn corner(&self) -> [f32; 4] {
        self.pixel(0, 0)
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.pixels.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn decode_and_resize_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("swatch.png");
        let img = image::RgbaImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        img.save(&path).unwrap();

        let frame = ImageFrame::open(&path, None).unwrap();
        assert_eq!(frame.dims(), (4, 8));
        assert_eq!(frame.corner(), [1.0, 0.0, 0.0, 1.0]);

        let resized = ImageFrame::open(&path, Some((8, 8))).unwrap();
        assert_eq!(resized.dims(), (8, 8));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ImageFrame::open(Path::new("/nonexistent/frame.png"), None).unwrap_err();
        assert!(matches!(err, VisionError::Decode { .. }));
    }

    #[test]
    fn zero_sized_frames_are_rejected() {
        assert!(ImageFrame::filled(0, 3, [0.0; 4]).is_err());
    }
}
