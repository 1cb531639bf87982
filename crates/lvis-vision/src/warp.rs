// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Affine jitter of a source frame onto a background-coloured canvas.
//!
//! The forward map scales and rotates about the image centre and then shifts
//! by the sampled translation times the half-extent. Each destination pixel is
//! pulled back through the inverse map, sampled bilinearly with premultiplied
//! alpha (outside the source counts as transparent) and composited over a fill
//! colour taken from the source's top-left pixel. Uncovered regions therefore
//! show the background estimate instead of black.

use nalgebra::{Matrix3, Vector3};

use crate::augment::AugmentParams;
use crate::error::{Result, VisionError};
use crate::frame::ImageFrame;

/// Forward pixel-space transform for `params` on a `width × height` image.
///
/// Positive `rotate_deg` turns the content counter-clockwise on screen.
pub fn affine_matrix(params: &AugmentParams, width: usize, height: usize) -> Matrix3<f32> {
    let half_w = width as f32 * 0.5;
    let half_h = height as f32 * 0.5;
    let theta = -params.rotate_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let s = params.scale;

    let to_origin = Matrix3::new(1.0, 0.0, -half_w, 0.0, 1.0, -half_h, 0.0, 0.0, 1.0);
    let scale_rotate = Matrix3::new(
        s * cos, -s * sin, 0.0, //
        s * sin, s * cos, 0.0, //
        0.0, 0.0, 1.0,
    );
    let back = Matrix3::new(
        1.0,
        0.0,
        half_w + params.trans[0] * half_w,
        0.0,
        1.0,
        half_h + params.trans[1] * half_h,
        0.0,
        0.0,
        1.0,
    );
    back * scale_rotate * to_origin
}

/// Applies `params` to `source`, returning a frame of identical size.
pub fn warp(source: &ImageFrame, params: &AugmentParams) -> Result<ImageFrame> {
    let mut out = ImageFrame::filled(source.height(), source.width(), [0.0; 4])?;
    warp_into(source, params, &mut out)?;
    Ok(out)
}

/// Like [`warp`] but writes into an existing frame of the same size.
pub fn warp_into(source: &ImageFrame, params: &AugmentParams, dest: &mut ImageFrame) -> Result<()> {
    if dest.dims() != source.dims() {
        return Err(VisionError::SizeMismatch {
            expected: source.dims(),
            got: dest.dims(),
        });
    }
    let (height, width) = source.dims();
    let inverse = affine_matrix(params, width, height)
        .try_inverse()
        .ok_or(VisionError::SingularTransform {
            scale: params.scale,
        })?;

    let corner = source.corner();
    let fill = [corner[0], corner[1], corner[2]];

    for y in 0..height {
        for x in 0..width {
            let d = Vector3::new(x as f32 + 0.5, y as f32 + 0.5, 1.0);
            let s = inverse * d;
            let [r, g, b, a] = sample_premultiplied(source, s.x - 0.5, s.y - 0.5);
            let keep = 1.0 - a;
            dest.set_pixel(
                y,
                x,
                [
                    r + fill[0] * keep,
                    g + fill[1] * keep,
                    b + fill[2] * keep,
                    1.0,
                ],
            );
        }
    }
    Ok(())
}

/// Bilinear sample at continuous pixel coordinates, premultiplied by alpha.
fn sample_premultiplied(frame: &ImageFrame, fx: f32, fy: f32) -> [f32; 4] {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut acc = [0.0f32; 4];
    for (dy, wy) in [(0, 1.0 - ty), (1, ty)] {
        for (dx, wx) in [(0, 1.0 - tx), (1, tx)] {
            let w = wx * wy;
            if w == 0.0 {
                continue;
            }
            if let Some([r, g, b, a]) = texel(frame, x0 + dx, y0 + dy) {
                acc[0] += w * r * a;
                acc[1] += w * g * a;
                acc[2] += w * b * a;
                acc[3] += w * a;
            }
        }
    }
    acc
}

fn texel(frame: &ImageFrame, x: i64, y: i64) -> Option<[f32; 4]> {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return None;
    }
    Some(frame.pixel(y as usize, x as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn checker(height: usize, width: usize) -> ImageFrame {
        ImageFrame::from_fn(height, width, |y, x| {
            let v = ((x + y) % 2) as f32;
            [v, 0.5, 1.0 - v, 1.0]
        })
        .unwrap()
    }

    #[test]
    fn identity_leaves_pixels_untouched() {
        let src = checker(6, 5);
        let out = warp(&src, &AugmentParams::identity()).unwrap();
        for y in 0..6 {
            for x in 0..5 {
                let (a, b) = (src.pixel(y, x), out.pixel(y, x));
                for c in 0..4 {
                    assert_relative_eq!(a[c], b[c], epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn uncovered_area_takes_corner_colour() {
        let mut src = ImageFrame::filled(8, 8, [0.2, 0.4, 0.6, 1.0]).unwrap();
        src.set_pixel(4, 4, [1.0, 1.0, 1.0, 1.0]);
        let params = AugmentParams {
            trans: [0.0, 0.0],
            scale: 0.25,
            rotate_deg: 0.0,
        };
        let out = warp(&src, &params).unwrap();
        assert_eq!(out.dims(), (8, 8));
        let edge = out.pixel(0, 7);
        assert_relative_eq!(edge[0], 0.2, epsilon = 1e-5);
        assert_relative_eq!(edge[1], 0.4, epsilon = 1e-5);
        assert_relative_eq!(edge[2], 0.6, epsilon = 1e-5);
        assert_relative_eq!(edge[3], 1.0);
    }

    #[test]
    fn translation_of_one_moves_centre_to_edge() {
        let m = affine_matrix(
            &AugmentParams {
                trans: [1.0, -1.0],
                scale: 1.0,
                rotate_deg: 0.0,
            },
            10,
            6,
        );
        let centre = m * Vector3::new(5.0, 3.0, 1.0);
        assert_relative_eq!(centre.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(centre.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn quarter_turn_rotates_about_centre() {
        let m = affine_matrix(
            &AugmentParams {
                trans: [0.0, 0.0],
                scale: 1.0,
                rotate_deg: 90.0,
            },
            4,
            4,
        );
        // a point right of centre ends up above it (counter-clockwise on screen)
        let p = m * Vector3::new(3.0, 2.0, 1.0);
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn transparent_source_shows_fill() {
        let src = ImageFrame::from_fn(4, 4, |y, x| {
            if y == 0 && x == 0 {
                [0.9, 0.1, 0.1, 1.0]
            } else {
                [0.0, 0.0, 0.0, 0.0]
            }
        })
        .unwrap();
        let out = warp(&src, &AugmentParams::identity()).unwrap();
        assert_relative_eq!(out.pixel(3, 3)[0], 0.9, epsilon = 1e-5);
        assert_relative_eq!(out.pixel(3, 3)[3], 1.0);
    }

    #[test]
    fn zero_scale_is_singular() {
        let src = checker(4, 4);
        let params = AugmentParams {
            scale: 0.0,
            ..AugmentParams::identity()
        };
        assert!(matches!(
            warp(&src, &params),
            Err(VisionError::SingularTransform { .. })
        ));
    }
}
