// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Per-trial in-plane jitter: translation, scale and rotation.
//!
//! Translation is expressed in half-extents, so `1.0` moves the image centre
//! onto its edge. With a positive `trans_sigma` each axis is drawn from a
//! zero-mean Gaussian and then clamped to `[-max, max]`; the clamp piles mass
//! onto the bounds and downstream tuning expects exactly that shape.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use lvis_config::determinism;

use crate::error::{Result, VisionError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Per-axis translation bound `[x, y]` in half-extents.
    pub trans_max: [f32; 2],
    /// Gaussian sigma for translation; zero or less selects uniform sampling.
    pub trans_sigma: f32,
    /// Scale factor range `[min, max)`.
    pub scale_range: [f32; 2],
    /// Rotation bound in degrees.
    pub rotate_max: f32,
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            trans_max: [0.3, 0.3],
            trans_sigma: 0.0,
            scale_range: [0.5, 1.1],
            rotate_max: 8.0,
            seed: None,
        }
    }
}

impl AugmentConfig {
    /// Configuration that always yields [`AugmentParams::identity`].
    pub fn disabled() -> Self {
        Self {
            trans_max: [0.0, 0.0],
            trans_sigma: 0.0,
            scale_range: [1.0, 1.0],
            rotate_max: 0.0,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trans_max.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(VisionError::InvalidAugment {
                field: "trans_max",
                reason: format!("{:?} must be finite and non-negative", self.trans_max),
            });
        }
        if !self.trans_sigma.is_finite() {
            return Err(VisionError::InvalidAugment {
                field: "trans_sigma",
                reason: "must be finite".into(),
            });
        }
        let [lo, hi] = self.scale_range;
        if !(lo.is_finite() && hi.is_finite()) || lo <= 0.0 || hi < lo {
            return Err(VisionError::InvalidAugment {
                field: "scale_range",
                reason: format!("[{lo}, {hi}) must be positive and ordered"),
            });
        }
        if !self.rotate_max.is_finite() || self.rotate_max < 0.0 {
            return Err(VisionError::InvalidAugment {
                field: "rotate_max",
                reason: format!("{} must be finite and non-negative", self.rotate_max),
            });
        }
        Ok(())
    }
}

/// One trial's transform parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugmentParams {
    /// `[x, y]` offset in half-extents.
    pub trans: [f32; 2],
    pub scale: f32,
    pub rotate_deg: f32,
}

impl AugmentParams {
    pub fn identity() -> Self {
        Self {
            trans: [0.0, 0.0],
            scale: 1.0,
            rotate_deg: 0.0,
        }
    }
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self::identity()
    }
}

/// Draws [`AugmentParams`] from an [`AugmentConfig`].
#[derive(Debug)]
pub struct AugmentSampler {
    config: AugmentConfig,
    normal: Option<Normal<f32>>,
    rng: StdRng,
}

impl AugmentSampler {
    pub fn new(config: AugmentConfig) -> Result<Self> {
        config.validate()?;
        let normal = gaussian(&config)?;
        let rng = determinism::rng_from_optional(config.seed, "lvis-vision/augment");
        Ok(Self {
            config,
            normal,
            rng,
        })
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    pub fn sample(&mut self) -> AugmentParams {
        draw(&self.config, self.normal.as_ref(), &mut self.rng)
    }
}

/// Samples once from `config` using the caller's generator.
pub fn sample_with<R: Rng>(config: &AugmentConfig, rng: &mut R) -> Result<AugmentParams> {
    config.validate()?;
    let normal = gaussian(config)?;
    Ok(draw(config, normal.as_ref(), rng))
}

fn gaussian(config: &AugmentConfig) -> Result<Option<Normal<f32>>> {
    if config.trans_sigma <= 0.0 {
        return Ok(None);
    }
    Normal::new(0.0, config.trans_sigma)
        .map(Some)
        .map_err(|err| VisionError::InvalidAugment {
            field: "trans_sigma",
            reason: err.to_string(),
        })
}

fn draw<R: Rng>(
    config: &AugmentConfig,
    normal: Option<&Normal<f32>>,
    rng: &mut R,
) -> AugmentParams {
    let mut trans = [0.0f32; 2];
    for (axis, slot) in trans.iter_mut().enumerate() {
        let max = config.trans_max[axis];
        *slot = match normal {
            Some(dist) => dist.sample(rng).clamp(-max, max),
            None => symmetric(rng, max),
        };
    }

    let [lo, hi] = config.scale_range;
    let scale = if hi > lo { rng.gen_range(lo..hi) } else { lo };

    AugmentParams {
        trans,
        scale,
        rotate_deg: symmetric(rng, config.rotate_max),
    }
}

fn symmetric<R: Rng>(rng: &mut R, max: f32) -> f32 {
    if max > 0.0 {
        rng.gen_range(-max..=max)
    } else {
        0.0
    }
}
