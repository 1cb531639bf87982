// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Multi-channel V1 filter bank.
//!
//! Every trial the warped frame is converted once into [`RetinaBuffers`]
//! (wide view plus centre-magnified narrow view). Each channel then reads its
//! view, filters on its own grid, max-pools and renormalises into a tensor it
//! owns. Channels never share output storage, so they fan out over rayon
//! unless serial filtering was requested.

use ndarray::Array4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use lvis_config::determinism;

use crate::error::{Result, VisionError};
use crate::filters::{
    max_pool_into, normalize_max, pooled_len, DogKernels, DogSpec, GaborBank, GaborSpec,
};
use crate::frame::ImageFrame;
use crate::retina::{OpponentPlanes, RetinaBuffers};

/// Which view of the retina a channel reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOfView {
    /// The whole frame (16° equivalent).
    Wide,
    /// The central crop magnified to full size (8° equivalent).
    Narrow,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelKind {
    Gabor(GaborSpec),
    ColorDog(DogSpec),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub fov: FieldOfView,
    pub kind: ChannelKind,
    /// Grid subsampling in pixels.
    pub spacing: usize,
    pub pool_size: usize,
    pub pool_stride: usize,
}

impl ChannelSpec {
    pub fn gabor(name: &str, fov: FieldOfView, size: usize, spacing: usize) -> Self {
        Self {
            name: name.to_string(),
            fov,
            kind: ChannelKind::Gabor(GaborSpec::with_size(size)),
            spacing,
            pool_size: 2,
            pool_stride: 2,
        }
    }

    pub fn color_dog(name: &str, fov: FieldOfView, size: usize, spacing: usize) -> Self {
        Self {
            name: name.to_string(),
            fov,
            kind: ChannelKind::ColorDog(DogSpec::with_size(size)),
            spacing,
            pool_size: 2,
            pool_stride: 2,
        }
    }

    /// Filter grid for an image of `(height, width)`.
    pub fn grid(&self, height: usize, width: usize) -> (usize, usize) {
        let spacing = self.spacing.max(1);
        ((height / spacing).max(1), (width / spacing).max(1))
    }

    /// Pre-pool tensor shape `[gy, gx, a, b]`.
    pub fn raw_shape(&self, height: usize, width: usize) -> [usize; 4] {
        let (gy, gx) = self.grid(height, width);
        match &self.kind {
            ChannelKind::Gabor(spec) => [gy, gx, 2, spec.angles],
            ChannelKind::ColorDog(_) => [gy, gx, 2, 2],
        }
    }

    /// Shape of the published tensor after pooling.
    pub fn output_shape(&self, height: usize, width: usize) -> [usize; 4] {
        let [gy, gx, a, b] = self.raw_shape(height, width);
        [
            pooled_len(gy, self.pool_size, self.pool_stride),
            pooled_len(gx, self.pool_size, self.pool_stride),
            a,
            b,
        ]
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| VisionError::InvalidChannel {
            name: self.name.clone(),
            reason,
        };
        if self.spacing == 0 || self.pool_size == 0 || self.pool_stride == 0 {
            return Err(invalid(format!(
                "spacing {}, pool size {} and pool stride {} must be positive",
                self.spacing, self.pool_size, self.pool_stride
            )));
        }
        match &self.kind {
            ChannelKind::Gabor(spec) => {
                if spec.size == 0 || spec.angles == 0 || spec.wavelength <= 0.0 {
                    return Err(invalid(format!("degenerate gabor {spec:?}")));
                }
                if spec.sigma_length <= 0.0 || spec.sigma_width <= 0.0 {
                    return Err(invalid("gabor sigmas must be positive".into()));
                }
            }
            ChannelKind::ColorDog(spec) => {
                if spec.size == 0 || spec.on_sigma <= 0.0 || spec.off_sigma <= 0.0 {
                    return Err(invalid(format!("degenerate colour DoG {spec:?}")));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterBankConfig {
    /// Working image size `[height, width]`.
    pub image_size: [usize; 2],
    /// Fraction of the frame the narrow view covers.
    pub narrow_fraction: f32,
    /// Enables the high-frequency wide channel.
    pub high16: bool,
    /// Enables the colour-opponent channels.
    pub color_dog: bool,
    /// Forces channels to run on the calling thread.
    pub serial: bool,
    /// Replaces the standard channel set when present.
    pub channels: Option<Vec<ChannelSpec>>,
}

impl Default for FilterBankConfig {
    fn default() -> Self {
        Self {
            image_size: [128, 128],
            narrow_fraction: 0.5,
            high16: false,
            color_dog: true,
            serial: false,
            channels: None,
        }
    }
}

impl FilterBankConfig {
    /// Channel list implied by this configuration.
    pub fn channel_specs(&self) -> Vec<ChannelSpec> {
        if let Some(channels) = &self.channels {
            return channels.clone();
        }
        use FieldOfView::{Narrow, Wide};
        let mut specs = vec![
            ChannelSpec::gabor("V1l16", Wide, 12, 4),
            ChannelSpec::gabor("V1m16", Wide, 6, 2),
        ];
        if self.high16 {
            specs.push(ChannelSpec::gabor("V1h16", Wide, 4, 1));
        }
        specs.push(ChannelSpec::gabor("V1l8", Narrow, 12, 4));
        specs.push(ChannelSpec::gabor("V1m8", Narrow, 6, 2));
        if self.color_dog {
            specs.push(ChannelSpec::color_dog("V1c16", Wide, 12, 4));
            specs.push(ChannelSpec::color_dog("V1c8", Narrow, 12, 4));
        }
        specs
    }
}

#[derive(Debug)]
enum ChannelFilter {
    Gabor(GaborBank),
    ColorDog(DogKernels),
}

#[derive(Debug)]
struct Channel {
    spec: ChannelSpec,
    filter: ChannelFilter,
    raw: Array4<f32>,
    output: Array4<f32>,
}

impl Channel {
    fn new(spec: ChannelSpec, height: usize, width: usize) -> Result<Self> {
        spec.validate()?;
        let filter = match &spec.kind {
            ChannelKind::Gabor(g) => ChannelFilter::Gabor(GaborBank::new(g.clone())),
            ChannelKind::ColorDog(d) => ChannelFilter::ColorDog(DogKernels::new(d.clone())),
        };
        let raw = Array4::zeros(spec.raw_shape(height, width));
        let output = Array4::zeros(spec.output_shape(height, width));
        Ok(Self {
            spec,
            filter,
            raw,
            output,
        })
    }

    fn run(&mut self, retina: &RetinaBuffers) {
        let planes: &OpponentPlanes = match self.spec.fov {
            FieldOfView::Wide => &retina.wide,
            FieldOfView::Narrow => &retina.narrow,
        };
        match &self.filter {
            ChannelFilter::Gabor(bank) => bank.respond(&planes.grey, self.spec.spacing, &mut self.raw),
            ChannelFilter::ColorDog(kernels) => {
                kernels.respond(planes, self.spec.spacing, &mut self.raw)
            }
        }
        max_pool_into(
            &self.raw,
            self.spec.pool_size,
            self.spec.pool_stride,
            &mut self.output,
        );
        normalize_max(&mut self.output);
    }
}

/// Filter bank plus the named feature tensors it repopulates every trial.
#[derive(Debug)]
pub struct FilterBank {
    config: FilterBankConfig,
    retina: RetinaBuffers,
    channels: Vec<Channel>,
}

impl FilterBank {
    pub fn new(config: FilterBankConfig) -> Result<Self> {
        let [height, width] = config.image_size;
        let retina = RetinaBuffers::new(height, width, config.narrow_fraction)?;
        let mut channels: Vec<Channel> = Vec::new();
        for spec in config.channel_specs() {
            if channels.iter().any(|c| c.spec.name == spec.name) {
                return Err(VisionError::InvalidChannel {
                    name: spec.name,
                    reason: "duplicate channel name".into(),
                });
            }
            channels.push(Channel::new(spec, height, width)?);
        }
        debug!(
            height,
            width,
            channels = channels.len(),
            "filter bank configured"
        );
        Ok(Self {
            config,
            retina,
            channels,
        })
    }

    pub fn config(&self) -> &FilterBankConfig {
        &self.config
    }

    /// `(height, width)` every frame must have.
    pub fn image_dims(&self) -> (usize, usize) {
        self.retina.dims()
    }

    /// Filters `frame` into every channel tensor.
    pub fn apply(&mut self, frame: &ImageFrame) -> Result<()> {
        self.retina.load(frame)?;
        let retina = &self.retina;
        if self.config.serial || determinism::serial_filters() {
            for channel in &mut self.channels {
                channel.run(retina);
            }
        } else {
            self.channels
                .par_iter_mut()
                .for_each(|channel| channel.run(retina));
        }
        trace!(channels = self.channels.len(), "filter bank applied");
        Ok(())
    }

    pub fn feature(&self, name: &str) -> Option<&Array4<f32>> {
        self.channels
            .iter()
            .find(|c| c.spec.name == name)
            .map(|c| &c.output)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(|c| c.spec.name.as_str())
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &Array4<f32>)> + '_ {
        self.channels
            .iter()
            .map(|c| (c.spec.name.as_str(), &c.output))
    }

    pub fn retina(&self) -> &RetinaBuffers {
        &self.retina
    }
}
