// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Category → target pattern lookup.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::{PatternError, Result};
use crate::sparse;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternMode {
    /// One contiguous block of `n_out_per` units per category.
    #[default]
    Localist,
    /// Cached binary patterns with a minimum pairwise distance.
    SparseRandom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub mode: PatternMode,
    /// Output layer geometry `[rows, cols]`.
    pub out_size: [usize; 2],
    /// Units per category in localist mode.
    pub n_out_per: usize,
    /// Fraction of units active in sparse-random mode.
    pub pct_on: f32,
    /// Minimum pairwise difference as a fraction of the active count.
    pub min_diff: f32,
    /// Where sparse-random tables are cached; no caching when absent.
    pub cache_dir: Option<PathBuf>,
    /// Rejection-search budget per category.
    pub max_attempts: usize,
    pub seed: Option<u64>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            mode: PatternMode::Localist,
            out_size: [10, 10],
            n_out_per: 1,
            pct_on: 0.2,
            min_diff: 0.5,
            cache_dir: None,
            max_attempts: 10_000,
            seed: None,
        }
    }
}

/// Fixed table of target patterns, one flattened row per category.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternTable {
    mode: PatternMode,
    shape: Vec<usize>,
    names: Vec<String>,
    data: Vec<f32>,
}

impl PatternTable {
    /// Builds the table `config` describes for the given category names.
    pub fn build<S: AsRef<str>>(config: &PatternConfig, names: &[S]) -> Result<Self> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let [rows, cols] = config.out_size;
        match config.mode {
            PatternMode::Localist => Self::localist(rows, cols, config.n_out_per, names),
            PatternMode::SparseRandom => sparse::load_or_generate(config, names),
        }
    }

    /// `[rows, cols, n_out_per, 1]` table where category `i` lights the units
    /// `i * n_out_per .. (i + 1) * n_out_per` of the flattened tensor.
    pub fn localist(rows: usize, cols: usize, n_out_per: usize, names: Vec<String>) -> Result<Self> {
        let slots = rows * cols;
        if slots == 0 || n_out_per == 0 {
            return Err(PatternError::InvalidGeometry {
                reason: format!("{rows}x{cols} with {n_out_per} units per category is empty"),
            });
        }
        if names.len() > slots {
            return Err(PatternError::InvalidGeometry {
                reason: format!(
                    "{} categories do not fit in {rows}x{cols} localist slots",
                    names.len()
                ),
            });
        }
        let cells = slots * n_out_per;
        let mut data = vec![0.0f32; names.len() * cells];
        for (i, row) in data.chunks_mut(cells).enumerate() {
            row[i * n_out_per..(i + 1) * n_out_per].fill(1.0);
        }
        info!(categories = names.len(), cells, "built localist pattern table");
        Ok(Self {
            mode: PatternMode::Localist,
            shape: vec![rows, cols, n_out_per, 1],
            names,
            data,
        })
    }

    pub(crate) fn from_rows(
        mode: PatternMode,
        shape: Vec<usize>,
        names: Vec<String>,
        data: Vec<f32>,
    ) -> Self {
        Self {
            mode,
            shape,
            names,
            data,
        }
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    /// Shape of a single category's tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened length of one pattern.
    pub fn cell_len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Flattened pattern of `category`.
    pub fn row(&self, category: usize) -> Result<&[f32]> {
        if category >= self.len() {
            return Err(PatternError::CategoryOutOfRange {
                index: category,
                categories: self.len(),
            });
        }
        let cells = self.cell_len();
        Ok(&self.data[category * cells..(category + 1) * cells])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks(self.cell_len().max(1)).take(self.len())
    }

    /// Pattern of `category` in its tensor shape.
    pub fn tensor(&self, category: usize) -> Result<ArrayD<f32>> {
        let row = self.row(category)?;
        ArrayD::from_shape_vec(IxDyn(&self.shape), row.to_vec()).map_err(|err| {
            PatternError::InvalidGeometry {
                reason: err.to_string(),
            }
        })
    }

    /// Copies the pattern of `category` into an existing tensor.
    pub fn write_into(&self, category: usize, target: &mut ArrayD<f32>) -> Result<()> {
        let row = self.row(category)?;
        if target.len() != row.len() {
            return Err(PatternError::ProbeSize {
                expected: row.len(),
                got: target.len(),
            });
        }
        for (dst, src) in target.iter_mut().zip(row) {
            *dst = *src;
        }
        Ok(())
    }
}
