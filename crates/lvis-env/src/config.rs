// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Typed experiment configuration, read from the `[lvis]` section of the
//! layered config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use lvis_config::{ConfigLayering, LayeredConfig};
use lvis_pattern::{Metric, PatternConfig};
use lvis_trial::{IndexOptions, SequencerConfig, Split};
use lvis_vision::{AugmentConfig, FilterBankConfig};

use crate::error::{EnvError, Result};

pub const SECTION: &str = "lvis";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub root: PathBuf,
    /// Accepted image extensions.
    pub extensions: Vec<String>,
    pub n_test: usize,
    pub cache_dir: Option<PathBuf>,
    pub delete: Vec<String>,
    pub select: Vec<String>,
    pub split: Split,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("images"),
            extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            n_test: 0,
            cache_dir: None,
            delete: Vec::new(),
            select: Vec::new(),
            split: Split::Train,
        }
    }
}

impl DatasetConfig {
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            root: self.root.clone(),
            extensions: self.extensions.clone(),
            n_test: self.n_test,
            cache_dir: self.cache_dir.clone(),
            delete: self.delete.clone(),
            select: self.select.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetConfig,
    pub sequencer: SequencerConfig,
    pub augment: AugmentConfig,
    pub filters: FilterBankConfig,
    pub patterns: PatternConfig,
    pub metric: Metric,
}

impl ExperimentConfig {
    /// Reads the `lvis` section, falling back to defaults when it is absent.
    pub fn from_layered(config: &LayeredConfig) -> Result<Self> {
        let parsed = config
            .section::<Self>(&[SECTION])
            .map_err(|source| EnvError::Config {
                section: SECTION.to_string(),
                source,
            })?;
        for event in config.events() {
            debug!(layer = event.layer.as_str(), path = %event.path, "experiment override");
        }
        Ok(parsed.unwrap_or_default())
    }

    /// Loads every layer under `dir` and resolves relative paths against it.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let layered = LayeredConfig::load(ConfigLayering::discover_in(dir))?;
        let mut config = Self::from_layered(&layered)?;
        config.resolve_paths(dir);
        Ok(config)
    }

    /// Anchors relative dataset and cache paths at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.dataset.root);
        if let Some(dir) = self.dataset.cache_dir.as_mut() {
            anchor(dir);
        }
        if let Some(dir) = self.patterns.cache_dir.as_mut() {
            anchor(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lvis_pattern::PatternMode;
    use std::fs;

    #[test]
    fn missing_section_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig::load_dir(dir.path()).unwrap();
        assert_eq!(cfg.dataset.root, dir.path().join("images"));
        assert_eq!(cfg.metric, Metric::InvCorrelation);
    }

    #[test]
    fn layers_override_base_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            r#"
[lvis.dataset]
root = "/data/objects"
n_test = 2

[lvis.patterns]
mode = "sparse_random"
out_size = [4, 5]

[lvis.filters]
image_size = [64, 64]
high16 = true
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("run.json"),
            r#"{"lvis": {"dataset": {"n_test": 5, "split": "test"}, "metric": "hamming"}}"#,
        )
        .unwrap();

        let cfg = ExperimentConfig::load_dir(dir.path()).unwrap();
        assert_eq!(cfg.dataset.root, PathBuf::from("/data/objects"));
        assert_eq!(cfg.dataset.n_test, 5);
        assert_eq!(cfg.dataset.split, Split::Test);
        assert_eq!(cfg.patterns.mode, PatternMode::SparseRandom);
        assert_eq!(cfg.patterns.out_size, [4, 5]);
        assert_eq!(cfg.filters.image_size, [64, 64]);
        assert!(cfg.filters.high16);
        assert_eq!(cfg.metric, Metric::Hamming);
    }

    #[test]
    fn malformed_section_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[lvis.sequencer]\nsequential = \"yes\"\n",
        )
        .unwrap();
        let err = ExperimentConfig::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, EnvError::Config { .. }));
    }
}
