// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Seed derivation for every stochastic stage of the stimulus pipeline.
//!
//! Shuffles, augmentation draws and sparse pattern generation each ask for a
//! generator by label. With an explicit seed the label is ignored; otherwise
//! the process-wide [`DeterminismConfig`] decides between a label-derived seed
//! and OS entropy. Label seeds use a fixed hash so they survive toolchain
//! upgrades.

use rand::{rngs::StdRng, SeedableRng};
use std::sync::OnceLock;

const DEFAULT_BASE_SEED: u64 = 42;

/// Process-wide determinism switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Derive unseeded generators from their label instead of entropy.
    pub enabled: bool,
    /// Mixed into every label-derived seed.
    pub base_seed: u64,
    /// Evaluate filter-bank channels on the calling thread.
    pub serial_filters: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_BASE_SEED,
            serial_filters: false,
        }
    }
}

impl DeterminismConfig {
    /// Reads `LVIS_DETERMINISTIC`, `LVIS_DETERMINISTIC_SEED` and
    /// `LVIS_SERIAL_FILTERS`. Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("LVIS_DETERMINISTIC").unwrap_or(defaults.enabled),
            base_seed: std::env::var("LVIS_DETERMINISTIC_SEED")
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(defaults.base_seed),
            serial_filters: env_flag("LVIS_SERIAL_FILTERS").unwrap_or(defaults.serial_filters),
        }
    }

    /// Seed for a component label: FNV-1a over the label, keyed by the base
    /// seed, finished with a splitmix64 round.
    pub fn seed_for(&self, label: &str) -> u64 {
        let mut hash = 0xcbf2_9ce4_8422_2325u64 ^ self.base_seed;
        for byte in label.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        splitmix64(hash)
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// `Some(true)` for 1/true/on/yes, `Some(false)` for 0/false/off/no, any case.
fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// The active configuration, read from the environment on first use.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Installs `cfg` unless a configuration is already active; returns the
/// active one either way.
pub fn configure(cfg: DeterminismConfig) -> &'static DeterminismConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Generator for `label`: label-derived when determinism is on, else entropy.
pub fn rng_from_label(label: &str) -> StdRng {
    let cfg = config();
    if cfg.enabled {
        StdRng::seed_from_u64(cfg.seed_for(label))
    } else {
        StdRng::from_entropy()
    }
}

/// Generator seeded from `seed` when present, else from `label`.
pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    seed.map_or_else(|| rng_from_label(label), StdRng::seed_from_u64)
}

/// Whether the filter bank must stay on one thread.
pub fn serial_filters() -> bool {
    config().serial_filters
}
