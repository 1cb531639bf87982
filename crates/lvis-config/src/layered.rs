// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Layered experiment configuration.
//!
//! A shared `base.toml`, a machine-local `site.toml` and a per-run `run.json`
//! are overlaid in that order. Any layer may be TOML or JSON; the extension
//! decides. Every leaf a layer sets or replaces is recorded as a
//! [`ConfigDiffEvent`] so a run log shows exactly which knobs were touched.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which file a configuration value came from, in overlay order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigLayer {
    Base,
    Site,
    Run,
}

impl ConfigLayer {
    pub const ALL: [ConfigLayer; 3] = [ConfigLayer::Base, ConfigLayer::Site, ConfigLayer::Run];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigLayer::Base => "base",
            ConfigLayer::Site => "site",
            ConfigLayer::Run => "run",
        }
    }

    /// Environment variable that points at this layer's file.
    pub fn env_var(self) -> &'static str {
        match self {
            ConfigLayer::Base => "LVIS_CONFIG_BASE",
            ConfigLayer::Site => "LVIS_CONFIG_SITE",
            ConfigLayer::Run => "LVIS_CONFIG_RUN",
        }
    }

    /// File name looked up under the config root.
    pub fn default_file(self) -> &'static str {
        match self {
            ConfigLayer::Base => "base.toml",
            ConfigLayer::Site => "site.toml",
            ConfigLayer::Run => "run.json",
        }
    }
}

/// A leaf set, replaced or cleared while overlaying a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDiffEvent {
    pub layer: ConfigLayer,
    /// Dotted key path, e.g. `lvis.sequencer.seed`.
    pub path: String,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

/// Paths of the three layers. `None` skips a layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigLayering {
    pub base: Option<PathBuf>,
    pub site: Option<PathBuf>,
    pub run: Option<PathBuf>,
}

impl ConfigLayering {
    /// Looks under `LVIS_CONFIG_ROOT`, or `~/.lvis` when unset.
    pub fn discover() -> Self {
        let root = std::env::var_os("LVIS_CONFIG_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(home_root);
        Self::discover_in(root)
    }

    /// Looks under `root`. Per-layer environment variables still take
    /// precedence, and files that do not exist are skipped.
    pub fn discover_in<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let locate = |layer: ConfigLayer| {
            let path = std::env::var_os(layer.env_var())
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join(layer.default_file()));
            path.exists().then_some(path)
        };
        Self {
            base: locate(ConfigLayer::Base),
            site: locate(ConfigLayer::Site),
            run: locate(ConfigLayer::Run),
        }
    }

    pub fn with_base<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base = Some(path.into());
        self
    }

    pub fn with_site<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.site = Some(path.into());
        self
    }

    pub fn with_run<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.run = Some(path.into());
        self
    }

    pub fn path(&self, layer: ConfigLayer) -> Option<&Path> {
        match layer {
            ConfigLayer::Base => self.base.as_deref(),
            ConfigLayer::Site => self.site.as_deref(),
            ConfigLayer::Run => self.run.as_deref(),
        }
    }
}

fn home_root() -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(".");
    };
    let nested = home.join(".lvis").join("config");
    if nested.is_dir() {
        nested
    } else {
        home.join(".lvis")
    }
}

/// The overlaid configuration tree plus the overrides that produced it.
#[derive(Clone, Debug)]
pub struct LayeredConfig {
    layering: ConfigLayering,
    value: Value,
    events: Vec<ConfigDiffEvent>,
}

impl LayeredConfig {
    /// Reads every present layer and overlays base → site → run.
    pub fn load(layering: ConfigLayering) -> Result<Self, LayeredConfigError> {
        let mut tree = Map::new();
        let mut events = Vec::new();

        for layer in ConfigLayer::ALL {
            let Some(path) = layering.path(layer) else {
                continue;
            };
            let Some(table) = read_layer(path)? else {
                continue;
            };
            let before = events.len();
            overlay(&mut tree, &table, &mut Vec::new(), layer, &mut events);
            debug!(
                layer = layer.as_str(),
                path = %path.display(),
                overrides = events.len() - before,
                "config layer applied"
            );
        }

        Ok(Self {
            layering,
            value: Value::Object(tree),
            events,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn layering(&self) -> &ConfigLayering {
        &self.layering
    }

    pub fn events(&self) -> &[ConfigDiffEvent] {
        &self.events
    }

    /// Deserialises the subtree at `path`, `None` when any key is missing.
    pub fn section<T>(&self, path: &[&str]) -> Result<Option<T>, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let node = path
            .iter()
            .try_fold(&self.value, |node, key| node.as_object()?.get(*key));
        node.map(|node| T::deserialize(node)).transpose()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayeredConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse JSON {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path:?} must contain a table at the top level")]
    NotATable { path: PathBuf },
}

fn read_layer(path: &Path) -> Result<Option<Map<String, Value>>, LayeredConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|source| LayeredConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let value: Value = if is_json {
        serde_json::from_str(&text).map_err(|source| LayeredConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(&text).map_err(|source| LayeredConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    };
    match value {
        Value::Object(table) => Ok(Some(table)),
        _ => Err(LayeredConfigError::NotATable {
            path: path.to_path_buf(),
        }),
    }
}

/// Writes `src` over `dest` key by key. Tables merge recursively; anything
/// else replaces the destination leaf.
fn overlay(
    dest: &mut Map<String, Value>,
    src: &Map<String, Value>,
    path: &mut Vec<String>,
    layer: ConfigLayer,
    events: &mut Vec<ConfigDiffEvent>,
) {
    for (key, incoming) in src {
        path.push(key.clone());
        match incoming {
            Value::Object(nested) => {
                if !dest.get(key).is_some_and(Value::is_object) {
                    let displaced = dest.insert(key.clone(), Value::Object(Map::new()));
                    if let Some(previous) = displaced.filter(|v| !v.is_null()) {
                        events.push(ConfigDiffEvent {
                            layer,
                            path: path.join("."),
                            previous: Some(previous),
                            current: None,
                        });
                    }
                }
                if let Some(Value::Object(existing)) = dest.get_mut(key) {
                    overlay(existing, nested, path, layer, events);
                }
            }
            leaf => {
                let previous = dest.insert(key.clone(), leaf.clone());
                if previous.as_ref() != Some(leaf) {
                    events.push(ConfigDiffEvent {
                        layer,
                        path: path.join("."),
                        previous: previous.filter(|v| !v.is_null()),
                        current: (!leaf.is_null()).then(|| leaf.clone()),
                    });
                }
            }
        }
        path.pop();
    }
}
