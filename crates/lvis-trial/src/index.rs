// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Category-partitioned image lists.
//!
//! The index expects one sub-directory per category under the image root.
//! Files inside a category (at any depth) that pass the extension filter are
//! sorted and split: the last `n_test` files of every category form the test
//! split, the rest the train split. Scanning a large image tree is slow, so the
//! resulting lists are written to JSON next to each other and reused whenever
//! the same root name and test size are requested again.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::CategoryCatalog;
use crate::error::{DatasetError, Result};

/// Which half of the dataset to serve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Train,
    Test,
}

/// One image, addressed by category index and path relative to its category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub category: usize,
    pub file: String,
}

/// Options accepted by [`DatasetIndex::open`].
#[derive(Clone, Debug, Default)]
pub struct IndexOptions {
    pub root: PathBuf,
    /// Accepted file extensions, compared case-insensitively. Empty accepts all.
    pub extensions: Vec<String>,
    pub n_test: usize,
    pub cache_dir: Option<PathBuf>,
    /// Categories to drop after loading.
    pub delete: Vec<String>,
    /// When non-empty, the only categories kept after loading.
    pub select: Vec<String>,
}

/// Locations of the three cache files for one root/test-size pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachePaths {
    pub categories: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
}

impl CachePaths {
    pub fn new(dir: &Path, tag: &str, n_test: usize) -> Self {
        Self {
            categories: dir.join(format!("{tag}_cats.json")),
            train: dir.join(format!("{tag}_ntest{n_test}_trn.json")),
            test: dir.join(format!("{tag}_ntest{n_test}_tst.json")),
        }
    }

    fn all_exist(&self) -> bool {
        self.categories.is_file() && self.train.is_file() && self.test.is_file()
    }
}

/// Train/test image lists partitioned by category, plus flat views used for
/// row addressing.
#[derive(Clone, Debug)]
pub struct DatasetIndex {
    root: PathBuf,
    n_test: usize,
    catalog: CategoryCatalog,
    train: Vec<Vec<String>>,
    test: Vec<Vec<String>>,
    flat_train: Vec<ImageEntry>,
    flat_test: Vec<ImageEntry>,
}

impl DatasetIndex {
    /// Loads the cached lists when available, otherwise scans the root and
    /// refreshes the cache, then applies the category filters.
    pub fn open(options: &IndexOptions) -> Result<Self> {
        if !options.root.is_dir() {
            return Err(DatasetError::MissingRoot {
                path: options.root.clone(),
            });
        }

        let cached = match options.cache_dir.as_deref() {
            Some(dir) => Self::load_cache(&options.root, dir, options.n_test)?,
            None => None,
        };

        let mut index = match cached {
            Some(index) => index,
            None => {
                let index = Self::scan(&options.root, &options.extensions, options.n_test)?;
                if let Some(dir) = options.cache_dir.as_deref() {
                    index.save_cache(dir)?;
                }
                index
            }
        };

        if !options.delete.is_empty() {
            index.delete_categories(&options.delete)?;
        }
        if !options.select.is_empty() {
            index.select_categories(&options.select)?;
        }
        if index.flat_train.is_empty() && index.flat_test.is_empty() {
            return Err(DatasetError::EmptyDataset {
                root: options.root.clone(),
                filter: options.extensions.clone(),
            });
        }

        info!(
            root = %index.root.display(),
            categories = index.catalog.len(),
            train = index.flat_train.len(),
            test = index.flat_test.len(),
            "dataset index ready"
        );
        Ok(index)
    }

    /// Walks `root/<category>/**` and builds the split lists.
    pub fn scan(root: &Path, extensions: &[String], n_test: usize) -> Result<Self> {
        if !root.is_dir() {
            return Err(DatasetError::MissingRoot {
                path: root.to_path_buf(),
            });
        }

        let mut categories = Vec::new();
        for entry in read_dir_sorted(root)? {
            if !entry.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let mut files = Vec::new();
            collect_files(&entry, &entry, extensions, &mut files)?;
            if files.is_empty() {
                debug!(category = name, "skipping category without matching files");
                continue;
            }
            files.sort();
            categories.push((name.to_string(), files));
        }

        if categories.is_empty() {
            return Err(DatasetError::EmptyDataset {
                root: root.to_path_buf(),
                filter: extensions.to_vec(),
            });
        }

        let mut names = Vec::with_capacity(categories.len());
        let mut train = Vec::with_capacity(categories.len());
        let mut test = Vec::with_capacity(categories.len());
        for (name, mut files) in categories {
            let held_out = n_test.min(files.len());
            let test_files = files.split_off(files.len() - held_out);
            names.push(name);
            train.push(files);
            test.push(test_files);
        }

        Self::from_lists(root.to_path_buf(), n_test, names, train, test)
    }

    /// Builds an index from already partitioned per-category lists.
    pub fn from_lists(
        root: PathBuf,
        n_test: usize,
        names: Vec<String>,
        train: Vec<Vec<String>>,
        test: Vec<Vec<String>>,
    ) -> Result<Self> {
        if train.len() != names.len() || test.len() != names.len() {
            return Err(DatasetError::CacheMismatch {
                path: root,
                reason: format!(
                    "{} categories but {} train and {} test lists",
                    names.len(),
                    train.len(),
                    test.len()
                ),
            });
        }
        let catalog = CategoryCatalog::from_names(names)?;
        let flat_train = flatten(&train);
        let flat_test = flatten(&test);
        Ok(Self {
            root,
            n_test,
            catalog,
            train,
            test,
            flat_train,
            flat_test,
        })
    }

    /// Name used to key the cache files: the last component of the root.
    pub fn image_tag(&self) -> String {
        image_tag(&self.root)
    }

    /// Writes the category list and both splits as JSON under `dir`.
    pub fn save_cache(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| DatasetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let paths = CachePaths::new(dir, &self.image_tag(), self.n_test);
        write_json(&paths.categories, &self.catalog.names())?;
        write_json(&paths.train, &self.train)?;
        write_json(&paths.test, &self.test)?;
        debug!(dir = %dir.display(), "dataset lists cached");
        Ok(())
    }

    /// Reads cached lists for `root`. Returns `Ok(None)` when any file is absent.
    pub fn load_cache(root: &Path, dir: &Path, n_test: usize) -> Result<Option<Self>> {
        let paths = CachePaths::new(dir, &image_tag(root), n_test);
        if !paths.all_exist() {
            debug!(dir = %dir.display(), "no dataset cache, scanning");
            return Ok(None);
        }
        let names: Vec<String> = read_json(&paths.categories)?;
        let train: Vec<Vec<String>> = read_json(&paths.train)?;
        let test: Vec<Vec<String>> = read_json(&paths.test)?;
        info!(cache = %paths.categories.display(), "loaded dataset lists from cache");
        Self::from_lists(root.to_path_buf(), n_test, names, train, test).map(Some)
    }

    /// Removes the named categories. Remaining categories keep their order.
    pub fn delete_categories<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut drop = vec![false; self.catalog.len()];
        for name in names {
            let name = name.as_ref();
            let idx = self
                .catalog
                .index_of(name)
                .ok_or_else(|| DatasetError::UnknownCategory {
                    name: name.to_string(),
                })?;
            drop[idx] = true;
        }
        self.retain(|idx| !drop[idx])
    }

    /// Keeps only the named categories, in catalog order.
    pub fn select_categories<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut keep = vec![false; self.catalog.len()];
        for name in names {
            let name = name.as_ref();
            let idx = self
                .catalog
                .index_of(name)
                .ok_or_else(|| DatasetError::UnknownCategory {
                    name: name.to_string(),
                })?;
            keep[idx] = true;
        }
        self.retain(|idx| keep[idx])
    }

    fn retain(&mut self, keep: impl Fn(usize) -> bool) -> Result<()> {
        let mut names = Vec::new();
        let mut train = Vec::new();
        let mut test = Vec::new();
        for (idx, name) in self.catalog.names().iter().enumerate() {
            if keep(idx) {
                names.push(name.clone());
                train.push(std::mem::take(&mut self.train[idx]));
                test.push(std::mem::take(&mut self.test[idx]));
            }
        }
        if names.is_empty() {
            warn!("category filters removed every category");
        }
        *self = Self::from_lists(self.root.clone(), self.n_test, names, train, test)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn n_test(&self) -> usize {
        self.n_test
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Per-category file lists for a split.
    pub fn files(&self, split: Split) -> &[Vec<String>] {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    /// Flat, category-ordered list used for row addressing.
    pub fn entries(&self, split: Split) -> &[ImageEntry] {
        match split {
            Split::Train => &self.flat_train,
            Split::Test => &self.flat_test,
        }
    }

    pub fn len(&self, split: Split) -> usize {
        self.entries(split).len()
    }

    pub fn is_empty(&self, split: Split) -> bool {
        self.entries(split).is_empty()
    }

    /// Absolute path of an entry on disk.
    pub fn path_of(&self, entry: &ImageEntry) -> PathBuf {
        let category = self.catalog.name(entry.category).unwrap_or_default();
        self.root.join(category).join(&entry.file)
    }
}

fn flatten(lists: &[Vec<String>]) -> Vec<ImageEntry> {
    lists
        .iter()
        .enumerate()
        .flat_map(|(category, files)| {
            files.iter().map(move |file| ImageEntry {
                category,
                file: file.clone(),
            })
        })
        .collect()
}

fn image_tag(root: &Path) -> String {
    root.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "images".to_string())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source: std::io::Error| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

fn collect_files(
    base: &Path,
    dir: &Path,
    extensions: &[String],
    out: &mut Vec<String>,
) -> Result<()> {
    for path in read_dir_sorted(dir)? {
        if path.is_dir() {
            collect_files(base, &path, extensions, out)?;
        } else if matches_extension(&path, extensions) {
            if let Ok(relative) = path.strip_prefix(base) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    Ok(())
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(root: &Path, category: &str, file: &str) {
        let path = root.join(category).join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn png() -> Vec<String> {
        vec!["png".to_string()]
    }

    #[test]
    fn scan_splits_last_files_into_test() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("objs");
        for file in ["a.png", "b.png", "c.png", "notes.txt"] {
            touch(&root, "car", file);
        }
        touch(&root, "banana", "x.PNG");
        touch(&root, "banana", "sub/y.png");

        let index = DatasetIndex::scan(&root, &png(), 1).unwrap();
        assert_eq!(index.catalog().names(), &["banana", "car"]);
        assert_eq!(index.files(Split::Train)[1], vec!["a.png", "b.png"]);
        assert_eq!(index.files(Split::Test)[1], vec!["c.png"]);
        assert_eq!(index.files(Split::Train)[0], vec!["sub/y.png"]);
        assert_eq!(index.files(Split::Test)[0], vec!["x.PNG"]);
        assert_eq!(index.len(Split::Train), 3);
        assert_eq!(
            index.entries(Split::Train)[2],
            ImageEntry {
                category: 1,
                file: "b.png".into()
            }
        );
        assert_eq!(
            index.path_of(&index.entries(Split::Train)[0]),
            root.join("banana").join("sub/y.png")
        );
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let options = IndexOptions {
            root: dir.path().join("absent"),
            ..Default::default()
        };
        let err = DatasetIndex::open(&options).unwrap_err();
        assert!(matches!(err, DatasetError::MissingRoot { .. }));
    }

    #[test]
    fn cache_round_trip_skips_rescan() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("objs");
        let cache = dir.path().join("cache");
        touch(&root, "car", "a.png");
        touch(&root, "car", "b.png");
        touch(&root, "lamp", "c.png");

        let options = IndexOptions {
            root: root.clone(),
            extensions: png(),
            n_test: 1,
            cache_dir: Some(cache.clone()),
            ..Default::default()
        };
        let first = DatasetIndex::open(&options).unwrap();
        let paths = CachePaths::new(&cache, "objs", 1);
        assert!(paths.all_exist());
        assert!(paths.train.ends_with("objs_ntest1_trn.json"));

        // new files are invisible until the cache is invalidated
        touch(&root, "car", "z.png");
        let second = DatasetIndex::open(&options).unwrap();
        assert_eq!(first.files(Split::Train), second.files(Split::Train));

        // a different test size keys a different cache
        let rescanned = DatasetIndex::open(&IndexOptions {
            n_test: 0,
            ..options.clone()
        })
        .unwrap();
        assert_eq!(rescanned.files(Split::Train)[0].len(), 3);
    }

    #[test]
    fn delete_and_select_reindex_categories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("objs");
        for cat in ["banana", "car", "chair", "lamp"] {
            touch(&root, cat, "a.png");
        }
        let mut index = DatasetIndex::scan(&root, &png(), 0).unwrap();
        index.delete_categories(&["car"]).unwrap();
        assert_eq!(index.catalog().names(), &["banana", "chair", "lamp"]);
        index.select_categories(&["lamp", "banana"]).unwrap();
        assert_eq!(index.catalog().names(), &["banana", "lamp"]);
        assert_eq!(index.entries(Split::Train)[1].category, 1);

        let err = index.delete_categories(&["car"]).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownCategory { .. }));
    }
}
