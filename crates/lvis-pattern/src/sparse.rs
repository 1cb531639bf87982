// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Sparse random output patterns with a minimum pairwise difference.
//!
//! Each category draws a random permutation of the units and switches the
//! first `n_on` of them on; a draw is rejected while it lies closer than
//! `min_diff` differing units to an accepted pattern. The search is bounded by
//! `max_attempts` per category. Tables are cached as TSV files whose name
//! encodes every generation parameter, so a cache hit reproduces the table.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use lvis_config::determinism;

use crate::error::{PatternError, Result};
use crate::table::{PatternConfig, PatternMode, PatternTable};

/// Resolved generation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SparseParams {
    pub rows: usize,
    pub cols: usize,
    pub categories: usize,
    pub n_on: usize,
    pub min_diff: usize,
}

impl SparseParams {
    pub fn from_config(config: &PatternConfig, categories: usize) -> Result<Self> {
        let [rows, cols] = config.out_size;
        let total = rows * cols;
        if total == 0 {
            return Err(PatternError::InvalidGeometry {
                reason: format!("{rows}x{cols} output has no units"),
            });
        }
        if !(0.0..=1.0).contains(&config.pct_on)
            || config.min_diff.is_nan()
            || config.min_diff < 0.0
        {
            return Err(PatternError::InvalidGeometry {
                reason: format!(
                    "pct_on {} must lie in [0, 1] and min_diff {} must be non-negative",
                    config.pct_on, config.min_diff
                ),
            });
        }
        let n_on = (config.pct_on * total as f32).round() as usize;
        if n_on == 0 {
            return Err(PatternError::InvalidGeometry {
                reason: format!("pct_on {} activates no units of {total}", config.pct_on),
            });
        }
        let min_diff = (config.min_diff * n_on as f32).round() as usize;
        Ok(Self {
            rows,
            cols,
            categories,
            n_on,
            min_diff,
        })
    }

    pub fn total(&self) -> usize {
        self.rows * self.cols
    }

    /// `<cols>x<rows>_n<categories>_on<n_on>_df<min_diff>.tsv`
    pub fn cache_file_name(&self) -> String {
        format!(
            "{}x{}_n{}_on{}_df{}.tsv",
            self.cols, self.rows, self.categories, self.n_on, self.min_diff
        )
    }
}

/// Number of positions where two binary patterns differ.
pub fn hamming(a: &[f32], b: &[f32]) -> usize {
    a.iter()
        .zip(b)
        .filter(|(x, y)| (**x > 0.5) != (**y > 0.5))
        .count()
}

/// Draws one pattern per category, rejecting draws too close to those
/// already accepted.
pub fn generate<R: Rng>(
    params: &SparseParams,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<Vec<f32>>> {
    let total = params.total();
    let mut units: Vec<usize> = (0..total).collect();
    let mut accepted: Vec<Vec<f32>> = Vec::with_capacity(params.categories);

    for category in 0..params.categories {
        let mut attempts = 0;
        loop {
            if attempts >= max_attempts {
                return Err(PatternError::MinDiffUnsatisfied {
                    category,
                    attempts,
                    min_diff: params.min_diff,
                });
            }
            attempts += 1;
            units.shuffle(rng);
            let mut candidate = vec![0.0f32; total];
            for &u in &units[..params.n_on] {
                candidate[u] = 1.0;
            }
            if accepted
                .iter()
                .all(|prev| hamming(prev, &candidate) >= params.min_diff)
            {
                debug!(category, attempts, "accepted sparse pattern");
                accepted.push(candidate);
                break;
            }
        }
    }
    Ok(accepted)
}

/// Loads the cached table for `config` when present, otherwise generates it
/// and writes the cache.
pub(crate) fn load_or_generate(config: &PatternConfig, names: Vec<String>) -> Result<PatternTable> {
    let params = SparseParams::from_config(config, names.len())?;
    let file_name = params.cache_file_name();
    let cache = config.cache_dir.as_ref().map(|dir| dir.join(&file_name));

    if let Some(path) = &cache {
        if path.exists() {
            match read_tsv(path, &params)? {
                Some(rows) => {
                    info!(path = %path.display(), "loaded cached sparse patterns");
                    return Ok(assemble(&params, names, rows));
                }
                None => warn!(path = %path.display(), "stale pattern cache, regenerating"),
            }
        }
    }

    let label = format!("lvis-pattern/sparse:{file_name}");
    let mut rng = determinism::rng_from_optional(config.seed, &label);
    let rows = generate(&params, config.max_attempts, &mut rng)?;
    info!(
        categories = params.categories,
        n_on = params.n_on,
        min_diff = params.min_diff,
        "generated sparse patterns"
    );
    if let Some(path) = &cache {
        write_tsv(path, &names, &rows)?;
    }
    Ok(assemble(&params, names, rows))
}

fn assemble(params: &SparseParams, names: Vec<String>, rows: Vec<Vec<f32>>) -> PatternTable {
    let data = rows.into_iter().flatten().collect();
    PatternTable::from_rows(
        PatternMode::SparseRandom,
        vec![params.rows, params.cols],
        names,
        data,
    )
}

/// Writes `Name` plus one column per unit, one row per category.
pub fn write_tsv(path: &Path, names: &[String], rows: &[Vec<f32>]) -> Result<()> {
    let io_err = |source: std::io::Error| PatternError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    let cells = rows.first().map_or(0, Vec::len);

    let mut header = String::from("Name");
    for i in 0..cells {
        header.push_str(&format!("\tP{i}"));
    }
    writeln!(out, "{header}").map_err(io_err)?;
    for (name, row) in names.iter().zip(rows) {
        let values: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
        writeln!(out, "{name}\t{}", values.join("\t")).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

/// Reads a cache written by [`write_tsv`]. Returns `Ok(None)` when the file
/// holds a different number of categories or units than `params` expects.
pub fn read_tsv(path: &Path, params: &SparseParams) -> Result<Option<Vec<Vec<f32>>>> {
    let file = fs::File::open(path).map_err(|source| PatternError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format_err = |line: usize, reason: String| PatternError::CacheFormat {
        path: PathBuf::from(path),
        line,
        reason,
    };

    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| PatternError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lineno = idx + 1;
        if idx == 0 {
            if !line.starts_with("Name") {
                return Err(format_err(lineno, "missing Name header".into()));
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        fields.next();
        let row = fields
            .map(|f| {
                f.trim()
                    .parse::<f32>()
                    .map_err(|err| format_err(lineno, format!("`{f}`: {err}")))
            })
            .collect::<Result<Vec<f32>>>()?;
        if row.len() != params.total() {
            return Ok(None);
        }
        rows.push(row);
    }
    if rows.len() != params.categories {
        return Ok(None);
    }
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> SparseParams {
        SparseParams::from_config(
            &PatternConfig {
                mode: PatternMode::SparseRandom,
                out_size: [5, 5],
                pct_on: 0.2,
                min_diff: 0.5,
                ..PatternConfig::default()
            },
            10,
        )
        .unwrap()
    }

    #[test]
    fn params_round_counts() {
        let p = params();
        assert_eq!(p.n_on, 5);
        assert_eq!(p.min_diff, 3);
        assert_eq!(p.cache_file_name(), "5x5_n10_on5_df3.tsv");
    }

    #[test]
    fn generated_patterns_respect_min_diff() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(9);
        let rows = generate(&p, 10_000, &mut rng).unwrap();
        assert_eq!(rows.len(), 10);
        for (i, a) in rows.iter().enumerate() {
            assert_eq!(a.iter().filter(|v| **v == 1.0).count(), 5);
            for b in &rows[i + 1..] {
                assert!(hamming(a, b) >= p.min_diff);
            }
        }
    }

    #[test]
    fn impossible_min_diff_fails_fast() {
        // 2 units on of 4, three patterns that must be fully disjoint
        let p = SparseParams {
            rows: 2,
            cols: 2,
            categories: 3,
            n_on: 2,
            min_diff: 4,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate(&p, 200, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            PatternError::MinDiffUnsatisfied {
                category: 2,
                attempts: 200,
                min_diff: 4
            }
        ));
    }

    #[test]
    fn tsv_round_trip_and_stale_detection() {
        let dir = tempfile::tempdir().unwrap();
        let p = params();
        let mut rng = StdRng::seed_from_u64(4);
        let rows = generate(&p, 10_000, &mut rng).unwrap();
        let names: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let path = dir.path().join(p.cache_file_name());
        write_tsv(&path, &names, &rows).unwrap();

        assert_eq!(read_tsv(&path, &p).unwrap(), Some(rows));
        let fewer = SparseParams { categories: 9, ..p };
        assert_eq!(read_tsv(&path, &fewer).unwrap(), None);
    }

    #[test]
    fn garbage_cell_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        fs::write(&path, "Name\tP0\nc0\tx\n").unwrap();
        let p = SparseParams {
            rows: 1,
            cols: 1,
            categories: 1,
            n_on: 1,
            min_diff: 0,
        };
        assert!(matches!(
            read_tsv(&path, &p),
            Err(PatternError::CacheFormat { line: 2, .. })
        ));
    }
}
