// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use lvis_pattern::sparse::hamming;
use lvis_pattern::{
    Classifier, PatternConfig, PatternError, PatternMode, PatternTable, ScoreTally, SparseParams,
};

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("obj{i:02}")).collect()
}

fn sparse_config(dir: &std::path::Path, seed: u64) -> PatternConfig {
    PatternConfig {
        mode: PatternMode::SparseRandom,
        out_size: [6, 6],
        pct_on: 0.2,
        min_diff: 0.5,
        cache_dir: Some(dir.to_path_buf()),
        seed: Some(seed),
        ..PatternConfig::default()
    }
}

#[test]
fn sparse_table_is_cached_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let cats = names(12);
    let first = PatternTable::build(&sparse_config(dir.path(), 1), &cats).unwrap();
    assert_eq!(first.shape(), &[6, 6]);

    let params = SparseParams::from_config(&sparse_config(dir.path(), 1), 12).unwrap();
    let cache = dir.path().join("6x6_n12_on7_df4.tsv");
    assert_eq!(params.cache_file_name(), "6x6_n12_on7_df4.tsv");
    assert!(cache.exists());

    // a different seed would draw different patterns, so equality proves a cache hit
    let second = PatternTable::build(&sparse_config(dir.path(), 99), &cats).unwrap();
    assert_eq!(first, second);

    let rows: Vec<&[f32]> = first.rows().collect();
    for (i, a) in rows.iter().enumerate() {
        assert_eq!(a.iter().filter(|v| **v > 0.5).count(), 7);
        for b in &rows[i + 1..] {
            assert!(hamming(a, b) >= 4);
        }
    }
}

#[test]
fn over_constrained_table_is_a_configuration_error() {
    let config = PatternConfig {
        mode: PatternMode::SparseRandom,
        out_size: [2, 2],
        pct_on: 0.5,
        min_diff: 2.0,
        max_attempts: 100,
        seed: Some(3),
        ..PatternConfig::default()
    };
    let err = PatternTable::build(&config, &names(3)).unwrap_err();
    assert!(matches!(err, PatternError::MinDiffUnsatisfied { .. }));
}

#[test]
fn localist_scenario_three_categories() {
    let config = PatternConfig {
        out_size: [2, 2],
        n_out_per: 2,
        ..PatternConfig::default()
    };
    let table = PatternTable::build(&config, &names(3)).unwrap();
    assert_eq!(table.cell_len(), 8);

    let mut occupied = vec![0; 8];
    for row in table.rows() {
        for (i, v) in row.iter().enumerate() {
            if *v == 1.0 {
                occupied[i] += 1;
            }
        }
    }
    assert_eq!(occupied, [1, 1, 1, 1, 1, 1, 0, 0]);

    let clf = Classifier::default();
    let mut tally = ScoreTally::new(table.len());
    for k in 0..table.len() {
        let probe = table.row(k).unwrap().to_vec();
        tally.record(&clf.classify(&table, &probe, k).unwrap(), k);
    }
    assert_eq!(tally.pct_correct(), 100.0);
}
