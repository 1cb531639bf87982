// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::tempdir;

fn write_fixture(dir: &Path, mode: &str) {
    for name in ["apple", "boat"] {
        let cat = dir.join("images").join(name);
        fs::create_dir_all(&cat).unwrap();
        for i in 0..3u8 {
            let img = RgbaImage::from_fn(20, 20, |x, y| {
                let v = if (x + y + u32::from(i)) % 5 == 0 { 250 } else { 40 };
                Rgba([v, 100, 255 - v, 255])
            });
            img.save(cat.join(format!("{i}.png"))).unwrap();
        }
    }
    let base = format!(
        r#"
[lvis.dataset]
root = "images"
n_test = 1
cache_dir = "cache"

[lvis.sequencer]
sequential = true

[lvis.augment]
seed = 5

[lvis.filters]
image_size = [24, 24]
serial = true

[lvis.patterns]
mode = "{mode}"
out_size = [4, 4]
n_out_per = 1
cache_dir = "patterns"
seed = 8
"#
    );
    fs::write(dir.join("base.toml"), base).unwrap();
}

fn run_cli(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_lvis-cli"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

#[test]
fn index_reports_split_counts_and_writes_cache() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path(), "localist");
    let config = dir.path().to_str().unwrap();

    let output = run_cli(&["index", "--config", config]);
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["train"], 4);
    assert_eq!(report["test"], 2);
    assert_eq!(report["categories"][1]["name"], "boat");
    assert!(dir.path().join("cache").join("images_cats.json").exists());
    assert!(dir.path().join("cache").join("images_ntest1_trn.json").exists());
}

#[test]
fn patterns_writes_sparse_table_and_cache() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path(), "sparse_random");
    let out = dir.path().join("out").join("patterns.json");

    run_cli(&[
        "patterns",
        "--config",
        dir.path().to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    let report: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["mode"], "sparse_random");
    assert_eq!(report["shape"], serde_json::json!([4, 4]));
    let apple = report["patterns"]["apple"].as_array().unwrap();
    assert_eq!(apple.len(), 16);
    // 0.2 * 16 rounds to 3 active units, min diff round(1.5) = 2
    assert!(dir.path().join("patterns").join("4x4_n2_on3_df2.tsv").exists());
}

#[test]
fn run_emits_one_record_per_trial() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path(), "localist");
    let out = dir.path().join("trials.jsonl");

    run_cli(&[
        "run",
        "--config",
        dir.path().to_str().unwrap(),
        "--trials",
        "5",
        "--output",
        out.to_str().unwrap(),
    ]);
    let text = fs::read_to_string(&out).unwrap();
    let records: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 5);
    let categories: Vec<u64> = records
        .iter()
        .map(|r| r["category"].as_u64().unwrap())
        .collect();
    assert_eq!(categories, [0, 0, 1, 1, 0]);
    assert_eq!(records[0]["voided"], false);
    assert_eq!(records[0]["shapes"]["Output"], serde_json::json!([4, 4, 1, 1]));
    assert_eq!(records[0]["shapes"]["Image"], serde_json::json!([24, 24, 4]));
}

#[test]
fn missing_dataset_root_fails() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("base.toml"),
        "[lvis.dataset]\nroot = \"nowhere\"\n",
    )
    .unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_lvis-cli"))
        .args(["index", "--config", dir.path().to_str().unwrap()])
        .env("RUST_LOG", "off")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[cfg(unix)]
#[test]
fn unreadable_trace_setting_is_reported_but_not_fatal() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    write_fixture(dir.path(), "localist");
    let output = Command::new(env!("CARGO_BIN_EXE_lvis-cli"))
        .args(["index", "--config", dir.path().to_str().unwrap()])
        .env("RUST_LOG", "warn")
        .env("LVIS_TRACE_CHROME", OsStr::from_bytes(&[0xff, 0xfe]))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LVIS_TRACE_CHROME"), "stderr: {stderr}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["train"], 4);
}
