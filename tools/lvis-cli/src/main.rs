// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

mod report;

use clap::{Args, Parser, Subcommand, ValueHint};
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use lvis_config::tracing::{flush_chrome_trace, init_tracing};
use lvis_env::{ExperimentConfig, PipelineState};
use lvis_pattern::PatternTable;
use lvis_trial::DatasetIndex;

use report::{IndexReport, PatternReport, TrialReport};

type DynError = Box<dyn Error>;

type Result<T> = std::result::Result<T, DynError>;

#[derive(Parser)]
#[command(author, version, about = "Stimulus and scoring driver for LVis experiments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan or reload the dataset and refresh the list caches
    Index(ConfigArgs),

    /// Build the configured output pattern table
    Patterns(PatternsArgs),

    /// Step trials through the full stimulus pipeline
    Run(RunArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Directory holding base.toml / site.toml / run.json
    #[arg(long, value_hint = ValueHint::DirPath)]
    config: PathBuf,
}

#[derive(Args)]
struct PatternsArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Write the report here instead of STDOUT
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Number of trials to step
    #[arg(long, default_value_t = 1)]
    trials: usize,

    /// Run identifier passed to init
    #[arg(long, default_value_t = 0)]
    run: i64,

    /// Total workers sharing the dataset
    #[arg(long, requires = "rank")]
    workers: Option<usize>,

    /// This worker's rank
    #[arg(long, requires = "workers")]
    rank: Option<usize>,

    /// Write one JSON record per line here instead of STDOUT
    #[arg(long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn main() {
    if let Err(err) = init_tracing() {
        eprintln!("warning: logging disabled: {err}");
    }
    let outcome = try_main();
    flush_chrome_trace();
    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Index(args) => run_index(args),
        Command::Patterns(args) => run_patterns(args),
        Command::Run(args) => run_trials(args),
    }
}

fn load_config(args: &ConfigArgs) -> Result<ExperimentConfig> {
    Ok(ExperimentConfig::load_dir(&args.config)?)
}

fn run_index(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    let index = DatasetIndex::open(&config.dataset.index_options())?;
    let report = IndexReport::from_index(&index);
    emit_json(&report, None)
}

fn run_patterns(args: &PatternsArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let index = DatasetIndex::open(&config.dataset.index_options())?;
    let table = PatternTable::build(&config.patterns, index.catalog().names())?;
    let report = PatternReport::from_table(&table);
    emit_json(&report, args.output.as_deref())
}

fn run_trials(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let mut env = match (args.workers, args.rank) {
        (Some(workers), Some(rank)) => PipelineState::configure_worker(config, workers, rank)?,
        _ => PipelineState::configure(config)?,
    };
    env.init(args.run);

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => {
            ensure_parent(path)?;
            Box::new(io::BufWriter::new(fs::File::create(path)?))
        }
        None => Box::new(io::stdout().lock()),
    };
    let mut voided = 0;
    for _ in 0..args.trials {
        let ok = env.step();
        if !ok {
            voided += 1;
        }
        if let Some(report) = TrialReport::capture(&env) {
            serde_json::to_writer(&mut sink, &report)?;
            writeln!(sink)?;
        }
    }
    sink.flush()?;
    info!(trials = args.trials, voided, "run finished");
    Ok(())
}

fn emit_json<T: serde::Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            ensure_parent(path)?;
            fs::write(path, payload)?;
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
