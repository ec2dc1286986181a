//! `train <DIR> [TRAINER_ARGS]...`
//!
//! Trains the classifier for a finished training directory and packages it
//! into `<DIR>/model.zip`. Trainer arguments are forwarded verbatim; a leading
//! `--executable <path>` pair replaces the default trainer binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cleaver_core::SigmoidConfig;
use cleaver_trainer::{TrainingDirectory, package_classifier, train_classifier};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "train", version, about = "Train and package a classifier")]
struct Cli {
    /// Sigmoid fit iteration cap
    #[arg(long, default_value_t = SigmoidConfig::default().max_iterations)]
    sigmoid_max_iterations: usize,

    /// Sigmoid fit gradient tolerance
    #[arg(long, default_value_t = SigmoidConfig::default().tolerance)]
    sigmoid_tolerance: f64,

    /// Training directory written by a DataWriter
    dir: PathBuf,

    /// Arguments passed through to the external trainer
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    trainer_args: Vec<String>,
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dir = TrainingDirectory::open(&cli.dir)
        .with_context(|| format!("opening training directory {}", cli.dir.display()))?;

    let sigmoid = SigmoidConfig::default()
        .with_max_iterations(cli.sigmoid_max_iterations)
        .with_tolerance(cli.sigmoid_tolerance);

    let runs = train_classifier(&dir, &cli.trainer_args, &sigmoid)
        .with_context(|| format!("training {} classifier", dir.kind()))?;
    for run in runs.iter().filter(|run| !run.success()) {
        warn!(command = %run.command_line, status = %run.status, "trainer reported failure");
    }

    let archive = package_classifier(&dir).context("packaging classifier")?;
    info!(archive = %archive.display(), kind = %dir.kind(), "classifier ready");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Training failed: {e:#}");
        std::process::exit(1);
    }
}
