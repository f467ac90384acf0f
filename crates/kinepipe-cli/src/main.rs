//! `kinepipe-cli` – markerless motion-capture pipeline runner.
//!
//! 1. Parses stage flags (`--calibration` … `--kinematics`, `--all`) and
//!    `--rotate`.
//! 2. Loads `<project>/kinepipe.toml` (or `--config`), falling back to
//!    defaults.
//! 3. Runs the selected stages in canonical order; with no flags, runs all
//!    of them.
//! 4. With `--rotate`, fixes the orientation of the filtered trajectories in
//!    `<project>/pose-3d` and reruns kinematics to regenerate motion files.

mod cli;
mod config;
mod workflow;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use kinepipe_pipeline::{init_tracing, StageRegistry};
use kinepipe_trc::{Outcome, RotationReport};
use kinepipe_types::KineError;

use crate::cli::Cli;
use crate::workflow::{Invocation, RunFailure, RunSummary};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let telemetry = init_tracing("kinepipe");
    tracing::debug!(span_export = telemetry.is_exporting(), "tracing initialised");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), KineError> {
    let project_dir = cli.project_dir();

    if cli.init_config {
        let path = config::config_path(&project_dir);
        config::save_to(&config::Config::default(), &path)?;
        println!("  {} Config written to {}", "✓".green().bold(), path.display().to_string().bold());
        return Ok(());
    }

    let cfg = config::load(cli.config.as_deref(), &project_dir)?;
    tracing::debug!(config = ?cfg, project = %project_dir.display(), "configuration loaded");

    let registry = StageRegistry::pose_pipeline(&cfg.launcher, &project_dir);
    let invocation = Invocation {
        request: cli.stage_request(),
        rotate: cli.rotate,
    };

    match workflow::run(&invocation, &cfg, &project_dir, &registry) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(RunFailure { error, partial }) => {
            // Files may already be rewritten; show what happened to them.
            print_summary(&partial);
            Err(error)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_summary(summary: &RunSummary) {
    if let Some(stages) = &summary.stages {
        println!(
            "{} {} stage(s) completed in {:.1?}: {}",
            "✓".green().bold(),
            stages.completed.len(),
            stages.elapsed,
            stages.completed.join(", ")
        );
    }
    if let Some(report) = &summary.rotation {
        print_rotation_report(report);
    }
    if summary.regenerated.is_some() {
        println!("{} Motion files regenerated from corrected trajectories.", "✓".green().bold());
    }
}

fn print_rotation_report(report: &RotationReport) {
    println!(
        "  Found {} trajectory file(s) in {}",
        report.files_found(),
        report.directory.display().to_string().bold()
    );
    if report.is_empty() {
        println!("  {}", "No files found! Check the path or the file naming.".yellow());
        return;
    }
    for entry in &report.outcomes {
        match &entry.outcome {
            Outcome::Rotated { rows } => {
                println!("  {} Rotated {} ({rows} frames)", "✓".green(), entry.file_name.bold())
            }
            Outcome::Failed { reason } => {
                println!("  {} Error processing {}: {reason}", "✗".red(), entry.file_name.bold())
            }
        }
    }
}
