//! One `kinepipe` invocation: selected stages first, then the optional
//! rotate-and-regenerate pass.

use std::path::Path;

use kinepipe_pipeline::{ExecutionSummary, StageRegistry, StageRequest, StageSelector, KINEMATICS};
use kinepipe_trc::{BatchRotator, RotationReport};
use kinepipe_types::KineError;
use tracing::{info, warn};

use crate::config::Config;

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request: StageRequest,
    pub rotate: bool,
}

/// Everything that ran.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stages: Option<ExecutionSummary>,
    pub rotation: Option<RotationReport>,
    pub regenerated: Option<ExecutionSummary>,
}

/// A failed invocation, with whatever completed before the error.
///
/// Rotated files are already rewritten on disk when the kinematics rerun
/// fails, so the caller still gets the rotation report to show.
#[derive(Debug)]
pub struct RunFailure {
    pub error: KineError,
    pub partial: RunSummary,
}

impl From<KineError> for RunFailure {
    fn from(error: KineError) -> Self {
        Self {
            error,
            partial: RunSummary::default(),
        }
    }
}

/// Execute `invocation` against `registry`.
///
/// Stage failures abort immediately.  When rotating, the kinematics stage is
/// rerun only if at least one trajectory file was found.
pub fn run(
    invocation: &Invocation,
    config: &Config,
    project_dir: &Path,
    registry: &StageRegistry,
) -> Result<RunSummary, RunFailure> {
    let selector = StageSelector::new(registry, config.unknown_stages);
    let mut summary = RunSummary::default();

    let stages = selector.resolve(&invocation.request, invocation.rotate)?;
    if !stages.is_empty() {
        summary.stages = Some(selector.execute(&stages)?);
    }

    if !invocation.rotate {
        return Ok(summary);
    }

    let rotator = BatchRotator::new(config.trc_suffix.as_str());
    let report = rotator.rotate_directory(&config.pose3d_path(project_dir), &config.rotation)?;
    if report.is_empty() {
        warn!(dir = %report.directory.display(), suffix = %config.trc_suffix, "no trajectory files found; skipping kinematics");
        summary.rotation = Some(report);
        return Ok(summary);
    }

    info!(rotated = report.succeeded().count(), failed = report.failed().count(), "regenerating motion files");
    summary.rotation = Some(report);
    let regenerated = registry
        .stage(KINEMATICS)
        .and_then(|kinematics| selector.execute(&[kinematics]));
    match regenerated {
        Ok(done) => {
            summary.regenerated = Some(done);
            Ok(summary)
        }
        Err(error) => Err(RunFailure {
            error,
            partial: summary,
        }),
    }
}
