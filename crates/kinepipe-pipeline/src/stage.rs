//! Pipeline stages and the [`StageAction`] capability they wrap.
//!
//! The biomechanics work itself (calibration, triangulation, inverse
//! kinematics, …) lives outside this crate.  A stage only knows its name and
//! how to invoke its action; the rest of the pipeline only ever talks to the
//! trait, so in-process closures and external tools are interchangeable.

use std::path::PathBuf;
use std::process::Command;

use kinepipe_types::KineError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An opaque, zero-argument unit of pipeline work.
pub trait StageAction: Send + Sync {
    /// Run the stage to completion.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining pipeline run.
    fn run(&self) -> Result<(), KineError>;
}

impl<F> StageAction for F
where
    F: Fn() -> Result<(), KineError> + Send + Sync,
{
    fn run(&self) -> Result<(), KineError> {
        self()
    }
}

/// A named pipeline stage.
pub struct PipelineStage {
    name: String,
    entry_point: String,
    action: Box<dyn StageAction>,
}

impl PipelineStage {
    /// Create a stage.  `entry_point` is the collaborator's name for the
    /// operation (e.g. `"poseEstimation"` for the `pose_estimation` stage).
    pub fn new(
        name: impl Into<String>,
        entry_point: impl Into<String>,
        action: impl StageAction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            entry_point: entry_point.into(),
            action: Box::new(action),
        }
    }

    /// Create a stage backed by an in-process closure.
    pub fn from_fn(
        name: impl Into<String>,
        entry_point: impl Into<String>,
        action: impl Fn() -> Result<(), KineError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, entry_point, action)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Invoke the stage action.
    pub fn run(&self) -> Result<(), KineError> {
        self.action.run()
    }
}

impl std::fmt::Debug for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStage")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// External command action
// ─────────────────────────────────────────────────────────────────────────────

/// Placeholder in [`Launcher::args`] replaced by the stage entry point.
pub const ENTRY_PLACEHOLDER: &str = "{entry}";

/// Program used to run stages provided by an external tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-c".to_string(),
        "from Pose2Sim import Pose2Sim; Pose2Sim.{entry}()".to_string(),
    ]
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

impl Launcher {
    /// The argument list with every placeholder replaced by `entry_point`.
    pub fn args_for(&self, entry_point: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(ENTRY_PLACEHOLDER, entry_point))
            .collect()
    }
}

/// A [`StageAction`] that runs the [`Launcher`] in the project directory and
/// waits for it to exit.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    stage: String,
    entry_point: String,
    launcher: Launcher,
    working_dir: PathBuf,
}

impl ExternalCommand {
    pub fn new(
        stage: impl Into<String>,
        entry_point: impl Into<String>,
        launcher: Launcher,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stage: stage.into(),
            entry_point: entry_point.into(),
            launcher,
            working_dir: working_dir.into(),
        }
    }

    fn failure(&self, details: String) -> KineError {
        KineError::StageExecution {
            stage: self.stage.clone(),
            details,
        }
    }
}

impl StageAction for ExternalCommand {
    fn run(&self) -> Result<(), KineError> {
        let args = self.launcher.args_for(&self.entry_point);
        debug!(stage = %self.stage, program = %self.launcher.program, ?args, "launching stage");
        let status = Command::new(&self.launcher.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .status()
            .map_err(|e| self.failure(format!("failed to launch '{}': {e}", self.launcher.program)))?;
        if status.success() {
            Ok(())
        } else {
            Err(self.failure(format!("'{}' exited with {status}", self.launcher.program)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn closure_stage_runs_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let stage = PipelineStage::from_fn("filtering", "filtering", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        stage.run().unwrap();
        stage.run().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(stage.name(), "filtering");
    }

    #[test]
    fn launcher_substitutes_entry_point() {
        let launcher = Launcher::default();
        let args = launcher.args_for("markerAugmentation");
        assert_eq!(args[0], "-c");
        assert!(args[1].ends_with("Pose2Sim.markerAugmentation()"));
    }

    #[test]
    fn debug_output_omits_action() {
        let stage = PipelineStage::from_fn("kinematics", "kinematics", || Ok(()));
        let s = format!("{stage:?}");
        assert!(s.contains("kinematics"));
        assert!(s.contains(".."));
    }

    #[test]
    fn missing_program_is_stage_execution_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let launcher = Launcher {
            program: "kinepipe-definitely-not-installed".to_string(),
            args: vec![],
        };
        let cmd = ExternalCommand::new("calibration", "calibration", launcher, dir.path());
        match cmd.run() {
            Err(KineError::StageExecution { stage, details }) => {
                assert_eq!(stage, "calibration");
                assert!(details.contains("failed to launch"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_stage_execution_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let launcher = Launcher {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "test {entry} = ok".to_string()],
        };
        let ok = ExternalCommand::new("a", "ok", launcher.clone(), dir.path());
        assert!(ok.run().is_ok());

        let bad = ExternalCommand::new("b", "nope", launcher, dir.path());
        assert!(matches!(bad.run(), Err(KineError::StageExecution { .. })));
    }
}
