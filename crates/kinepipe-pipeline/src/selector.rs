//! Stage selection and sequential execution.
//!
//! [`StageSelector::resolve`] turns a [`StageRequest`] into an execution list
//! that always follows [`StageRegistry`] order, whatever order the names were
//! requested in.  [`StageSelector::execute`] then runs the list like a
//! sequence node: left to right, stopping at the first failure.
//!
//! # Example
//!
//! ```rust
//! use kinepipe_pipeline::{PipelineStage, StageRegistry, StageRequest, StageSelector};
//!
//! let registry = StageRegistry::new(vec![
//!     PipelineStage::from_fn("calibration", "calibration", || Ok(())),
//!     PipelineStage::from_fn("triangulation", "triangulation", || Ok(())),
//!     PipelineStage::from_fn("kinematics", "kinematics", || Ok(())),
//! ])
//! .unwrap();
//!
//! let selector = StageSelector::new(&registry, Default::default());
//! let request = StageRequest::named(["kinematics", "calibration"]);
//! let stages = selector.resolve(&request, false).unwrap();
//! let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
//! assert_eq!(names, ["calibration", "kinematics"]);
//! ```

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use kinepipe_types::KineError;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::registry::StageRegistry;
use crate::stage::PipelineStage;

/// What to do with requested names that are not in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStagePolicy {
    /// Log a warning and drop the name.
    #[default]
    Ignore,
    /// Fail the whole resolution with [`KineError::NotFound`].
    Reject,
}

/// The caller's stage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    /// Every registered stage.
    All,
    /// A set of stage names; request order is irrelevant.
    Named(BTreeSet<String>),
}

impl StageRequest {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StageRequest::Named(names.into_iter().map(Into::into).collect())
    }
}

/// Stages completed by a successful [`StageSelector::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSummary {
    pub completed: Vec<String>,
    pub elapsed: Duration,
}

/// Resolves requests against a [`StageRegistry`] and runs the result.
pub struct StageSelector<'a> {
    registry: &'a StageRegistry,
    policy: UnknownStagePolicy,
}

impl<'a> StageSelector<'a> {
    pub fn new(registry: &'a StageRegistry, policy: UnknownStagePolicy) -> Self {
        Self { registry, policy }
    }

    /// Resolve `request` to stages in registry order.
    ///
    /// An empty [`StageRequest::Named`] means the full pipeline, unless
    /// `rotate_only` is set, in which case it selects nothing.
    ///
    /// # Errors
    ///
    /// [`KineError::NotFound`] for an unknown name under
    /// [`UnknownStagePolicy::Reject`].
    pub fn resolve(
        &self,
        request: &StageRequest,
        rotate_only: bool,
    ) -> Result<Vec<&'a PipelineStage>, KineError> {
        let names = match request {
            StageRequest::All => return Ok(self.registry.iter().collect()),
            StageRequest::Named(names) if names.is_empty() => {
                return Ok(if rotate_only {
                    Vec::new()
                } else {
                    self.registry.iter().collect()
                });
            }
            StageRequest::Named(names) => names,
        };

        for name in names.iter().filter(|n| !self.registry.contains(n)) {
            match self.policy {
                UnknownStagePolicy::Ignore => {
                    warn!(stage = %name, known = ?self.registry.names(), "ignoring unknown stage")
                }
                UnknownStagePolicy::Reject => return Err(KineError::NotFound(name.clone())),
            }
        }

        Ok(self
            .registry
            .iter()
            .filter(|s| names.contains(s.name()))
            .collect())
    }

    /// Run `stages` in order.  The first failure stops the run and is
    /// returned as [`KineError::StageExecution`].
    pub fn execute(&self, stages: &[&PipelineStage]) -> Result<ExecutionSummary, KineError> {
        let started = Instant::now();
        let mut completed = Vec::with_capacity(stages.len());
        for (position, stage) in stages.iter().enumerate() {
            let span = info_span!("stage", name = %stage.name(), position);
            let _enter = span.enter();

            let t0 = Instant::now();
            info!("stage started");
            stage.run().map_err(|e| match e {
                KineError::StageExecution { .. } => e,
                other => KineError::StageExecution {
                    stage: stage.name().to_string(),
                    details: other.to_string(),
                },
            })?;
            info!(elapsed_ms = t0.elapsed().as_millis() as u64, "stage finished");
            completed.push(stage.name().to_string());
        }
        Ok(ExecutionSummary {
            completed,
            elapsed: started.elapsed(),
        })
    }

    /// [`resolve`][Self::resolve] then [`execute`][Self::execute].
    pub fn run(
        &self,
        request: &StageRequest,
        rotate_only: bool,
    ) -> Result<ExecutionSummary, KineError> {
        let stages = self.resolve(request, rotate_only)?;
        self.execute(&stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::POSE_PIPELINE;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Pose pipeline whose stages record their name; `failing` returns an
    /// error instead.
    fn recording_registry(log: &Log, failing: Option<&'static str>) -> StageRegistry {
        let stages = POSE_PIPELINE
            .iter()
            .map(|(name, entry)| {
                let log = log.clone();
                let name = *name;
                PipelineStage::from_fn(name, *entry, move || {
                    if Some(name) == failing {
                        return Err(KineError::Config("boom".to_string()));
                    }
                    log.lock().unwrap().push(name.to_string());
                    Ok(())
                })
            })
            .collect();
        StageRegistry::new(stages).unwrap()
    }

    fn names(stages: &[&PipelineStage]) -> Vec<String> {
        stages.iter().map(|s| s.name().to_string()).collect()
    }

    fn all_names() -> Vec<String> {
        POSE_PIPELINE.iter().map(|(n, _)| n.to_string()).collect()
    }

    #[test]
    fn all_and_empty_resolve_to_full_pipeline() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);

        let all = selector.resolve(&StageRequest::All, false).unwrap();
        assert_eq!(names(&all), all_names());

        let empty = selector.resolve(&StageRequest::named(Vec::<String>::new()), false).unwrap();
        assert_eq!(names(&empty), all_names());
    }

    #[test]
    fn empty_request_with_rotate_only_selects_nothing() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);
        let stages = selector.resolve(&StageRequest::named(Vec::<String>::new()), true).unwrap();
        assert!(stages.is_empty());

        // "all" wins over rotate-only intent.
        assert_eq!(selector.resolve(&StageRequest::All, true).unwrap().len(), 8);
    }

    #[test]
    fn named_request_follows_registry_order() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);

        let request = StageRequest::named(["kinematics", "triangulation", "calibration"]);
        let stages = selector.resolve(&request, false).unwrap();
        assert_eq!(names(&stages), ["calibration", "triangulation", "kinematics"]);
    }

    #[test]
    fn unknown_names_are_ignored_by_default() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);

        let request = StageRequest::named(["filtering", "teleportation"]);
        let stages = selector.resolve(&request, false).unwrap();
        assert_eq!(names(&stages), ["filtering"]);
    }

    #[test]
    fn unknown_names_fail_under_reject_policy() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Reject);

        let request = StageRequest::named(["filtering", "teleportation"]);
        let err = selector.resolve(&request, false).unwrap_err();
        assert!(matches!(err, KineError::NotFound(ref n) if n == "teleportation"));
    }

    #[test]
    fn execute_runs_stages_in_order() {
        let log = Log::default();
        let registry = recording_registry(&log, None);
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);

        let summary = selector
            .run(&StageRequest::named(["kinematics", "filtering"]), false)
            .unwrap();
        assert_eq!(summary.completed, ["filtering", "kinematics"]);
        assert_eq!(*log.lock().unwrap(), ["filtering", "kinematics"]);
    }

    #[test]
    fn execute_stops_at_first_failure() {
        let log = Log::default();
        let registry = recording_registry(&log, Some("triangulation"));
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);

        let err = selector.run(&StageRequest::All, false).unwrap_err();
        match err {
            KineError::StageExecution { stage, details } => {
                assert_eq!(stage, "triangulation");
                assert!(details.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            *log.lock().unwrap(),
            ["calibration", "pose_estimation", "synchronization", "person_association"]
        );
    }

    #[test]
    fn execute_empty_list_is_ok() {
        let registry = StageRegistry::new(Vec::new()).unwrap();
        let selector = StageSelector::new(&registry, UnknownStagePolicy::Ignore);
        let summary = selector.execute(&[]).unwrap();
        assert!(summary.completed.is_empty());
    }
}
