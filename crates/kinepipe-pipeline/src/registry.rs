//! [`StageRegistry`] – the canonical, ordered list of pipeline stages.
//!
//! Registry order is execution order: each stage consumes what the previous
//! ones produced, so callers never reorder it.  The registry is immutable
//! once built.

use std::collections::HashSet;
use std::path::Path;

use kinepipe_types::KineError;

use crate::stage::{ExternalCommand, Launcher, PipelineStage};

/// Canonical stages of the markerless motion-capture pipeline as
/// `(stage name, collaborator entry point)`.
pub const POSE_PIPELINE: [(&str, &str); 8] = [
    ("calibration", "calibration"),
    ("pose_estimation", "poseEstimation"),
    ("synchronization", "synchronization"),
    ("person_association", "personAssociation"),
    ("triangulation", "triangulation"),
    ("filtering", "filtering"),
    ("marker_augmentation", "markerAugmentation"),
    ("kinematics", "kinematics"),
];

/// Name of the stage that regenerates motion files from trajectories.
pub const KINEMATICS: &str = "kinematics";

/// Ordered collection of uniquely named [`PipelineStage`]s.
#[derive(Debug)]
pub struct StageRegistry {
    stages: Vec<PipelineStage>,
}

impl StageRegistry {
    /// Build a registry; `stages` are kept in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`KineError::DuplicateStage`] if two stages share a name.
    pub fn new(stages: Vec<PipelineStage>) -> Result<Self, KineError> {
        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.name()) {
                return Err(KineError::DuplicateStage(stage.name().to_string()));
            }
        }
        Ok(Self { stages })
    }

    /// The standard eight-stage pipeline, every stage run through `launcher`
    /// inside `project_dir`.
    pub fn pose_pipeline(launcher: &Launcher, project_dir: &Path) -> Self {
        let stages = POSE_PIPELINE
            .iter()
            .map(|(name, entry)| {
                PipelineStage::new(
                    *name,
                    *entry,
                    ExternalCommand::new(*name, *entry, launcher.clone(), project_dir),
                )
            })
            .collect();
        Self { stages }
    }

    /// Stage names in canonical order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(PipelineStage::name).collect()
    }

    /// Look up a stage by name.
    ///
    /// # Errors
    ///
    /// Returns [`KineError::NotFound`] when no stage has that name.
    pub fn stage(&self, name: &str) -> Result<&PipelineStage, KineError> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| KineError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineStage> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> PipelineStage {
        PipelineStage::from_fn(name, name, || Ok(()))
    }

    #[test]
    fn names_keep_construction_order() {
        let registry = StageRegistry::new(vec![noop("b"), noop("a"), noop("c")]).unwrap();
        assert_eq!(registry.names(), ["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = StageRegistry::new(vec![noop("a"), noop("b"), noop("a")]).unwrap_err();
        assert!(matches!(err, KineError::DuplicateStage(ref n) if n == "a"));
    }

    #[test]
    fn stage_lookup() {
        let registry = StageRegistry::new(vec![noop("calibration")]).unwrap();
        assert_eq!(registry.stage("calibration").unwrap().name(), "calibration");
        assert!(matches!(
            registry.stage("ghost"),
            Err(KineError::NotFound(ref n)) if n == "ghost"
        ));
    }

    #[test]
    fn pose_pipeline_has_canonical_order() {
        let registry = StageRegistry::pose_pipeline(&Launcher::default(), Path::new("."));
        assert_eq!(
            registry.names(),
            [
                "calibration",
                "pose_estimation",
                "synchronization",
                "person_association",
                "triangulation",
                "filtering",
                "marker_augmentation",
                "kinematics",
            ]
        );
        assert_eq!(registry.stage("pose_estimation").unwrap().entry_point(), "poseEstimation");
        assert!(registry.contains(KINEMATICS));
    }

    #[test]
    fn empty_registry() {
        let registry = StageRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
