//! Command-line interface

use clap::Parser;
use kinepipe_pipeline::StageRequest;
use std::path::PathBuf;

/// Run the markerless motion-capture pipeline and fix trajectory orientation
#[derive(Parser, Debug)]
#[command(name = "kinepipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(short, long, env = "KINEPIPE_PROJECT_DIR")]
    pub project: Option<PathBuf>,

    /// Config file (defaults to <project>/kinepipe.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write a default kinepipe.toml into the project and exit
    #[arg(long)]
    pub init_config: bool,

    /// Run every stage (the default when no stage flag is given)
    #[arg(long)]
    pub all: bool,

    /// Rotate the filtered trajectories in pose-3d, then rerun kinematics
    #[arg(long)]
    pub rotate: bool,

    /// Camera calibration
    #[arg(long)]
    pub calibration: bool,

    /// 2D pose estimation
    #[arg(long)]
    pub pose_estimation: bool,

    /// Camera synchronization
    #[arg(long)]
    pub synchronization: bool,

    /// Person association across views
    #[arg(long)]
    pub person_association: bool,

    /// 3D triangulation
    #[arg(long)]
    pub triangulation: bool,

    /// Trajectory filtering
    #[arg(long)]
    pub filtering: bool,

    /// Marker augmentation
    #[arg(long)]
    pub marker_augmentation: bool,

    /// Inverse kinematics
    #[arg(long)]
    pub kinematics: bool,
}

impl Cli {
    /// Resolved project directory.
    pub fn project_dir(&self) -> PathBuf {
        self.project.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// The stage request implied by the flags.
    pub fn stage_request(&self) -> StageRequest {
        if self.all {
            return StageRequest::All;
        }
        let flags = [
            ("calibration", self.calibration),
            ("pose_estimation", self.pose_estimation),
            ("synchronization", self.synchronization),
            ("person_association", self.person_association),
            ("triangulation", self.triangulation),
            ("filtering", self.filtering),
            ("marker_augmentation", self.marker_augmentation),
            ("kinematics", self.kinematics),
        ];
        StageRequest::named(flags.iter().filter(|(_, on)| *on).map(|(name, _)| *name))
    }
}
