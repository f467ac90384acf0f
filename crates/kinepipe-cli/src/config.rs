//! Per-project configuration – reads/writes `<project>/kinepipe.toml`.
//!
//! Every field has a default, so a project without a config file runs with
//! the standard pose pipeline and the `[180, 180, 0]` orientation fix.

use std::fs;
use std::path::{Path, PathBuf};

use kinepipe_pipeline::{Launcher, UnknownStagePolicy};
use kinepipe_trc::DEFAULT_TRC_SUFFIX;
use kinepipe_types::{EulerConvention, KineError, RotationSpec};
use serde::{Deserialize, Serialize};

/// File name looked up in the project directory.
pub const CONFIG_FILE: &str = "kinepipe.toml";

/// Settings for one invocation.  Loaded once and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sub-directory of the project holding triangulated trajectories.
    #[serde(default = "default_pose3d_dir")]
    pub pose3d_dir: String,

    /// File name suffix selecting the trajectories to rotate.
    #[serde(default = "default_trc_suffix")]
    pub trc_suffix: String,

    /// Handling of requested stage names that do not exist.
    #[serde(default)]
    pub unknown_stages: UnknownStagePolicy,

    /// Orientation correction applied by `--rotate`.
    #[serde(default = "default_rotation")]
    pub rotation: RotationSpec,

    /// How stages are launched.
    #[serde(default)]
    pub launcher: Launcher,
}

fn default_pose3d_dir() -> String {
    "pose-3d".to_string()
}
fn default_trc_suffix() -> String {
    DEFAULT_TRC_SUFFIX.to_string()
}
fn default_rotation() -> RotationSpec {
    // Upside-down subjects.  Use [-90, 0, 0] for subjects lying on their back.
    RotationSpec {
        x: 180.0,
        y: 180.0,
        z: 0.0,
        convention: EulerConvention::Intrinsic,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pose3d_dir: default_pose3d_dir(),
            trc_suffix: default_trc_suffix(),
            unknown_stages: UnknownStagePolicy::default(),
            rotation: default_rotation(),
            launcher: Launcher::default(),
        }
    }
}

impl Config {
    /// Directory scanned by the batch rotator.
    pub fn pose3d_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.pose3d_dir)
    }
}

/// Default config location for `project_dir`.
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE)
}

/// Load the configuration for a run.
///
/// An `explicit` path must exist.  Otherwise `<project>/kinepipe.toml` is
/// used when present and defaults when not.
pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Config, KineError> {
    match explicit {
        Some(path) => load_from(path)?.ok_or_else(|| {
            KineError::Config(format!("config file {} does not exist", path.display()))
        }),
        None => Ok(load_from(&config_path(project_dir))?.unwrap_or_default()),
    }
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, KineError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| KineError::io(path, e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| KineError::Config(format!("failed to parse {}: {e}", path.display())))?;
    cfg.rotation.validate()?;
    Ok(Some(cfg))
}

/// Write `cfg` to `path`.  An existing file is never overwritten.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), KineError> {
    if path.exists() {
        return Err(KineError::Config(format!(
            "{} already exists; not overwriting",
            path.display()
        )));
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| KineError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| KineError::io(path, e))
}
