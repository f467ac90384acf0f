//! [`BatchRotator`] – applies one orientation correction to every filtered
//! trajectory file in a directory.
//!
//! Files are independent units of work: a malformed or unwritable file is
//! recorded in the [`RotationReport`] and the loop moves on to the next one.

use std::fs;
use std::path::{Path, PathBuf};

use kinepipe_types::{KineError, RotationSpec};
use tracing::{debug, info, warn};

use crate::codec::TrajectoryFile;
use crate::rotation::Rotation;

/// Name suffix of the Butterworth-filtered, LSTM-augmented trajectories that
/// are eligible for rotation.
pub const DEFAULT_TRC_SUFFIX: &str = "filt_butterworth_LSTM.trc";

/// Result of rotating one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The file was rewritten; `rows` body rows were rotated.
    Rotated { rows: usize },
    /// The file was left as it was.
    Failed { reason: String },
}

/// Per-file entry of a [`RotationReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub file_name: String,
    pub outcome: Outcome,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Rotated { .. })
    }
}

/// Summary of a [`BatchRotator::rotate_directory`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationReport {
    pub directory: PathBuf,
    pub outcomes: Vec<FileOutcome>,
}

impl RotationReport {
    /// Number of matching files discovered.
    pub fn files_found(&self) -> usize {
        self.outcomes.len()
    }

    /// `true` when no file matched; derived outputs must not be regenerated.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Discovers trajectory files by name suffix and rotates each in place.
#[derive(Debug, Clone)]
pub struct BatchRotator {
    suffix: String,
}

impl Default for BatchRotator {
    fn default() -> Self {
        Self::new(DEFAULT_TRC_SUFFIX)
    }
}

impl BatchRotator {
    /// Create a rotator matching file names that end with `suffix`.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Matching files directly inside `dir`, sorted by name.  Hidden files
    /// are skipped; symlinks to regular files are followed.  An entry that
    /// cannot be read is logged and skipped.
    ///
    /// # Errors
    ///
    /// [`KineError::Io`] if `dir` cannot be listed.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, KineError> {
        let entries = fs::read_dir(dir).map_err(|e| KineError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !name.ends_with(&self.suffix) {
                continue;
            }
            if entry.path().is_file() {
                debug!(file = %name, "matched trajectory file");
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Rotate every matching file in `dir` by `spec`.
    ///
    /// Per-file failures are recorded in the report rather than returned.  An
    /// empty report means nothing matched and is not an error.
    ///
    /// # Errors
    ///
    /// Only when `dir` itself cannot be listed.
    pub fn rotate_directory(
        &self,
        dir: &Path,
        spec: &RotationSpec,
    ) -> Result<RotationReport, KineError> {
        let files = self.discover(dir)?;
        info!(dir = %dir.display(), found = files.len(), rotation = %spec, "rotating trajectory files");

        let rotation = Rotation::from_spec(spec);
        let outcomes = files
            .iter()
            .map(|path| {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let outcome = match rotate_file(path, &rotation) {
                    Ok(rows) => {
                        info!(file = %file_name, rows, "rotated");
                        Outcome::Rotated { rows }
                    }
                    Err(e) => {
                        warn!(file = %file_name, error = %e, "rotation failed");
                        Outcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                FileOutcome { file_name, outcome }
            })
            .collect();

        Ok(RotationReport {
            directory: dir.to_path_buf(),
            outcomes,
        })
    }
}

/// Read, rotate and rewrite one file, returning the number of rows rotated.
pub fn rotate_file(path: &Path, rotation: &Rotation) -> Result<usize, KineError> {
    let mut file = TrajectoryFile::read(path)?;
    for row in file.rows_mut() {
        rotation.apply_in_place(row.points_mut());
    }
    file.write(path)?;
    Ok(file.rows().len())
}
