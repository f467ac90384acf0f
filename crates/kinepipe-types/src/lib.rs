use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the three Euler angles of a [`RotationSpec`] are composed.
///
/// The axis order is always X, then Y, then Z; only the frame the later
/// rotations are taken about changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EulerConvention {
    /// Each rotation is about the axes of the already-rotated (body) frame.
    #[default]
    Intrinsic,
    /// Each rotation is about the fixed (world) axes.
    Extrinsic,
}

impl std::fmt::Display for EulerConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EulerConvention::Intrinsic => write!(f, "intrinsic"),
            EulerConvention::Extrinsic => write!(f, "extrinsic"),
        }
    }
}

/// Orientation correction applied to trajectory coordinates, in degrees.
///
/// `x` is applied first, then `y`, then `z`.  Rotation composition is not
/// commutative, so the order is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationSpec {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub convention: EulerConvention,
}

impl RotationSpec {
    /// Build an intrinsic X→Y→Z spec.
    ///
    /// # Errors
    ///
    /// Returns [`KineError::InvalidRotation`] if any angle is NaN or infinite.
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self, KineError> {
        Self::with_convention(x, y, z, EulerConvention::Intrinsic)
    }

    /// Build a spec with an explicit [`EulerConvention`].
    pub fn with_convention(
        x: f64,
        y: f64,
        z: f64,
        convention: EulerConvention,
    ) -> Result<Self, KineError> {
        let spec = Self { x, y, z, convention };
        spec.validate()?;
        Ok(spec)
    }

    /// The no-op rotation.
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            convention: EulerConvention::Intrinsic,
        }
    }

    /// Check that every angle is a finite number.  Deserialised specs bypass
    /// the constructors, so callers loading configuration must call this.
    pub fn validate(&self) -> Result<(), KineError> {
        for (axis, angle) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if !angle.is_finite() {
                return Err(KineError::InvalidRotation(format!(
                    "angle about {axis} must be finite, got {angle}"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RotationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}] deg ({})",
            self.x, self.y, self.z, self.convention
        )
    }
}

/// Error type shared by the codec, the batch rotator, and the stage pipeline.
#[derive(Error, Debug)]
pub enum KineError {
    #[error("Malformed trajectory file {path}, line {line}: {details}")]
    Format {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown pipeline stage: {0}")]
    NotFound(String),

    #[error("Stage '{stage}' failed: {details}")]
    StageExecution { stage: String, details: String },

    #[error("Duplicate pipeline stage: {0}")]
    DuplicateStage(String),

    #[error("Invalid rotation: {0}")]
    InvalidRotation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KineError {
    /// Wrap an [`std::io::Error`] with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KineError::Io {
            path: path.into(),
            source,
        }
    }
}
