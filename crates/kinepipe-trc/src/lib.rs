//! `kinepipe-trc` – trajectory post-processing.
//!
//! Corrects the orientation of triangulated marker trajectories before the
//! kinematics stage turns them into joint-angle motion files.
//!
//! # Modules
//!
//! - [`codec`] – [`TrajectoryFile`][codec::TrajectoryFile]: reads and writes
//!   the `.trc` format (5-line verbatim header + tab-separated body), with
//!   all-or-nothing replacement on write.
//! - [`rotation`] – [`Rotation`][rotation::Rotation]: turns a
//!   [`RotationSpec`][kinepipe_types::RotationSpec] into a single rotation
//!   matrix and applies it to coordinate triples.
//! - [`batch`] – [`BatchRotator`][batch::BatchRotator]: discovers filtered
//!   trajectory files in a directory and rotates each one independently,
//!   collecting a [`RotationReport`][batch::RotationReport].

pub mod batch;
pub mod codec;
pub mod rotation;

pub use batch::{BatchRotator, FileOutcome, Outcome, RotationReport, DEFAULT_TRC_SUFFIX};
pub use codec::{TrajectoryFile, TrajectoryRow};
pub use rotation::{rotate, Rotation, Vec3};
