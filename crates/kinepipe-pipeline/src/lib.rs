//! `kinepipe-pipeline` – stage registry and orchestration.
//!
//! The biomechanics stages themselves are external; this crate only knows
//! their names, their canonical order, and how to invoke them.
//!
//! # Modules
//!
//! - [`stage`] – [`PipelineStage`][stage::PipelineStage] and the
//!   [`StageAction`][stage::StageAction] trait every stage action implements,
//!   plus [`ExternalCommand`][stage::ExternalCommand], which runs a stage
//!   through an external launcher.
//! - [`registry`] – [`StageRegistry`][registry::StageRegistry]: the ordered,
//!   uniquely named stage list.  Registry order is execution order.
//! - [`selector`] – [`StageSelector`][selector::StageSelector]: resolves a
//!   [`StageRequest`][selector::StageRequest] into registry-ordered stages and
//!   runs them, halting at the first failure.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod registry;
pub mod selector;
pub mod stage;
pub mod telemetry;

pub use registry::{StageRegistry, KINEMATICS, POSE_PIPELINE};
pub use selector::{ExecutionSummary, StageRequest, StageSelector, UnknownStagePolicy};
pub use stage::{ExternalCommand, Launcher, PipelineStage, StageAction};
pub use telemetry::{init_tracing, TracerProviderGuard};
