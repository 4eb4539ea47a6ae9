#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Recovery workflow engine: sequences service control, renames, tool runs
//! and output classification, and rolls the on-disk layout back when a step
//! fails.
//!
//! Layout: `job.rs` (job request and derived paths), `stage.rs` (workflow
//! stages), `report.rs` (final report), `engine.rs` (state machine),
//! `error.rs` (job construction errors).

pub mod engine;
pub mod error;
pub mod job;
pub mod report;
pub mod stage;

pub use engine::RecoveryEngine;
pub use error::{AppError, AppResult};
pub use job::{Credentials, DEFAULT_USER, JobRequest, RecoveryJob};
pub use report::{Artifacts, Operation, Outcome, RecoveryReport, ToolSection};
pub use stage::{ToolKind, WorkflowStage};
