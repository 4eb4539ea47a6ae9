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

//! Boundaries to the outside world used by the recovery workflow: running
//! external commands, judging their console output, controlling the engine
//! service and locating the Firebird tool binaries.
//!
//! Layout: `runner.rs` (`CommandRunner` trait + process-backed runner),
//! `classify.rs` (output heuristics), `service.rs` (service controller),
//! `discovery.rs` (tool directory probing).

pub mod classify;
pub mod discovery;
pub mod runner;
pub mod service;

pub use classify::{Classifier, Verdict, is_failure};
pub use discovery::{Tool, ToolProbe, candidate_dirs, detect_tool_dir, probe_tool_dir};
pub use runner::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use service::{ServiceController, ServicePlatform, ServiceState};
