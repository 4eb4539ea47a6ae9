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

//! Filesystem steps of the recovery workflow: lock-tolerant renames, the
//! derived artifact layout of a job and the sweep of earlier history files.
//!
//! Layout: `error.rs` (error type), `rename.rs` (retrying rename),
//! `layout.rs` (artifact paths), `history.rs` (history sweep).

pub mod error;
pub mod history;
pub mod layout;
pub mod rename;

pub use error::{FsOpsError, FsOpsResult};
pub use history::{is_history_artifact, sweep_history};
pub use layout::{ArtifactLayout, STAMP_FORMAT, TEMP_DIR_NAME, stamp_token};
pub use rename::{
    RenameOp, RenameOutcome, RetryPolicy, is_transient, rename_with_retry, rename_with_retry_using,
};
