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

//! Logging primitives shared across the fbmend workspace.
//!
//! Layout: `init.rs` (subscriber installation and format selection),
//! `context.rs` (job span guard).

pub mod context;
pub mod init;

pub use context::{JobSpanGuard, record_target};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
