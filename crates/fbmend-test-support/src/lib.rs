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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (temporary database and tool directory), mocks.rs (scripted command runner).

pub mod fixtures;
pub mod mocks;

pub use fixtures::{DatabaseFixture, ORIGINAL_CONTENTS};
pub use mocks::{Script, ScriptedRunner};
