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

//! File-backed settings and command templates for the recovery tooling.
//!
//! Layout: `model.rs` (settings document and template set), `defaults.rs`
//! (compiled-in templates, heuristics, service identities), `render.rs`
//! (placeholder substitution), `store.rs` (`SettingsStore` load/save/reset).

pub mod defaults;
pub mod error;
pub mod model;
pub mod render;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use model::{Settings, TemplateKind, TemplateSet};
pub use render::{RenderContext, placeholder, quote_if_needed, render};
pub use store::SettingsStore;
