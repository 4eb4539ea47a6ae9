//! Command handlers grouped by concern.

pub(crate) mod jobs;
pub(crate) mod service;
pub(crate) mod templates;
pub(crate) mod tools;
