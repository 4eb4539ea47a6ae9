//! Span helpers that tag every log line of a run with its command.
//!
//! # Design
//! - One CLI process runs one job, so the command span is entered for the
//!   lifetime of the guard and never re-entered.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the command-level span entered for the lifetime of the process.
pub struct JobSpanGuard {
    _guard: Entered<'static>,
}

impl JobSpanGuard {
    /// Enter a span tagged with the command name, a run identifier and the build SHA.
    #[must_use]
    pub fn new(command: impl Into<String>, run_id: impl Into<String>) -> Self {
        let command = command.into();
        let run_id = run_id.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "fbmend",
            command = %command,
            run_id = %run_id,
            build_sha = %build_sha(),
            target = tracing::field::Empty,
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the target database path on the active span.
pub fn record_target(target: &str) {
    Span::current().record("target", tracing::field::display(target));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_span_guard_records_target() {
        let guard = JobSpanGuard::new("check", "run-1");
        record_target("/data/APP.FDB");
        drop(guard);
    }
}
