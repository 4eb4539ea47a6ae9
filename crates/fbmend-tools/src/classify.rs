//! Heuristic classification of free-form tool output.
//!
//! # Design
//! - A rule written `/.../` is a case-insensitive regex; anything else is a
//!   case-insensitive substring.
//! - A pattern that fails to compile degrades to a literal match of its full
//!   text, so a typo in the settings never disables the rule.
//! - Success markers always win over failure rules.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct Rule {
    source: String,
    matcher: Matcher,
}

impl Rule {
    fn parse(source: &str) -> Option<Self> {
        if source.trim().is_empty() {
            return None;
        }
        let matcher = match pattern_body(source) {
            Some(body) => match RegexBuilder::new(body).case_insensitive(true).build() {
                Ok(regex) => Matcher::Pattern(regex),
                Err(err) => {
                    warn!(rule = source, error = %err, "invalid heuristic pattern; matching literally");
                    Matcher::Literal(source.to_lowercase())
                }
            },
            None => Matcher::Literal(source.to_lowercase()),
        };
        Some(Self {
            source: source.to_string(),
            matcher,
        })
    }

    fn matches(&self, raw: &str, lowered: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(needle) => lowered.contains(needle.as_str()),
            Matcher::Pattern(regex) => regex.is_match(raw),
        }
    }
}

fn pattern_body(source: &str) -> Option<&str> {
    if source.len() > 2 && source.starts_with('/') && source.ends_with('/') {
        Some(&source[1..source.len() - 1])
    } else {
        None
    }
}

/// Outcome of classifying one piece of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No failure rule matched.
    Clean,
    /// A failure rule matched and no success marker did.
    Failed {
        /// Rule that fired first.
        rule: String,
    },
    /// A failure rule matched but a success marker overrode it.
    Overridden {
        /// Failure rule that fired first.
        rule: String,
        /// Success marker that suppressed it.
        marker: String,
    },
}

impl Verdict {
    /// `true` only for [`Verdict::Failed`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Precompiled failure heuristics and success markers.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    failure: Vec<Rule>,
    success: Vec<Rule>,
}

impl Classifier {
    /// Compile both rule lists. Blank entries are skipped.
    #[must_use]
    pub fn new<F, S>(failure: &[F], success: &[S]) -> Self
    where
        F: AsRef<str>,
        S: AsRef<str>,
    {
        Self {
            failure: failure
                .iter()
                .filter_map(|rule| Rule::parse(rule.as_ref()))
                .collect(),
            success: success
                .iter()
                .filter_map(|rule| Rule::parse(rule.as_ref()))
                .collect(),
        }
    }

    /// Full verdict for `output`.
    #[must_use]
    pub fn verdict(&self, output: &str) -> Verdict {
        let lowered = output.to_lowercase();
        let Some(rule) = first_match(&self.failure, output, &lowered) else {
            return Verdict::Clean;
        };
        match first_match(&self.success, output, &lowered) {
            Some(marker) => Verdict::Overridden {
                rule: rule.to_string(),
                marker: marker.to_string(),
            },
            None => Verdict::Failed {
                rule: rule.to_string(),
            },
        }
    }

    /// `true` when a failure rule matches and no success marker does.
    #[must_use]
    pub fn is_failure(&self, output: &str) -> bool {
        self.verdict(output).is_failure()
    }
}

fn first_match<'a>(rules: &'a [Rule], raw: &str, lowered: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| rule.matches(raw, lowered))
        .map(|rule| rule.source.as_str())
}

/// One-shot classification without keeping the compiled rules around.
#[must_use]
pub fn is_failure<F, S>(output: &str, failure: &[F], success: &[S]) -> bool
where
    F: AsRef<str>,
    S: AsRef<str>,
{
    Classifier::new(failure, success).is_failure(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILURE: &[&str] = &["error", "corrupt", "/wrong\\s+page\\s+type/"];
    const SUCCESS: &[&str] = &["closing file, committing, and finishing"];

    #[test]
    fn literal_rules_match_case_insensitively() {
        assert!(is_failure("gbak: ERROR: unavailable database", FAILURE, SUCCESS));
        assert!(is_failure("Database is Corrupt", FAILURE, SUCCESS));
        assert!(!is_failure("gbak: 42 records written", FAILURE, SUCCESS));
    }

    #[test]
    fn pattern_rules_compile_as_case_insensitive_regex() {
        let classifier = Classifier::new(FAILURE, SUCCESS);
        assert_eq!(
            classifier.verdict("WRONG   PAGE TYPE in page 12"),
            Verdict::Failed {
                rule: "/wrong\\s+page\\s+type/".to_string(),
            }
        );
    }

    #[test]
    fn success_markers_dominate_failure_rules() {
        let classifier = Classifier::new(FAILURE, SUCCESS);
        let output = "gbak: 3 errors ignored\ngbak: closing file, committing, and finishing";
        assert_eq!(
            classifier.verdict(output),
            Verdict::Overridden {
                rule: "error".to_string(),
                marker: "closing file, committing, and finishing".to_string(),
            }
        );
        assert!(!classifier.is_failure(output));
    }

    #[test]
    fn invalid_pattern_falls_back_to_literal_text() {
        let classifier = Classifier::new(&["/unclosed(group/"], &[] as &[&str]);
        assert!(classifier.is_failure("log says /UNCLOSED(GROUP/ here"));
        assert!(!classifier.is_failure("unclosed group"));
    }

    #[test]
    fn blank_and_short_rules_are_handled() {
        let classifier = Classifier::new(&["", "   ", "//"], &[] as &[&str]);
        assert!(classifier.is_failure("path //server/share"));
        assert_eq!(classifier.verdict("nothing to see"), Verdict::Clean);
    }

    #[test]
    fn empty_rule_lists_never_fail() {
        assert!(!is_failure::<&str, &str>("error everywhere", &[], &[]));
    }

    #[test]
    fn verdict_serialises_with_tag() -> anyhow::Result<()> {
        let value = serde_json::to_value(Verdict::Failed {
            rule: "bad".to_string(),
        })?;
        assert_eq!(value["verdict"], "failed");
        assert_eq!(value["rule"], "bad");
        Ok(())
    }
}
