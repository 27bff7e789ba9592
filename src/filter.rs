//! Regex predicates over event text attributes.
//!
//! Matching is anchored at the start of the attribute value (a "match", not a
//! "search"), all active predicates must hold (logical AND), and an absent
//! attribute never satisfies an active predicate.

use regex::Regex;

use crate::event::EventInstance;

/// Compiled text-attribute predicates for summary, description and location.
#[derive(Debug, Default)]
pub struct FilterCriteria {
    summary: Option<Regex>,
    description: Option<Regex>,
    location: Option<Regex>,
}

impl FilterCriteria {
    /// Compile the configured patterns. Returns one message per pattern that
    /// fails to compile so callers can aggregate them with other config issues.
    pub fn compile(
        summary: Option<&str>,
        description: Option<&str>,
        location: Option<&str>,
    ) -> Result<Self, Vec<String>> {
        let mut issues = Vec::new();
        let summary = compile_anchored("summary", summary, &mut issues);
        let description = compile_anchored("description", description, &mut issues);
        let location = compile_anchored("location", location, &mut issues);

        if issues.is_empty() {
            Ok(Self {
                summary,
                description,
                location,
            })
        } else {
            Err(issues)
        }
    }

    /// Retain events whose attributes satisfy every active predicate. Pure and
    /// order-preserving.
    pub fn apply(&self, events: Vec<EventInstance>) -> Vec<EventInstance> {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }

    pub fn matches(&self, event: &EventInstance) -> bool {
        field_matches(&self.summary, event.summary.as_deref())
            && field_matches(&self.description, event.description.as_deref())
            && field_matches(&self.location, event.location.as_deref())
    }
}

fn field_matches(pattern: &Option<Regex>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(re), Some(text)) => re.is_match(text),
    }
}

/// Wrap the user pattern so the match is anchored at the start of the value.
fn compile_anchored(field: &str, pattern: Option<&str>, issues: &mut Vec<String>) -> Option<Regex> {
    let pattern = pattern?;
    match Regex::new(&format!("^(?:{pattern})")) {
        Ok(re) => Some(re),
        Err(e) => {
            issues.push(format!("Invalid {field} filter regex '{pattern}': {e}"));
            None
        }
    }
}
