//! Error types for calendar queries.

use thiserror::Error;

/// Errors that can occur while querying a calendar.
#[derive(Error, Debug)]
pub enum QueryError {
    /// One or more configuration problems, collected before any I/O happens.
    #[error("Invalid configuration:\n{}", format_issues(.0))]
    Config(Vec<String>),

    #[error("Failed to download calendar from '{url}': {reason}")]
    Download { url: String, reason: String },

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Recurrence expansion error: {0}")]
    Recurrence(String),

    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Invalid date/time: {0}")]
    DateTime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_issues(issues: &[String]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for calendar query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_lists_every_issue() {
        let err = QueryError::Config(vec![
            "Start date is after end date".to_string(),
            "Invalid summary filter regex".to_string(),
        ]);

        let message = err.to_string();
        assert!(message.contains("Start date is after end date"));
        assert!(message.contains("Invalid summary filter regex"));
    }

    #[test]
    fn download_error_mentions_url_and_reason() {
        let err = QueryError::Download {
            url: "https://example.com/cal.ics".to_string(),
            reason: "Not Found (status 404)".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("Failed to download"));
        assert!(message.contains("https://example.com/cal.ics"));
        assert!(message.contains("status 404"));
    }
}
