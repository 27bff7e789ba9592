//! Rendering of query results as JSON or a human-readable report.
//!
//! Both formats echo the active filter criteria so consumers can audit which
//! query produced the result. Output goes to stdout by default, or fully
//! overwrites the configured output file.

use std::fs;
use std::io::Write;

use serde::Serialize;

use crate::config::{Config, OutputConfig, OutputFormat};
use crate::error::QueryError;
use crate::event::EventInstance;

/// Render the sorted events in the configured format.
pub fn render(config: &Config, events: &[EventInstance]) -> Result<String, QueryError> {
    match config.output.format {
        OutputFormat::Json => render_json(config, events),
        OutputFormat::HumanReadable => Ok(render_human(config, events)),
    }
}

/// Write the rendered output to the configured destination.
pub fn write_output(output: &OutputConfig, content: &str) -> Result<(), QueryError> {
    match &output.file {
        Some(path) => fs::write(path, format!("{content}\n"))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    filter: JsonFilter<'a>,
    events: Vec<JsonEvent<'a>>,
}

#[derive(Serialize)]
struct JsonFilter<'a> {
    #[serde(rename = "start-date")]
    start_date: String,
    #[serde(rename = "end-date")]
    end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    #[serde(rename = "start-date")]
    start_date: String,
    #[serde(rename = "end-date")]
    end_date: String,
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

// serde_json's pretty printer already gives 2-space indentation and leaves
// non-ASCII characters unescaped.
fn render_json(config: &Config, events: &[EventInstance]) -> Result<String, QueryError> {
    let report = JsonReport {
        filter: JsonFilter {
            start_date: config.filter.start.to_rfc3339(),
            end_date: config.filter.end.to_rfc3339(),
            summary: config.filter.summary.as_deref(),
            description: config.filter.description.as_deref(),
            location: config.filter.location.as_deref(),
        },
        events: events
            .iter()
            .map(|e| JsonEvent {
                start_date: e.start.to_rfc3339(),
                end_date: e.end.to_rfc3339(),
                summary: e.summary.as_deref(),
                description: e.description.as_deref(),
                location: e.location.as_deref(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_human(config: &Config, events: &[EventInstance]) -> String {
    let mut lines = Vec::new();

    push_labeled(&mut lines, "Start Date:", &config.filter.start.to_rfc3339());
    push_labeled(&mut lines, "End Date:", &config.filter.end.to_rfc3339());
    if let Some(pattern) = &config.filter.summary {
        push_labeled(&mut lines, "Summary Filter:", pattern);
    }
    if let Some(pattern) = &config.filter.description {
        push_labeled(&mut lines, "Description Filter:", pattern);
    }
    if let Some(pattern) = &config.filter.location {
        push_labeled(&mut lines, "Location Filter:", pattern);
    }
    push_labeled(&mut lines, "Number of Events:", &events.len().to_string());
    lines.push(String::new());

    for event in events {
        lines.push(render_event_line(event));
    }

    lines.join("\n")
}

fn push_labeled(lines: &mut Vec<String>, label: &str, value: &str) {
    lines.push(format!("{label:<20} {value}"));
}

fn render_event_line(event: &EventInstance) -> String {
    let span = format!(
        "{} -> {} [{} sec]",
        event.start.to_rfc3339(),
        event.end.to_rfc3339(),
        event.duration_seconds()
    );

    let mut line = format!("{span:<70} | {}", event.summary.as_deref().unwrap_or(""));
    if let Some(description) = &event.description {
        line.push_str(&format!(" | Description: {description}"));
    }
    if let Some(location) = &event.location {
        line.push_str(&format!(" | Location: {location}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalendarConfig, FilterConfig, OutputConfig};
    use chrono::DateTime;

    fn test_config(format: OutputFormat, summary_filter: Option<&str>) -> Config {
        Config {
            calendar: CalendarConfig {
                url: url::Url::parse("https://example.com/cal.ics").unwrap(),
                verify_tls: true,
                user: None,
                password: None,
                encoding: "UTF-8".to_string(),
            },
            filter: FilterConfig {
                start: DateTime::parse_from_rfc3339("2025-10-03T00:00:00+02:00").unwrap(),
                end: DateTime::parse_from_rfc3339("2025-10-04T23:59:59+02:00").unwrap(),
                summary: summary_filter.map(str::to_string),
                description: None,
                location: None,
            },
            output: OutputConfig {
                format,
                file: None,
            },
        }
    }

    fn holiday() -> EventInstance {
        EventInstance {
            start: DateTime::parse_from_rfc3339("2025-10-03T00:00:00+02:00").unwrap(),
            end: DateTime::parse_from_rfc3339("2025-10-03T23:59:59+02:00").unwrap(),
            summary: Some("Tag der Deutschen Einheit".to_string()),
            description: Some("Wiedervereinigung Deutschlands".to_string()),
            location: None,
        }
    }

    #[test]
    fn json_echoes_filter_and_omits_absent_keys() {
        let config = test_config(OutputFormat::Json, Some(".*Einheit.*"));
        let rendered = render(&config, &[holiday()]).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["filter"]["start-date"], "2025-10-03T00:00:00+02:00");
        assert_eq!(parsed["filter"]["summary"], ".*Einheit.*");
        assert!(parsed["filter"].get("description").is_none());

        let events = parsed["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["summary"], "Tag der Deutschen Einheit");
        assert_eq!(events[0]["description"], "Wiedervereinigung Deutschlands");
        assert!(events[0].get("location").is_none());
    }

    #[test]
    fn json_keeps_non_ascii_literal_and_uses_two_space_indent() {
        let config = test_config(OutputFormat::Json, None);
        let rendered = render(&config, &[holiday()]).unwrap();

        assert!(rendered.contains("Wiedervereinigung Deutschlands"));
        assert!(!rendered.contains("\\u"));
        assert!(rendered.contains("\n  \"filter\""));
    }

    #[test]
    fn human_report_lists_window_filters_and_count() {
        let config = test_config(OutputFormat::HumanReadable, Some(".*Einheit.*"));
        let rendered = render(&config, &[holiday()]).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].starts_with("Start Date:"));
        assert!(lines[0].contains("2025-10-03T00:00:00+02:00"));
        assert!(lines[1].starts_with("End Date:"));
        assert!(lines[2].starts_with("Summary Filter:"));
        assert!(lines[3].starts_with("Number of Events:"));
        assert!(lines[3].contains('1'));
        // The count line is terminated by a blank line before the events
        assert_eq!(lines[4], "");
        assert!(lines[5].contains("[86399 sec]"));
        assert!(lines[5].contains("| Tag der Deutschen Einheit"));
        assert!(lines[5].contains("| Description: Wiedervereinigung Deutschlands"));
        assert!(!lines[5].contains("Location:"));
    }

    #[test]
    fn inactive_filters_produce_no_lines() {
        let config = test_config(OutputFormat::HumanReadable, None);
        let rendered = render(&config, &[]).unwrap();

        assert!(!rendered.contains("Summary Filter:"));
        assert!(!rendered.contains("Description Filter:"));
        assert!(!rendered.contains("Location Filter:"));
        assert!(rendered.contains("Number of Events:"));
    }

    #[test]
    fn location_line_uses_the_location_attribute() {
        // Description and location must not be conflated.
        let mut event = holiday();
        event.location = Some("Berlin".to_string());

        let line = render_event_line(&event);
        assert!(line.contains("| Description: Wiedervereinigung Deutschlands"));
        assert!(line.contains("| Location: Berlin"));
    }

    #[test]
    fn output_file_is_fully_overwritten() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "old content that should disappear").unwrap();

        let output = OutputConfig {
            format: OutputFormat::Json,
            file: Some(file.path().to_path_buf()),
        };
        write_output(&output, "{}").unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "{}\n");
    }
}
