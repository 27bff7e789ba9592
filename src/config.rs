//! Typed configuration and its validation.
//!
//! Settings are merged from CLI arguments, `ICAL_EVENTS_` environment
//! variables and an optional TOML config file, then validated once into an
//! immutable `Config` before any I/O. All validation issues are collected and
//! reported together.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::QueryError;
use crate::filter::FilterCriteria;
use crate::normalize::Normalizer;

/// Environment variable prefix recognized for all settings.
pub const ENV_PREFIX: &str = "ICAL_EVENTS_";

const DEFAULT_ENCODING: &str = "UTF-8";

/// Basic-auth secret. Redacted in Debug and Display so it never reaches logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum OutputFormat {
    HumanReadable,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human_readable" => Ok(OutputFormat::HumanReadable),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Invalid output format '{other}' (expected 'human_readable' or 'json')"
            )),
        }
    }
}

/// Calendar access settings.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub url: Url,
    pub verify_tls: bool,
    pub user: Option<String>,
    pub password: Option<Secret>,
    pub encoding: String,
}

/// Filter window and text-attribute patterns.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

/// Validated, immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub calendar: CalendarConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Validate raw settings into a `Config` plus compiled filter criteria.
    ///
    /// Naive window bounds are localized to the local timezone *before* the
    /// start/end comparison so only comparable instants are compared. Every
    /// discovered issue is collected; nothing proceeds when any check fails.
    pub fn validate(
        settings: Settings,
        normalizer: &Normalizer,
    ) -> Result<(Config, FilterCriteria), QueryError> {
        let mut issues = Vec::new();

        let url = match &settings.calendar.url {
            Some(s) => match Url::parse(s) {
                Ok(u) => Some(u),
                Err(e) => {
                    issues.push(format!("Invalid calendar URL '{s}': {e}"));
                    None
                }
            },
            None => {
                issues.push("Missing calendar URL (--url)".to_string());
                None
            }
        };

        let encoding = settings
            .calendar
            .encoding
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());
        if encoding_rs::Encoding::for_label(encoding.as_bytes()).is_none() {
            issues.push(format!("Unknown calendar encoding '{encoding}'"));
        }

        let now = Utc::now().with_timezone(&normalizer.local_tz());
        let now = now.with_nanosecond(0).unwrap_or(now);

        let start = match &settings.filter.start_date {
            Some(s) => match parse_instant(s, normalizer) {
                Ok(dt) => Some(dt),
                Err(e) => {
                    issues.push(e);
                    None
                }
            },
            None => Some(now.fixed_offset()),
        };
        let end = match &settings.filter.end_date {
            Some(s) => match parse_instant(s, normalizer) {
                Ok(dt) => Some(dt),
                Err(e) => {
                    issues.push(e);
                    None
                }
            },
            None => match end_of_today(now.date_naive(), normalizer) {
                Ok(dt) => Some(dt),
                Err(e) => {
                    issues.push(e.to_string());
                    None
                }
            },
        };

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                issues.push(format!(
                    "Start date {} is after end date {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                ));
            }
        }

        let criteria = match FilterCriteria::compile(
            settings.filter.summary.as_deref(),
            settings.filter.description.as_deref(),
            settings.filter.location.as_deref(),
        ) {
            Ok(criteria) => Some(criteria),
            Err(regex_issues) => {
                issues.extend(regex_issues);
                None
            }
        };

        if !issues.is_empty() {
            return Err(QueryError::Config(issues));
        }

        // All of these are Some once the issue list is empty.
        let config = Config {
            calendar: CalendarConfig {
                url: url.expect("validated"),
                verify_tls: settings.calendar.verify_tls.unwrap_or(true),
                user: settings.calendar.user,
                password: settings.calendar.password,
                encoding,
            },
            filter: FilterConfig {
                start: start.expect("validated"),
                end: end.expect("validated"),
                summary: settings.filter.summary,
                description: settings.filter.description,
                location: settings.filter.location,
            },
            output: OutputConfig {
                format: settings.output.format.unwrap_or(OutputFormat::HumanReadable),
                file: settings.output.file,
            },
        };

        Ok((config, criteria.expect("validated")))
    }
}

/// Parse an ISO-8601 date or date-time window bound. Values without an offset
/// are localized to the local timezone; sub-second precision is dropped.
fn parse_instant(value: &str, normalizer: &Normalizer) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_nanosecond(0).unwrap_or(dt));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return normalizer.localize(naive).map_err(|e| e.to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return normalizer
            .localize(date.and_time(NaiveTime::MIN))
            .map_err(|e| e.to_string());
    }
    Err(format!("Invalid ISO-8601 date/time '{value}'"))
}

fn end_of_today(
    today: NaiveDate,
    normalizer: &Normalizer,
) -> Result<DateTime<FixedOffset>, QueryError> {
    normalizer.localize(today.and_hms_opt(23, 59, 59).unwrap())
}

/// Raw, unvalidated settings: three groups, everything optional so the merge
/// of CLI, environment and config file stays mechanical.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub calendar: CalendarSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CalendarSettings {
    pub url: Option<String>,
    pub verify_tls: Option<bool>,
    pub user: Option<String>,
    pub password: Option<Secret>,
    pub encoding: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilterSettings {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OutputSettings {
    pub format: Option<OutputFormat>,
    pub file: Option<PathBuf>,
}

impl Settings {
    /// Overlay `over` on top of `self`: set fields in `over` win.
    pub fn overlay(self, over: Settings) -> Settings {
        Settings {
            calendar: CalendarSettings {
                url: over.calendar.url.or(self.calendar.url),
                verify_tls: over.calendar.verify_tls.or(self.calendar.verify_tls),
                user: over.calendar.user.or(self.calendar.user),
                password: over.calendar.password.or(self.calendar.password),
                encoding: over.calendar.encoding.or(self.calendar.encoding),
            },
            filter: FilterSettings {
                start_date: over.filter.start_date.or(self.filter.start_date),
                end_date: over.filter.end_date.or(self.filter.end_date),
                summary: over.filter.summary.or(self.filter.summary),
                description: over.filter.description.or(self.filter.description),
                location: over.filter.location.or(self.filter.location),
            },
            output: OutputSettings {
                format: over.output.format.or(self.output.format),
                file: over.output.file.or(self.output.file),
            },
        }
    }

    /// Parse a TOML config file body.
    pub fn from_toml(content: &str) -> Result<Settings, QueryError> {
        toml::from_str(content)
            .map_err(|e| QueryError::Config(vec![format!("Invalid config file: {e}")]))
    }

    /// Read settings from `ICAL_EVENTS_*` environment variables.
    pub fn from_env() -> Settings {
        Settings {
            calendar: CalendarSettings {
                url: env_var("URL"),
                verify_tls: env_var("VERIFY_TLS").and_then(|v| parse_env_bool(&v)),
                user: env_var("USER"),
                password: env_var("PASSWORD").map(Secret::new),
                encoding: env_var("ENCODING"),
            },
            filter: FilterSettings {
                start_date: env_var("START_DATE"),
                end_date: env_var("END_DATE"),
                summary: env_var("FILTER_SUMMARY"),
                description: env_var("FILTER_DESCRIPTION"),
                location: env_var("FILTER_LOCATION"),
            },
            output: OutputSettings {
                format: env_var("OUTPUT_FORMAT").and_then(|v| v.parse().ok()),
                file: env_var("OUTPUT_FILE").map(PathBuf::from),
            },
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin() -> Normalizer {
        Normalizer::new(chrono_tz::Europe::Berlin)
    }

    fn settings(url: Option<&str>, start: Option<&str>, end: Option<&str>) -> Settings {
        Settings {
            calendar: CalendarSettings {
                url: url.map(str::to_string),
                ..Default::default()
            },
            filter: FilterSettings {
                start_date: start.map(str::to_string),
                end_date: end.map(str::to_string),
                ..Default::default()
            },
            output: OutputSettings::default(),
        }
    }

    #[test]
    fn valid_settings_produce_a_config() {
        let s = settings(
            Some("https://example.com/cal.ics"),
            Some("2025-01-01T00:00:00"),
            Some("2025-12-31T23:59:59"),
        );
        let (config, _) = Config::validate(s, &berlin()).unwrap();

        assert_eq!(config.calendar.url.as_str(), "https://example.com/cal.ics");
        assert!(config.calendar.verify_tls);
        assert_eq!(config.calendar.encoding, "UTF-8");
        assert_eq!(config.output.format, OutputFormat::HumanReadable);
        // Naive bounds are localized before comparison
        assert_eq!(
            config.filter.start.to_rfc3339(),
            "2025-01-01T00:00:00+01:00"
        );
        assert_eq!(config.filter.end.to_rfc3339(), "2025-12-31T23:59:59+01:00");
    }

    #[test]
    fn start_after_end_is_rejected() {
        let s = settings(
            Some("https://example.com/cal.ics"),
            Some("2025-12-31T00:00:00"),
            Some("2025-01-01T00:00:00"),
        );
        let err = Config::validate(s, &berlin()).unwrap_err();
        match err {
            QueryError::Config(issues) => {
                assert!(issues.iter().any(|i| i.contains("is after end date")));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn offset_aware_bounds_keep_their_offset() {
        let s = settings(
            Some("https://example.com/cal.ics"),
            Some("2025-06-01T00:00:00+09:00"),
            Some("2025-06-02T00:00:00+09:00"),
        );
        let (config, _) = Config::validate(s, &berlin()).unwrap();
        assert_eq!(
            config.filter.start.to_rfc3339(),
            "2025-06-01T00:00:00+09:00"
        );
    }

    #[test]
    fn all_issues_are_reported_together() {
        let mut s = settings(None, Some("not-a-date"), None);
        s.filter.summary = Some("(".to_string());
        s.calendar.encoding = Some("no-such-encoding".to_string());

        let err = Config::validate(s, &berlin()).unwrap_err();
        match err {
            QueryError::Config(issues) => {
                assert_eq!(issues.len(), 4);
                assert!(issues.iter().any(|i| i.contains("Missing calendar URL")));
                assert!(issues.iter().any(|i| i.contains("no-such-encoding")));
                assert!(issues.iter().any(|i| i.contains("not-a-date")));
                assert!(issues.iter().any(|i| i.contains("summary filter regex")));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn window_defaults_are_now_until_end_of_today() {
        let s = settings(Some("https://example.com/cal.ics"), None, None);
        let (config, _) = Config::validate(s, &berlin()).unwrap();

        assert!(config.filter.start <= config.filter.end);
        assert_eq!(config.filter.start.nanosecond(), 0);
        let end = config.filter.end;
        assert_eq!(end.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn bare_dates_become_local_midnight() {
        let s = settings(
            Some("https://example.com/cal.ics"),
            Some("2025-03-01"),
            Some("2025-03-02"),
        );
        let (config, _) = Config::validate(s, &berlin()).unwrap();
        assert_eq!(
            config.filter.start.to_rfc3339(),
            "2025-03-01T00:00:00+01:00"
        );
    }

    #[test]
    fn overlay_prefers_the_upper_layer() {
        let base = settings(Some("https://base/cal.ics"), Some("2025-01-01"), None);
        let mut over = Settings::default();
        over.calendar.url = Some("https://override/cal.ics".to_string());
        over.filter.end_date = Some("2025-02-01".to_string());

        let merged = base.overlay(over);
        assert_eq!(merged.calendar.url.as_deref(), Some("https://override/cal.ics"));
        assert_eq!(merged.filter.start_date.as_deref(), Some("2025-01-01"));
        assert_eq!(merged.filter.end_date.as_deref(), Some("2025-02-01"));
    }

    #[test]
    fn settings_parse_from_toml() {
        let content = r#"
[calendar]
url = "https://example.com/cal.ics"
verify-tls = false
user = "alice"
password = "hunter2"

[filter]
start-date = "2025-01-01T00:00:00"
summary = ".*Einheit.*"

[output]
format = "json"
"#;
        let s = Settings::from_toml(content).unwrap();
        assert_eq!(s.calendar.verify_tls, Some(false));
        assert_eq!(s.calendar.password, Some(Secret::new("hunter2")));
        assert_eq!(s.filter.summary.as_deref(), Some(".*Einheit.*"));
        assert_eq!(s.output.format, Some(OutputFormat::Json));
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(****)");
        assert_eq!(format!("{secret}"), "****");
        assert_eq!(secret.expose(), "hunter2");
    }
}
