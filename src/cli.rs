//! Command-line surface.
//!
//! Every option can also come from a TOML config file or an `ICAL_EVENTS_*`
//! environment variable; CLI arguments win over the environment, which wins
//! over the file.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{
    CalendarSettings, FilterSettings, OutputFormat, OutputSettings, Secret, Settings,
};
use crate::error::QueryError;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(
    name = "ical-events",
    version,
    about = "Read and filter events from an iCalendar (ICS) calendar"
)]
pub struct Cli {
    /// Path to a TOML configuration file (default: ./config.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// URL of the iCalendar (ICS) resource (http, https or file scheme)
    #[arg(long)]
    pub url: Option<String>,

    /// Verify TLS certificates when downloading the calendar
    #[arg(long, value_name = "BOOL")]
    pub verify_tls: Option<bool>,

    /// Username for HTTP basic authentication
    #[arg(long)]
    pub user: Option<String>,

    /// Password for HTTP basic authentication
    #[arg(long)]
    pub password: Option<String>,

    /// Character encoding of the calendar
    #[arg(long)]
    pub encoding: Option<String>,

    /// Start of the event filter window (ISO-8601). Default: now
    #[arg(short = 's', long)]
    pub start_date: Option<String>,

    /// End of the event filter window (ISO-8601). Default: end of today
    #[arg(short = 'e', long)]
    pub end_date: Option<String>,

    /// RegEx to filter events by summary, matched at the start of the value
    #[arg(short = 'f', long)]
    pub filter_summary: Option<String>,

    /// RegEx to filter events by description
    #[arg(long)]
    pub filter_description: Option<String>,

    /// RegEx to filter events by location
    #[arg(long)]
    pub filter_location: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the output to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,
}

impl Cli {
    /// Merge all settings sources: CLI over environment over config file.
    pub fn settings(&self) -> Result<Settings, QueryError> {
        let file = self.file_settings()?;
        let merged = file.overlay(Settings::from_env()).overlay(self.as_settings());
        Ok(merged)
    }

    fn file_settings(&self) -> Result<Settings, QueryError> {
        match &self.config {
            Some(path) => load_settings_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    load_settings_file(default)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }

    fn as_settings(&self) -> Settings {
        Settings {
            calendar: CalendarSettings {
                url: self.url.clone(),
                verify_tls: self.verify_tls,
                user: self.user.clone(),
                password: self.password.clone().map(Secret::new),
                encoding: self.encoding.clone(),
            },
            filter: FilterSettings {
                start_date: self.start_date.clone(),
                end_date: self.end_date.clone(),
                summary: self.filter_summary.clone(),
                description: self.filter_description.clone(),
                location: self.filter_location.clone(),
            },
            output: OutputSettings {
                format: self.format,
                file: self.output_file.clone(),
            },
        }
    }
}

fn load_settings_file(path: &Path) -> Result<Settings, QueryError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        QueryError::Config(vec![format!(
            "Failed to read config file '{}': {e}",
            path.display()
        )])
    })?;
    Settings::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arguments_override_file_settings() {
        let cli = Cli::parse_from([
            "ical-events",
            "--url",
            "https://cli/cal.ics",
            "-f",
            ".*Oster.*",
            "--format",
            "json",
        ]);

        let mut file = Settings::default();
        file.calendar.url = Some("https://file/cal.ics".to_string());
        file.filter.end_date = Some("2025-12-31".to_string());

        let merged = file.overlay(cli.as_settings());
        assert_eq!(merged.calendar.url.as_deref(), Some("https://cli/cal.ics"));
        assert_eq!(merged.filter.summary.as_deref(), Some(".*Oster.*"));
        assert_eq!(merged.filter.end_date.as_deref(), Some("2025-12-31"));
        assert_eq!(merged.output.format, Some(OutputFormat::Json));
    }

    #[test]
    fn verify_tls_accepts_an_explicit_value() {
        let cli = Cli::parse_from(["ical-events", "--verify-tls", "false"]);
        assert_eq!(cli.verify_tls, Some(false));
    }

    #[test]
    fn format_accepts_snake_case_values() {
        let cli = Cli::parse_from(["ical-events", "--format", "human_readable"]);
        assert_eq!(cli.format, Some(OutputFormat::HumanReadable));
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let cli = Cli::parse_from(["ical-events", "--config", "/no/such/file.toml"]);
        assert!(matches!(cli.settings(), Err(QueryError::Config(_))));
    }
}
