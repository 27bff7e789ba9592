//! Retrieval of the raw ICS document.
//!
//! Exactly one GET per invocation, fail-fast: any non-2xx response or
//! transport failure aborts the run. `file://` URLs read local bytes without a
//! network round trip.

use std::time::Duration;

use encoding_rs::Encoding;
use tracing::debug;

use crate::config::CalendarConfig;
use crate::error::QueryError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the raw calendar text from the configured source.
pub async fn fetch_calendar(calendar: &CalendarConfig) -> Result<String, QueryError> {
    if calendar.url.scheme() == "file" {
        return read_local(calendar);
    }

    debug!("Downloading calendar from {}", calendar.url);

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .danger_accept_invalid_certs(!calendar.verify_tls)
        .build()
        .map_err(|e| download_error(calendar, e.to_string()))?;

    let mut request = client.get(calendar.url.as_str());
    if let (Some(user), Some(password)) = (&calendar.user, &calendar.password) {
        request = request.basic_auth(user, Some(password.expose()));
    }

    let response = request
        .send()
        .await
        .map_err(|e| download_error(calendar, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unknown reason");
        return Err(download_error(
            calendar,
            format!("{reason} (status {})", status.as_u16()),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(calendar, e.to_string()))?;
    decode(calendar, &bytes)
}

fn read_local(calendar: &CalendarConfig) -> Result<String, QueryError> {
    let path = calendar
        .url
        .to_file_path()
        .map_err(|_| download_error(calendar, "not a valid file path".to_string()))?;
    debug!("Reading calendar from {}", path.display());
    let bytes = std::fs::read(&path)
        .map_err(|e| download_error(calendar, format!("{}: {e}", path.display())))?;
    decode(calendar, &bytes)
}

/// Decode the calendar bytes with the configured encoding. The encoding label
/// was already checked during config validation.
fn decode(calendar: &CalendarConfig, bytes: &[u8]) -> Result<String, QueryError> {
    let encoding = Encoding::for_label(calendar.encoding.as_bytes()).ok_or_else(|| {
        QueryError::Config(vec![format!(
            "Unknown calendar encoding '{}'",
            calendar.encoding
        )])
    })?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

fn download_error(calendar: &CalendarConfig, reason: String) -> QueryError {
    QueryError::Download {
        url: calendar.url.to_string(),
        reason,
    }
}
