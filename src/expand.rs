//! RRULE expansion for recurring events.
//!
//! Expands each recurring master into concrete occurrences that can overlap
//! the query window. The rrule crate does the actual recurrence math; this
//! module only assembles its input and maps occurrences back onto events.

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use tracing::warn;

use crate::error::QueryError;
use crate::event::{EventTime, RawEvent};

/// Cap on generated occurrences per rule.
const MAX_OCCURRENCES: u16 = 10_000;

/// Expand all masters into concrete occurrences for the [start, end) window.
///
/// Non-recurring events pass through unchanged. The generation window is
/// padded by the master duration plus one day so occurrences that begin before
/// the window but still run into it are produced; precise overlap filtering
/// happens later on normalized instants.
pub fn expand_events(
    masters: &[RawEvent],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<RawEvent>, QueryError> {
    let mut occurrences = Vec::new();
    for master in masters {
        if master.is_recurring() {
            occurrences.extend(expand_master(master, window_start, window_end)?);
        } else {
            occurrences.push(master.clone());
        }
    }
    Ok(occurrences)
}

fn expand_master(
    master: &RawEvent,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<RawEvent>, QueryError> {
    let rrule_str = build_rrule_string(master);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        QueryError::Recurrence(format!(
            "Failed to parse recurrence of event '{}': {}",
            master.summary.as_deref().unwrap_or("<no summary>"),
            e
        ))
    })?;

    let duration = master.end.approx_utc() - master.start.approx_utc();

    let tz: rrule::Tz = Utc.into();
    let after = (window_start - duration - Duration::days(1)).with_timezone(&tz);
    let before = (window_end + Duration::days(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        warn!(
            "Recurrence expansion of '{}' hit the {} occurrence cap",
            master.summary.as_deref().unwrap_or("<no summary>"),
            MAX_OCCURRENCES
        );
    }

    let mut events = Vec::with_capacity(result.dates.len());
    for occ_dt in &result.dates {
        let (start, end) = occurrence_times(occ_dt, master, duration);
        events.push(RawEvent {
            summary: master.summary.clone(),
            description: master.description.clone(),
            location: master.location.clone(),
            start,
            end,
            rrule: None,
            exdates: Vec::new(),
            rdates: Vec::new(),
        });
    }
    Ok(events)
}

/// Build an iCalendar-format recurrence string for the rrule crate parser.
fn build_rrule_string(master: &RawEvent) -> String {
    let mut lines = vec![format_time_line("DTSTART", &master.start)];

    if let Some(rrule) = &master.rrule {
        lines.push(format!("RRULE:{rrule}"));
    } else {
        // An RDATE-only set yields just its RDATE entries; DTSTART is still
        // the first occurrence per RFC 5545, so repeat it as an RDATE.
        lines.push(format_time_line("RDATE", &master.start));
    }
    for rdate in &master.rdates {
        lines.push(format_time_line("RDATE", rdate));
    }
    for exdate in &master.exdates {
        lines.push(format_time_line("EXDATE", exdate));
    }

    lines.join("\n")
}

// The rrule crate needs a datetime, so all-day dates become midnight UTC
fn format_time_line(name: &str, time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => format!("{name}:{}T000000Z", d.format("%Y%m%d")),
        EventTime::Utc(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::Floating(dt) => format!("{name}:{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::Zoned { datetime, tzid } => {
            format!("{name};TZID={tzid}:{}", datetime.format("%Y%m%dT%H%M%S"))
        }
    }
}

/// Map one generated instant onto start/end values that carry the same
/// representation as the master: full-day masters stay full-day with the same
/// day span, timed masters keep their zone flavor and duration.
fn occurrence_times(
    dt: &DateTime<rrule::Tz>,
    master: &RawEvent,
    duration: Duration,
) -> (EventTime, EventTime) {
    match &master.start {
        EventTime::Date(start_day) => {
            let day = dt.date_naive();
            let span = match &master.end {
                EventTime::Date(end_day) => (*end_day - *start_day).num_days(),
                _ => 1,
            };
            (
                EventTime::Date(day),
                EventTime::Date(day + Duration::days(span)),
            )
        }
        EventTime::Utc(_) => {
            let start = dt.with_timezone(&Utc);
            (EventTime::Utc(start), EventTime::Utc(start + duration))
        }
        EventTime::Floating(_) => {
            let start = dt.naive_utc();
            (
                EventTime::Floating(start),
                EventTime::Floating(start + duration),
            )
        }
        EventTime::Zoned { tzid, .. } => {
            let start = dt.naive_local();
            (
                EventTime::Zoned {
                    datetime: start,
                    tzid: tzid.clone(),
                },
                EventTime::Zoned {
                    datetime: start + duration,
                    tzid: tzid.clone(),
                },
            )
        }
    }
}
