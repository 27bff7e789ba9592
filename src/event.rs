//! Event data model shared across the query pipeline.
//!
//! `EventTime` mirrors the date representations allowed by RFC 5545 for
//! DTSTART/DTEND/EXDATE values. `RawEvent` is one VEVENT as parsed from the
//! calendar (possibly a recurring master); `EventInstance` is one concrete
//! occurrence after normalization, carrying offset-aware instants only.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// A DTSTART/DTEND/EXDATE/RDATE value as it appears in the ICS source.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    /// Bare calendar date (full-day semantics)
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    /// Local time with no timezone information attached
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Approximate UTC instant, used for expansion-window padding and duration
    /// math only. Bare dates map to midnight UTC, floating and zoned times are
    /// read as UTC; the normalizer produces the exact instants afterwards.
    pub fn approx_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            EventTime::Utc(dt) => *dt,
            EventTime::Floating(dt) => dt.and_utc(),
            EventTime::Zoned { datetime, .. } => datetime.and_utc(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

/// One VEVENT master as parsed from the calendar, before expansion.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// RRULE value (without the property name), if the event recurs
    pub rrule: Option<String>,
    pub exdates: Vec<EventTime>,
    pub rdates: Vec<EventTime>,
}

impl RawEvent {
    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some() || !self.rdates.is_empty()
    }
}

/// One concrete event occurrence with normalized, offset-aware instants.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInstance {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl EventInstance {
    /// Whole seconds between end and start.
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}
