//! Conversion of heterogeneous ICS date representations into offset-aware
//! instants.
//!
//! The local timezone is resolved once at startup and threaded through
//! explicitly; nothing in here touches global state.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::QueryError;
use crate::event::{EventInstance, EventTime, RawEvent};

/// Normalizes event times against an explicitly resolved local timezone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    local_tz: Tz,
}

impl Normalizer {
    pub fn new(local_tz: Tz) -> Self {
        Self { local_tz }
    }

    /// Resolve the process's IANA timezone. Called once at startup.
    pub fn from_system() -> Result<Self, QueryError> {
        let name = iana_time_zone::get_timezone().map_err(|e| QueryError::Timezone(e.to_string()))?;
        let tz = name
            .parse::<Tz>()
            .map_err(|_| QueryError::Timezone(name.clone()))?;
        Ok(Self::new(tz))
    }

    pub fn local_tz(&self) -> Tz {
        self.local_tz
    }

    /// Produce an `EventInstance` with timezone-aware start/end instants.
    pub fn normalize(&self, raw: &RawEvent) -> Result<EventInstance, QueryError> {
        Ok(EventInstance {
            start: self.normalize_start(&raw.start)?,
            end: self.normalize_end(&raw.end)?,
            summary: raw.summary.clone(),
            description: raw.description.clone(),
            location: raw.location.clone(),
        })
    }

    /// Full-day starts expand to 00:00:00 of that day in the local timezone;
    /// timed values pass through.
    pub fn normalize_start(&self, time: &EventTime) -> Result<DateTime<FixedOffset>, QueryError> {
        self.instant(time)
    }

    /// Full-day ends are stored by the ICS convention as the day *after* the
    /// last day of the event. Subtract that day back out, then expand to
    /// 23:59:59 of the corrected day. Skipping the subtraction shifts every
    /// full-day event one day too far.
    pub fn normalize_end(&self, time: &EventTime) -> Result<DateTime<FixedOffset>, QueryError> {
        match time {
            EventTime::Date(d) => {
                let last_day = *d - Duration::days(1);
                self.localize(last_day.and_hms_opt(23, 59, 59).unwrap())
            }
            other => self.instant(other),
        }
    }

    /// Localize a naive date/time in the local timezone. Also used by config
    /// validation to make naive window bounds comparable.
    pub fn localize(&self, dt: NaiveDateTime) -> Result<DateTime<FixedOffset>, QueryError> {
        localize_in(self.local_tz, dt)
    }

    fn instant(&self, time: &EventTime) -> Result<DateTime<FixedOffset>, QueryError> {
        match time {
            EventTime::Date(d) => self.localize(d.and_time(NaiveTime::MIN)),
            EventTime::Utc(dt) => Ok(dt.fixed_offset()),
            // Floating times carry no zone; read them as local time
            EventTime::Floating(dt) => self.localize(*dt),
            EventTime::Zoned { datetime, tzid } => {
                let tz: Tz = tzid
                    .parse()
                    .map_err(|_| QueryError::Timezone(tzid.clone()))?;
                localize_in(tz, *datetime)
            }
        }
    }
}

fn localize_in(tz: Tz, dt: NaiveDateTime) -> Result<DateTime<FixedOffset>, QueryError> {
    match tz.from_local_datetime(&dt) {
        LocalResult::Single(t) => Ok(t.fixed_offset()),
        // DST fold: take the earlier of the two valid interpretations
        LocalResult::Ambiguous(t, _) => Ok(t.fixed_offset()),
        LocalResult::None => Err(QueryError::DateTime(format!(
            "{dt} does not exist in timezone {tz}"
        ))),
    }
}
