//! ICS parsing using the icalendar crate's parser.
//!
//! Turns raw calendar text into `RawEvent` masters. Only VEVENT components are
//! considered; recurrence data (RRULE/RDATE/EXDATE) is kept as-is for the
//! expansion step.

use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::QueryError;
use crate::event::{EventTime, RawEvent};

/// Parse ICS content into the list of VEVENT masters.
pub fn parse_events(content: &str) -> Result<Vec<RawEvent>, QueryError> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| QueryError::IcsParse(e.to_string()))?;

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(parse_vevent)
        .collect()
}

fn parse_vevent(vevent: &Component) -> Result<RawEvent, QueryError> {
    let summary = vevent.find_prop("SUMMARY").map(|p| p.val.to_string());
    let description = vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string());
    let location = vevent.find_prop("LOCATION").map(|p| p.val.to_string());

    let start_prop = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| QueryError::IcsParse("VEVENT is missing DTSTART".to_string()))?;
    let start = DatePerhapsTime::try_from(start_prop)
        .ok()
        .map(to_event_time)
        .ok_or_else(|| QueryError::IcsParse("VEVENT has an invalid DTSTART value".to_string()))?;

    let end = match vevent.find_prop("DTEND") {
        Some(prop) => DatePerhapsTime::try_from(prop)
            .ok()
            .map(to_event_time)
            .ok_or_else(|| QueryError::IcsParse("VEVENT has an invalid DTEND value".to_string()))?,
        None => default_end(&start),
    };

    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_date_list_property)
        .collect();
    let rdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "RDATE")
        .flat_map(parse_date_list_property)
        .collect();

    Ok(RawEvent {
        summary,
        description,
        location,
        start,
        end,
        rrule,
        exdates,
        rdates,
    })
}

/// RFC 5545 fallback when DTEND is absent: a date start spans one full day,
/// a timed start has zero duration.
fn default_end(start: &EventTime) -> EventTime {
    match start {
        EventTime::Date(d) => EventTime::Date(*d + chrono::Duration::days(1)),
        other => other.clone(),
    }
}

fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    use icalendar::CalendarDateTime;
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => EventTime::Utc(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(dt)) => EventTime::Floating(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            EventTime::Zoned {
                datetime: date_time,
                tzid,
            }
        }
    }
}

/// EXDATE and RDATE carry one or more comma-separated values whose reading
/// depends on the TZID and VALUE=DATE parameters. Entries that fail to parse
/// are skipped.
fn parse_date_list_property(prop: &Property) -> Vec<EventTime> {
    let tzid = param_value(prop, "TZID");
    let is_date = param_value(prop, "VALUE").as_deref() == Some("DATE");

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| parse_date_list_entry(s, is_date, tzid.as_deref()))
        .collect()
}

fn param_value(prop: &Property, key: &str) -> Option<String> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
}

const DATE_FORMAT: &str = "%Y%m%d";
const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

fn parse_date_list_entry(s: &str, is_date: bool, tzid: Option<&str>) -> Option<EventTime> {
    if is_date {
        let d = chrono::NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
        return Some(EventTime::Date(d));
    }
    if let Some(tzid) = tzid {
        let dt = chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok()?;
        return Some(EventTime::Zoned {
            datetime: dt,
            tzid: tzid.to_string(),
        });
    }
    if let Some(stripped) = s.strip_suffix('Z') {
        let dt = chrono::NaiveDateTime::parse_from_str(stripped, DATETIME_FORMAT).ok()?;
        return Some(EventTime::Utc(dt.and_utc()));
    }
    let dt = chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok()?;
    Some(EventTime::Floating(dt))
}
