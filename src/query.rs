//! The query pipeline: fetch, parse, expand, normalize, filter, sort.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::config::Config;
use crate::error::QueryError;
use crate::event::EventInstance;
use crate::expand::expand_events;
use crate::fetch::fetch_calendar;
use crate::filter::FilterCriteria;
use crate::ics::parse_events;
use crate::normalize::Normalizer;

/// Run the full query: download the calendar and return the filtered, sorted
/// event instances for the configured window.
pub async fn run_query(
    config: &Config,
    criteria: &FilterCriteria,
    normalizer: &Normalizer,
) -> Result<Vec<EventInstance>, QueryError> {
    let ics = fetch_calendar(&config.calendar).await?;
    query_ics(&ics, config, criteria, normalizer)
}

/// The pipeline behind the fetch. Split out so tests can drive it with
/// fixture calendar text.
pub fn query_ics(
    ics: &str,
    config: &Config,
    criteria: &FilterCriteria,
    normalizer: &Normalizer,
) -> Result<Vec<EventInstance>, QueryError> {
    let window_start = config.filter.start;
    let window_end = config.filter.end;
    debug!(
        "Querying calendar events between {} and {}",
        window_start.to_rfc3339(),
        window_end.to_rfc3339()
    );

    let masters = parse_events(ics)?;
    let occurrences = expand_events(&masters, window_start.to_utc(), window_end.to_utc())?;

    let mut events = Vec::with_capacity(occurrences.len());
    for occurrence in &occurrences {
        events.push(normalizer.normalize(occurrence)?);
    }

    let mut events = retain_overlapping(events, window_start, window_end);
    events = criteria.apply(events);
    sort_by_start(&mut events);
    Ok(events)
}

/// Keep events overlapping the [start, end) window. An event whose tail only
/// touches the window start still counts as overlapping.
fn retain_overlapping(
    events: Vec<EventInstance>,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Vec<EventInstance> {
    events
        .into_iter()
        .filter(|e| e.start < end && e.end >= start)
        .collect()
}

/// Ascending by start instant. The sort is stable, so events with equal starts
/// keep their original relative order.
pub fn sort_by_start(events: &mut [EventInstance]) {
    events.sort_by_key(|e| e.start);
}
