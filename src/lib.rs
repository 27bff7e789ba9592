//! Query events from iCalendar (ICS) calendars.
//!
//! The pipeline is linear: fetch the raw calendar text, parse it into VEVENT
//! masters, expand recurring rules within the requested window, normalize the
//! heterogeneous date representations into offset-aware instants, filter by
//! regex criteria, sort by start time, and render as JSON or a human-readable
//! report.

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod expand;
pub mod fetch;
pub mod filter;
pub mod ics;
pub mod normalize;
pub mod output;
pub mod query;

pub use config::{Config, OutputFormat};
pub use error::{QueryError, QueryResult};
pub use event::EventInstance;
pub use filter::FilterCriteria;
pub use normalize::Normalizer;
