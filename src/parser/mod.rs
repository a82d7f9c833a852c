//! Natural-language date and duration parsing.
//!
//! Everything in here is pure: a `reference` date stands in for "today" so the
//! same input always resolves to the same output.

mod calendar;
mod dates;
mod duration;

pub use calendar::{
    calculate_inclusive_days, format_human_readable, is_past_date, is_weekend, project_end_date,
    reconcile_end_date, week_bounds, working_days,
};
pub(crate) use dates::{MONTHS, WEEKDAYS};
pub use dates::{
    DateParseError, DateParseResult, DateRange, month_from_name, names_month, parse_date_range,
    parse_dates, parse_single_date,
};
pub use duration::{DurationSpec, parse_duration, strip_duration_phrases};
