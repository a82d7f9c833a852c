use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashSet;

// Hard stop for any day-by-day walk.
const MAX_SPAN_DAYS: usize = 400;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts the days in `[start, end]` that are actually taken off.
///
/// A half day is always `0.5`. Otherwise each day is counted unless it falls
/// on a weekend (when `exclude_weekends`) or in `holidays`. An inverted range
/// counts as zero.
pub fn working_days(
    start: NaiveDate,
    end: NaiveDate,
    is_half_day: bool,
    exclude_weekends: bool,
    holidays: &HashSet<NaiveDate>,
) -> f64 {
    if is_half_day {
        return 0.5;
    }
    if end < start {
        return 0.0;
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !(exclude_weekends && is_weekend(*day)))
        .filter(|day| !holidays.contains(day))
        .count() as f64
}

/// String-typed variant of [`working_days`] for ISO `YYYY-MM-DD` inputs.
///
/// Returns `0` when either boundary does not parse, before the half-day rule
/// is considered. Unparseable holiday entries are ignored.
pub fn calculate_inclusive_days(
    start: &str,
    end: &str,
    is_half_day: bool,
    exclude_weekends: bool,
    holiday_dates: &[String],
) -> f64 {
    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d"),
        NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d"),
    ) else {
        return 0.0;
    };

    let holidays: HashSet<NaiveDate> = holiday_dates
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .collect();

    working_days(start, end, is_half_day, exclude_weekends, &holidays)
}

/// Naive calendar projection: `start + ceil(days) - 1`, or `start` itself for
/// a day or less.
pub fn project_end_date(start: NaiveDate, days: f64) -> NaiveDate {
    if days <= 1.0 {
        return start;
    }
    let extra = days.ceil() as u64 - 1;
    start.checked_add_days(Days::new(extra)).unwrap_or(start)
}

/// Extends the naive projection until `ceil(days)` working days fit between
/// `start` and the returned end date.
pub fn reconcile_end_date(start: NaiveDate, days: f64, holidays: &HashSet<NaiveDate>) -> NaiveDate {
    let projected = project_end_date(start, days);
    if days <= 1.0 {
        return projected;
    }

    let target = days.ceil() as usize;
    let mut counted = 0usize;
    for day in start.iter_days().take(MAX_SPAN_DAYS) {
        if !is_weekend(day) && !holidays.contains(&day) {
            counted += 1;
            if counted >= target {
                return day.max(projected);
            }
        }
    }
    projected
}

/// Strictly before the reference day; today is never in the past.
pub fn is_past_date(date: NaiveDate, reference: NaiveDate) -> bool {
    date < reference
}

/// `"April 15, 2026"`
pub fn format_human_readable(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Monday and Sunday of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = date.weekday().num_days_from_monday() as u64;
    let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    (monday, sunday)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_with_weekend_and_holiday() {
        // Mon 2026-01-19 .. Sun 2026-01-25 plus Mon 2026-01-26 (Republic Day)
        let holidays = ["2026-01-26".to_string()];
        assert_eq!(
            calculate_inclusive_days("2026-01-19", "2026-01-26", false, true, &holidays),
            5.0
        );
        assert_eq!(
            calculate_inclusive_days("2026-01-19", "2026-01-26", false, false, &holidays),
            7.0
        );
    }

    #[test]
    fn test_unparseable_dates_count_zero() {
        assert_eq!(calculate_inclusive_days("soon", "2026-01-26", true, true, &[]), 0.0);
        assert_eq!(calculate_inclusive_days("2026-01-20", "2026-01-20", true, true, &[]), 0.5);
    }

    #[test]
    fn test_project_end_date() {
        assert_eq!(project_end_date(d(2026, 3, 3), 1.0), d(2026, 3, 3));
        assert_eq!(project_end_date(d(2026, 3, 3), 0.5), d(2026, 3, 3));
        assert_eq!(project_end_date(d(2026, 3, 3), 3.0), d(2026, 3, 5));
    }

    #[test]
    fn test_reconcile_skips_weekend() {
        // Friday + 2 working days lands on Monday
        let end = reconcile_end_date(d(2026, 3, 6), 2.0, &HashSet::new());
        assert_eq!(end, d(2026, 3, 9));
        // Mid-week needs no adjustment
        assert_eq!(reconcile_end_date(d(2026, 3, 3), 2.0, &HashSet::new()), d(2026, 3, 4));
    }

    #[test]
    fn test_past_date_is_strict() {
        let today = d(2026, 3, 3);
        assert!(is_past_date(d(2026, 3, 2), today));
        assert!(!is_past_date(today, today));
    }

    #[test]
    fn test_week_bounds_monday_to_sunday() {
        assert_eq!(week_bounds(d(2026, 3, 5)), (d(2026, 3, 2), d(2026, 3, 8)));
        assert_eq!(week_bounds(d(2026, 3, 8)), (d(2026, 3, 2), d(2026, 3, 8)));
    }

    #[test]
    fn test_human_readable() {
        assert_eq!(format_human_readable(d(2026, 4, 15)), "April 15, 2026");
    }
}
