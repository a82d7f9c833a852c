use std::collections::HashSet;

use chrono::NaiveDate;

use super::date;
use crate::parser::{
    DateParseError, calculate_inclusive_days, parse_date_range, parse_dates, parse_duration,
    parse_single_date, reconcile_end_date, working_days,
};

// 2026-03-02 is a Monday
const MONDAY: (i32, u32, u32) = (2026, 3, 2);

fn reference() -> chrono::NaiveDate {
    date(MONDAY.0, MONDAY.1, MONDAY.2)
}

#[test]
fn test_relative_words() {
    let today = reference();
    assert_eq!(parse_single_date("today", today), Ok(today));
    assert_eq!(parse_single_date("leave tomorrow", today), Ok(date(2026, 3, 3)));
    assert_eq!(
        parse_single_date("the day after tomorrow", today),
        Ok(date(2026, 3, 4))
    );
    assert_eq!(parse_single_date("yesterday", today), Ok(date(2026, 3, 1)));
}

#[test]
fn test_weekday_phrases() {
    let today = reference();
    assert_eq!(parse_single_date("this monday", today), Ok(today));
    assert_eq!(parse_single_date("next monday", today), Ok(date(2026, 3, 9)));
    assert_eq!(parse_single_date("coming friday", today), Ok(date(2026, 3, 6)));
}

#[test]
fn test_absolute_formats() {
    let today = reference();
    assert_eq!(parse_single_date("2026-04-15", today), Ok(date(2026, 4, 15)));
    assert_eq!(parse_single_date("on 15.04.2026", today), Ok(date(2026, 4, 15)));
    assert_eq!(parse_single_date("15/4", today), Ok(date(2026, 4, 15)));
    assert_eq!(parse_single_date("25th Jan", today), Ok(date(2026, 1, 25)));
    assert_eq!(parse_single_date("April 15th, 2027", today), Ok(date(2027, 4, 15)));
    assert_eq!(parse_single_date("the 20th", today), Ok(date(2026, 3, 20)));
}

#[test]
fn test_every_day_reads_the_same_in_four_formats() {
    let today = reference();
    let last = date(2028, 12, 31);
    for day in date(2025, 1, 1).iter_days().take_while(|d| *d <= last) {
        for format in ["%Y-%m-%d", "%-d.%-m.%Y", "%-d %B %Y", "%B %-d %Y"] {
            let text = day.format(format).to_string();
            assert_eq!(parse_single_date(&text, today), Ok(day), "{text}");
        }
    }
}

#[test]
fn test_february_overflow_is_an_error() {
    let today = reference();
    for text in ["30th february 2026", "30.02.2026", "29 feb 2027", "2027-02-29"] {
        assert!(
            matches!(
                parse_single_date(text, today),
                Err(DateParseError::InvalidDayForMonth(_))
            ),
            "{text}"
        );
    }
    assert_eq!(
        parse_single_date("29 february 2028", today),
        Ok(date(2028, 2, 29))
    );
}

#[test]
fn test_inclusive_days_over_a_holiday_weekend() {
    // Fri 14th, Independence Day on Sat 15th, Sun 16th, Mon 17th
    let holidays = ["2026-08-15".to_string()];
    assert_eq!(
        calculate_inclusive_days("2026-08-14", "2026-08-17", false, true, &holidays),
        2.0
    );
    assert_eq!(
        calculate_inclusive_days("2026-03-02", "2026-03-02", false, true, &[]),
        1.0
    );
    assert_eq!(
        calculate_inclusive_days("2026-03-07", "2026-03-07", false, true, &[]),
        0.0
    );
}

fn weekdays_by_walking(start: NaiveDate, end: NaiveDate) -> f64 {
    use chrono::Datelike;
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| d.weekday().num_days_from_monday() < 5)
        .count() as f64
}

#[test]
fn test_working_days_agree_with_a_calendar_walk() {
    let none = HashSet::new();
    let (start, end) = (date(2026, 4, 15), date(2026, 5, 19));
    assert_eq!(weekdays_by_walking(start, end), 25.0);
    assert_eq!(working_days(start, end, false, true, &none), 25.0);

    let mut from = date(2026, 1, 1);
    while from < date(2026, 12, 1) {
        let to = from + chrono::Duration::days(40);
        assert_eq!(
            working_days(from, to, false, true, &none),
            weekdays_by_walking(from, to)
        );
        from += chrono::Duration::days(17);
    }
}

#[test]
fn test_day_of_next_month_rolls_the_year() {
    let december = date(2026, 12, 10);
    assert_eq!(
        parse_single_date("5th of next month", december),
        Ok(date(2027, 1, 5))
    );
}

#[test]
fn test_impossible_day_is_an_error() {
    assert!(matches!(
        parse_single_date("31st april", reference()),
        Err(DateParseError::InvalidDayForMonth(_))
    ));
    assert!(matches!(
        parse_single_date("10-13-2026", reference()),
        Err(DateParseError::InvalidMonth(_))
    ));
}

#[test]
fn test_duration_number_is_not_a_day() {
    assert_eq!(
        parse_single_date("3 days from tomorrow", reference()),
        Ok(date(2026, 3, 3))
    );
    let spec = parse_duration("3 days from tomorrow");
    assert_eq!(spec.days, Some(3.0));
    assert!(spec.has_explicit_duration);
}

#[test]
fn test_ranges() {
    let today = reference();

    let range = parse_date_range("from 15th to 17th November", today).unwrap();
    assert_eq!((range.start(), range.end()), (date(2026, 11, 15), date(2026, 11, 17)));

    let range = parse_date_range("leave 15-04-2026 to 19-05-2026 for a trip", today).unwrap();
    assert_eq!((range.start(), range.end()), (date(2026, 4, 15), date(2026, 5, 19)));

    let range = parse_date_range("wfh monday till wednesday", today).unwrap();
    assert_eq!((range.start(), range.end()), (today, date(2026, 3, 4)));

    assert_eq!(
        parse_date_range("leave on 5th march", today),
        Err(DateParseError::NotARange)
    );
}

#[test]
fn test_inverted_range_is_reported() {
    let result = parse_dates("20th to 15th march", reference());
    assert_eq!(result.start, None);
    assert_eq!(result.errors, vec![DateParseError::EndBeforeStart]);
}

#[test]
fn test_text_without_dates_is_empty_not_an_error() {
    let result = parse_dates("I need some time off", reference());
    assert_eq!(result.start, None);
    assert!(result.errors.is_empty());
}

#[test]
fn test_holiday_inside_span_extends_end() {
    // Friday 2026-03-06 is a holiday; two working days from Thursday land on Monday
    let holidays: HashSet<_> = [date(2026, 3, 6)].into_iter().collect();
    assert_eq!(
        reconcile_end_date(date(2026, 3, 5), 2.0, &holidays),
        date(2026, 3, 9)
    );
    assert_eq!(
        working_days(date(2026, 3, 5), date(2026, 3, 9), false, true, &holidays),
        2.0
    );
}
