use chrono::{Datelike, Days, NaiveDate};
use derive_more::Display;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::duration::strip_duration_phrases;

pub(crate) const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
pub(crate) const WEEKDAYS: &str = r"monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues?|wed|thu(?:rs?)?|fri|sat|sun";

static MONTH_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"\b(?:{MONTHS})\b")).unwrap());
static WEEKDAY_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({WEEKDAYS})\b")).unwrap());
static RELATIVE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:today|tomorrow|yesterday)\b").unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

static DAY_AFTER_TOMORROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bday after tomorrow\b").unwrap());
static TOMORROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btomorrow\b").unwrap());
static YESTERDAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\byesterday\b").unwrap());
static TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btoday\b").unwrap());
static WEEKDAY_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b(this|next|coming)\s+({WEEKDAYS})\b")).unwrap());

static ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());
static NUMERIC_WITH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b").unwrap());
static NUMERIC_NO_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[./-](\d{1,2})\b([./-]\d+)?").unwrap());
static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s*(?:of\s+)?({MONTHS})\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .unwrap()
});
static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .unwrap()
});
static LONE_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?\b").unwrap());
static DAY_OF_RELATIVE_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(this|next)\s+month\b").unwrap()
});

static RANGE_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:to|till|until|thru|through)\s+|\s+-\s+|(?:st|nd|rd|th)\s*-\s*").unwrap()
});
static FROM_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfrom\s+").unwrap());
static CLAUSE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?:for|because|as|since|due|and|but|so)\b|[;!?]").unwrap());

// Tokens kept on each side of a range separator.
const LEFT_WINDOW: usize = 3;
const RIGHT_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum DateParseError {
    #[display(fmt = "No text provided")]
    NoText,
    #[display(fmt = "Unable to understand the requested date.")]
    Unrecognized,
    #[display(fmt = "Invalid day for the specified month in \"{}\".", _0)]
    InvalidDayForMonth(String),
    #[display(fmt = "Invalid month in \"{}\".", _0)]
    InvalidMonth(String),
    #[display(fmt = "End date cannot be earlier than start date.")]
    EndBeforeStart,
    #[display(fmt = "No date range found.")]
    NotARange,
}

impl std::error::Error for DateParseError {}

/// Inclusive date span. `end` is never before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateParseError> {
        if end < start {
            return Err(DateParseError::EndBeforeStart);
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// Combined outcome of range-then-single parsing. An absent date with no
/// errors means the text simply held no date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateParseResult {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub is_range: bool,
    pub errors: Vec<DateParseError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Full,
    DayOnly,
}

pub fn month_from_name(name: &str) -> Option<u32> {
    let key: String = name.trim().to_lowercase().chars().take(3).collect();
    let month = match key.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// True when `text` names a calendar month as a whole word.
pub fn names_month(text: &str) -> bool {
    MONTH_WORD.is_match(&text.to_lowercase())
}

fn weekday_index(name: &str) -> Option<u32> {
    // Sunday-based, matching chrono's num_days_from_sunday
    let key: String = name.chars().take(3).collect();
    let idx = match key.as_str() {
        "sun" => 0,
        "mon" => 1,
        "tue" => 2,
        "wed" => 3,
        "thu" => 4,
        "fri" => 5,
        "sat" => 6,
        _ => return None,
    };
    Some(idx)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace('–', "-")
}

fn add_days(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_add_days(Days::new(n)).unwrap_or(day)
}

fn build_date(year: i32, month: u32, day: u32, segment: &str) -> Result<NaiveDate, DateParseError> {
    if !(1..=12).contains(&month) {
        return Err(DateParseError::InvalidMonth(segment.trim().to_string()));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateParseError::InvalidDayForMonth(segment.trim().to_string()))
}

fn capture_num<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

fn parse_relative(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if DAY_AFTER_TOMORROW.is_match(text) {
        return Some(add_days(reference, 2));
    }
    if TOMORROW.is_match(text) {
        return Some(add_days(reference, 1));
    }
    if YESTERDAY.is_match(text) {
        return reference.checked_sub_days(Days::new(1));
    }
    if TODAY.is_match(text) {
        return Some(reference);
    }
    None
}

fn upcoming_weekday(reference: NaiveDate, target: u32, strictly_after: bool) -> NaiveDate {
    let current = reference.weekday().num_days_from_sunday();
    let mut diff = (target + 7 - current) % 7;
    if diff == 0 && strictly_after {
        diff = 7;
    }
    add_days(reference, diff as u64)
}

fn parse_weekday(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let caps = WEEKDAY_PHRASE.captures(text)?;
    let target = weekday_index(&caps[2])?;
    let strictly_after = &caps[1] != "this";
    Some(upcoming_weekday(reference, target, strictly_after))
}

// "5th of next month", "20th this month"
fn parse_relative_month(
    text: &str,
    reference: NaiveDate,
) -> Option<Result<NaiveDate, DateParseError>> {
    let caps = DAY_OF_RELATIVE_MONTH.captures(text)?;
    let (mut year, mut month) = (reference.year(), reference.month());
    if &caps[2] == "next" {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    Some(match capture_num(&caps, 1) {
        Some(day) => build_date(year, month, day, &caps[0]),
        None => Err(DateParseError::Unrecognized),
    })
}

fn parse_absolute(
    text: &str,
    reference: NaiveDate,
) -> Option<Result<(NaiveDate, Resolution), DateParseError>> {
    if let Some(caps) = ISO.captures(text) {
        let segment = &caps[0];
        return Some(
            match (capture_num(&caps, 1), capture_num(&caps, 2), capture_num(&caps, 3)) {
                (Some(y), Some(m), Some(d)) => build_date(y, m, d, segment),
                _ => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::Full)),
        );
    }

    if let Some(caps) = NUMERIC_WITH_YEAR.captures(text) {
        let segment = &caps[0];
        return Some(
            match (capture_num(&caps, 1), capture_num(&caps, 2), capture_num(&caps, 3)) {
                (Some(d), Some(m), Some(y)) => build_date(y, m, d, segment),
                _ => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::Full)),
        );
    }

    if let Some(caps) = NUMERIC_NO_YEAR.captures(text) {
        // "15-04-26" style short years are not supported
        if caps.get(3).is_some() {
            return Some(Err(DateParseError::Unrecognized));
        }
        let segment = &caps[0];
        return Some(
            match (capture_num(&caps, 1), capture_num(&caps, 2)) {
                (Some(d), Some(m)) => build_date(reference.year(), m, d, segment),
                _ => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::Full)),
        );
    }

    if let Some(caps) = DAY_MONTH.captures(text) {
        let segment = &caps[0];
        let year = capture_num(&caps, 3).unwrap_or(reference.year());
        return Some(
            match (capture_num(&caps, 1), month_from_name(&caps[2])) {
                (Some(d), Some(m)) => build_date(year, m, d, segment),
                _ => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::Full)),
        );
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let segment = &caps[0];
        let year = capture_num(&caps, 3).unwrap_or(reference.year());
        return Some(
            match (month_from_name(&caps[1]), capture_num(&caps, 2)) {
                (Some(m), Some(d)) => build_date(year, m, d, segment),
                _ => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::Full)),
        );
    }

    if let Some(caps) = LONE_DAY.captures(text) {
        let segment = &caps[0];
        return Some(
            match capture_num(&caps, 1) {
                Some(d) => build_date(reference.year(), reference.month(), d, segment),
                None => Err(DateParseError::Unrecognized),
            }
            .map(|date| (date, Resolution::DayOnly)),
        );
    }

    None
}

/// Resolves one date from free text.
///
/// Relative keywords are tried first (`day after tomorrow`, `tomorrow`,
/// `yesterday`, `today`), then `this|next|coming <weekday>`, then absolute
/// formats in order: ISO, `D-M-YYYY`, `D-M`, `15th April [2026]`,
/// `April 15th [2026]`, and finally a lone day number in the reference month.
/// Numbers that belong to a duration (`2 days`) are never read as a day.
pub fn parse_single_date(text: &str, reference: NaiveDate) -> Result<NaiveDate, DateParseError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(DateParseError::NoText);
    }

    if let Some(date) = parse_relative(&normalized, reference) {
        return Ok(date);
    }
    if let Some(date) = parse_weekday(&normalized, reference) {
        return Ok(date);
    }

    if let Some(result) = parse_relative_month(&normalized, reference) {
        return result;
    }

    let cleaned = strip_duration_phrases(&normalized);
    match parse_absolute(&cleaned, reference) {
        Some(result) => result.map(|(date, _)| date),
        None => Err(DateParseError::Unrecognized),
    }
}

fn has_date_signal(segment: &str) -> bool {
    DIGIT.is_match(segment)
        || MONTH_WORD.is_match(segment)
        || RELATIVE_WORD.is_match(segment)
        || WEEKDAY_WORD.is_match(segment)
}

fn left_segment(before: &str) -> String {
    if let Some(found) = FROM_WORD.find_iter(before).last() {
        return before[found.end()..].trim().to_string();
    }
    let tokens: Vec<&str> = before.split_whitespace().collect();
    let skip = tokens.len().saturating_sub(LEFT_WINDOW);
    tokens[skip..].join(" ")
}

fn right_segment(after: &str) -> String {
    let clause = match CLAUSE_BREAK.find(after) {
        Some(found) => &after[..found.start()],
        None => after,
    };
    clause
        .split_whitespace()
        .take(RIGHT_WINDOW)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_boundary(
    segment: &str,
    reference: NaiveDate,
) -> Result<(NaiveDate, Resolution), DateParseError> {
    if let Some(result) = parse_relative_month(segment, reference) {
        return result.map(|date| (date, Resolution::Full));
    }

    if let Some(date) = parse_relative(segment, reference) {
        return Ok((date, Resolution::Full));
    }
    if let Some(date) = parse_weekday(segment, reference) {
        return Ok((date, Resolution::Full));
    }
    if let Some(result) = parse_absolute(segment, reference) {
        return result;
    }
    // A bare weekday inside a range means the upcoming one
    if let Some(caps) = WEEKDAY_WORD.captures(segment) {
        if let Some(target) = weekday_index(&caps[1]) {
            return Ok((upcoming_weekday(reference, target, false), Resolution::Full));
        }
    }

    Err(DateParseError::Unrecognized)
}

/// Resolves `from X to Y`, `X till Y`, `X - Y` or `15th-17th` style spans.
///
/// The hyphens inside an ISO or numeric date are never treated as a range
/// separator. When only one side names a month, a bare day number on the other
/// side inherits that side's month and year, so `15th to 17th November`
/// covers November 15..17. Returns [`DateParseError::NotARange`] when no
/// separator has a date on both sides.
pub fn parse_date_range(text: &str, reference: NaiveDate) -> Result<DateRange, DateParseError> {
    let normalized = strip_duration_phrases(&normalize(text));
    if normalized.trim().is_empty() {
        return Err(DateParseError::NoText);
    }

    for separator in RANGE_SEPARATOR.find_iter(&normalized) {
        let left = left_segment(&normalized[..separator.start()]);
        let right = right_segment(&normalized[separator.end()..]);
        if !has_date_signal(&left) || !has_date_signal(&right) {
            continue;
        }

        let (mut start, start_resolution) = match parse_boundary(&left, reference) {
            Ok(found) => found,
            Err(DateParseError::Unrecognized) => continue,
            Err(e) => return Err(e),
        };
        let (mut end, end_resolution) = match parse_boundary(&right, reference) {
            Ok(found) => found,
            Err(DateParseError::Unrecognized) => continue,
            Err(e) => return Err(e),
        };

        let left_names_month = MONTH_WORD.is_match(&left);
        let right_names_month = MONTH_WORD.is_match(&right);
        if left_names_month && !right_names_month && end_resolution == Resolution::DayOnly {
            end = build_date(start.year(), start.month(), end.day(), &right)?;
        } else if right_names_month && !left_names_month && start_resolution == Resolution::DayOnly {
            start = build_date(end.year(), end.month(), start.day(), &left)?;
        }

        return DateRange::new(start, end);
    }

    Err(DateParseError::NotARange)
}

/// Range first, then a single date. Texts without any date come back empty
/// and error-free; genuine failures (`31 April`, inverted ranges) are listed
/// in `errors`.
pub fn parse_dates(text: &str, reference: NaiveDate) -> DateParseResult {
    match parse_date_range(text, reference) {
        Ok(range) => DateParseResult {
            start: Some(range.start()),
            end: Some(range.end()),
            is_range: true,
            errors: Vec::new(),
        },
        Err(DateParseError::NotARange) => match parse_single_date(text, reference) {
            Ok(day) => DateParseResult {
                start: Some(day),
                end: Some(day),
                is_range: false,
                errors: Vec::new(),
            },
            Err(DateParseError::NoText | DateParseError::Unrecognized) => DateParseResult::default(),
            Err(other) => DateParseResult {
                errors: vec![other],
                ..DateParseResult::default()
            },
        },
        Err(DateParseError::NoText) => DateParseResult::default(),
        Err(other) => DateParseResult {
            errors: vec![other],
            ..DateParseResult::default()
        },
    }
}
