use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use super::Entities;
use crate::model::LeaveType;
use crate::parser::{
    MONTHS, WEEKDAYS, month_from_name, parse_date_range, parse_dates, parse_duration,
    parse_single_date, week_bounds,
};
use crate::services::record_store::RequestFilter;

pub(crate) static WFH_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:wfh|work(?:ing)?\s+from\s+home|remote(?:ly)?|home\s+office)\b").unwrap()
});
pub(crate) static LEAVE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:leaves?|time\s+off|day\s+off|days\s+off)\b").unwrap());

static EXPLICIT_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(annual|sick|casual|maternity|paternity)\b").unwrap());
static SICK_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(fever|cold|flu|illness|doctor|hospital|medical|appointment|surgery|unwell|health|cough|pain|headache|stomach|viral|infection|dentist)\b").unwrap()
});
static CASUAL_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(wedding|marriage|festival|temple|church|mosque|ceremony|function|personal|family|urgent|emergency|birthday|anniversary|pongal|diwali|deepavali|christmas|eid|onam|holi|navratri|dussehra|new year)\b").unwrap()
});
static ANNUAL_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(vacation|holiday|trip|travel|tour|break|rest|relax|beach|mountain)\b").unwrap()
});

static REASON_AFTER_NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d{1,2}[-/.]\d{1,2}[-/.]\d{4}\s+for\s+(.+)$").unwrap());
static REASON_AFTER_NAMED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bon\s+\d{1,2}(?:st|nd|rd|th)?\s+\w+\s+(?:\d{4}\s+)?for\s+(.+)$").unwrap()
});
static REASON_FOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfor\s+(.+?)(?:\s+on\b|\s+from\b|\s+\d{1,2}[-/.]\d|$)").unwrap()
});
static REASON_BECAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:because|since|due\s+to)\s+(.+)$").unwrap());

static REASON_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:apply(?:ing)?|request(?:ing)?|create|book|submit)\b".to_string(),
        r"(?i)\b(?:leaves?|wfh|work(?:ing)?\s+from\s+home)\b".to_string(),
        r"(?i)\b(?:annual|sick|casual|maternity|paternity)\b".to_string(),
        r"(?i)\b(?:day\s+after\s+tomorrow|today|tomorrow|yesterday)\b".to_string(),
        format!(r"(?i)\b(?:this|next|last|coming)\s+(?:week|month|year|{WEEKDAYS})\b"),
        r"\b\d{4}-\d{1,2}-\d{1,2}\b".to_string(),
        r"\b\d{1,2}[-/.]\d{1,2}(?:[-/.]\d{2,4})?\b".to_string(),
        format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s*(?:of\s+)?(?:{MONTHS})\b(?:,?\s*\d{{4}})?"),
        format!(r"(?i)\b(?:{MONTHS})\s+\d{{1,2}}(?:st|nd|rd|th)?\b(?:,?\s*\d{{4}})?"),
        r"(?i)\b\d{1,2}(?:st|nd|rd|th)\b".to_string(),
        r"(?i)\b\d+(?:\.\d+)?\s*(?:days?|weeks?)\b".to_string(),
        r"(?i)\bhalf(?:\s+a)?[\s-]?days?\b".to_string(),
        r"(?i)\b(?:on|from|to|till|until)\b".to_string(),
        r"(?i)\b(?:i|i'm|im|want|need|a|an|the|my|for|at|in|of|please|can|could|would|will|shall|you|me|help|just|take|taking|off|some|hi|hello|hey|ok|okay)\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static WORK_FROM_HOME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)work(?:ing)?\s+from\s+home").unwrap());
static FROM_HOME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)from\s+home").unwrap());

static CANCEL_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:cancel|stop|reset)\b").unwrap());
static EDIT_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:edit|change|modify|update|mistake)\b").unwrap());
static ALL_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:all|both|everything)\b").unwrap());

static MONTH_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b({MONTHS})\b")).unwrap());
static YEAR_CAPTURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());
static COUNT_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:how\s+many|count|number\s+of|no\s+of|total)\b").unwrap());
static CHECK_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:is|was|will)\b|\bis\s+(?:there\s+)?(?:a\s+)?holiday\s+on\b").unwrap());

const YES_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "sure", "ok", "okay", "correct", "right", "confirm", "proceed", "approve",
];
const NO_WORDS: &[&str] = &["no", "nope", "nah", "cancel", "nevermind", "never mind", "stop", "wrong"];
const GENERIC_REASONS: &[&str] = &["personal", "work", "reason", "purpose"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayQueryMode {
    List,
    Count,
    Check(NaiveDate),
}

/// Leave type named outright in the message.
pub fn explicit_leave_type(message: &str) -> Option<LeaveType> {
    let lower = message.to_lowercase();
    let caps = EXPLICIT_TYPE.captures(&lower)?;
    LeaveType::from_str(&caps[1]).ok()
}

/// Leave type implied by symptoms, family events or travel plans.
pub fn infer_leave_type(message: &str) -> Option<LeaveType> {
    let lower = message.to_lowercase();
    if SICK_HINT.is_match(&lower) {
        Some(LeaveType::Sick)
    } else if CASUAL_HINT.is_match(&lower) {
        Some(LeaveType::Casual)
    } else if ANNUAL_HINT.is_match(&lower) {
        Some(LeaveType::Annual)
    } else {
        None
    }
}

pub fn extract_leave_type(message: &str) -> Option<LeaveType> {
    explicit_leave_type(message).or_else(|| infer_leave_type(message))
}

fn clean_reason(text: &str) -> Option<String> {
    let mut cleaned = text.to_string();
    for pattern in REASON_NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned
        .trim()
        .trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | '-' | ':' | ';'))
        .trim();

    if cleaned.chars().count() < 3 {
        return None;
    }
    if GENERIC_REASONS.contains(&cleaned.to_lowercase().as_str()) {
        return Some("Personal".to_string());
    }
    Some(cleaned.to_string())
}

/// Pulls a free-text reason out of a request message, or `None` when all
/// that is left after removing dates and request wording is noise.
pub fn extract_reason(message: &str) -> Option<String> {
    for pattern in [&*REASON_AFTER_NUMERIC_DATE, &*REASON_AFTER_NAMED_DATE] {
        if let Some(caps) = pattern.captures(message) {
            if let Some(reason) = clean_reason(caps[1].trim()) {
                return Some(reason);
            }
        }
    }

    if let Some(caps) = REASON_FOR.captures(message) {
        if let Some(reason) = clean_reason(caps[1].trim()) {
            return Some(reason);
        }
    }

    if let Some(caps) = REASON_BECAUSE.captures(message) {
        if let Some(reason) = clean_reason(caps[1].trim()) {
            return Some(reason);
        }
    }

    clean_reason(message).filter(|r| (6..200).contains(&r.chars().count()))
}

/// Stock WFH reason for messages that hint at one without stating it.
pub fn context_reason(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let reason = if SICK_HINT.is_match(&lower) || lower.contains("sick") {
        "Medical reasons"
    } else if lower.contains("wedding") || lower.contains("marriage") {
        "Family wedding"
    } else if lower.contains("emergency") || lower.contains("urgent") {
        "Emergency"
    } else if lower.contains("vacation") || lower.contains("trip") || lower.contains("travel") {
        "Vacation"
    } else {
        return None;
    };
    Some(reason.to_string())
}

pub fn extract_leave_entities(message: &str, reference: NaiveDate) -> Entities {
    let dates = parse_dates(message, reference);
    Entities {
        start_date: dates.start,
        end_date: dates.end,
        date_errors: dates.errors,
        duration: parse_duration(message),
        leave_type: extract_leave_type(message),
        reason: extract_reason(message),
        ..Default::default()
    }
}

pub fn extract_wfh_entities(message: &str, reference: NaiveDate) -> Entities {
    // "work from home" must not read as the start of a "from X to Y" range
    let sanitized = WORK_FROM_HOME.replace_all(message, "wfh");
    let sanitized = FROM_HOME.replace_all(&sanitized, "home");
    let dates = parse_dates(&sanitized, reference);
    Entities {
        start_date: dates.start,
        end_date: dates.end,
        date_errors: dates.errors,
        reason: extract_reason(message).or_else(|| context_reason(message)),
        ..Default::default()
    }
}

pub fn extract_confirmation(message: &str) -> Option<Confirmation> {
    let cleaned: String = message
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | '!' | '?' | ','))
        .collect();
    let leads_with = |word: &&str| cleaned == *word || cleaned.starts_with(&format!("{word} "));

    if YES_WORDS.iter().any(leads_with) {
        Some(Confirmation::Yes)
    } else if NO_WORDS.iter().any(leads_with) {
        Some(Confirmation::No)
    } else {
        None
    }
}

pub fn is_cancel_phrase(message: &str) -> bool {
    CANCEL_PHRASE.is_match(message)
}

pub fn is_edit_request(message: &str) -> bool {
    EDIT_PHRASE.is_match(message)
}

pub fn extract_request_filter(message: &str) -> Option<RequestFilter> {
    let wfh = WFH_WORDS.is_match(message);
    let leave = LEAVE_WORDS.is_match(message);
    if ALL_WORDS.is_match(message) || (wfh && leave) {
        Some(RequestFilter::All)
    } else if wfh {
        Some(RequestFilter::Wfh)
    } else if leave {
        Some(RequestFilter::Leave)
    } else {
        None
    }
}

/// Range, month and year narrowing for a holiday question.
pub fn extract_holiday_entities(message: &str, reference: NaiveDate) -> Entities {
    let lower = message.to_lowercase();
    let mut entities = Entities::default();

    if let Ok(range) = parse_date_range(&lower, reference) {
        entities.start_date = Some(range.start());
        entities.end_date = Some(range.end());
    } else if lower.contains("this week") {
        let (monday, sunday) = week_bounds(reference);
        entities.start_date = Some(monday);
        entities.end_date = Some(sunday);
    } else if lower.contains("next week") {
        let next = reference.checked_add_days(Days::new(7)).unwrap_or(reference);
        let (monday, sunday) = week_bounds(next);
        entities.start_date = Some(monday);
        entities.end_date = Some(sunday);
    }

    if lower.contains("this month") {
        entities.month = Some(reference.month());
        entities.year = Some(reference.year());
    } else if lower.contains("next month") {
        let (year, month) = match reference.month() {
            12 => (reference.year() + 1, 1),
            m => (reference.year(), m + 1),
        };
        entities.month = Some(month);
        entities.year = Some(year);
    } else if entities.start_date.is_none() {
        entities.month = MONTH_CAPTURE
            .captures(&lower)
            .and_then(|caps| month_from_name(&caps[1]));
    }

    if let Some(caps) = YEAR_CAPTURE.captures(&lower) {
        entities.year = caps[1].parse().ok();
    } else if lower.contains("next year") {
        entities.year = Some(reference.year() + 1);
    } else if lower.contains("this year") && entities.year.is_none() {
        entities.year = Some(reference.year());
    }

    entities
}

/// Whether a holiday question wants a list, a count, or a yes/no for one day.
pub fn holiday_query_mode(message: &str, reference: NaiveDate) -> HolidayQueryMode {
    if COUNT_WORDS.is_match(message) {
        return HolidayQueryMode::Count;
    }
    if CHECK_PHRASE.is_match(message) {
        if let Ok(day) = parse_single_date(message, reference) {
            return HolidayQueryMode::Check(day);
        }
    }
    HolidayQueryMode::List
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_leave_type_explicit_beats_inferred() {
        assert_eq!(extract_leave_type("casual leave for fever"), Some(LeaveType::Casual));
        assert_eq!(extract_leave_type("leave tomorrow, I have a fever"), Some(LeaveType::Sick));
        assert_eq!(extract_leave_type("going on a trip to goa"), Some(LeaveType::Annual));
        assert_eq!(extract_leave_type("cousin's wedding"), Some(LeaveType::Casual));
        assert_eq!(extract_leave_type("apply leave tomorrow"), None);
    }

    #[test]
    fn test_reason_extraction() {
        assert_eq!(
            extract_reason("apply casual leave on 26th january for family function").as_deref(),
            Some("family function")
        );
        assert_eq!(
            extract_reason("wfh tomorrow for plumber visit").as_deref(),
            Some("plumber visit")
        );
        assert_eq!(extract_reason("2 days casual leave from tomorrow"), None);
        assert_eq!(extract_reason("Apply for leave 15-04-2026 to 19-05-2026"), None);
        assert_eq!(
            extract_reason("leave on friday because my car broke down").as_deref(),
            Some("car broke down")
        );
    }

    #[test]
    fn test_wfh_entities_ignore_from_home() {
        let entities = extract_wfh_entities("work from home tomorrow", monday());
        assert_eq!(entities.start_date, NaiveDate::from_ymd_opt(2026, 3, 3));
        assert_eq!(entities.end_date, NaiveDate::from_ymd_opt(2026, 3, 3));
        assert!(entities.reason.is_none());
    }

    #[test]
    fn test_confirmation_vocabulary() {
        assert_eq!(extract_confirmation("Yes!"), Some(Confirmation::Yes));
        assert_eq!(extract_confirmation("ok go ahead"), Some(Confirmation::Yes));
        assert_eq!(extract_confirmation("never mind"), Some(Confirmation::No));
        assert_eq!(extract_confirmation("nope."), Some(Confirmation::No));
        assert_eq!(extract_confirmation("november 5th"), None);
        assert_eq!(extract_confirmation("show my requests"), None);
    }

    #[test]
    fn test_request_filter() {
        assert_eq!(extract_request_filter("show my wfh requests"), Some(RequestFilter::Wfh));
        assert_eq!(extract_request_filter("leave"), Some(RequestFilter::Leave));
        assert_eq!(extract_request_filter("All"), Some(RequestFilter::All));
        assert_eq!(extract_request_filter("show my requests"), None);
    }

    #[test]
    fn test_holiday_entities_and_mode() {
        let entities = extract_holiday_entities("holidays in january 2026", monday());
        assert_eq!(entities.month, Some(1));
        assert_eq!(entities.year, Some(2026));

        let next = extract_holiday_entities("any holidays next month?", monday());
        assert_eq!((next.month, next.year), (Some(4), Some(2026)));

        assert_eq!(holiday_query_mode("how many holidays this year", monday()), HolidayQueryMode::Count);
        assert_eq!(
            holiday_query_mode("is 26th january a holiday?", monday()),
            HolidayQueryMode::Check(NaiveDate::from_ymd_opt(2026, 1, 26).unwrap())
        );
        assert_eq!(holiday_query_mode("show holiday list", monday()), HolidayQueryMode::List);
    }
}
