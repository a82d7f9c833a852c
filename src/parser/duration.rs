use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DAY_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\s*days?\b").unwrap());
static HALF_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhalf(?:\s+a)?[\s-]?days?\b").unwrap());
static PART_OF_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:morning|afternoon)\b").unwrap());
static DURATION_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\s*(?:days?|weeks?|hours?|hrs?)\b").unwrap());

/// How long the employee asked to be away, independent of any dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSpec {
    pub days: Option<f64>,
    pub is_half_day: bool,
    pub has_explicit_duration: bool,
}

/// Reads `"<N> day(s)"` and half-day phrasing out of free text.
///
/// Half-day wording always wins and pins the duration to `0.5`. `morning` or
/// `afternoon` only implies a half day when no explicit count was given.
/// Fractional counts other than one half are rounded up to whole days.
pub fn parse_duration(text: &str) -> DurationSpec {
    let lower = text.to_lowercase();
    let mut spec = DurationSpec::default();

    if let Some(caps) = DAY_COUNT.captures(&lower) {
        if let Ok(value) = caps[1].parse::<f64>() {
            if value > 0.0 {
                spec.has_explicit_duration = true;
                if (value - 0.5).abs() < f64::EPSILON {
                    spec.is_half_day = true;
                    spec.days = Some(0.5);
                } else {
                    spec.days = Some(value.ceil());
                }
            }
        }
    }

    let implicit_half = !spec.has_explicit_duration && PART_OF_DAY.is_match(&lower);
    if HALF_DAY.is_match(&lower) || implicit_half {
        spec.is_half_day = true;
        spec.days = Some(0.5);
    }

    spec
}

/// Blanks out `"2 days"` style phrases so their numbers are never mistaken for
/// a day of the month.
pub fn strip_duration_phrases(text: &str) -> String {
    DURATION_PHRASE.replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_day_count() {
        let spec = parse_duration("I need 3 days off");
        assert_eq!(spec.days, Some(3.0));
        assert!(spec.has_explicit_duration);
        assert!(!spec.is_half_day);
    }

    #[test]
    fn test_half_day_variants() {
        for text in ["half day tomorrow", "a half-day on friday", "half a day please", "halfday"] {
            let spec = parse_duration(text);
            assert!(spec.is_half_day, "{text}");
            assert_eq!(spec.days, Some(0.5), "{text}");
        }
    }

    #[test]
    fn test_morning_only_implies_half_day_without_count() {
        assert!(parse_duration("leave tomorrow morning").is_half_day);
        let spec = parse_duration("2 days starting monday morning");
        assert!(!spec.is_half_day);
        assert_eq!(spec.days, Some(2.0));
    }

    #[test]
    fn test_half_day_overrides_count() {
        let spec = parse_duration("1 day, actually half day");
        assert_eq!(spec.days, Some(0.5));
        assert!(spec.is_half_day);
    }

    #[test]
    fn test_no_duration() {
        assert_eq!(parse_duration("leave on friday"), DurationSpec::default());
    }
}
