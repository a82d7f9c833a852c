use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

/// Source of "now". Injected everywhere so dates resolve deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used as the reference for relative dates, in the same
    /// zone as [`Clock::now`].
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a moment; can be moved forward.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Noon UTC on the given day.
    pub fn on(day: NaiveDate) -> Self {
        let noon = day.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc();
        Self::new(noon)
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_today_follows_now_across_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let clock = FixedClock::new(day.and_hms_opt(23, 59, 0).unwrap().and_utc());
        assert_eq!(clock.today(), day);

        clock.advance(Duration::minutes(2));
        assert_eq!(clock.today(), day.succ_opt().unwrap());
        assert_eq!(clock.today(), clock.now().date_naive());
    }

    #[test]
    fn test_system_clock_day_matches_its_instant() {
        let clock = SystemClock;
        let before = clock.now().date_naive();
        let today = clock.today();
        let after = clock.now().date_naive();
        assert!(today == before || today == after);
    }
}
