use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::StoreError;
use crate::model::Holiday;
use crate::model::holiday::HolidayFile;
use crate::parser::DateRange;

const BUNDLED_HOLIDAYS: &str = include_str!("../../data/holidays.json");

/// Narrowing applied to a holiday lookup; every set field must match.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HolidayFilter {
    pub range: Option<DateRange>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl HolidayFilter {
    fn matches(&self, holiday: &Holiday) -> bool {
        self.range.is_none_or(|r| r.contains(holiday.date))
            && self.year.is_none_or(|y| holiday.date.year() == y)
            && self.month.is_none_or(|m| holiday.date.month() == m)
    }
}

/// Company holiday policy.
#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    async fn holidays(&self, filter: &HolidayFilter) -> Result<Vec<Holiday>, StoreError>;

    /// Every listed holiday inside `range`, optional ones included; each blocks
    /// leave and WFH.
    async fn blocking_holidays(&self, range: DateRange) -> Result<Vec<Holiday>, StoreError> {
        let filter = HolidayFilter {
            range: Some(range),
            ..Default::default()
        };
        self.holidays(&filter).await
    }

    async fn holiday_dates(&self, range: DateRange) -> Result<HashSet<NaiveDate>, StoreError> {
        Ok(self
            .blocking_holidays(range)
            .await?
            .into_iter()
            .map(|h| h.date)
            .collect())
    }
}

pub struct StaticHolidayCalendar {
    holidays: Vec<Holiday>,
}

impl StaticHolidayCalendar {
    pub fn new(mut holidays: Vec<Holiday>) -> Self {
        holidays.sort_by_key(|h| h.date);
        Self { holidays }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: HolidayFile = serde_json::from_str(json).context("invalid holiday calendar JSON")?;
        Ok(Self::new(file.holidays))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read holiday file {}", path.display()))?;
        let calendar = Self::from_json(&raw)?;
        info!(count = calendar.holidays.len(), path = %path.display(), "Holiday calendar loaded");
        Ok(calendar)
    }

    /// Calendar shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_HOLIDAYS)
    }
}

#[async_trait]
impl HolidayCalendar for StaticHolidayCalendar {
    async fn holidays(&self, filter: &HolidayFilter) -> Result<Vec<Holiday>, StoreError> {
        Ok(self
            .holidays
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect())
    }
}
