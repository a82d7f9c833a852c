use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use strum_macros::{AsRefStr, Display};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::model::{EmployeeIdentity, LeaveRequestDraft, PendingConfirmation, RequestKind, WfhRequestDraft};
use crate::parser::{DateRange, is_past_date, week_bounds};
use crate::services::clock::Clock;
use crate::services::holiday::HolidayCalendar;
use crate::services::record_store::{RecordStore, RequestFilter};
use crate::services::with_timeout;

/// Why a draft did not pass. Doubles as the reply intent tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    InvalidDates,
    HolidayConflict,
    #[strum(serialize = "past_date_error")]
    PastDate,
    #[strum(serialize = "overlap_conflict")]
    Overlap,
    InsufficientBalance,
    WfhLimitExceeded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason_code: ReasonCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Accepted,
    /// Blocking; the user must change the request.
    Rejected(Rejection),
    /// Over an allowance; the user may resubmit as an exception.
    ExceptionOffered(Rejection),
}

fn format_days(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn plural(value: f64) -> &'static str {
    if value == 1.0 { "" } else { "s" }
}

pub fn past_date_message(kind: RequestKind, day: NaiveDate) -> String {
    format!("❌ Cannot apply {kind} for a past date ({day}). Please select today or a future date.")
}

/// Checks run before a draft may be confirmed, after an edit, and again on commit.
///
/// Order matters: holiday, past date, overlap, then the allowance checks that
/// can be waived as an exception. The gate only reads from its collaborators,
/// so an unchanged draft always gets the same answer.
pub struct ValidationGate {
    records: Arc<dyn RecordStore>,
    holidays: Arc<dyn HolidayCalendar>,
    clock: Arc<dyn Clock>,
    wfh_weekly_cap: usize,
    timeout: Duration,
}

impl ValidationGate {
    pub fn new(
        records: Arc<dyn RecordStore>,
        holidays: Arc<dyn HolidayCalendar>,
        clock: Arc<dyn Clock>,
        wfh_weekly_cap: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            records,
            holidays,
            clock,
            wfh_weekly_cap,
            timeout,
        }
    }

    #[instrument(name = "validation_gate", skip_all, fields(kind = %request.kind()))]
    pub async fn check(
        &self,
        employee: &EmployeeIdentity,
        request: &PendingConfirmation,
    ) -> Result<GateOutcome, StoreError> {
        let kind = request.kind();
        let Some(range) = request.range() else {
            return Ok(GateOutcome::Rejected(Rejection {
                reason_code: ReasonCode::InvalidDates,
                message: "❌ Please provide a valid date for your request.".to_string(),
            }));
        };

        // 1️⃣ holidays
        let blocking = with_timeout(self.timeout, self.holidays.blocking_holidays(range)).await?;
        if let Some(holiday) = blocking.first() {
            return Ok(GateOutcome::Rejected(Rejection {
                reason_code: ReasonCode::HolidayConflict,
                message: format!(
                    "❌ Cannot apply {kind} on {} ({}). It is a company holiday.",
                    holiday.date, holiday.name
                ),
            }));
        }

        // 2️⃣ past start
        if is_past_date(range.start(), self.clock.today()) {
            return Ok(GateOutcome::Rejected(Rejection {
                reason_code: ReasonCode::PastDate,
                message: past_date_message(kind, range.start()),
            }));
        }

        // 3️⃣ overlap with any active request
        if let Some(existing) =
            with_timeout(self.timeout, self.records.check_overlap(employee, range)).await?
        {
            return Ok(GateOutcome::Rejected(Rejection {
                reason_code: ReasonCode::Overlap,
                message: format!(
                    "⚠️ You already have {} from {} to {}.\n\nPlease adjust your new request or update the existing one first.",
                    existing.label(),
                    existing.start_date,
                    existing.end_date
                ),
            }));
        }

        if request.is_exception() {
            return Ok(GateOutcome::Accepted);
        }

        // 4️⃣ / 5️⃣ waivable allowances
        let outcome = match request {
            PendingConfirmation::Leave(draft) => self.check_balance(employee, draft).await?,
            PendingConfirmation::Wfh(draft) => self.check_weekly_cap(employee, draft, range).await?,
        };
        debug!(?outcome, "Gate finished");
        Ok(outcome)
    }

    async fn check_balance(
        &self,
        employee: &EmployeeIdentity,
        draft: &LeaveRequestDraft,
    ) -> Result<GateOutcome, StoreError> {
        let Some(leave_type) = draft.leave_type else {
            return Ok(GateOutcome::Accepted);
        };
        let requested = draft.requested_days();
        let balance = with_timeout(
            self.timeout,
            self.records.check_balance(employee, leave_type, requested),
        )
        .await?;

        if balance.is_available {
            return Ok(GateOutcome::Accepted);
        }

        Ok(GateOutcome::ExceptionOffered(Rejection {
            reason_code: ReasonCode::InsufficientBalance,
            message: format!(
                "⚠️ Insufficient {leave_type} leave balance.\n\n\
                 • Requested: {} day{}\n\
                 • Available: {} day{}\n\n\
                 Would you like to submit this as an exception request for manager review? (Yes/No)",
                format_days(requested),
                plural(requested),
                format_days(balance.remaining),
                plural(balance.remaining),
            ),
        }))
    }

    async fn check_weekly_cap(
        &self,
        employee: &EmployeeIdentity,
        draft: &WfhRequestDraft,
        range: DateRange,
    ) -> Result<GateOutcome, StoreError> {
        let first_day = draft.first_day().unwrap_or(range.start());
        let (monday, sunday) = week_bounds(first_day);

        let existing = with_timeout(
            self.timeout,
            self.records.list_requests(employee, RequestFilter::Wfh),
        )
        .await?;
        let used = existing
            .iter()
            .filter(|r| r.kind == RequestKind::Wfh && r.status.is_active())
            .filter(|r| r.start_date >= monday && r.start_date <= sunday)
            .count();

        if used < self.wfh_weekly_cap {
            return Ok(GateOutcome::Accepted);
        }

        Ok(GateOutcome::ExceptionOffered(Rejection {
            reason_code: ReasonCode::WfhLimitExceeded,
            message: format!(
                "⚠️ You have already used your WFH allowance for the week of {monday} ({used} of {} days).\n\n\
                 Would you like to submit this as an exception request for manager review? (Yes/No)",
                self.wfh_weekly_cap
            ),
        }))
    }
}
