use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use strum::IntoEnumIterator;
use tracing::{error, info};

use super::engine::ChatEngine;
use super::replies::{
    ASK_REQUEST_TYPE, BALANCE_UNAVAILABLE, ChatReply, HOLIDAYS_UNAVAILABLE, REQUESTS_UNAVAILABLE,
    ReplyIntent, no_requests, request_listing,
};
use super::session::SessionContext;
use crate::model::{EmployeeIdentity, Gender, Holiday, LeaveType};
use crate::nlu::Entities;
use crate::nlu::entities::{HolidayQueryMode, holiday_query_mode};
use crate::parser::{DateRange, format_human_readable};
use crate::services::holiday::HolidayFilter;
use crate::services::record_store::{LeaveBalance, RequestFilter};
use crate::services::with_timeout;

/// Maternity and paternity leave only show up for the matching gender.
pub(super) fn visible_to(leave_type: LeaveType, gender: Option<Gender>) -> bool {
    match leave_type {
        LeaveType::Maternity => gender == Some(Gender::Female),
        LeaveType::Paternity => gender == Some(Gender::Male),
        _ => true,
    }
}

fn filter_scope(filter: RequestFilter) -> &'static str {
    match filter {
        RequestFilter::Leave => "leave",
        RequestFilter::Wfh => "WFH",
        RequestFilter::All => "leave or WFH",
    }
}

/// Holiday filter and the phrase describing it ("in March 2026").
fn holiday_scope(entities: &Entities, today: NaiveDate) -> (HolidayFilter, String) {
    if let Some(start) = entities.start_date {
        let end = entities.end_date.unwrap_or(start);
        let range = DateRange::new(start, end).unwrap_or(DateRange::single(start));
        let scope = format!(
            "from {} to {}",
            format_human_readable(range.start()),
            format_human_readable(range.end())
        );
        let filter = HolidayFilter {
            range: Some(range),
            ..Default::default()
        };
        return (filter, scope);
    }

    let year = entities.year.unwrap_or(today.year());
    if let Some(month) = entities.month {
        let month_name = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d.format("%B").to_string())
            .unwrap_or_default();
        let filter = HolidayFilter {
            year: Some(year),
            month: Some(month),
            ..Default::default()
        };
        return (filter, format!("in {month_name} {year}"));
    }

    let filter = HolidayFilter {
        year: Some(year),
        ..Default::default()
    };
    (filter, format!("in {year}"))
}

fn holiday_line(holiday: &Holiday) -> String {
    let optional = if holiday.optional { " _(optional)_" } else { "" };
    format!(
        "• **{}**: {} ({}){optional}",
        holiday.name,
        format_human_readable(holiday.date),
        holiday.date.format("%A")
    )
}

fn balance_line(balance: &LeaveBalance) -> String {
    format!(
        "• **{}**: {} of {} days remaining",
        balance.leave_type, balance.remaining, balance.total
    )
}

impl ChatEngine {
    pub(super) async fn leave_balance(&self, session: &SessionContext, entities: &Entities) -> ChatReply {
        let employee = &session.employee;

        if let Some(leave_type) = entities.leave_type {
            if !visible_to(leave_type, employee.gender) {
                return ChatReply::text(
                    format!("{leave_type} leave isn't part of your leave entitlement."),
                    ReplyIntent::LeaveBalanceInfo,
                );
            }
            return match with_timeout(self.timeout(), self.records.get_balance(employee, leave_type)).await {
                Ok(balance) => ChatReply::text(
                    format!(
                        "📊 **{leave_type} Leave Balance**\n\n\
                         • Total: {} days\n• Used: {} days\n• Remaining: **{}** days",
                        balance.total, balance.used, balance.remaining
                    ),
                    ReplyIntent::LeaveBalanceInfo,
                ),
                Err(e) => {
                    error!(error = %e, %leave_type, "Balance lookup failed");
                    ChatReply::text(BALANCE_UNAVAILABLE, ReplyIntent::Error)
                }
            };
        }

        // one lookup per visible type, all in flight together
        let lookups = LeaveType::iter()
            .filter(|t| visible_to(*t, employee.gender))
            .map(|t| with_timeout(self.timeout(), self.records.get_balance(employee, t)));
        let balances: Result<Vec<LeaveBalance>, _> = join_all(lookups).await.into_iter().collect();

        match balances {
            Ok(balances) => {
                let lines: Vec<String> = balances.iter().map(balance_line).collect();
                ChatReply::text(
                    format!(
                        "📋 **Your Leave Balance Summary ({}):**\n\n{}\n\nNeed time off? Just tell me the dates.",
                        self.clock.today().year(),
                        lines.join("\n")
                    ),
                    ReplyIntent::LeaveBalanceSummary,
                )
            }
            Err(e) => {
                error!(error = %e, "Balance summary failed");
                ChatReply::text(BALANCE_UNAVAILABLE, ReplyIntent::Error)
            }
        }
    }

    /// Lists requests, or asks which kind when the message did not say.
    pub(super) async fn view_requests(
        &self,
        session: &mut SessionContext,
        filter: Option<RequestFilter>,
    ) -> ChatReply {
        match filter {
            Some(filter) => self.list_requests(&session.employee, filter).await,
            None => {
                session.awaiting_request_type = true;
                ChatReply::text(ASK_REQUEST_TYPE, ReplyIntent::AskRequestType)
            }
        }
    }

    pub(super) async fn list_requests(
        &self,
        employee: &EmployeeIdentity,
        filter: RequestFilter,
    ) -> ChatReply {
        match with_timeout(self.timeout(), self.records.list_requests(employee, filter)).await {
            Ok(records) if records.is_empty() => no_requests(filter_scope(filter)),
            Ok(records) => {
                info!(count = records.len(), "Requests listed");
                request_listing(&records)
            }
            Err(e) => {
                error!(error = %e, "Request listing failed");
                ChatReply::text(REQUESTS_UNAVAILABLE, ReplyIntent::Error)
            }
        }
    }

    pub(super) async fn holiday_query(&self, message: &str, entities: &Entities) -> ChatReply {
        let today = self.clock.today();

        if let HolidayQueryMode::Check(day) = holiday_query_mode(message, today) {
            let filter = HolidayFilter {
                range: Some(DateRange::single(day)),
                ..Default::default()
            };
            return match with_timeout(self.timeout(), self.holidays.holidays(&filter)).await {
                Ok(found) => match found.first() {
                    Some(holiday) => ChatReply::text(
                        format!(
                            "✅ Yes, {} is a company holiday: **{}**{}.",
                            format_human_readable(day),
                            holiday.name,
                            if holiday.optional { " (optional)" } else { "" }
                        ),
                        ReplyIntent::HolidayCheck,
                    ),
                    None => ChatReply::text(
                        format!("❌ No, {} is not a company holiday.", format_human_readable(day)),
                        ReplyIntent::HolidayCheck,
                    ),
                },
                Err(e) => {
                    error!(error = %e, "Holiday lookup failed");
                    ChatReply::text(HOLIDAYS_UNAVAILABLE, ReplyIntent::Error)
                }
            };
        }

        let (filter, scope) = holiday_scope(entities, today);
        let holidays = match with_timeout(self.timeout(), self.holidays.holidays(&filter)).await {
            Ok(holidays) => holidays,
            Err(e) => {
                error!(error = %e, "Holiday lookup failed");
                return ChatReply::text(HOLIDAYS_UNAVAILABLE, ReplyIntent::Error);
            }
        };

        if holiday_query_mode(message, today) == HolidayQueryMode::Count {
            let reply = match holidays.len() {
                1 => format!("📅 There is **1** company holiday {scope}."),
                n => format!("📅 There are **{n}** company holidays {scope}."),
            };
            return ChatReply::text(reply, ReplyIntent::HolidayCount);
        }

        if holidays.is_empty() {
            return ChatReply::text(
                format!("🗓️ There are no company holidays {scope}."),
                ReplyIntent::HolidayList,
            );
        }
        let lines: Vec<String> = holidays.iter().map(holiday_line).collect();
        ChatReply::text(
            format!("🗓️ **Company Holidays {scope}:**\n\n{}", lines.join("\n")),
            ReplyIntent::HolidayList,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parental_leave_follows_gender() {
        assert!(visible_to(LeaveType::Maternity, Some(Gender::Female)));
        assert!(!visible_to(LeaveType::Maternity, Some(Gender::Male)));
        assert!(!visible_to(LeaveType::Paternity, None));
        assert!(visible_to(LeaveType::Casual, None));
    }

    #[test]
    fn test_holiday_scope_defaults_to_current_year() {
        let (filter, scope) = holiday_scope(&Entities::default(), date(2026, 3, 2));
        assert_eq!(filter.year, Some(2026));
        assert_eq!(scope, "in 2026");

        let march = Entities {
            month: Some(3),
            ..Default::default()
        };
        let (filter, scope) = holiday_scope(&march, date(2026, 3, 2));
        assert_eq!(filter.month, Some(3));
        assert_eq!(scope, "in March 2026");
    }
}
