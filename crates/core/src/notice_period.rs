//! Response window after the preliminary notice of revocation.
//!
//! The reassessment step opens on a summary of how many business days the
//! candidate has left to respond. Weekends do not count; holidays are not
//! modelled.

use chrono::{Datelike, Days, Weekday};
use serde::{Deserialize, Serialize};

use crate::completion::parse_business_days;
use crate::step_data::{StepData, StepRecord};
use crate::types::Date;

/// Time-remaining summary shown when step 4 is entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticePeriod {
    pub notice_date: Date,
    pub business_days: u32,
    /// Last day the candidate may respond.
    pub deadline: Date,
    pub business_days_remaining: u32,
    pub expired: bool,
}

fn is_business_day(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The date `days` business days after `start`.
///
/// Saturates at the last representable date.
pub fn add_business_days(start: Date, days: u32) -> Date {
    if days == 0 {
        return start;
    }
    // A weekend start counts from the Friday before it.
    let from_friday = match start.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    };
    let Some(start) = start.checked_sub_days(Days::new(from_friday)) else {
        return start;
    };
    let weekday = u64::from(start.weekday().num_days_from_monday());
    let weeks = u64::from(days / 5);
    let rest = u64::from(days % 5);
    let extra = if weekday + rest > 4 { rest + 2 } else { rest };
    start
        .checked_add_days(Days::new(weeks * 7 + extra))
        .unwrap_or(Date::MAX)
}

/// Business days in `(from, to]`; zero when `to` is not after `from`.
pub fn business_days_between(from: Date, to: Date) -> u32 {
    if to <= from {
        return 0;
    }
    let span = (to - from).num_days();
    let weeks = span / 7;
    let mut count = weeks * 5;
    let mut date = from + chrono::Duration::days(weeks * 7);
    while date < to {
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if is_business_day(date) {
            count += 1;
        }
    }
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Summarise the window opened by a completed step 3 record.
///
/// Returns `None` for any other step or when the window cannot be parsed.
pub fn notice_period(step3: &StepRecord, today: Date) -> Option<NoticePeriod> {
    let StepData::PreliminaryRevocation(notice) = &step3.step_data else {
        return None;
    };
    let business_days = parse_business_days(&notice.business_days)?;
    let notice_date = step3.completed_at.date_naive();
    let deadline = add_business_days(notice_date, business_days);

    Some(NoticePeriod {
        notice_date,
        business_days,
        deadline,
        business_days_remaining: business_days_between(today, deadline),
        expired: today > deadline,
    })
}
