//! # Due-Date Scheduling
//!
//! Deadline arithmetic for remediation and delivery due dates. Two
//! flavors exist in the regulation: plain calendar days and business
//! days (Mon–Fri, weekends skipped; holidays are not modeled — the
//! coordination office adjusts those by hand).

use chrono::Weekday;

use tdg_core::Timestamp;

/// Due date a fixed number of calendar days from `start`.
pub fn calendar_days_from(start: Timestamp, days: u32) -> Timestamp {
    start.plus_days(days)
}

/// Due date `days` business days from `start`, counting Mon–Fri only.
///
/// Advances one calendar day at a time; the nth qualifying day is the
/// due date. The start day itself never counts, whatever its weekday.
pub fn business_days_from(start: Timestamp, days: u32) -> Timestamp {
    let mut current = start;
    let mut counted = 0;
    while counted < days {
        current = current.plus_days(1);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            counted += 1;
        }
    }
    current
}
