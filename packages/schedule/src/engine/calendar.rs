//! Business-Day Calendar
//!
//! Date arithmetic over a Monday-to-Friday working week. Saturdays and
//! Sundays are never counted and never landed on; holiday calendars are an
//! explicit non-goal.
//!
//! Durations in this crate are *inclusive* counts of both endpoints: a task
//! occupying Monday through Wednesday has a duration of 3, and its end date
//! is `add_business_days(start, duration - 1)`.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::engine::error::CalendarError;

/// Whether the date falls on a working weekday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Return the date `n` business days away from `start`, skipping weekends.
///
/// `n = 0` is the identity, even when `start` itself falls on a weekend.
/// Negative `n` walks backward (needed for negative dependency lag).
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use sitebuild_schedule::add_business_days;
///
/// let fri = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// let mon = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// assert_eq!(add_business_days(fri, 1), mon);
/// assert_eq!(add_business_days(mon, -1), fri);
/// assert_eq!(add_business_days(fri, 0), fri);
/// ```
pub fn add_business_days(start: NaiveDate, n: i64) -> NaiveDate {
    let mut date = start;
    let mut remaining = n.unsigned_abs();
    let forward = n >= 0;

    while remaining > 0 {
        date = if forward {
            date + Days::new(1)
        } else {
            date - Days::new(1)
        };
        if is_business_day(date) {
            remaining -= 1;
        }
    }
    date
}

/// Inclusive count of weekdays between two dates.
///
/// `end >= start` is required; a backwards range is a validation error,
/// never a negative number.
///
/// # Errors
///
/// Returns [`CalendarError::EndBeforeStart`] when `end < start`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> Result<i64, CalendarError> {
    if end < start {
        return Err(CalendarError::EndBeforeStart { start, end });
    }

    let mut count = 0;
    let mut date = start;
    while date <= end {
        if is_business_day(date) {
            count += 1;
        }
        date = date + Days::new(1);
    }
    Ok(count)
}
