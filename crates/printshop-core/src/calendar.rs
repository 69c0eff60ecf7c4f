//! Calendar-month helpers shared by the loan engine and the recurring
//! expense scheduler.
//!
//! Month addition clamps to the end of the target month:
//! `2024-01-31 + 1 month = 2024-02-29`.

use chrono::{Datelike, Months, NaiveDate};

/// Adds `months` calendar months, clamping the day to the target month's
/// length. Saturates at `NaiveDate::MAX`.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// First day of the given month, or `None` for an invalid month.
pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Last day of the given month, or `None` for an invalid month.
pub fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = first_of_month(year, month)?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
}

/// Whole calendar months from `from`'s month to `to`'s month, ignoring days.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month() as i64 - from.month() as i64)
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// English month name, empty for an out-of-range month.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize],
        _ => "",
    }
}
