//! Calendar metadata for day ids.

use chrono::{Datelike, Duration, Month, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar metadata derived from a `YYYYMMDD` day id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInfo {
    /// Full English weekday name, e.g. "Monday".
    pub day_of_week: String,
    /// Full English month name, e.g. "January".
    pub month_name: String,
    /// ISO 8601 week number.
    pub week_of_year: u32,
    pub is_weekend: bool,
    /// Reserved, always false.
    pub is_market_holiday: bool,
}

/// Splits a day id into `(year, month, day)` without validation.
pub const fn split_date_id(date_id: i32) -> (i32, i32, i32) {
    (date_id / 10_000, (date_id / 100) % 100, date_id % 100)
}

/// Resolves a day id to a calendar date.
///
/// Month and day overflow the way calendar arithmetic does: month 13 is
/// January of the following year and day 0 is the last day of the previous
/// month. Returns `None` only outside chrono's supported range.
pub fn resolve_date(date_id: i32) -> Option<NaiveDate> {
    let (year, month, day) = split_date_id(date_id);
    let total_months = i64::from(year) * 12 + i64::from(month) - 1;
    let year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let month = u32::try_from(total_months.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_add_signed(Duration::days(i64::from(day) - 1))
}

/// Computes calendar metadata for a day id, interpreted at UTC midnight.
pub fn enrich(date_id: i32) -> DateInfo {
    let date = resolve_date(date_id).unwrap_or_default();
    let weekday = date.weekday();
    let month_name = u8::try_from(date.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map_or("", |m| m.name());

    DateInfo {
        day_of_week: weekday_name(weekday).to_string(),
        month_name: month_name.to_string(),
        week_of_year: date.iso_week().week(),
        is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
        is_market_holiday: false,
    }
}

const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
