//! Mapping of calendar years onto a common day axis

use crate::DailyUsage;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Length of the weekday aligned axis: 54 weeks
pub const ALIGNED_DAYS: i64 = 378;
/// Major tick period of the weekday aligned axis: 4 weeks
pub const TICK_PERIOD: i64 = 28;
/// Number of major ticks, `W1` to `W53`
pub const N_TICKS: i64 = 14;

/// Sunday on or before January 1st of `year`
pub fn sunday_anchor(year: i32) -> Option<NaiveDate> {
    let first_day = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Some(first_day - Duration::days(first_day.weekday().num_days_from_sunday() as i64))
}

/// Number of days from `anchor` to `date`
pub fn relative_day(date: NaiveDate, anchor: NaiveDate) -> i64 {
    (date - anchor).num_days()
}

/// Saturdays and Sundays of the weekday aligned axis (day 0 is a Sunday)
pub fn is_weekend_day(relative_day: i64) -> bool {
    matches!(relative_day.rem_euclid(7), 0 | 6)
}

/// Weekend days of the weekday aligned axis
pub fn weekend_days() -> impl Iterator<Item = i64> {
    (0..ALIGNED_DAYS).filter(|&day| is_weekend_day(day))
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Major ticks of the weekday aligned axis: every 4 weeks from `W1` to `W53`
pub fn week_ticks() -> Vec<(i64, String)> {
    (0..N_TICKS)
        .map(|i| (i * TICK_PERIOD, format!("W{}", 4 * i + 1)))
        .collect()
}

/// Day of year of the first day of each month (non-leap year)
pub fn month_ticks() -> Vec<(i64, String)> {
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(2001, month, 1))
        .map(|date| (date.ordinal0() as i64, date.format("%b").to_string()))
        .collect()
}

/// Year overlay alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alignment {
    /// Day 0 is the Sunday on or before January 1st
    Weekday,
    /// Day 0 is January 1st
    Calendar,
}
impl Alignment {
    /// Day 0 of `year`
    pub fn anchor(&self, year: i32) -> Option<NaiveDate> {
        match self {
            Alignment::Weekday => sunday_anchor(year),
            Alignment::Calendar => NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }
}

/// Daily totals of a year on the aligned day axis
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedYear {
    pub year: i32,
    /// days of the previous year between the anchor and January 1st
    pub lead_in: Vec<(i64, f64)>,
    pub days: Vec<(i64, f64)>,
}

/// Aligns each year of `daily`, years without data are skipped
pub fn align(daily: &DailyUsage, alignment: Alignment) -> Vec<AlignedYear> {
    daily
        .years()
        .into_iter()
        .filter_map(|year| {
            let anchor = alignment.anchor(year)?;
            let first_day = NaiveDate::from_ymd_opt(year, 1, 1)?;
            let relative = |(date, value): (NaiveDate, f64)| (relative_day(date, anchor), value);
            let days: Vec<_> = daily.year(year).map(relative).collect();
            if days.is_empty() {
                return None;
            }
            let lead_in = daily.between(anchor, first_day).map(relative).collect();
            Some(AlignedYear {
                year,
                lead_in,
                days,
            })
        })
        .collect()
}
