use crate::DailyUsage;
use chrono::{Duration, NaiveDateTime, Timelike};
use std::{collections::BTreeMap, ops::Deref};
use strum_macros::{Display, EnumIter, EnumString};

/// Consumption sampling resolution
#[derive(EnumIter, EnumString, Display, Clone, Copy, PartialEq, Debug)]
#[strum(serialize_all = "lowercase")]
pub enum Resolution {
    /// Meter intervals as exported
    Interval,
    Hourly,
    Daily,
}
impl Resolution {
    /// Start of the bucket `time` falls into
    pub fn bucket(&self, time: NaiveDateTime) -> NaiveDateTime {
        match self {
            Resolution::Interval => time,
            Resolution::Hourly => time.date().and_hms_opt(time.hour(), 0, 0).unwrap_or(time),
            Resolution::Daily => time.date().and_hms_opt(0, 0, 0).unwrap_or(time),
        }
    }
    /// Bucket width, `None` for the raw intervals
    pub fn step(&self) -> Option<Duration> {
        match self {
            Resolution::Interval => None,
            Resolution::Hourly => Some(Duration::hours(1)),
            Resolution::Daily => Some(Duration::days(1)),
        }
    }
}

/// A meter reading
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// interval start time
    pub start: NaiveDateTime,
    /// consumption over the interval, `None` if the export field was not a number
    pub value: Option<f64>,
}
impl Interval {
    pub fn new(start: NaiveDateTime, value: Option<f64>) -> Self {
        Self { start, value }
    }
}

/// Time ordered meter readings
#[derive(Default, Debug, Clone)]
pub struct Usage {
    intervals: Vec<Interval>,
}
impl Deref for Usage {
    type Target = [Interval];

    fn deref(&self) -> &Self::Target {
        &self.intervals
    }
}
impl From<Vec<Interval>> for Usage {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::new(intervals)
    }
}
impl Usage {
    /// Sorts the readings by start time, readings with the same start time keep their order
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by_key(|interval| interval.start);
        Self { intervals }
    }
    pub fn len(&self) -> usize {
        self.intervals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// First and last interval start times
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.intervals.first()?.start, self.intervals.last()?.start))
    }
    /// Sums the readings per `resolution` bucket
    ///
    /// Every bucket between the first and the last one is returned,
    /// buckets without any reading are set to 0.
    /// Missing values are skipped and do not contribute to the sums.
    pub fn resample(&self, resolution: Resolution) -> Vec<(NaiveDateTime, f64)> {
        let Some(step) = resolution.step() else {
            return self
                .intervals
                .iter()
                .filter_map(|interval| interval.value.map(|value| (interval.start, value)))
                .collect();
        };
        let mut buckets: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for interval in &self.intervals {
            let sum = buckets
                .entry(resolution.bucket(interval.start))
                .or_insert(0f64);
            if let Some(value) = interval.value {
                *sum += value;
            }
        }
        if let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) {
            let mut time = first + step;
            while time < last {
                buckets.entry(time).or_insert(0f64);
                time += step;
            }
        }
        buckets.into_iter().collect()
    }
    /// Daily consumption totals
    pub fn daily(&self) -> DailyUsage {
        self.resample(Resolution::Daily)
            .into_iter()
            .map(|(time, value)| (time.date(), value))
            .collect::<BTreeMap<_, _>>()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn sorted_on_creation() {
        let usage = Usage::new(vec![
            Interval::new(at(2, 0, 0), Some(1.)),
            Interval::new(at(1, 0, 0), Some(2.)),
        ]);
        assert_eq!(usage[0].start, at(1, 0, 0));
        assert_eq!(usage.time_range(), Some((at(1, 0, 0), at(2, 0, 0))));
    }

    #[test]
    fn daily_sum_skips_missing_values() {
        let usage = Usage::new(vec![
            Interval::new(at(1, 0, 0), Some(0.5)),
            Interval::new(at(1, 12, 0), None),
            Interval::new(at(1, 23, 0), Some(1.25)),
            Interval::new(at(2, 1, 0), Some(2.)),
        ]);
        let daily = usage.resample(Resolution::Daily);
        assert_eq!(daily, vec![(at(1, 0, 0), 1.75), (at(2, 0, 0), 2.)]);
    }

    #[test]
    fn gaps_are_filled_with_zero() {
        let usage = Usage::new(vec![
            Interval::new(at(1, 10, 0), Some(1.)),
            Interval::new(at(4, 10, 0), Some(3.)),
        ]);
        let daily = usage.daily();
        assert_eq!(daily.len(), 4);
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()], 0.);
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()], 0.);
    }

    #[test]
    fn hourly_buckets() {
        let usage = Usage::new(vec![
            Interval::new(at(1, 10, 0), Some(1.)),
            Interval::new(at(1, 10, 15), Some(1.)),
            Interval::new(at(1, 12, 45), Some(0.5)),
        ]);
        let hourly = usage.resample(Resolution::Hourly);
        assert_eq!(
            hourly,
            vec![(at(1, 10, 0), 2.), (at(1, 11, 0), 0.), (at(1, 12, 0), 0.5)]
        );
    }

    #[test]
    fn raw_intervals_drop_missing_values() {
        let usage = Usage::new(vec![
            Interval::new(at(1, 10, 0), Some(1.)),
            Interval::new(at(1, 11, 0), None),
        ]);
        assert_eq!(usage.resample(Resolution::Interval), vec![(at(1, 10, 0), 1.)]);
    }

    #[test]
    fn resolution_from_str() {
        assert_eq!("hourly".parse::<Resolution>().unwrap(), Resolution::Hourly);
        assert_eq!(Resolution::Daily.to_string(), "daily");
    }

    #[test]
    fn empty_usage() {
        let usage = Usage::default();
        assert!(usage.is_empty());
        assert!(usage.resample(Resolution::Daily).is_empty());
        assert!(usage.daily().is_empty());
    }
}
