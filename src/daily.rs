use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Deref,
    path::Path,
};

/// Day names, Sunday first
pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Serialize)]
struct DailyRecord {
    date: String,
    value: f64,
}

/// Daily totals statistics over a calendar year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearStats {
    pub days: usize,
    pub total: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
impl YearStats {
    fn new(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let total = values.iter().sum::<f64>();
        let mean = total / n;
        let std = (values
            .iter()
            .map(|x| x - mean)
            .fold(0f64, |s, x| s + x * x)
            / n)
            .sqrt();
        Self {
            days: values.len(),
            total,
            mean,
            std,
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Daily consumption totals
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DailyUsage(BTreeMap<NaiveDate, f64>);
impl Deref for DailyUsage {
    type Target = BTreeMap<NaiveDate, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<BTreeMap<NaiveDate, f64>> for DailyUsage {
    fn from(days: BTreeMap<NaiveDate, f64>) -> Self {
        Self(days)
    }
}
impl FromIterator<(NaiveDate, f64)> for DailyUsage {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl DailyUsage {
    /// Keeps only the days with a strictly positive total
    pub fn positive(self) -> Self {
        let n = self.len();
        let days: BTreeMap<_, _> = self.0.into_iter().filter(|(_, v)| *v > 0f64).collect();
        log::debug!("dropped {} days without consumption", n - days.len());
        Self(days)
    }
    /// Calendar years with at least one day, in ascending order
    pub fn years(&self) -> Vec<i32> {
        self.keys()
            .map(|date| date.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
    /// Days in `[from, to)`
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.0
            .range(from..to.max(from))
            .map(|(date, value)| (*date, *value))
    }
    /// Days of calendar `year`
    pub fn year(&self, year: i32) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        NaiveDate::from_ymd_opt(year, 1, 1)
            .zip(NaiveDate::from_ymd_opt(year + 1, 1, 1))
            .into_iter()
            .flat_map(move |(from, to)| self.between(from, to))
    }
    /// Per year statistics of the daily totals
    pub fn stats(&self) -> BTreeMap<i32, YearStats> {
        self.years()
            .into_iter()
            .map(|year| {
                let values: Vec<f64> = self.year(year).map(|(_, v)| v).collect();
                (year, YearStats::new(&values))
            })
            .collect()
    }
    /// Mean daily total for each day of the week, Sunday first
    pub fn weekday_means(&self) -> [Option<f64>; 7] {
        let mut sums = [(0f64, 0usize); 7];
        for (date, value) in self.iter() {
            let sum = &mut sums[date.weekday().num_days_from_sunday() as usize];
            sum.0 += value;
            sum.1 += 1;
        }
        sums.map(|(sum, n)| if n > 0 { Some(sum / n as f64) } else { None })
    }
    /// Print out a daily totals summary
    pub fn summary(&self) {
        println!("SUMMARY:");
        println!(" - # of days: {}", self.len());
        let (Some((first, _)), Some((last, _))) = (self.first_key_value(), self.last_key_value())
        else {
            return;
        };
        println!(" - date range: [{} - {}]", first, last);
        println!(" - daily totals [kWh]:");
        println!(
            "    {:^6}: {:>5} {:>10}  ({:^10}, {:^10})  ({:^10}, {:^10})",
            "YEAR", "DAYS", "TOTAL", "MEAN", "STD", "MIN", "MAX"
        );
        for (year, stats) in self.stats() {
            println!(
                "  - {:6}: {:>5} {:>10.1}  ({:>10.3}, {:>10.3})  ({:>10.3}, {:>10.3})",
                year, stats.days, stats.total, stats.mean, stats.std, stats.min, stats.max
            );
        }
        println!(" - weekday means [kWh]:");
        for (day, mean) in WEEKDAYS.iter().zip(self.weekday_means()) {
            match mean {
                Some(mean) => println!("  - {:6}: {:>10.3}", day, mean),
                None => println!("  - {:6}: {:?}", day, None::<f64>),
            }
        }
    }
    /// Writes the daily totals to a CSV file with a `Date` and a `value_column` column
    pub fn to_csv<P: AsRef<Path>>(&self, path: P, value_column: &str) -> crate::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())?;
        wtr.write_record(["Date", value_column])?;
        for (date, value) in self.iter() {
            wtr.serialize(DailyRecord {
                date: date.format("%Y-%m-%d").to_string(),
                value: *value,
            })?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        log::info!("daily totals written to {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> DailyUsage {
        [
            (date(2023, 12, 30), 4.),
            (date(2023, 12, 31), 0.),
            (date(2024, 1, 1), 2.),
            (date(2024, 1, 2), 6.),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn positive_drops_zero_days() {
        let daily = sample().positive();
        assert_eq!(daily.len(), 3);
        assert!(!daily.contains_key(&date(2023, 12, 31)));
    }

    #[test]
    fn years() {
        assert_eq!(sample().years(), vec![2023, 2024]);
    }

    #[test]
    fn year_and_between() {
        let daily = sample();
        let y2024: Vec<_> = daily.year(2024).collect();
        assert_eq!(y2024, vec![(date(2024, 1, 1), 2.), (date(2024, 1, 2), 6.)]);
        assert_eq!(daily.between(date(2023, 12, 31), date(2024, 1, 2)).count(), 2);
        assert_eq!(daily.between(date(2024, 1, 2), date(2023, 12, 31)).count(), 0);
    }

    #[test]
    fn stats_per_year() {
        let stats = sample().stats();
        let y2024 = stats[&2024];
        assert_eq!(y2024.days, 2);
        assert_eq!(y2024.total, 8.);
        assert_eq!(y2024.mean, 4.);
        assert_eq!(y2024.std, 2.);
        assert_eq!((y2024.min, y2024.max), (2., 6.));
    }

    #[test]
    fn weekday_means() {
        // 2023-12-30 is a Saturday, 2023-12-31 a Sunday and 2024-01-01 a Monday
        let means = sample().weekday_means();
        assert_eq!(means[6], Some(4.));
        assert_eq!(means[0], Some(0.));
        assert_eq!(means[1], Some(2.));
        assert_eq!(means[2], Some(6.));
        assert_eq!(means[3], None);
    }

    #[test]
    fn csv_export() {
        let path = std::env::temp_dir().join(format!("meter-charts-daily-{}.csv", std::process::id()));
        sample().to_csv(&path, "Inflow (kWh)").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Date,Inflow (kWh)"));
        assert_eq!(lines.next(), Some("2023-12-30,4.0"));
        assert_eq!(contents.lines().count(), 5);
    }
}
