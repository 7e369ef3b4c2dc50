//! # meter-charts
//!
//! Electricity meter interval consumption exports merged into daily totals
//! and drawn as year over year, weekday aligned or timeline charts.
//!
//! ```no_run
//! use meter_charts::{plot::{Chart, ChartKind}, UsageLoader};
//!
//! let usage = UsageLoader::default()
//!     .file_pattern("consumption-*.csv")
//!     .load()?;
//! let daily = usage.daily().positive();
//! daily.summary();
//! Chart::new(ChartKind::Weekday).draw(&daily)?;
//! # Ok::<(), meter_charts::Error>(())
//! ```

pub mod align;
mod daily;
mod error;
mod interval;
mod loader;
#[cfg(feature = "plot")]
pub mod plot;

pub use daily::{DailyUsage, YearStats, WEEKDAYS};
pub use error::Error;
pub use interval::{Interval, Resolution, Usage};
pub use loader::{LoaderError, UsageLoader};

pub type Result<T> = std::result::Result<T, Error>;
