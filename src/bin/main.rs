use chrono::NaiveDate;
use meter_charts::{
    plot::{Chart, ChartKind},
    Resolution, UsageLoader,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "meter-charts", about = "Electricity meter consumption charts")]
struct Opt {
    /// Glob patterns of the consumption CSV exports
    #[structopt(required = true)]
    patterns: Vec<String>,
    /// Interval start time column
    #[structopt(long, default_value = "Interval Start Date/Time")]
    time_column: String,
    /// Consumption column
    #[structopt(long, default_value = "Inflow (kWh)")]
    value_column: String,
    /// Interval start time format
    #[structopt(long, default_value = "%Y-%m-%d %H:%M")]
    time_format: String,
    /// First day (YYYY-MM-DD)
    #[structopt(short, long)]
    start: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD)
    #[structopt(short, long)]
    end: Option<NaiveDate>,
    /// Chart: weekday, calendar or timeline (repeat for several charts)
    #[structopt(short = "c", long = "chart", number_of_values = 1)]
    charts: Vec<ChartKind>,
    /// Timeline resolution: daily, hourly or interval
    #[structopt(short, long, default_value = "daily")]
    resolution: Resolution,
    /// Keep the days without consumption
    #[structopt(long)]
    keep_zero: bool,
    /// Charts directory
    #[structopt(short, long, parse(from_os_str), default_value = ".")]
    output: PathBuf,
    /// Charts image format: png or svg
    #[structopt(long, default_value = "png")]
    format: String,
    /// Charts width in pixels
    #[structopt(long, default_value = "1600")]
    width: u32,
    /// Charts height in pixels
    #[structopt(long, default_value = "800")]
    height: u32,
    /// Save the daily totals to CSV file
    #[structopt(long, parse(from_os_str))]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut loader = UsageLoader::default()
        .file_patterns(opt.patterns)
        .time_column(opt.time_column)
        .value_column(opt.value_column.as_str())
        .time_format(opt.time_format);
    if let Some(date) = opt.start {
        loader = loader.start_date(date);
    }
    if let Some(date) = opt.end {
        loader = loader.end_date(date);
    }

    let usage = loader.load()?;
    let mut daily = usage.daily();
    if !opt.keep_zero {
        daily = daily.positive();
    }
    daily.summary();

    if let Some(filename) = opt.csv {
        daily.to_csv(filename, &opt.value_column)?;
    }

    let charts = if opt.charts.is_empty() {
        vec![ChartKind::Weekday]
    } else {
        opt.charts
    };
    if opt.resolution != Resolution::Daily && !charts.contains(&ChartKind::Timeline) {
        log::warn!("the {} resolution only applies to the timeline chart", opt.resolution);
    }
    for kind in charts {
        let chart = Chart::new(kind)
            .size((opt.width, opt.height))
            .y_desc(opt.value_column.as_str())
            .filename(opt.output.join(format!("{}.{}", kind, opt.format)));
        let path = match (kind, opt.resolution) {
            (ChartKind::Timeline, Resolution::Daily) | (ChartKind::Weekday | ChartKind::Calendar, _) => {
                chart.draw(&daily)?
            }
            (ChartKind::Timeline, resolution) => {
                chart.draw_resampled(&usage.resample(resolution), resolution)?
            }
        };
        println!("{} chart written to {:?}", kind, path);
    }

    Ok(())
}
