//! Consumption charts

use crate::{
    align::{self, Alignment, ALIGNED_DAYS},
    DailyUsage, Resolution,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use plotters::{coord::Shift, prelude::*};
use std::{
    ops::Range,
    path::{Path, PathBuf},
};
use strum_macros::{Display, EnumIter, EnumString};

mod axis;
pub use axis::DayAxis;

#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("No consumption to plot")]
    Empty,
    #[error("The {0} chart cannot be drawn from resampled intervals")]
    Unsupported(ChartKind),
    #[error("Failed to draw the chart: {0}")]
    Drawing(String),
}
type Result<T> = std::result::Result<T, ChartError>;

fn drawing<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Most labelled ticks on the x axis
const MAX_MAJOR_TICKS: usize = 16;

/// Chart layouts
#[derive(EnumIter, EnumString, Display, Clone, Copy, PartialEq, Debug)]
#[strum(serialize_all = "lowercase")]
pub enum ChartKind {
    /// Years overlaid on a Sunday aligned day axis
    Weekday,
    /// Years overlaid on their day of year
    Calendar,
    /// The whole record on a continuous date axis
    Timeline,
}
impl ChartKind {
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Weekday => "Electricity Usage: Weekday Aligned (Sunday Start)",
            ChartKind::Calendar => "Electricity Usage: Year over Year",
            ChartKind::Timeline => "Electricity Usage",
        }
    }
    pub fn x_desc(&self) -> &'static str {
        match self {
            ChartKind::Weekday => "4-Week Periods",
            ChartKind::Calendar => "Day of Year",
            ChartKind::Timeline => "Date",
        }
    }
}

/// A line of the chart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    /// points drawn faintly ahead of the line
    pub lead_in: Vec<(f64, f64)>,
    pub points: Vec<(f64, f64)>,
    /// draw a circle at each point
    pub markers: bool,
}

/// Everything that goes into a chart, in data coordinates
#[derive(Debug, Clone)]
pub struct Layers {
    pub axis: DayAxis,
    pub y_range: Range<f64>,
    /// centers of the 1 day wide weekend bands
    pub bands: Vec<f64>,
    pub series: Vec<Series>,
}
impl Layers {
    /// Value range from 0, or the smallest value if negative, to 5% above the largest value
    fn y_range(series: &[Series]) -> Range<f64> {
        let (min, max) = series
            .iter()
            .flat_map(|s| s.lead_in.iter().chain(s.points.iter()))
            .fold((0f64, f64::NEG_INFINITY), |(min, max), (_, y)| {
                (min.min(*y), max.max(*y))
            });
        let max = if max > 0f64 { max * 1.05 } else { 1f64 };
        min..max
    }
    fn overlay(daily: &DailyUsage, alignment: Alignment) -> Result<Vec<Series>> {
        let to_xy = |points: Vec<(i64, f64)>| -> Vec<(f64, f64)> {
            points.into_iter().map(|(x, y)| (x as f64, y)).collect()
        };
        let series: Vec<_> = align::align(daily, alignment)
            .into_iter()
            .map(|year| Series {
                label: Some(format!("Year {}", year.year)),
                lead_in: to_xy(year.lead_in),
                points: to_xy(year.days),
                markers: true,
            })
            .collect();
        if series.is_empty() {
            Err(ChartError::Empty)
        } else {
            Ok(series)
        }
    }
    /// Years overlaid on the Sunday aligned axis with weekends highlighted
    pub fn weekday(daily: &DailyUsage) -> Result<Self> {
        let series = Self::overlay(daily, Alignment::Weekday)?;
        Ok(Self {
            axis: DayAxis::new(-1f64..ALIGNED_DAYS as f64)
                .major_ticks(align::week_ticks())
                .minor_step(0, 7),
            y_range: Self::y_range(&series),
            bands: align::weekend_days().map(|day| day as f64).collect(),
            series,
        })
    }
    /// Years overlaid on the day of year axis
    pub fn calendar(daily: &DailyUsage) -> Result<Self> {
        let series = Self::overlay(daily, Alignment::Calendar)?;
        Ok(Self {
            axis: DayAxis::new(-1f64..367f64).major_ticks(align::month_ticks()),
            y_range: Self::y_range(&series),
            bands: Vec::new(),
            series,
        })
    }
    /// Consumption along a continuous date axis with weekends highlighted
    ///
    /// The x coordinate is the number of days since midnight of the first point.
    /// Daily totals are centered on their day, finer resolutions span it.
    pub fn timeline(points: &[(NaiveDateTime, f64)], resolution: Resolution) -> Result<Self> {
        let (Some(first), Some(last)) = (
            points.iter().map(|(t, _)| *t).min(),
            points.iter().map(|(t, _)| *t).max(),
        ) else {
            return Err(ChartError::Empty);
        };
        let origin = first.date();
        let days = |time: NaiveDateTime| -> f64 {
            (time - origin.and_time(Default::default())).num_seconds() as f64 / 86_400f64
        };
        let offset = if resolution == Resolution::Daily { 0f64 } else { 0.5 };
        let n_days = (last.date() - origin).num_days();

        let bands: Vec<f64> = (0..=n_days)
            .map(|day| origin + Duration::days(day))
            .filter(|date| align::is_weekend(*date))
            .map(|date| (date - origin).num_days() as f64 + offset)
            .collect();

        let month_starts: Vec<NaiveDate> = (0..=n_days)
            .map(|day| origin + Duration::days(day))
            .filter(|date| date.day() == 1)
            .collect();
        let step = (month_starts.len() + MAX_MAJOR_TICKS - 1) / MAX_MAJOR_TICKS;
        let ticks = month_starts
            .into_iter()
            .step_by(step.max(1))
            .map(|date| ((date - origin).num_days(), date.format("%Y-%m").to_string()));
        // minor grid on Sundays
        let sunday = align::sunday_anchor(origin.year())
            .map(|anchor| (anchor - origin).num_days())
            .unwrap_or_default();

        let series = vec![Series {
            label: None,
            lead_in: Vec::new(),
            points: points.iter().map(|(t, v)| (days(*t), *v)).collect(),
            markers: false,
        }];
        Ok(Self {
            axis: DayAxis::new(-1f64..(n_days + 2) as f64)
                .major_ticks(ticks)
                .minor_step(sunday, 7),
            y_range: Self::y_range(&series),
            bands,
            series,
        })
    }
}

/// Chart renderer
///
/// The image format follows the file extension: SVG for `.svg`, bitmap otherwise.
pub struct Chart {
    kind: ChartKind,
    title: Option<String>,
    size: (u32, u32),
    filename: Option<PathBuf>,
    y_desc: String,
}
impl Chart {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            title: None,
            size: (1600, 800),
            filename: None,
            y_desc: String::from(crate::UsageLoader::VALUE_COLUMN),
        }
    }
    pub fn title<S: Into<String>>(self, title: S) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }
    /// Image size in pixels
    pub fn size(self, size: (u32, u32)) -> Self {
        Self { size, ..self }
    }
    pub fn filename<P: AsRef<Path>>(self, filename: P) -> Self {
        Self {
            filename: Some(filename.as_ref().to_path_buf()),
            ..self
        }
    }
    pub fn y_desc<S: Into<String>>(self, y_desc: S) -> Self {
        Self {
            y_desc: y_desc.into(),
            ..self
        }
    }
    /// Output file, `<kind>.png` by default
    pub fn path(&self) -> PathBuf {
        self.filename
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.png", self.kind)))
    }
    /// Draws the daily totals
    pub fn draw(&self, daily: &DailyUsage) -> Result<PathBuf> {
        let layers = match self.kind {
            ChartKind::Weekday => Layers::weekday(daily)?,
            ChartKind::Calendar => Layers::calendar(daily)?,
            ChartKind::Timeline => {
                let points: Vec<_> = daily
                    .iter()
                    .map(|(date, value)| (date.and_time(Default::default()), *value))
                    .collect();
                Layers::timeline(&points, Resolution::Daily)?
            }
        };
        self.save(layers)
    }
    /// Draws a timeline of consumption resampled at `resolution`
    pub fn draw_resampled(
        &self,
        points: &[(NaiveDateTime, f64)],
        resolution: Resolution,
    ) -> Result<PathBuf> {
        if self.kind != ChartKind::Timeline {
            return Err(ChartError::Unsupported(self.kind));
        }
        self.save(Layers::timeline(points, resolution)?)
    }
    fn save(&self, layers: Layers) -> Result<PathBuf> {
        let path = self.path();
        log::info!("Drawing {} chart to {:?}", self.kind, path);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("svg") => self.render(SVGBackend::new(&path, self.size).into_drawing_area(), layers)?,
            _ => self.render(BitMapBackend::new(&path, self.size).into_drawing_area(), layers)?,
        }
        Ok(path)
    }
    fn render<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>, layers: Layers) -> Result<()> {
        let Layers {
            axis,
            y_range,
            bands,
            series,
        } = layers;
        root.fill(&WHITE).map_err(drawing)?;

        let labels = axis.clone();
        let x_label_formatter = |x: &f64| labels.label(*x);
        let title = self.title.as_deref().unwrap_or(self.kind.title());
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 60)
            .margin(20)
            .build_cartesian_2d(axis, y_range.clone())
            .map_err(drawing)?;
        chart
            .configure_mesh()
            .x_labels(MAX_MAJOR_TICKS)
            .max_light_lines(10)
            .x_label_formatter(&x_label_formatter)
            .light_line_style(BLACK.mix(0.05))
            .x_desc(self.kind.x_desc())
            .y_desc(&self.y_desc)
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(bands.iter().map(|&x| {
                Rectangle::new(
                    [(x - 0.5, y_range.start), (x + 0.5, y_range.end)],
                    BLACK.mix(0.06).filled(),
                )
            }))
            .map_err(drawing)?;

        for (series, color) in series.iter().zip(colorous::TABLEAU10.iter().cycle()) {
            let rgb = RGBColor(color.r, color.g, color.b);
            if !series.lead_in.is_empty() {
                let faint = rgb.mix(0.4);
                chart
                    .draw_series(LineSeries::new(
                        series.lead_in.iter().copied(),
                        faint.stroke_width(2),
                    ))
                    .map_err(drawing)?;
                chart
                    .draw_series(
                        series
                            .lead_in
                            .iter()
                            .map(|&xy| Circle::new(xy, 2, faint.filled())),
                    )
                    .map_err(drawing)?;
            }
            let line = chart
                .draw_series(LineSeries::new(
                    series.points.iter().copied(),
                    rgb.stroke_width(2),
                ))
                .map_err(drawing)?;
            if let Some(label) = &series.label {
                line.label(label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
            }
            if series.markers {
                chart
                    .draw_series(
                        series
                            .points
                            .iter()
                            .map(|&xy| Circle::new(xy, 4, rgb.filled())),
                    )
                    .map_err(drawing)?;
            }
        }
        if series.iter().any(|s| s.label.is_some()) {
            chart
                .configure_series_labels()
                .border_style(&BLACK)
                .background_style(&WHITE.mix(0.8))
                .position(SeriesLabelPosition::UpperLeft)
                .draw()
                .map_err(drawing)?;
        }
        root.present().map_err(drawing)?;
        Ok(())
    }
}
