use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use std::ops::Range;

/// Day axis with explicit labelled (major) and grid only (minor) key points
#[derive(Debug, Clone)]
pub struct DayAxis {
    range: Range<f64>,
    major: Vec<(f64, String)>,
    minor: Vec<f64>,
}
impl DayAxis {
    pub fn new(range: Range<f64>) -> Self {
        Self {
            range,
            major: Vec::new(),
            minor: Vec::new(),
        }
    }
    fn contains(&self, x: f64) -> bool {
        x >= self.range.start && x <= self.range.end
    }
    /// Labelled ticks, ticks outside the axis range are discarded
    pub fn major_ticks<I>(mut self, ticks: I) -> Self
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        self.major = ticks
            .into_iter()
            .map(|(x, label)| (x as f64, label))
            .filter(|(x, _)| self.contains(*x))
            .collect();
        self
    }
    /// Grid lines every `step` days from `origin`
    pub fn minor_step(mut self, origin: i64, step: i64) -> Self {
        if step > 0 {
            let first = origin - (origin - self.range.start.ceil() as i64).div_euclid(step) * step;
            self.minor = (0..)
                .map(|i| (first + i * step) as f64)
                .take_while(|x| *x < self.range.end)
                .collect();
        }
        self
    }
    /// Label of the major tick at `x`, empty if there is none
    pub fn label(&self, x: f64) -> String {
        self.major
            .iter()
            .find(|(tick, _)| (tick - x).abs() < 1e-6)
            .map(|(_, label)| label.clone())
            .unwrap_or_default()
    }
    /// Major tick locations, at most `max` of them
    pub fn major_points(&self, max: usize) -> Vec<f64> {
        thin(self.major.iter().map(|(x, _)| *x).collect(), max)
    }
    /// Minor tick locations, at most `max` of them
    pub fn minor_points(&self, max: usize) -> Vec<f64> {
        thin(self.minor.clone(), max)
    }
}
/// Keeps every n-th point so that at most `max` remain
fn thin(points: Vec<f64>, max: usize) -> Vec<f64> {
    if max == 0 {
        return Vec::new();
    }
    let step = (points.len() + max - 1) / max;
    points.into_iter().step_by(step.max(1)).collect()
}
impl Ranged for DayAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let logic_length = (*value - self.range.start) / (self.range.end - self.range.start);
        let actual_length = limit.1 - limit.0;
        if actual_length == 0 {
            return limit.1;
        }
        limit.0 + (actual_length as f64 * logic_length + 1e-3).floor() as i32
    }
    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            self.minor_points(hint.max_num_points())
        } else {
            self.major_points(hint.max_num_points())
        }
    }
    fn range(&self) -> Range<f64> {
        self.range.clone()
    }
}
