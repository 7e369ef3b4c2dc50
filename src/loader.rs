use crate::{Interval, Usage};
use chrono::{NaiveDate, NaiveDateTime};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashSet},
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    time::Instant,
};

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {1:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("Failed to parse the CSV file {1:?}")]
    Csv(#[source] csv::Error, PathBuf),
    #[error("Invalid file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("Failed to list the CSV files")]
    Glob(#[from] glob::GlobError),
    #[error("No file matching {0:?}")]
    NoFiles(Vec<String>),
    #[error("Column {column:?} not found in {path:?}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("Invalid timestamp {value:?} in {path:?} at line {line}")]
    Timestamp {
        value: String,
        path: PathBuf,
        line: u64,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Missing decompression protocol for {0:?}")]
    Decompression(PathBuf),
}
type Result<T> = std::result::Result<T, LoaderError>;

/// A CSV row: all its fields and the reading it holds
type Row = (Vec<String>, Interval);

/// Meter export loader
///
/// Loads and merges all the CSV exports matching the file patterns:
/// ```no_run
/// use meter_charts::UsageLoader;
///
/// let usage = UsageLoader::default()
///     .data_path("exports")
///     .file_pattern("consumption-*.csv")
///     .load()
///     .unwrap();
/// ```
pub struct UsageLoader {
    data_path: PathBuf,
    patterns: Vec<String>,
    time_column: String,
    value_column: String,
    time_format: String,
    date_range: (Option<NaiveDate>, Option<NaiveDate>),
}
impl Default for UsageLoader {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            patterns: Vec::new(),
            time_column: String::from(Self::TIME_COLUMN),
            value_column: String::from(Self::VALUE_COLUMN),
            time_format: String::from(Self::TIME_FORMAT),
            date_range: (None, None),
        }
    }
}
impl UsageLoader {
    pub const FILE_PATTERN: &'static str = "*.csv";
    pub const TIME_COLUMN: &'static str = "Interval Start Date/Time";
    pub const VALUE_COLUMN: &'static str = "Inflow (kWh)";
    pub const TIME_FORMAT: &'static str = "%Y-%m-%d %H:%M";

    /// Directory the relative file patterns are resolved against
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Adds a glob pattern of CSV exports
    pub fn file_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.patterns.push(pattern.into());
        self
    }
    pub fn file_patterns<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        patterns
            .into_iter()
            .fold(self, |loader, pattern| loader.file_pattern(pattern))
    }
    pub fn time_column<S: Into<String>>(self, time_column: S) -> Self {
        Self {
            time_column: time_column.into(),
            ..self
        }
    }
    pub fn value_column<S: Into<String>>(self, value_column: S) -> Self {
        Self {
            value_column: value_column.into(),
            ..self
        }
    }
    /// Timestamp format, see [chrono::format::strftime]
    pub fn time_format<S: Into<String>>(self, time_format: S) -> Self {
        Self {
            time_format: time_format.into(),
            ..self
        }
    }
    /// First day to load
    pub fn start_date(self, date: NaiveDate) -> Self {
        Self {
            date_range: (Some(date), self.date_range.1),
            ..self
        }
    }
    /// Last day to load
    pub fn end_date(self, date: NaiveDate) -> Self {
        Self {
            date_range: (self.date_range.0, Some(date)),
            ..self
        }
    }
    fn patterns(&self) -> Vec<String> {
        if self.patterns.is_empty() {
            vec![Self::FILE_PATTERN.to_string()]
        } else {
            self.patterns.clone()
        }
    }
    /// Sorted paths of the files matching the patterns
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let patterns = self.patterns();
        let mut paths = BTreeSet::new();
        for pattern in &patterns {
            let pattern = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                self.data_path.join(pattern).to_string_lossy().into_owned()
            };
            for entry in glob::glob(&pattern)? {
                paths.insert(entry?);
            }
        }
        if paths.is_empty() {
            return Err(LoaderError::NoFiles(patterns));
        }
        Ok(paths.into_iter().collect())
    }
    fn decompress(path: &Path) -> Result<String> {
        let mut contents = String::new();
        let file = File::open(path).map_err(|e| LoaderError::Io(e, path.to_path_buf()))?;
        log::debug!("Reading {:?}...", path);
        let mut reader: Box<dyn Read> = match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Box::new(flate2::read::GzDecoder::new(file)),
            #[cfg(feature = "bzip2")]
            Some("bz2") => Box::new(bzip2::bufread::BzDecoder::new(BufReader::new(file))),
            #[cfg(not(feature = "bzip2"))]
            Some("bz2") => return Err(LoaderError::Decompression(path.to_path_buf())),
            _ => Box::new(BufReader::new(file)),
        };
        reader
            .read_to_string(&mut contents)
            .map_err(|e| LoaderError::Io(e, path.to_path_buf()))?;
        Ok(contents)
    }
    fn column(&self, headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| LoaderError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    }
    fn in_range(&self, time: &NaiveDateTime) -> bool {
        let date = time.date();
        self.date_range.0.map_or(true, |start| date >= start)
            && self.date_range.1.map_or(true, |end| date <= end)
    }
    /// Parses the CSV `contents` read from `path`
    fn rows(&self, contents: &str, path: &Path) -> Result<Vec<Row>> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(contents.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| LoaderError::Csv(e, path.to_path_buf()))?
            .clone();
        let time_idx = self.column(&headers, &self.time_column, path)?;
        let value_idx = self.column(&headers, &self.value_column, path)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| LoaderError::Csv(e, path.to_path_buf()))?;
            let field = record.get(time_idx).unwrap_or_default().trim();
            let start = NaiveDateTime::parse_from_str(field, &self.time_format).map_err(|source| {
                LoaderError::Timestamp {
                    value: field.to_string(),
                    path: path.to_path_buf(),
                    line: record.position().map_or(0, |p| p.line()),
                    source,
                }
            })?;
            if !self.in_range(&start) {
                continue;
            }
            let value = record
                .get(value_idx)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite());
            if value.is_none() {
                log::debug!("{:?}: no consumption at {}", path, start);
            }
            rows.push((
                record.iter().map(|f| f.to_string()).collect(),
                Interval::new(start, value),
            ));
        }
        Ok(rows)
    }
    fn read(&self, path: &Path) -> Result<Vec<Row>> {
        let contents = Self::decompress(path)?;
        self.rows(&contents, path)
    }
    /// Drops the rows identical to a previous one
    fn merge<I: IntoIterator<Item = Row>>(rows: I) -> Vec<Interval> {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter_map(|(fields, interval)| seen.insert(fields).then_some(interval))
            .collect()
    }
    /// Loads all the CSV exports
    pub fn load(self) -> Result<Usage> {
        let now = Instant::now();
        let paths = self.paths()?;
        let n_files = paths.len();
        log::info!("Loading {} CSV file(s)...", n_files);
        let pb = if n_files > 1 {
            ProgressBar::new(n_files as u64)
        } else {
            ProgressBar::hidden()
        };
        let tables = paths
            .par_iter()
            .progress_with(pb)
            .map(|path| self.read(path))
            .collect::<Result<Vec<_>>>()?;
        let n_rows: usize = tables.iter().map(|rows| rows.len()).sum();
        let intervals = Self::merge(tables.into_iter().flatten());
        log::info!(
            "... loaded {} intervals ({} duplicates dropped) in {:}ms",
            intervals.len(),
            n_rows - intervals.len(),
            now.elapsed().as_millis()
        );
        Ok(Usage::new(intervals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    const HEADER: &str = "Account Number,Interval Start Date/Time,Inflow (kWh),Outflow (kWh)";

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("meter-charts-{}-{}", name, std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, name: &str, rows: &[&str]) {
        let mut contents = vec![HEADER];
        contents.extend_from_slice(rows);
        std::fs::write(dir.join(name), contents.join("\n")).unwrap();
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parse_rows() {
        let contents = format!(
            "{}\n123,2024-01-01 00:00,0.5,0\n123, 2024-01-01 01:00 ,N/A,0\n",
            HEADER
        );
        let rows = UsageLoader::default()
            .rows(&contents, Path::new("inline.csv"))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, Interval::new(at(2024, 1, 1, 0, 0), Some(0.5)));
        assert_eq!(rows[1].1, Interval::new(at(2024, 1, 1, 1, 0), None));
    }

    #[test]
    fn missing_column() {
        let contents = "Date,kWh\n2024-01-01 00:00,1\n";
        let err = UsageLoader::default()
            .rows(contents, Path::new("inline.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { ref column, .. } if column == "Interval Start Date/Time"));
    }

    #[test]
    fn invalid_timestamp() {
        let contents = format!("{}\n123,2024-01-01 00:00,1,0\n123,01/02/2024,1,0\n", HEADER);
        let err = UsageLoader::default()
            .rows(&contents, Path::new("inline.csv"))
            .unwrap_err();
        match err {
            LoaderError::Timestamp { value, line, .. } => {
                assert_eq!(value, "01/02/2024");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn custom_columns() {
        let contents = "when, kwh\n2024/01/01T00:00,2\n";
        let rows = UsageLoader::default()
            .time_column("when")
            .value_column("kwh")
            .time_format("%Y/%m/%dT%H:%M")
            .rows(contents, Path::new("inline.csv"))
            .unwrap();
        assert_eq!(rows[0].1, Interval::new(at(2024, 1, 1, 0, 0), Some(2.)));
    }

    #[test]
    fn date_window() {
        let contents = format!(
            "{}\n1,2023-12-31 23:00,1,0\n1,2024-01-01 00:00,1,0\n1,2024-01-02 23:45,1,0\n1,2024-01-03 00:00,1,0\n",
            HEADER
        );
        let rows = UsageLoader::default()
            .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .end_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .rows(&contents, Path::new("inline.csv"))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn overlapping_exports_are_merged() {
        let dir = fixture_dir("overlap");
        write(
            &dir,
            "consumption-1.csv",
            &["1,2024-01-01 00:00,1,0", "1,2024-01-01 01:00,2,0"],
        );
        write(
            &dir,
            "consumption-2.csv",
            &[
                "1,2024-01-01 01:00,2,0",
                "1,2024-01-01 01:00,3,0",
                "1,2024-01-02 00:00,4,0",
            ],
        );
        let usage = UsageLoader::default()
            .data_path(&dir)
            .file_pattern("consumption-*.csv")
            .load()
            .unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        let values: Vec<_> = usage.iter().map(|i| i.value.unwrap()).collect();
        assert_eq!(values, vec![1., 2., 3., 4.]);
        let daily = usage.daily();
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()], 6.);
    }

    #[test]
    fn gzip_exports() {
        let dir = fixture_dir("gzip");
        let contents = format!("{}\n1,2024-02-01 00:00,1.5,0\n", HEADER);
        let mut gz = GzEncoder::new(
            File::create(dir.join("export.csv.gz")).unwrap(),
            Compression::default(),
        );
        gz.write_all(contents.as_bytes()).unwrap();
        gz.finish().unwrap();
        write(&dir, "export.csv", &["1,2024-02-02 00:00,2.5,0"]);
        let usage = UsageLoader::default()
            .data_path(&dir)
            .file_patterns(["*.csv", "*.csv.gz"])
            .load()
            .unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].value, Some(1.5));
    }

    #[cfg(feature = "bzip2")]
    #[test]
    fn bzip2_exports_and_overlapping_patterns() {
        use bzip2::write::BzEncoder;
        let dir = fixture_dir("bzip2");
        write(&dir, "a.csv", &["1,2024-03-01 00:00,1,0"]);
        let contents = format!("{}\n1,2024-03-02 00:00,2,0\n", HEADER);
        let mut bz = BzEncoder::new(
            File::create(dir.join("b.csv.bz2")).unwrap(),
            bzip2::Compression::default(),
        );
        bz.write_all(contents.as_bytes()).unwrap();
        bz.finish().unwrap();
        let loader = UsageLoader::default()
            .data_path(&dir)
            .file_patterns(["*.csv", "a.*", "*.bz2"]);
        // a.csv matches the first two patterns
        assert_eq!(loader.paths().unwrap().len(), 2);
        let usage = loader.load().unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        let values: Vec<_> = usage.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![Some(1.), Some(2.)]);
    }

    #[test]
    fn no_files() {
        let dir = fixture_dir("empty");
        let err = UsageLoader::default().data_path(&dir).load().unwrap_err();
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(err, LoaderError::NoFiles(ref patterns) if patterns == &["*.csv"]));
    }
}
