//! Historical price series: per-ticker sources and a date-aligned frame.
//!
//! A [`PriceSeriesProvider`] yields one series per identifier. The default
//! provider reads `<dir>/<ID>.csv` files with a `Date` column and an
//! adjusted-close column. [`PriceFrame::compile`] aligns any number of series
//! on the union of their dates, leaving gaps where a series has no value.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// Header of the date column in price files.
pub const DATE_COLUMN: &str = "Date";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// One identifier's values by date. `None` marks a recorded gap.
pub type PriceSeries = BTreeMap<NaiveDate, Option<f64>>;

/// Source of price history for a single identifier.
pub trait PriceSeriesProvider {
    fn series(&self, id: &str) -> Result<PriceSeries>;
}

// ============================================================================
// CSV directory
// ============================================================================

/// Reads `<dir>/<ID>.csv` for each requested identifier.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
    column: String,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            column: "Adj Close".into(),
        }
    }

    /// Read values from `column` instead of `Adj Close`.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.csv"))
    }
}

impl PriceSeriesProvider for CsvDirectoryProvider {
    fn series(&self, id: &str) -> Result<PriceSeries> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(Error::Prices(format!(
                "no price file for {id} at {}",
                path.display()
            )));
        }
        let file = std::fs::File::open(&path)?;
        let series = read_series(file, &self.column, &path)?;
        debug!("{id}: {} dates from {}", series.len(), path.display());
        Ok(series)
    }
}

/// Parse one price file. `source` only labels errors.
pub fn read_series<R: Read>(reader: R, column: &str, source: &Path) -> Result<PriceSeries> {
    let read_err = |e: csv::Error| Error::PriceRead {
        path: source.to_path_buf(),
        source: e,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(read_err)?.clone();
    let find = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            Error::Prices(format!("{} has no '{name}' column", source.display()))
        })
    };
    let date_idx = find(DATE_COLUMN)?;
    let value_idx = find(column)?;

    let mut series = PriceSeries::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(read_err)?;
        let line = i + 2;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| {
            Error::Prices(format!(
                "{} line {line}: bad date '{raw_date}'",
                source.display()
            ))
        })?;
        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = parse_value(raw_value).map_err(|_| {
            Error::Prices(format!(
                "{} line {line}: bad value '{raw_value}'",
                source.display()
            ))
        })?;
        series.insert(date, value);
    }
    Ok(series)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Timestamps like "2021-01-04 00:00:00" keep only the date part
    let s = s.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_value(s: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>().map(Some)
}

// ============================================================================
// In-memory
// ============================================================================

/// Provider over series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: FxHashMap<String, PriceSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, series: PriceSeries) {
        self.series.insert(id.into(), series);
    }

    pub fn with_series<I>(mut self, id: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        self.insert(id, points.into_iter().collect());
        self
    }
}

impl PriceSeriesProvider for InMemoryProvider {
    fn series(&self, id: &str) -> Result<PriceSeries> {
        self.series
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Prices(format!("no price series for {id}")))
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Price series aligned on the union of their dates, one column per id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFrame {
    ids: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl PriceFrame {
    /// Fetch every id from `provider` and align them.
    ///
    /// Fails on the first id the provider cannot supply, or on a repeated id.
    pub fn compile<P, S>(provider: &P, ids: &[S]) -> Result<Self>
    where
        P: PriceSeriesProvider + ?Sized,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut series = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            if !seen.insert(id) {
                return Err(Error::Prices(format!("identifier {id} requested twice")));
            }
            series.push((id.to_string(), provider.series(id)?));
        }
        Ok(Self::from_series(series))
    }

    /// Outer-align already fetched series. Column order follows the input.
    pub fn from_series(series: Vec<(String, PriceSeries)>) -> Self {
        let width = series.len();
        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        let mut ids = Vec::with_capacity(width);
        for (col, (id, points)) in series.into_iter().enumerate() {
            ids.push(id);
            for (date, value) in points {
                rows.entry(date).or_insert_with(|| vec![None; width])[col] = value;
            }
        }
        Self { ids, rows }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Value for `id` on `date`; `None` for gaps and unknown keys.
    pub fn get(&self, date: NaiveDate, id: &str) -> Option<f64> {
        let col = self.ids.iter().position(|i| i == id)?;
        self.rows.get(&date)?.get(col).copied().flatten()
    }

    /// Every row as (date, values in id order).
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(d, v)| (*d, v.as_slice()))
    }

    /// Keep only dates where every id has a value.
    pub fn drop_incomplete(mut self) -> Self {
        self.rows.retain(|_, values| values.iter().all(Option::is_some));
        self
    }

    /// Header `Date,<ids...>`, ISO dates, empty cells for gaps.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let to_err = |e: csv::Error| Error::Prices(format!("failed to write prices: {e}"));

        let mut header = Vec::with_capacity(self.ids.len() + 1);
        header.push(DATE_COLUMN.to_string());
        header.extend(self.ids.iter().cloned());
        wtr.write_record(&header).map_err(to_err)?;

        for (date, values) in &self.rows {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
            wtr.write_record(&record).map_err(to_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}
