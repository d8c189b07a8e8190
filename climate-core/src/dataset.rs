use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use std::{fmt::Write as _, fs::File, io::BufReader, io::Read, path::Path};

use crate::model::{ObservationSeries, Variable, WeatherRecord};

/// Header of the timestamp column in the input CSV.
pub const TIME_COLUMN: &str = "Time";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    Value {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("duplicate timestamp {0} in input")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("input contains no data rows")]
    Empty,
}

/// The loaded dataset: all rows, sorted by timestamp.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<WeatherRecord>,
}

impl Dataset {
    /// Load a dataset from a CSV file on disk.
    pub fn from_csv_path(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let dataset = Self::from_reader(BufReader::new(file))?;
        debug!("loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Load a dataset from any CSV reader.
    ///
    /// Rows are sorted by timestamp after parsing; duplicate timestamps
    /// are rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let time_idx = column_index(&headers, TIME_COLUMN)?;
        let temperature_idx = column_index(&headers, Variable::Temperature.column())?;
        let humidity_idx = column_index(&headers, Variable::Humidity.column())?;
        let wind_idx = column_index(&headers, Variable::WindSpeed.column())?;

        let mut rows = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            // 1-based, counting the header line.
            let row = i + 2;

            let raw_time = record.get(time_idx).unwrap_or_default();
            let time = parse_timestamp(raw_time).ok_or_else(|| DatasetError::Timestamp {
                row,
                value: raw_time.to_string(),
            })?;

            rows.push(WeatherRecord {
                time,
                temperature_c: parse_value(&record, row, temperature_idx, Variable::Temperature)?,
                relative_humidity_pct: parse_value(&record, row, humidity_idx, Variable::Humidity)?,
                wind_speed_mps: parse_value(&record, row, wind_idx, Variable::WindSpeed)?,
            });
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        rows.sort_by_key(|r| r.time);
        if let Some(dup) = rows.windows(2).find(|w| w[0].time == w[1].time) {
            return Err(DatasetError::DuplicateTimestamp(dup[0].time));
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.rows
    }

    /// Read-only view of one variable as an observation series.
    pub fn series(&self, variable: Variable) -> ObservationSeries {
        let timestamps = self.rows.iter().map(|r| r.time).collect();
        let values = self.rows.iter().map(|r| r.value(variable)).collect();

        ObservationSeries::from_sorted_columns(variable, timestamps, values)
    }

    /// Format the first `n` rows as an aligned text table.
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {:>16} {:>22} {:>17}",
            TIME_COLUMN,
            Variable::Temperature.column(),
            Variable::Humidity.column(),
            Variable::WindSpeed.column(),
        );

        for record in self.rows.iter().take(n) {
            let _ = writeln!(
                out,
                "{:<20} {:>16.2} {:>22.2} {:>17.2}",
                record.time.format("%Y-%m-%d %H:%M:%S"),
                record.temperature_c,
                record.relative_humidity_pct,
                record.wind_speed_mps,
            );
        }

        out
    }
}

fn column_index(
    headers: &csv::StringRecord,
    name: &'static str,
) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or(DatasetError::MissingColumn(name))
}

fn parse_value(
    record: &csv::StringRecord,
    row: usize,
    idx: usize,
    variable: Variable,
) -> Result<f64, DatasetError> {
    let raw = record.get(idx).unwrap_or_default();
    raw.trim().parse::<f64>().map_err(|_| DatasetError::Value {
        row,
        column: variable.column(),
        value: raw.to_string(),
    })
}

/// Parse a timestamp in any of the formats the dataset is seen with:
/// RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]`, or a bare
/// date (interpreted as midnight).
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Time,Temperature (C),Relative Humidity (%),Wind Speed (m/s)";

    fn dataset_from(lines: &[&str]) -> Result<Dataset, DatasetError> {
        let body = format!("{HEADER}\n{}\n", lines.join("\n"));
        Dataset::from_reader(body.as_bytes())
    }

    #[test]
    fn loads_and_sorts_rows_by_timestamp() {
        let dataset = dataset_from(&[
            "2019-01-03 00:00:00,16.0,70.0,3.0",
            "2019-01-01 00:00:00,14.0,82.0,2.1",
            "2019-01-02 00:00:00,15.0,78.0,2.5",
        ])
        .unwrap();

        assert_eq!(dataset.len(), 3);
        let times: Vec<_> = dataset.records().iter().map(|r| r.time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dataset.records()[0].temperature_c, 14.0);
    }

    #[test]
    fn loads_from_file_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "2019-01-01 00:00:00,14.0,82.0,2.1").unwrap();

        let dataset = Dataset::from_csv_path(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Dataset::from_csv_path(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = dataset_from(&[
            "2019-01-01 00:00:00,14.0,82.0,2.1",
            "2019-01-01 00:00:00,15.0,78.0,2.5",
        ])
        .unwrap_err();

        assert!(matches!(err, DatasetError::DuplicateTimestamp(_)));
    }

    #[test]
    fn rejects_missing_column() {
        let body = "Time,Temperature (C)\n2019-01-01,14.0\n";
        let err = Dataset::from_reader(body.as_bytes()).unwrap_err();

        match err {
            DatasetError::MissingColumn(name) => assert_eq!(name, "Relative Humidity (%)"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let err = dataset_from(&["yesterday,14.0,82.0,2.1"]).unwrap_err();

        match err {
            DatasetError::Timestamp { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected Timestamp, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_value_naming_the_column() {
        let err = dataset_from(&["2019-01-01 00:00:00,14.0,n/a,2.1"]).unwrap_err();

        match err {
            DatasetError::Value { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Relative Humidity (%)");
                assert_eq!(value, "n/a");
            }
            other => panic!("expected Value, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_input() {
        let err = Dataset::from_reader(format!("{HEADER}\n").as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn accepts_bare_dates_as_midnight() {
        let dataset = dataset_from(&["2019-01-01,14.0,82.0,2.1"]).unwrap();
        let time = dataset.records()[0].time;
        assert_eq!(time.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn series_view_matches_column() {
        let dataset = dataset_from(&[
            "2019-01-01 00:00:00,14.0,82.0,2.1",
            "2019-01-02 00:00:00,15.0,78.0,2.5",
        ])
        .unwrap();

        let series = dataset.series(Variable::Humidity);
        assert_eq!(series.values(), &[82.0, 78.0]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn preview_limits_rows() {
        let dataset = dataset_from(&[
            "2019-01-01 00:00:00,14.0,82.0,2.1",
            "2019-01-02 00:00:00,15.0,78.0,2.5",
            "2019-01-03 00:00:00,16.0,70.0,3.0",
        ])
        .unwrap();

        let preview = dataset.preview(2);
        // Header plus two data rows.
        assert_eq!(preview.lines().count(), 3);
        assert!(preview.starts_with(TIME_COLUMN));
        assert!(preview.contains("82.00"));
    }
}
