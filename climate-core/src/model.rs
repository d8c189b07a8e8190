use anyhow::{Result, anyhow, ensure};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// One measured quantity of the input dataset.
///
/// Carries everything the pipeline needs to treat the three quantities
/// uniformly: the CSV column header, a human label, the unit, and the
/// y-axis range used when charting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    Temperature,
    Humidity,
    WindSpeed,
}

impl Variable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Temperature => "temperature",
            Variable::Humidity => "humidity",
            Variable::WindSpeed => "wind-speed",
        }
    }

    /// Exact header of the column in the input CSV.
    pub fn column(&self) -> &'static str {
        match self {
            Variable::Temperature => "Temperature (C)",
            Variable::Humidity => "Relative Humidity (%)",
            Variable::WindSpeed => "Wind Speed (m/s)",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Variable::Temperature => "Temperature",
            Variable::Humidity => "Relative Humidity",
            Variable::WindSpeed => "Wind Speed",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Variable::Temperature => "°C",
            Variable::Humidity => "%",
            Variable::WindSpeed => "m/s",
        }
    }

    /// Y-axis range for charts. Temperature and humidity use fixed ranges;
    /// wind speed scales with the largest observed value.
    pub fn display_range(&self, observed_max: f64) -> (f64, f64) {
        match self {
            Variable::Temperature => (0.0, 55.0),
            Variable::Humidity => (0.0, 120.0),
            Variable::WindSpeed => (0.0, observed_max + 1.0),
        }
    }

    pub const fn all() -> &'static [Variable] {
        &[Variable::Temperature, Variable::Humidity, Variable::WindSpeed]
    }

    /// The variable pairs used for scatter charts and correlations.
    pub const fn pairs() -> &'static [(Variable, Variable)] {
        &[
            (Variable::Temperature, Variable::Humidity),
            (Variable::Temperature, Variable::WindSpeed),
            (Variable::Humidity, Variable::WindSpeed),
        ]
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Variable {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "temperature" => Ok(Variable::Temperature),
            "humidity" => Ok(Variable::Humidity),
            "wind-speed" | "windspeed" => Ok(Variable::WindSpeed),
            _ => Err(anyhow!(
                "Unknown variable '{value}'. Supported variables: temperature, humidity, wind-speed."
            )),
        }
    }
}

/// One row of the input dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub time: NaiveDateTime,
    pub temperature_c: f64,
    pub relative_humidity_pct: f64,
    pub wind_speed_mps: f64,
}

impl WeatherRecord {
    pub fn value(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Temperature => self.temperature_c,
            Variable::Humidity => self.relative_humidity_pct,
            Variable::WindSpeed => self.wind_speed_mps,
        }
    }
}

/// Ordered (timestamp, value) pairs for one variable.
///
/// Timestamps are strictly increasing with no duplicates; irregular
/// sampling is fine.
#[derive(Debug, Clone)]
pub struct ObservationSeries {
    variable: Variable,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl ObservationSeries {
    pub fn new(
        variable: Variable,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Result<Self> {
        ensure!(
            timestamps.len() == values.len(),
            "timestamps and values must have the same length ({} vs {})",
            timestamps.len(),
            values.len()
        );
        ensure!(
            timestamps.windows(2).all(|w| w[0] < w[1]),
            "timestamps must be strictly increasing"
        );

        Ok(Self { variable, timestamps, values })
    }

    /// Construct without re-validating. Dataset rows are already sorted
    /// and deduplicated at load time.
    pub(crate) fn from_sorted_columns(
        variable: Variable,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Self {
        Self { variable, timestamps, values }
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Reshape into the two-column frame the forecasting backends take.
    ///
    /// Preserves row order and every timestamp; no filtering, no
    /// resampling.
    pub fn training_frame(&self) -> Result<TrainingFrame> {
        TrainingFrame::from_series(self)
    }
}

/// Two parallel columns: `ds` (timestamps) and `y` (values).
///
/// This is the generic input shape shared by all forecasting backends.
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    pub ds: Vec<NaiveDateTime>,
    pub y: Vec<f64>,
}

impl TrainingFrame {
    pub fn from_series(series: &ObservationSeries) -> Result<Self> {
        ensure!(
            !series.is_empty(),
            "cannot build a training frame from an empty {} series",
            series.variable()
        );

        Ok(Self { ds: series.timestamps().to_vec(), y: series.values().to_vec() })
    }

    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }
}
