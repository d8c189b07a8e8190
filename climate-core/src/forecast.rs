use augurs::Forecast;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::{convert::TryFrom, fmt::Debug};

use crate::forecast::{ets::EtsForecaster, mstl::MstlForecaster};
use crate::model::TrainingFrame;
use crate::settings::Settings;

pub mod ets;
pub mod mstl;

/// Default uncertainty interval level.
pub const DEFAULT_INTERVAL_LEVEL: f64 = 0.95;

/// Default forecast horizon: six months of days.
pub const DEFAULT_HORIZON_DAYS: usize = 6 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    Ets,
    Mstl,
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Ets => "ets",
            BackendId::Mstl => "mstl",
        }
    }

    pub const fn all() -> &'static [BackendId] {
        &[BackendId::Ets, BackendId::Mstl]
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BackendId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "ets" => Ok(BackendId::Ets),
            "mstl" => Ok(BackendId::Mstl),
            _ => Err(anyhow::anyhow!(
                "Unknown backend '{value}'. Supported backends: ets, mstl."
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("cannot forecast an empty series")]
    EmptySeries,

    #[error("series has {distinct} distinct timestamp(s); at least 2 are required to fit")]
    DegenerateSeries { distinct: usize },

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("model prediction failed: {0}")]
    Predict(String),

    #[error("forecast output invalid: {0}")]
    InvalidOutput(String),
}

/// Per-timestamp point forecast with its uncertainty band, covering the
/// observed range plus the requested future horizon.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastTable {
    pub ds: Vec<NaiveDateTime>,
    pub yhat: Vec<f64>,
    pub yhat_lower: Vec<f64>,
    pub yhat_upper: Vec<f64>,
}

impl ForecastTable {
    /// Validates that all columns have equal length and that
    /// `yhat_lower <= yhat <= yhat_upper` holds for every row.
    pub fn new(
        ds: Vec<NaiveDateTime>,
        yhat: Vec<f64>,
        yhat_lower: Vec<f64>,
        yhat_upper: Vec<f64>,
    ) -> Result<Self, ForecastError> {
        let len = ds.len();
        if yhat.len() != len || yhat_lower.len() != len || yhat_upper.len() != len {
            return Err(ForecastError::InvalidOutput(format!(
                "column lengths differ: ds={}, yhat={}, lower={}, upper={}",
                len,
                yhat.len(),
                yhat_lower.len(),
                yhat_upper.len()
            )));
        }

        for (i, ((&y, &lo), &hi)) in
            yhat.iter().zip(&yhat_lower).zip(&yhat_upper).enumerate()
        {
            if !(lo <= y && y <= hi) {
                return Err(ForecastError::InvalidOutput(format!(
                    "row {i}: bounds are not ordered (lower={lo}, yhat={y}, upper={hi})"
                )));
            }
        }

        Ok(Self { ds, yhat, yhat_lower, yhat_upper })
    }

    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }
}

/// A forecasting strategy: fit a model on the frame and predict over the
/// observed range plus `horizon_days` future days.
///
/// The model itself is opaque; implementations delegate to an external
/// forecasting library.
pub trait Forecaster: Debug {
    fn fit_predict(
        &self,
        frame: &TrainingFrame,
        horizon_days: usize,
    ) -> Result<ForecastTable, ForecastError>;
}

/// Construct a backend from an explicit id and resolved options.
pub fn backend(id: BackendId, interval_level: f64, seasonal_periods: &[usize]) -> Box<dyn Forecaster> {
    match id {
        BackendId::Ets => Box::new(EtsForecaster::new(interval_level)),
        BackendId::Mstl => Box::new(MstlForecaster::new(seasonal_periods.to_vec(), interval_level)),
    }
}

/// Construct a backend from persisted settings.
pub fn backend_from_settings(id: BackendId, settings: &Settings) -> Box<dyn Forecaster> {
    backend(id, settings.interval_level(id), &settings.seasonal_periods(id))
}

/// Timestamps for the future horizon: one-day steps past the last
/// observation.
pub(crate) fn future_timestamps(last: NaiveDateTime, horizon_days: usize) -> Vec<NaiveDateTime> {
    (1..=horizon_days as i64).map(|day| last + Duration::days(day)).collect()
}

/// Shared pre-fit validation: the forecasting models need at least two
/// distinct timestamps. Frame timestamps are strictly increasing, so the
/// distinct count is the length.
pub(crate) fn check_fit_input(frame: &TrainingFrame) -> Result<(), ForecastError> {
    match frame.len() {
        0 => Err(ForecastError::EmptySeries),
        distinct @ 1 => Err(ForecastError::DegenerateSeries { distinct }),
        _ => Ok(()),
    }
}

/// Split a library forecast into (point, lower, upper). When the library
/// omits intervals, substitute a symmetric band of 15 % of the point
/// forecast's magnitude.
pub(crate) fn split_forecast(forecast: Forecast) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let point = forecast.point;

    match forecast.intervals {
        Some(intervals) => (point, intervals.lower, intervals.upper),
        None => {
            let (lower, upper) = fallback_band(&point);
            (point, lower, upper)
        }
    }
}

fn fallback_band(point: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let lower = point.iter().map(|v| v - v.abs() * 0.15).collect();
    let upper = point.iter().map(|v| v + v.abs() * 0.15).collect();
    (lower, upper)
}

/// Assemble the full table from the in-sample fit and the future
/// predictions.
pub(crate) fn assemble_table(
    frame: &TrainingFrame,
    horizon_days: usize,
    in_sample: Forecast,
    future: Forecast,
) -> Result<ForecastTable, ForecastError> {
    let last = *frame.ds.last().ok_or(ForecastError::EmptySeries)?;

    let mut ds = frame.ds.clone();
    ds.extend(future_timestamps(last, horizon_days));

    let (mut yhat, mut lower, mut upper) = split_forecast(in_sample);
    let (future_yhat, future_lower, future_upper) = split_forecast(future);
    yhat.extend(future_yhat);
    lower.extend(future_lower);
    upper.extend(future_upper);

    ForecastTable::new(ds, yhat, lower, upper)
}
