use augurs::ets::AutoETS;
use augurs::prelude::*;
use log::debug;

use crate::model::TrainingFrame;

use super::{
    DEFAULT_INTERVAL_LEVEL, ForecastError, ForecastTable, Forecaster, assemble_table,
    check_fit_input,
};

/// Automatic exponential smoothing via the `augurs` ETS implementation.
///
/// The default backend: model selection, fitting and uncertainty
/// quantification all happen inside the library.
#[derive(Debug, Clone)]
pub struct EtsForecaster {
    interval_level: f64,
}

impl EtsForecaster {
    pub fn new(interval_level: f64) -> Self {
        Self { interval_level }
    }
}

impl Default for EtsForecaster {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_LEVEL)
    }
}

impl Forecaster for EtsForecaster {
    fn fit_predict(
        &self,
        frame: &TrainingFrame,
        horizon_days: usize,
    ) -> Result<ForecastTable, ForecastError> {
        check_fit_input(frame)?;
        debug!(
            "fitting ETS on {} observations, {} day(s) ahead",
            frame.len(),
            horizon_days
        );

        let model = AutoETS::non_seasonal()
            .fit(&frame.y)
            .map_err(|e| ForecastError::Fit(e.to_string()))?;

        let in_sample = model
            .predict_in_sample(self.interval_level)
            .map_err(|e| ForecastError::Predict(e.to_string()))?;
        let future = model
            .predict(horizon_days, self.interval_level)
            .map_err(|e| ForecastError::Predict(e.to_string()))?;

        assemble_table(frame, horizon_days, in_sample, future)
    }
}
