use augurs::ets::AutoETS;
use augurs::mstl::MSTLModel;
use augurs::prelude::*;
use log::debug;

use crate::model::TrainingFrame;

use super::{
    DEFAULT_INTERVAL_LEVEL, ForecastError, ForecastTable, Forecaster, assemble_table,
    check_fit_input,
};

/// Seasonal periods assumed by default: the annual cycle on daily
/// observations.
pub const DEFAULT_SEASONAL_PERIODS: &[usize] = &[365];

/// Additive seasonal-trend decomposition via the `augurs` MSTL
/// implementation, with an automatic ETS model forecasting the
/// deseasonalised trend.
#[derive(Debug, Clone)]
pub struct MstlForecaster {
    seasonal_periods: Vec<usize>,
    interval_level: f64,
}

impl MstlForecaster {
    pub fn new(seasonal_periods: Vec<usize>, interval_level: f64) -> Self {
        Self { seasonal_periods, interval_level }
    }
}

impl Default for MstlForecaster {
    fn default() -> Self {
        Self::new(DEFAULT_SEASONAL_PERIODS.to_vec(), DEFAULT_INTERVAL_LEVEL)
    }
}

impl Forecaster for MstlForecaster {
    fn fit_predict(
        &self,
        frame: &TrainingFrame,
        horizon_days: usize,
    ) -> Result<ForecastTable, ForecastError> {
        check_fit_input(frame)?;
        debug!(
            "fitting MSTL (periods {:?}) on {} observations, {} day(s) ahead",
            self.seasonal_periods,
            frame.len(),
            horizon_days
        );

        let trend_model = AutoETS::non_seasonal().into_trend_model();
        let model = MSTLModel::new(self.seasonal_periods.clone(), trend_model);

        let fit = model
            .fit(&frame.y)
            .map_err(|e| ForecastError::Fit(e.to_string()))?;

        let in_sample = fit
            .predict_in_sample(self.interval_level)
            .map_err(|e| ForecastError::Predict(e.to_string()))?;
        let future = fit
            .predict(horizon_days, self.interval_level)
            .map_err(|e| ForecastError::Predict(e.to_string()))?;

        assemble_table(frame, horizon_days, in_sample, future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservationSeries, Variable};
    use chrono::{NaiveDate, NaiveDateTime};

    fn weekly_seasonal_frame(days: usize) -> TrainingFrame {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let timestamps: Vec<NaiveDateTime> = (0..days as u64)
            .map(|day| {
                start
                    .checked_add_days(chrono::Days::new(day))
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect();
        let values: Vec<f64> = (0..days)
            .map(|day| {
                let weekly = (day % 7) as f64;
                20.0 + weekly + (day as f64) * 0.01
            })
            .collect();

        ObservationSeries::new(Variable::Temperature, timestamps, values)
            .unwrap()
            .training_frame()
            .unwrap()
    }

    #[test]
    fn covers_history_plus_horizon() {
        let frame = weekly_seasonal_frame(112);

        let forecaster = MstlForecaster::new(vec![7], DEFAULT_INTERVAL_LEVEL);
        let table = forecaster.fit_predict(&frame, 14).unwrap();

        assert_eq!(table.len(), 126);
        for ((&y, &lo), &hi) in table
            .yhat
            .iter()
            .zip(&table.yhat_lower)
            .zip(&table.yhat_upper)
        {
            assert!(lo <= y && y <= hi);
        }
    }

    #[test]
    fn degenerate_series_fails_to_fit() {
        let frame = weekly_seasonal_frame(1);

        let forecaster = MstlForecaster::new(vec![7], DEFAULT_INTERVAL_LEVEL);
        let err = forecaster.fit_predict(&frame, 5).unwrap_err();
        assert!(matches!(err, ForecastError::DegenerateSeries { distinct: 1 }));
    }
}
