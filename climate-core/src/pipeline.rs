use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::chart;
use crate::dataset::Dataset;
use crate::forecast::{
    self, BackendId, DEFAULT_HORIZON_DAYS, DEFAULT_INTERVAL_LEVEL, ForecastTable, Forecaster,
};
use crate::forecast::mstl::DEFAULT_SEASONAL_PERIODS;
use crate::model::Variable;
use crate::stats::{CorrelationEntry, correlation_report};

/// Which stages run, and with what parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub preview_rows: usize,
    pub render_charts: bool,
    pub report_correlations: bool,
    pub run_forecasts: bool,
    pub horizon_days: usize,
    pub backend: BackendId,
    pub interval_level: f64,
    pub seasonal_periods: Vec<usize>,
    pub out_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            render_charts: true,
            report_correlations: true,
            run_forecasts: true,
            horizon_days: DEFAULT_HORIZON_DAYS,
            backend: BackendId::Ets,
            interval_level: DEFAULT_INTERVAL_LEVEL,
            seasonal_periods: DEFAULT_SEASONAL_PERIODS.to_vec(),
            out_dir: PathBuf::from("charts"),
        }
    }
}

/// One variable's completed forecast.
#[derive(Debug, Serialize)]
pub struct VariableForecast {
    pub variable: Variable,
    pub historical_rows: usize,
    pub horizon_days: usize,
    pub last_timestamp: NaiveDateTime,
    pub last_predicted: f64,
    pub chart: Option<PathBuf>,
    #[serde(skip)]
    pub table: ForecastTable,
}

/// One variable's isolated forecast failure.
#[derive(Debug, Serialize)]
pub struct ForecastFailure {
    pub variable: Variable,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub preview: String,
    pub charts: Vec<PathBuf>,
    pub correlations: Vec<CorrelationEntry>,
    pub forecasts: Vec<VariableForecast>,
    pub failures: Vec<ForecastFailure>,
}

/// Run the selected stages over the dataset.
///
/// A forecast failure for one variable is recorded and logged; the
/// remaining variables are still processed. Chart and I/O failures in the
/// descriptive stages abort the run.
pub fn run(dataset: &Dataset, options: &PipelineOptions) -> Result<PipelineReport> {
    let mut report = PipelineReport {
        preview: dataset.preview(options.preview_rows),
        charts: Vec::new(),
        correlations: Vec::new(),
        forecasts: Vec::new(),
        failures: Vec::new(),
    };

    if options.render_charts {
        debug!("rendering descriptive charts into {}", options.out_dir.display());
        ensure_out_dir(&options.out_dir)?;
        render_descriptive_charts(dataset, options, &mut report)?;
    }

    if options.report_correlations {
        debug!("computing pairwise correlations");
        report.correlations = correlation_report(dataset);
    }

    if options.run_forecasts {
        ensure_out_dir(&options.out_dir)?;
        let forecaster =
            forecast::backend(options.backend, options.interval_level, &options.seasonal_periods);
        debug!("forecasting with backend '{}'", options.backend);

        for &variable in Variable::all() {
            match forecast_one(dataset, variable, forecaster.as_ref(), options) {
                Ok(result) => report.forecasts.push(result),
                Err(error) => {
                    warn!("forecast for {variable} failed: {error:#}");
                    report
                        .failures
                        .push(ForecastFailure { variable, error: format!("{error:#}") });
                }
            }
        }
    }

    Ok(report)
}

fn ensure_out_dir(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))
}

fn render_descriptive_charts(
    dataset: &Dataset,
    options: &PipelineOptions,
    report: &mut PipelineReport,
) -> Result<()> {
    for &variable in Variable::all() {
        let series = dataset.series(variable);
        let title = format!("{} over time", variable.label());
        let out = options.out_dir.join(format!("line_{}.png", variable.as_str()));

        chart::variable_line_chart(&series, &title, &out)?;
        report.charts.push(out);
    }

    for &(left, right) in Variable::pairs() {
        let xs = dataset.series(left);
        let ys = dataset.series(right);
        let title = format!("{} vs. {}", left.label(), right.label());
        let out = options
            .out_dir
            .join(format!("scatter_{}_{}.png", left.as_str(), right.as_str()));

        chart::scatter_chart(&xs, &ys, &title, &out)?;
        report.charts.push(out);
    }

    Ok(())
}

fn forecast_one(
    dataset: &Dataset,
    variable: Variable,
    forecaster: &dyn Forecaster,
    options: &PipelineOptions,
) -> Result<VariableForecast> {
    let series = dataset.series(variable);
    let historical_rows = series.len();
    let frame = series.training_frame()?;
    let table = forecaster.fit_predict(&frame, options.horizon_days)?;

    let chart_path = if options.render_charts {
        let title =
            format!("{} Forecast ({} days ahead)", variable.label(), options.horizon_days);
        let out = options.out_dir.join(format!("forecast_{}.png", variable.as_str()));
        chart::forecast_chart(&table, &title, &out)?;
        Some(out)
    } else {
        None
    };

    let last_timestamp = *table.ds.last().context("forecast table is empty")?;
    let last_predicted = *table.yhat.last().context("forecast table is empty")?;

    Ok(VariableForecast {
        variable,
        historical_rows,
        horizon_days: options.horizon_days,
        last_timestamp,
        last_predicted,
        chart: chart_path,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset(rows: usize) -> Dataset {
        let mut body =
            String::from("Time,Temperature (C),Relative Humidity (%),Wind Speed (m/s)\n");
        for day in 0..rows {
            let date = chrono::NaiveDate::from_ymd_opt(2019, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(day as u64))
                .unwrap();
            body.push_str(&format!(
                "{} 00:00:00,{:.1},{:.1},{:.1}\n",
                date.format("%Y-%m-%d"),
                15.0 + (day % 10) as f64,
                80.0 - (day % 7) as f64,
                2.0 + (day % 3) as f64,
            ));
        }

        Dataset::from_reader(body.as_bytes()).unwrap()
    }

    fn quiet_options() -> PipelineOptions {
        PipelineOptions {
            render_charts: false,
            horizon_days: 10,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn runs_all_enabled_stages() {
        let dataset = sample_dataset(40);
        let report = run(&dataset, &quiet_options()).unwrap();

        assert_eq!(report.preview.lines().count(), 6);
        assert_eq!(report.correlations.len(), 3);
        assert_eq!(report.forecasts.len(), 3);
        assert!(report.failures.is_empty());
        assert!(report.charts.is_empty());

        for forecast in &report.forecasts {
            assert_eq!(forecast.table.len(), 40 + 10);
            assert_eq!(forecast.historical_rows, 40);
            assert!(forecast.chart.is_none());
        }
    }

    #[test]
    fn stage_toggles_skip_work() {
        let dataset = sample_dataset(10);
        let options = PipelineOptions {
            report_correlations: false,
            run_forecasts: false,
            ..quiet_options()
        };

        let report = run(&dataset, &options).unwrap();
        assert!(report.correlations.is_empty());
        assert!(report.forecasts.is_empty());
    }

    #[test]
    fn degenerate_dataset_isolates_forecast_failures() {
        // One row: correlations still come out (zero variance -> 0.0),
        // every forecast fails, and the failures are recorded instead of
        // aborting the run.
        let dataset = sample_dataset(1);
        let report = run(&dataset, &quiet_options()).unwrap();

        assert_eq!(report.correlations.len(), 3);
        assert!(report.forecasts.is_empty());
        assert_eq!(report.failures.len(), 3);
        for failure in &report.failures {
            assert!(failure.error.contains("distinct"), "unexpected: {}", failure.error);
        }
    }
}
