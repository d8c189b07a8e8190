use chrono::{Duration, NaiveDateTime};
use log::debug;
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use std::path::Path;

use crate::forecast::ForecastTable;
use crate::model::ObservationSeries;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("no data points to draw for '{0}'")]
    EmptySeries(String),

    #[error("failed to render chart '{title}': {message}")]
    Render { title: String, message: String },
}

const CHART_SIZE: (u32, u32) = (1024, 768);

fn render_error(title: &str) -> impl Fn(String) -> ChartError + '_ {
    move |message| ChartError::Render { title: title.to_string(), message }
}

/// Line chart of one variable over its full time range, y-axis clamped to
/// the variable's display range.
pub fn variable_line_chart(
    series: &ObservationSeries,
    title: &str,
    out: &Path,
) -> Result<(), ChartError> {
    if series.is_empty() {
        return Err(ChartError::EmptySeries(title.to_string()));
    }

    let variable = series.variable();
    let (y_min, y_max) = variable.display_range(series.max_value());
    let (x_min, x_max) = time_range(series.timestamps());
    let err = render_error(title);

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(RangedDateTime::from(x_min..x_max), y_min..y_max)
        .map_err(|e| err(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(format!("{} ({})", variable.label(), variable.unit()))
        .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%Y-%m-%d").to_string())
        .light_line_style(BLACK.mix(0.15))
        .draw()
        .map_err(|e| err(e.to_string()))?;

    let points = series
        .timestamps()
        .iter()
        .copied()
        .zip(series.values().iter().copied());
    chart
        .draw_series(LineSeries::new(points, &BLUE))
        .map_err(|e| err(e.to_string()))?;

    root.present().map_err(|e| err(e.to_string()))?;
    debug!("wrote line chart to {}", out.display());
    Ok(())
}

/// Scatter chart of one variable pair.
pub fn scatter_chart(
    xs: &ObservationSeries,
    ys: &ObservationSeries,
    title: &str,
    out: &Path,
) -> Result<(), ChartError> {
    if xs.is_empty() || ys.is_empty() {
        return Err(ChartError::EmptySeries(title.to_string()));
    }

    let err = render_error(title);
    let (x_min, x_max) = padded_value_range(xs.values());
    let (y_min, y_max) = padded_value_range(ys.values());

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| err(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(format!("{} ({})", xs.variable().label(), xs.variable().unit()))
        .y_desc(format!("{} ({})", ys.variable().label(), ys.variable().unit()))
        .light_line_style(BLACK.mix(0.15))
        .draw()
        .map_err(|e| err(e.to_string()))?;

    let points = xs
        .values()
        .iter()
        .copied()
        .zip(ys.values().iter().copied());
    chart
        .draw_series(points.map(|(x, y)| Circle::new((x, y), 3, BLUE.mix(0.35).filled())))
        .map_err(|e| err(e.to_string()))?;

    root.present().map_err(|e| err(e.to_string()))?;
    debug!("wrote scatter chart to {}", out.display());
    Ok(())
}

/// Forecast chart: three overlaid line traces (point forecast, lower
/// bound, upper bound) over the observed range plus the horizon.
pub fn forecast_chart(table: &ForecastTable, title: &str, out: &Path) -> Result<(), ChartError> {
    if table.is_empty() {
        return Err(ChartError::EmptySeries(title.to_string()));
    }

    let err = render_error(title);
    let (x_min, x_max) = time_range(&table.ds);
    let (y_min, y_max) = padded_value_range_of(&[&table.yhat_lower[..], &table.yhat_upper[..]]);

    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(RangedDateTime::from(x_min..x_max), y_min..y_max)
        .map_err(|e| err(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Value")
        .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%Y-%m-%d").to_string())
        .light_line_style(BLACK.mix(0.15))
        .draw()
        .map_err(|e| err(e.to_string()))?;

    let trace = |values: &[f64]| -> Vec<(NaiveDateTime, f64)> {
        table.ds.iter().copied().zip(values.iter().copied()).collect()
    };

    chart
        .draw_series(LineSeries::new(trace(&table.yhat), &BLUE))
        .map_err(|e| err(e.to_string()))?
        .label("Forecast")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(trace(&table.yhat_lower), BLUE.mix(0.4)))
        .map_err(|e| err(e.to_string()))?
        .label("Lower Bound")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.mix(0.4)));

    chart
        .draw_series(LineSeries::new(trace(&table.yhat_upper), BLUE.mix(0.4)))
        .map_err(|e| err(e.to_string()))?
        .label("Upper Bound")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.mix(0.4)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| err(e.to_string()))?;

    root.present().map_err(|e| err(e.to_string()))?;
    debug!("wrote forecast chart to {}", out.display());
    Ok(())
}

/// X-axis range; a single-point range is padded by one day so the axis
/// stays non-degenerate.
fn time_range(timestamps: &[NaiveDateTime]) -> (NaiveDateTime, NaiveDateTime) {
    let min = timestamps[0];
    let max = timestamps[timestamps.len() - 1];
    if min == max { (min, max + Duration::days(1)) } else { (min, max) }
}

fn padded_value_range(values: &[f64]) -> (f64, f64) {
    padded_value_range_of(&[values])
}

fn padded_value_range_of(columns: &[&[f64]]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for values in columns {
        for &v in *values {
            min = min.min(v);
            max = max.max(v);
        }
    }

    let padding = if (max - min).abs() > 1e-6 { (max - min) * 0.1 } else { 1.0 };
    (min - padding, max + padding)
}
