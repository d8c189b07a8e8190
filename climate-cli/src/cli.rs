use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use inquire::Text;
use std::{fs, path::PathBuf};

use climate_core::{
    BackendId, BackendOptions, Dataset, PipelineOptions, PipelineReport, Settings, pipeline,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "climate", version, about = "Weather history exploration and forecasting CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the analysis pipeline over a weather history CSV.
    Analyze(AnalyzeArgs),

    /// Configure defaults for a forecasting backend.
    Configure {
        /// Backend short name, e.g. "ets" or "mstl".
        backend: String,
    },
}

#[derive(Debug, clap::Args)]
pub struct AnalyzeArgs {
    /// Path to the input CSV file.
    input: PathBuf,

    /// Directory charts are written into.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Forecast horizon in days.
    #[arg(long)]
    horizon: Option<usize>,

    /// Forecasting backend, e.g. "ets" or "mstl".
    #[arg(long)]
    backend: Option<String>,

    /// Uncertainty interval level, e.g. 0.95.
    #[arg(long)]
    level: Option<f64>,

    /// How many rows of the loaded table to print.
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Skip the descriptive and forecast charts.
    #[arg(long)]
    no_charts: bool,

    /// Skip the correlation report.
    #[arg(long)]
    no_correlations: bool,

    /// Skip the forecasts.
    #[arg(long)]
    no_forecast: bool,

    /// Write the pipeline report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Analyze(args) => run_analyze(args),
            Command::Configure { backend } => run_configure(&backend),
        }
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let settings = Settings::load()?;

    let backend = match args.backend.as_deref() {
        Some(s) => BackendId::try_from(s)?,
        None => settings.default_backend_id()?,
    };

    let options = PipelineOptions {
        preview_rows: args.preview_rows,
        render_charts: !args.no_charts,
        report_correlations: !args.no_correlations,
        run_forecasts: !args.no_forecast,
        horizon_days: args.horizon.unwrap_or_else(|| settings.horizon_days()),
        backend,
        interval_level: args.level.unwrap_or_else(|| settings.interval_level(backend)),
        seasonal_periods: settings.seasonal_periods(backend),
        out_dir: args
            .out_dir
            .or_else(|| settings.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("charts")),
    };

    let dataset = Dataset::from_csv_path(&args.input)
        .with_context(|| format!("Failed to load dataset from {}", args.input.display()))?;

    let pipeline_report = pipeline::run(&dataset, &options)?;
    print_report(&pipeline_report);

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&pipeline_report)
            .context("Failed to serialize the pipeline report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    print!("{}", report.preview);

    for entry in &report.correlations {
        println!("{}", entry.sentence());
    }

    for chart in &report.charts {
        println!("Chart written to {}", chart.display());
    }

    for forecast in &report.forecasts {
        println!(
            "{}: {} historical rows + {} forecast days, last prediction {:.2} on {}",
            forecast.variable,
            forecast.historical_rows,
            forecast.horizon_days,
            forecast.last_predicted,
            forecast.last_timestamp.format("%Y-%m-%d"),
        );
        if let Some(chart) = &forecast.chart {
            println!("Chart written to {}", chart.display());
        }
    }

    for failure in &report.failures {
        eprintln!("Forecast for {} failed: {}", failure.variable, failure.error);
    }
}

fn run_configure(backend: &str) -> Result<()> {
    let id = BackendId::try_from(backend)?;
    let mut settings = Settings::load()?;

    let level_raw = Text::new("Uncertainty interval level (0-1):")
        .with_default("0.95")
        .prompt()?;
    let interval_level: f64 = level_raw
        .trim()
        .parse()
        .context("Interval level must be a number, e.g. 0.95")?;
    ensure!(
        interval_level > 0.0 && interval_level < 1.0,
        "Interval level must be strictly between 0 and 1, got {interval_level}"
    );

    let mut options = BackendOptions { interval_level: Some(interval_level), seasonal_periods: None };

    if id == BackendId::Mstl {
        let periods_raw = Text::new("Seasonal periods (comma-separated, in observations):")
            .with_default("365")
            .prompt()?;
        options.seasonal_periods = Some(parse_periods(&periods_raw)?);
    }

    let horizon_raw = Text::new("Default forecast horizon in days:")
        .with_default("180")
        .prompt()?;
    let horizon_days: usize = horizon_raw
        .trim()
        .parse()
        .context("Horizon must be a whole number of days, e.g. 180")?;
    ensure!(horizon_days > 0, "Horizon must be at least 1 day");

    settings.upsert_backend(id, options);
    settings.horizon_days = Some(horizon_days);
    settings.save()?;

    println!(
        "Saved settings for backend '{id}' to {}",
        Settings::settings_file_path()?.display()
    );
    Ok(())
}

fn parse_periods(raw: &str) -> Result<Vec<usize>> {
    let periods = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid seasonal period '{}'", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;

    ensure!(!periods.is_empty(), "At least one seasonal period is required");
    ensure!(
        periods.iter().all(|&p| p >= 2),
        "Seasonal periods must be at least 2 observations"
    );

    Ok(periods)
}
