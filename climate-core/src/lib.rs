//! Core library for the `climate` CLI.
//!
//! This crate defines:
//! - Dataset loading & the shared domain models
//! - Descriptive statistics and chart rendering
//! - Forecasting backends behind a common trait
//! - The analysis pipeline and persisted settings
//!
//! It is used by `climate-cli`, but can also be reused by other binaries or services.

pub mod chart;
pub mod dataset;
pub mod forecast;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod stats;

pub use dataset::{Dataset, DatasetError};
pub use forecast::{BackendId, ForecastError, ForecastTable, Forecaster};
pub use model::{ObservationSeries, TrainingFrame, Variable, WeatherRecord};
pub use pipeline::{PipelineOptions, PipelineReport};
pub use settings::{BackendOptions, Settings};
