//! # Cost Forecast
//!
//! A Rust library for cloud cost anomaly detection and short-horizon cost
//! forecasting.
//!
//! ## Features
//!
//! - Combined billing table handling with per-service partitioning
//! - Outlier-threshold calibration against a deterministic isolation forest
//! - ARIMA order selection from stationarity and autocorrelation diagnostics
//! - Multi-step cost forecasting with dated forecast files
//! - Append-only threshold ledger shared with the alerting consumer
//!
//! ## Quick Start
//!
//! ```no_run
//! use cost_forecast::pipeline::{Pipeline, PipelineConfig};
//!
//! # fn main() -> cost_forecast::error::Result<()> {
//! // Configure a batch run over the default service set
//! let config = PipelineConfig::new("clean-cost-and-usage-report.csv", "out");
//!
//! // Process every service: calibrate thresholds, fit models, write files
//! let report = Pipeline::new(config).run()?;
//!
//! for service in &report.services {
//!     println!("{}: success = {}", service.service.code, service.is_success());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Individual stages are usable on their own: [`data::CostTable`] partitions
//! the billing table, [`anomaly::calibrate_threshold`] calibrates a
//! threshold for one series, and [`stationarity::select_order`] picks an
//! order for [`models::arima::ArimaModel`].

pub mod anomaly;
pub mod data;
pub mod error;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod stationarity;
pub mod stats;

// Re-export commonly used types
pub use crate::anomaly::{calibrate_threshold, CalibrationParams, ThresholdCalibration};
pub use crate::data::{CostTable, DataLoader, ServiceCostSeries};
pub use crate::error::CostError;
pub use crate::ledger::ThresholdLedger;
pub use crate::models::{ForecastModel, ForecastResult, ModelOrder};
pub use crate::pipeline::{Pipeline, PipelineConfig, RunReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
