//! Per-service pipeline orchestration

use crate::anomaly::{calibrate_threshold, CalibrationParams, ThresholdCalibration};
use crate::data::{ColumnSpec, CostTable, DataLoader, ServiceCostSeries};
use crate::error::{CostError, Result};
use crate::ledger::{write_forecast_csv, ThresholdLedger};
use crate::models::arima::ArimaModel;
use crate::models::{ForecastModel, ModelOrder, TrainedForecastModel};
use crate::services::{default_services, ServiceSpec};
use crate::stationarity::select_order;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

fn default_target_accuracy() -> f64 {
    95.0
}

fn default_max_iterations() -> usize {
    100
}

fn default_forecast_horizon() -> usize {
    7
}

/// Configuration of one batch run, passed in at construction
///
/// There is no module-level state; everything the pipeline touches comes
/// through here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cleaned combined billing table
    pub input_csv: PathBuf,
    /// Directory the forecast files are written into
    pub output_dir: PathBuf,
    /// Shared append-only threshold ledger
    pub ledger_path: PathBuf,
    /// Services to process
    #[serde(default = "default_services")]
    pub services: Vec<ServiceSpec>,
    /// Detection accuracy the calibration search aims for, in percent
    #[serde(default = "default_target_accuracy")]
    pub target_accuracy: f64,
    /// Iteration budget of the calibration search
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Number of periods to forecast
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,
    /// Worker pool size; 0 uses the rayon default
    #[serde(default)]
    pub max_workers: usize,
    /// Column roles of the billing table
    #[serde(default)]
    pub columns: ColumnSpec,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the file locations;
    /// the ledger lands next to the forecast files
    pub fn new<P: Into<PathBuf>>(input_csv: P, output_dir: P) -> Self {
        let output_dir = output_dir.into();
        Self {
            input_csv: input_csv.into(),
            ledger_path: output_dir.join("outliers.csv"),
            output_dir,
            services: default_services(),
            target_accuracy: default_target_accuracy(),
            max_iterations: default_max_iterations(),
            forecast_horizon: default_forecast_horizon(),
            max_workers: 0,
            columns: ColumnSpec::default(),
        }
    }
}

/// What the forecasting branch produced for one service
#[derive(Debug)]
pub struct ForecastArtifact {
    /// Order the model was fit with
    pub order: ModelOrder,
    /// Where the forecast file was written
    pub path: PathBuf,
    /// Periods forecasted
    pub horizon: usize,
    /// First forecasted date, one period past the last observation
    pub first_date: NaiveDate,
}

/// Outcome of one service's pipeline instance
///
/// The calibration and forecast branches share only the partitioned series,
/// so each can fail without taking the other down.
#[derive(Debug)]
pub enum ServiceOutcome {
    /// Partitioning failed; neither branch ran
    Skipped {
        /// Why the service was skipped
        error: CostError,
    },
    /// Both branches ran, each with its own result
    Ran {
        /// Threshold calibration result
        calibration: Result<ThresholdCalibration>,
        /// Order selection, model fit and forecast file result
        forecast: Result<ForecastArtifact>,
    },
}

/// Per-service report collected by the orchestrator
#[derive(Debug)]
pub struct ServiceReport {
    /// The service this report covers
    pub service: ServiceSpec,
    /// What happened
    pub outcome: ServiceOutcome,
}

impl ServiceReport {
    /// True when every branch of this service's run succeeded
    pub fn is_success(&self) -> bool {
        matches!(
            &self.outcome,
            ServiceOutcome::Ran {
                calibration: Ok(_),
                forecast: Ok(_),
            }
        )
    }

    /// All errors this service's run produced
    pub fn failures(&self) -> Vec<&CostError> {
        match &self.outcome {
            ServiceOutcome::Skipped { error } => vec![error],
            ServiceOutcome::Ran {
                calibration,
                forecast,
            } => calibration
                .as_ref()
                .err()
                .into_iter()
                .chain(forecast.as_ref().err())
                .collect(),
        }
    }
}

/// Report over the whole batch
#[derive(Debug)]
pub struct RunReport {
    /// One entry per configured service, in configuration order
    pub services: Vec<ServiceReport>,
}

impl RunReport {
    /// Number of services that completed both branches
    pub fn succeeded(&self) -> usize {
        self.services.iter().filter(|s| s.is_success()).count()
    }

    /// Number of services with at least one failed branch
    pub fn failed(&self) -> usize {
        self.services.len() - self.succeeded()
    }
}

/// Batch pipeline over the configured set of services
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with an explicit configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the whole batch
    ///
    /// Services are processed on a bounded worker pool; per-service failures
    /// are collected into the report, never propagated. Only environment
    /// failures (unreadable input, unwritable ledger) abort the run.
    /// Threshold ledger appends happen after the parallel section, in
    /// configuration order, so the shared file has a single writer.
    pub fn run(&self) -> Result<RunReport> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let table = DataLoader::from_csv(&self.config.input_csv, self.config.columns.clone())?;
        info!(
            rows = table.len(),
            services = self.config.services.len(),
            "loaded combined billing table"
        );

        let process = || {
            self.config
                .services
                .par_iter()
                .map(|spec| self.run_service(&table, spec))
                .collect::<Vec<_>>()
        };

        let reports = if self.config.max_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.max_workers)
                .build()
                .map_err(|e| CostError::Validation(format!("Worker pool: {}", e)))?;
            pool.install(process)
        } else {
            process()
        };

        let ledger = ThresholdLedger::new(&self.config.ledger_path);
        for report in &reports {
            if let ServiceOutcome::Ran {
                calibration: Ok(calibration),
                ..
            } = &report.outcome
            {
                ledger.append(&report.service.code, calibration.threshold)?;
            }
        }

        let report = RunReport { services: reports };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    fn run_service(&self, table: &CostTable, spec: &ServiceSpec) -> ServiceReport {
        let series = match table.service_series(&spec.code) {
            Ok(series) => series,
            Err(error) => {
                warn!(service = %spec.code, %error, "skipping service");
                return ServiceReport {
                    service: spec.clone(),
                    outcome: ServiceOutcome::Skipped { error },
                };
            }
        };
        info!(service = %spec.code, observations = series.len(), "processing service");

        let calibration = calibrate_threshold(
            series.costs(),
            &CalibrationParams {
                initial_threshold: spec.initial_threshold,
                target_accuracy: self.config.target_accuracy,
                max_iterations: self.config.max_iterations,
            },
        );
        match &calibration {
            Ok(c) => info!(
                service = %spec.code,
                threshold = c.threshold,
                accuracy = c.accuracy,
                "calibrated outlier threshold"
            ),
            Err(error) => warn!(service = %spec.code, %error, "calibration failed"),
        }

        let forecast = self.forecast_service(&series, spec);
        match &forecast {
            Ok(artifact) => info!(
                service = %spec.code,
                order = %artifact.order,
                path = %artifact.path.display(),
                "wrote forecast"
            ),
            Err(error) => warn!(service = %spec.code, %error, "forecast failed"),
        }

        ServiceReport {
            service: spec.clone(),
            outcome: ServiceOutcome::Ran {
                calibration,
                forecast,
            },
        }
    }

    fn forecast_service(
        &self,
        series: &ServiceCostSeries,
        spec: &ServiceSpec,
    ) -> Result<ForecastArtifact> {
        let horizon = self.config.forecast_horizon;
        if series.len() < 2 * horizon {
            return Err(CostError::ModelFit(format!(
                "Service '{}' has {} observations, need at least {} for a {}-step forecast",
                spec.code,
                series.len(),
                2 * horizon,
                horizon
            )));
        }

        let (order, _diagnostics) = select_order(series.costs())?;
        let trained = ArimaModel::new(order).train(series)?;

        let in_sample_mae = trained.fitted()?.mean_absolute_error(series.costs())?;
        debug!(service = %spec.code, in_sample_mae, "in-sample fit diagnostic");

        let forecast = trained.forecast(horizon)?;
        let path = write_forecast_csv(&self.config.output_dir, &spec.slug, &spec.code, &forecast)?;

        Ok(ForecastArtifact {
            order,
            path,
            horizon,
            first_date: forecast.dates()[0],
        })
    }
}
