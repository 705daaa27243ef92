//! Batch entry point: load a config, run the pipeline, report per service

use cost_forecast::pipeline::{Pipeline, PipelineConfig, ServiceOutcome};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let report = match Pipeline::new(config).run() {
        Ok(report) => report,
        Err(e) => {
            error!("pipeline aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for service in &report.services {
        match &service.outcome {
            ServiceOutcome::Skipped { error } => {
                info!(service = %service.service.code, "skipped: {}", error)
            }
            ServiceOutcome::Ran {
                calibration,
                forecast,
            } => {
                match calibration {
                    Ok(c) => info!(
                        service = %service.service.code,
                        "threshold {} at {:.1}% accuracy", c.threshold, c.accuracy
                    ),
                    Err(e) => info!(service = %service.service.code, "calibration failed: {}", e),
                }
                match forecast {
                    Ok(f) => info!(
                        service = %service.service.code,
                        "forecast ARIMA{} from {} -> {}", f.order, f.first_date, f.path.display()
                    ),
                    Err(e) => info!(service = %service.service.code, "forecast failed: {}", e),
                }
            }
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "done"
    );

    // Per-service failures are reported above, not turned into a bad exit
    ExitCode::SUCCESS
}

fn load_config() -> Result<PipelineConfig, String> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read config '{}': {}", path, e))?;
            serde_json::from_str(&raw).map_err(|e| format!("invalid config '{}': {}", path, e))
        }
        None => Ok(PipelineConfig::new(
            "clean-cost-and-usage-report.csv",
            "forecasts",
        )),
    }
}
