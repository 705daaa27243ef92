//! Flat-file persistence for calibrated thresholds and forecasts

use crate::error::{CostError, Result};
use crate::models::ForecastResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One row of a per-service forecast file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// Forecasted date, beyond the last observed one
    pub date: NaiveDate,
    /// Service identifier
    pub product_servicecode: String,
    /// Forecasted cost
    pub forecast: f64,
}

/// Append-only ledger of calibrated thresholds, shared across runs
///
/// Every calibration appends one `"{service}, {threshold}"` line; reruns add
/// new lines rather than updating old ones. Consumers take the last line per
/// service.
#[derive(Debug, Clone)]
pub struct ThresholdLedger {
    path: PathBuf,
}

impl ThresholdLedger {
    /// Open a ledger at the given path; the file is created on first append
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one calibration line
    pub fn append(&self, service_code: &str, threshold: f64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}, {}", service_code, threshold)?;
        Ok(())
    }

    /// Latest threshold per service, the read contract of the alerting
    /// consumer
    pub fn latest(&self) -> Result<HashMap<String, f64>> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut latest = HashMap::new();

        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (service, value) = line.rsplit_once(',').ok_or_else(|| {
                CostError::Data(format!("Malformed ledger line {}: '{}'", number + 1, line))
            })?;
            let threshold: f64 = value.trim().parse().map_err(|_| {
                CostError::Data(format!("Malformed ledger line {}: '{}'", number + 1, line))
            })?;
            latest.insert(service.trim().to_string(), threshold);
        }

        Ok(latest)
    }
}

/// Write one service's forecast file, replacing any previous run's content
///
/// The file is named `forecasted_{slug}_costs.csv` and holds exactly one row
/// per forecasted period.
pub fn write_forecast_csv(
    output_dir: &Path,
    slug: &str,
    service_code: &str,
    forecast: &ForecastResult,
) -> Result<PathBuf> {
    let path = output_dir.join(format!("forecasted_{}_costs.csv", slug));
    let mut writer = csv::Writer::from_path(&path)?;

    for (date, value) in forecast.dates().iter().zip(forecast.values()) {
        writer.serialize(ForecastRecord {
            date: *date,
            product_servicecode: service_code.to_string(),
            forecast: *value,
        })?;
    }
    writer.flush()?;

    Ok(path)
}
