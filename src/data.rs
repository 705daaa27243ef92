//! Combined billing table handling and per-service partitioning

use crate::error::{CostError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Column names of the cleaned combined billing table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Name of the date column
    pub date: String,
    /// Name of the service identifier column
    pub service: String,
    /// Name of the region column, if the table carries one
    pub region: Option<String>,
    /// Name of the cost column
    pub cost: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            service: "product_servicecode".to_string(),
            region: Some("product_region_code".to_string()),
            cost: "cost".to_string(),
        }
    }
}

/// One billing line item after cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    /// Usage date
    pub date: NaiveDate,
    /// Service identifier
    pub service: String,
    /// Region the usage was billed in
    pub region: Option<String>,
    /// Cost net of discounts and promotions
    pub cost: f64,
}

/// Ordered cost series for a single service
///
/// Dates are non-decreasing. Gaps are kept as-is; nothing is interpolated.
#[derive(Debug, Clone)]
pub struct ServiceCostSeries {
    service: String,
    dates: Vec<NaiveDate>,
    costs: Vec<f64>,
}

impl ServiceCostSeries {
    /// Build a series from per-service records, sorting by date
    pub fn from_records(service: &str, mut records: Vec<CostRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(CostError::MissingServiceData {
                service: service.to_string(),
            });
        }

        records.sort_by_key(|r| r.date);

        let dates = records.iter().map(|r| r.date).collect();
        let costs = records.iter().map(|r| r.cost).collect();

        Ok(Self {
            service: service.to_string(),
            dates,
            costs,
        })
    }

    /// Service identifier this series belongs to
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Observation dates, non-decreasing
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Cost values, aligned with `dates`
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Date of the last observation
    pub fn last_date(&self) -> NaiveDate {
        *self.dates.last().expect("series is never empty")
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Mean of the cost values
    pub fn mean(&self) -> f64 {
        self.costs.iter().sum::<f64>() / self.costs.len() as f64
    }

    /// Standard deviation of the cost values
    pub fn std_dev(&self) -> f64 {
        let mean = self.mean();
        let variance = self
            .costs
            .iter()
            .map(|c| (c - mean).powi(2))
            .sum::<f64>()
            / self.costs.len() as f64;
        variance.sqrt()
    }
}

/// Data loader for the combined billing table
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the combined billing table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: ColumnSpec) -> Result<CostTable> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        CostTable::from_dataframe(df, columns)
    }
}

/// Cleaned combined billing table with known column roles
#[derive(Debug, Clone)]
pub struct CostTable {
    df: DataFrame,
    columns: ColumnSpec,
}

impl CostTable {
    /// Wrap an existing DataFrame, validating that the required columns exist
    pub fn from_dataframe(df: DataFrame, columns: ColumnSpec) -> Result<Self> {
        let names = df.get_column_names();
        for required in [&columns.date, &columns.service, &columns.cost] {
            if !names.iter().any(|n| *n == required.as_str()) {
                return Err(CostError::Data(format!(
                    "Column '{}' not found in billing table",
                    required
                )));
            }
        }

        Ok(Self { df, columns })
    }

    /// Get the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Column roles of this table
    pub fn columns(&self) -> &ColumnSpec {
        &self.columns
    }

    /// Number of line items
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Decode the table into typed line items
    pub fn records(&self) -> Result<Vec<CostRecord>> {
        let dates = self.column_as_dates(&self.columns.date)?;
        let services = self.column_as_strings(&self.columns.service)?;
        let costs = self.column_as_f64(&self.columns.cost)?;

        let regions = match &self.columns.region {
            Some(name) if self.df.get_column_names().iter().any(|n| *n == name.as_str()) => {
                self.column_as_strings(name)?.into_iter().map(Some).collect()
            }
            _ => vec![None; dates.len()],
        };

        if services.len() != dates.len() || costs.len() != dates.len() {
            return Err(CostError::Data(
                "Billing table columns have inconsistent lengths".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(dates.len());
        for i in 0..dates.len() {
            records.push(CostRecord {
                date: dates[i],
                service: services[i].clone(),
                region: regions[i].clone(),
                cost: costs[i],
            });
        }

        Ok(records)
    }

    /// Extract the ordered cost series for one service
    ///
    /// Region and other descriptive columns are dropped; only date and cost
    /// survive into the series. A service with no rows signals
    /// `MissingServiceData` rather than yielding an empty series.
    pub fn service_series(&self, service_code: &str) -> Result<ServiceCostSeries> {
        let records: Vec<CostRecord> = self
            .records()?
            .into_iter()
            .filter(|r| r.service == service_code)
            .collect();

        ServiceCostSeries::from_records(service_code, records)
    }

    /// Partition the table into one series per service present in it
    pub fn partition(&self) -> Result<BTreeMap<String, ServiceCostSeries>> {
        let mut by_service: BTreeMap<String, Vec<CostRecord>> = BTreeMap::new();
        for record in self.records()? {
            by_service
                .entry(record.service.clone())
                .or_default()
                .push(record);
        }

        let mut partitions = BTreeMap::new();
        for (service, records) in by_service {
            let series = ServiceCostSeries::from_records(&service, records)?;
            partitions.insert(service, series);
        }

        Ok(partitions)
    }

    /// Helper method to get a column as f64 values
    fn column_as_f64(&self, column_name: &str) -> Result<Vec<f64>> {
        let col = self.df.column(column_name).map_err(|e| {
            CostError::Data(format!("Column '{}' not found: {}", column_name, e))
        })?;

        match col.dtype() {
            DataType::Float64 => Ok(col.f64().unwrap().into_iter().flatten().collect()),
            DataType::Float32 => Ok(col
                .f32()
                .unwrap()
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            DataType::Int64 => Ok(col
                .i64()
                .unwrap()
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            DataType::Int32 => Ok(col
                .i32()
                .unwrap()
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            _ => Err(CostError::Data(format!(
                "Column '{}' cannot be converted to f64",
                column_name
            ))),
        }
    }

    /// Helper method to get a column as string values
    fn column_as_strings(&self, column_name: &str) -> Result<Vec<String>> {
        let col = self.df.column(column_name).map_err(|e| {
            CostError::Data(format!("Column '{}' not found: {}", column_name, e))
        })?;

        match col.dtype() {
            DataType::Utf8 => Ok(col
                .utf8()
                .unwrap()
                .into_iter()
                .map(|v| v.unwrap_or("").to_string())
                .collect()),
            _ => Err(CostError::Data(format!(
                "Column '{}' cannot be read as strings",
                column_name
            ))),
        }
    }

    /// Helper method to get a column as dates
    ///
    /// Supports ISO date strings as well as Polars Date/Datetime columns.
    fn column_as_dates(&self, column_name: &str) -> Result<Vec<NaiveDate>> {
        let col = self.df.column(column_name).map_err(|e| {
            CostError::Data(format!("Column '{}' not found: {}", column_name, e))
        })?;

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()
                .unwrap()
                .into_iter()
                .map(|v| {
                    let raw = v.ok_or_else(|| {
                        CostError::Data(format!("Null date in column '{}'", column_name))
                    })?;
                    // Billing exports sometimes keep the time-interval suffix
                    let day = raw.split('T').next().unwrap_or(raw);
                    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                        CostError::Data(format!("Unparseable date '{}': {}", raw, e))
                    })
                })
                .collect(),
            DataType::Date => Ok(col
                .date()
                .unwrap()
                .into_iter()
                .flatten()
                .map(|days| {
                    NaiveDate::from_ymd_opt(1970, 1, 1)
                        .unwrap()
                        .checked_add_days(chrono::Days::new(days as u64))
                        .unwrap()
                })
                .collect()),
            DataType::Datetime(_, _) => Ok(col
                .datetime()
                .unwrap()
                .into_iter()
                .flatten()
                .filter_map(|ts| chrono::DateTime::from_timestamp(ts / 1_000_000_000, 0))
                .map(|dt| dt.date_naive())
                .collect()),
            _ => Err(CostError::Data(format!(
                "Column '{}' cannot be read as dates",
                column_name
            ))),
        }
    }
}
