//! ARIMA models for cost series forecasting

use crate::data::ServiceCostSeries;
use crate::error::{CostError, Result};
use crate::models::{ForecastModel, ForecastResult, ModelOrder, TrainedForecastModel};
use crate::stationarity::difference;
use crate::stats::ols;
use chrono::{Duration, NaiveDate};

/// ARIMA model (AutoRegressive Integrated Moving Average)
///
/// Fit on the original cost column; the differencing implied by the order is
/// applied internally and inverted when forecasting.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ModelOrder,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Model order
    order: ModelOrder,
    /// Intercept of the ARMA equation on the differenced scale
    intercept: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Series after differencing, the scale the ARMA part lives on
    differenced: Vec<f64>,
    /// Conditional residuals on the differenced scale
    residuals: Vec<f64>,
    /// Last observed value at each differencing level, level scale first
    integration_tails: Vec<f64>,
    /// Observation dates of the training sample
    dates: Vec<NaiveDate>,
    /// Training sample on the level scale
    historical_data: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model with the given order
    pub fn new(order: ModelOrder) -> Self {
        Self {
            name: format!("ARIMA{}", order),
            order,
        }
    }

    /// The order this model was configured with
    pub fn order(&self) -> ModelOrder {
        self.order
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &ServiceCostSeries) -> Result<TrainedArimaModel> {
        let costs = series.costs();
        let ModelOrder { p, d, q } = self.order;

        if costs.len() < p + d + q + 2 {
            return Err(CostError::ModelFit(format!(
                "Insufficient data for ARIMA{}. Need at least {} observations, got {}.",
                self.order,
                p + d + q + 2,
                costs.len()
            )));
        }
        if series.std_dev() == 0.0 {
            return Err(CostError::ModelFit(
                "Cannot fit ARIMA on a constant series".to_string(),
            ));
        }

        // Difference d times, remembering the last value at each level so
        // forecasts can be integrated back
        let mut working = costs.to_vec();
        let mut integration_tails = Vec::with_capacity(d);
        for _ in 0..d {
            integration_tails.push(*working.last().unwrap());
            working = difference(&working);
        }

        let (intercept, ar_coefficients, ma_coefficients) =
            estimate_arma(&working, p, q)?;
        let residuals =
            conditional_residuals(&working, intercept, &ar_coefficients, &ma_coefficients);

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            intercept,
            ar_coefficients,
            ma_coefficients,
            differenced: working,
            residuals,
            integration_tails,
            dates: series.dates().to_vec(),
            historical_data: costs.to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(CostError::Validation(
                "Forecast horizon must be positive".to_string(),
            ));
        }

        // ARMA recursion on the differenced scale, future shocks at zero
        let p = self.ar_coefficients.len();
        let q = self.ma_coefficients.len();
        let mut values_hist = self.differenced.clone();
        let mut shock_hist = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut next = self.intercept;
            for i in 0..p {
                let idx = values_hist.len() - 1 - i;
                next += self.ar_coefficients[i] * values_hist[idx];
            }
            for j in 0..q {
                let idx = shock_hist.len() - 1 - j;
                next += self.ma_coefficients[j] * shock_hist[idx];
            }
            values_hist.push(next);
            shock_hist.push(0.0);
            forecasts.push(next);
        }

        // Undo the differencing, outermost level last
        let mut level_forecasts = forecasts;
        for tail in self.integration_tails.iter().rev() {
            let mut previous = *tail;
            for value in level_forecasts.iter_mut() {
                *value += previous;
                previous = *value;
            }
        }

        let last_date = *self.dates.last().expect("training sample is never empty");
        let dates: Vec<NaiveDate> = (1..=horizon as i64)
            .map(|offset| last_date + Duration::days(offset))
            .collect();

        ForecastResult::new(dates, level_forecasts)
    }

    fn fitted(&self) -> Result<ForecastResult> {
        // On the level scale the one-step error equals the differenced-scale
        // residual, so fitted = observed - residual. The first d observations
        // have no residual and are passed through unchanged.
        let d = self.order.d;
        let mut fitted = Vec::with_capacity(self.historical_data.len());
        for (t, &value) in self.historical_data.iter().enumerate() {
            if t < d {
                fitted.push(value);
            } else {
                fitted.push(value - self.residuals[t - d]);
            }
        }

        ForecastResult::new(self.dates.clone(), fitted)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Estimate ARMA(p, q) coefficients on a (differenced) series via the
/// Hannan-Rissanen procedure
///
/// Stage one fits a long autoregression to proxy the unobserved shocks;
/// stage two regresses the value on p value-lags and q shock-lags.
fn estimate_arma(w: &[f64], p: usize, q: usize) -> Result<(f64, Vec<f64>, Vec<f64>)> {
    let n = w.len();

    if p == 0 && q == 0 {
        let mean = w.iter().sum::<f64>() / n as f64;
        return Ok((mean, Vec::new(), Vec::new()));
    }

    let shocks = if q == 0 {
        Vec::new()
    } else {
        long_ar_residuals(w, p, q)?
    };

    let start = if q == 0 {
        p
    } else {
        p.max(long_ar_order(n, p, q) + q)
    };
    if n <= start + p + q + 1 {
        return Err(CostError::ModelFit(format!(
            "Insufficient data to estimate ARMA({},{}) on {} observations",
            p, q, n
        )));
    }

    let mut responses = Vec::new();
    let mut rows = Vec::new();
    for t in start..n {
        let mut row = Vec::with_capacity(1 + p + q);
        row.push(1.0);
        for i in 1..=p {
            row.push(w[t - i]);
        }
        for j in 1..=q {
            row.push(shocks[t - j]);
        }
        rows.push(row);
        responses.push(w[t]);
    }

    let fit = ols(&responses, &rows)
        .map_err(|e| CostError::ModelFit(format!("ARMA regression failed: {}", e)))?;

    let intercept = fit.coefficients[0];
    let ar = fit.coefficients[1..=p].to_vec();
    let ma = fit.coefficients[p + 1..].to_vec();

    Ok((intercept, ar, ma))
}

/// Order of the stage-one long autoregression
fn long_ar_order(n: usize, p: usize, q: usize) -> usize {
    let by_length = (2.0 * (n as f64).ln()).round() as usize;
    by_length.max(p + q).min(n.saturating_sub(p + q + 3) / 2)
}

/// Residuals of a long AR fit, used as shock proxies; zeros where the
/// autoregression has no lags yet
fn long_ar_residuals(w: &[f64], p: usize, q: usize) -> Result<Vec<f64>> {
    let n = w.len();
    let m = long_ar_order(n, p, q);
    if m == 0 || n <= 2 * m + 2 {
        return Err(CostError::ModelFit(format!(
            "Series of {} observations is too short for shock estimation",
            n
        )));
    }

    let mut responses = Vec::new();
    let mut rows = Vec::new();
    for t in m..n {
        let mut row = Vec::with_capacity(m + 1);
        row.push(1.0);
        for i in 1..=m {
            row.push(w[t - i]);
        }
        rows.push(row);
        responses.push(w[t]);
    }

    let fit = ols(&responses, &rows)
        .map_err(|e| CostError::ModelFit(format!("Long AR stage failed: {}", e)))?;

    let mut residuals = vec![0.0; n];
    for t in m..n {
        let mut predicted = fit.coefficients[0];
        for i in 1..=m {
            predicted += fit.coefficients[i] * w[t - i];
        }
        residuals[t] = w[t] - predicted;
    }

    Ok(residuals)
}

/// Conditional (CSS-style) residuals of the fitted ARMA equation, with
/// unavailable lags treated as zero
fn conditional_residuals(w: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; w.len()];
    for t in 0..w.len() {
        let mut predicted = intercept;
        for (i, phi) in ar.iter().enumerate() {
            if t > i {
                predicted += phi * w[t - 1 - i];
            }
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                predicted += theta * residuals[t - 1 - j];
            }
        }
        residuals[t] = w[t] - predicted;
    }
    residuals
}
