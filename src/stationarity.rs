//! Stationarity testing and ARIMA order selection

use crate::error::{CostError, Result};
use crate::models::ModelOrder;
use crate::stats::{acf, ols, pacf};
use tracing::debug;

/// Significance level for the stationarity decisions
const ADF_ALPHA: f64 = 0.05;

/// Most differencing passes the selector will apply
const MAX_DIFFERENCING: usize = 2;

/// Augmented Dickey-Fuller test outcome
#[derive(Debug, Clone)]
pub struct AdfResult {
    /// The tau statistic of the lagged-level coefficient
    pub statistic: f64,
    /// Approximate p-value under the unit-root null
    pub p_value: f64,
    /// Number of lagged difference terms, chosen by AIC
    pub lags: usize,
    /// Observations used in the final regression
    pub nobs: usize,
}

/// Diagnostics produced while selecting an order
#[derive(Debug, Clone)]
pub struct StationarityDiagnostics {
    /// ADF p-value of the raw series
    pub raw_p_value: f64,
    /// Variance-stabilized series (sqrt + differencing), or the raw series
    /// when it already tested stationary
    pub stabilized: Vec<f64>,
    /// ADF p-value of the stabilized series
    pub stabilized_p_value: f64,
    /// Lag count examined for the ACF/PACF cutoffs
    pub nlags: usize,
    /// Confidence band the cutoff search compared against
    pub band: f64,
}

/// First-order differences of a series
pub fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

// Asymptotic quantiles of the Dickey-Fuller tau distribution, constant case
// (MacKinnon). The p-value is interpolated linearly between them.
const TAU_QUANTILES: [(f64, f64); 9] = [
    (-3.43, 0.010),
    (-3.12, 0.025),
    (-2.86, 0.050),
    (-2.57, 0.100),
    (-1.57, 0.500),
    (-0.44, 0.900),
    (-0.07, 0.950),
    (0.23, 0.975),
    (0.60, 0.990),
];

fn mackinnon_p_value(statistic: f64) -> f64 {
    let (first, last) = (TAU_QUANTILES[0], TAU_QUANTILES[TAU_QUANTILES.len() - 1]);
    if statistic <= first.0 {
        return 0.001;
    }
    if statistic >= last.0 {
        return 0.999;
    }

    for pair in TAU_QUANTILES.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if statistic <= hi.0 {
            let frac = (statistic - lo.0) / (hi.0 - lo.0);
            return lo.1 + frac * (hi.1 - lo.1);
        }
    }

    last.1
}

/// Augmented Dickey-Fuller unit-root test, regression with constant
///
/// The number of lagged difference terms is selected by AIC over a common
/// sample, then the reported regression is refit on the full usable sample.
pub fn adf_test(series: &[f64]) -> Result<AdfResult> {
    let n = series.len();
    if n < 8 {
        return Err(CostError::Degenerate(format!(
            "ADF test needs at least 8 observations, got {}",
            n
        )));
    }

    let mean = series.iter().sum::<f64>() / n as f64;
    if series.iter().all(|x| (x - mean).abs() < 1e-12) {
        // A flat series has nothing left to difference away
        return Ok(AdfResult {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            lags: 0,
            nobs: n,
        });
    }

    let dy = difference(series);
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    let max_lag = schwert.min((n.saturating_sub(6)) / 3);

    // Pick the lag count on the common sample so the AICs are comparable
    let mut best = (0usize, f64::INFINITY);
    for k in 0..=max_lag {
        if let Ok(fit) = adf_regression(series, &dy, k, max_lag) {
            let aic = fit.aic();
            if aic < best.1 {
                best = (k, aic);
            }
        }
    }

    let lags = best.0;
    let fit = adf_regression(series, &dy, lags, lags)?;
    let statistic = if fit.std_errors[1] > 0.0 {
        fit.coefficients[1] / fit.std_errors[1]
    } else {
        return Err(CostError::Math(
            "ADF regression produced a zero standard error".to_string(),
        ));
    };

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        lags,
        nobs: fit.nobs,
    })
}

/// The Dickey-Fuller regression with `lags` difference terms, starting the
/// sample at `start_lag` so different lag counts can share observations
fn adf_regression(
    series: &[f64],
    dy: &[f64],
    lags: usize,
    start_lag: usize,
) -> Result<crate::stats::OlsFit> {
    let mut responses = Vec::new();
    let mut rows = Vec::new();

    for i in start_lag..dy.len() {
        let mut row = Vec::with_capacity(lags + 2);
        row.push(1.0);
        row.push(series[i]);
        for j in 1..=lags {
            row.push(dy[i - j]);
        }
        rows.push(row);
        responses.push(dy[i]);
    }

    ols(&responses, &rows)
}

/// Square-root transform followed by differencing until the series tests
/// stationary, capped at two passes
///
/// The result is diagnostic output only; the forecaster fits the original
/// series. Kept separate from the differencing-order search on purpose.
fn stabilize(series: &[f64], raw: &AdfResult) -> Result<(Vec<f64>, f64)> {
    if raw.p_value <= ADF_ALPHA {
        return Ok((series.to_vec(), raw.p_value));
    }

    let transformed: Vec<f64> = series.iter().map(|x| x.sqrt()).collect();
    let mut stabilized = difference(&transformed);
    let mut result = adf_test(&stabilized)?;
    if result.p_value > ADF_ALPHA {
        stabilized = difference(&stabilized);
        result = adf_test(&stabilized)?;
    }

    Ok((stabilized, result.p_value))
}

/// Index of the first lag whose magnitude drops inside the confidence band,
/// minus one, floored at zero
///
/// When no lag qualifies the search lands on index 0, which the floor turns
/// into an order of 0 as well.
fn cutoff_order(values: &[f64], band: f64) -> usize {
    let first = values
        .iter()
        .position(|v| v.abs() < band)
        .unwrap_or(0);
    first.saturating_sub(1)
}

/// Select an ARIMA order for a cost series from its stationarity and
/// autocorrelation structure
pub fn select_order(costs: &[f64]) -> Result<(ModelOrder, StationarityDiagnostics)> {
    let raw = adf_test(costs)?;
    let (stabilized, stabilized_p_value) = stabilize(costs, &raw)?;

    // The differencing order comes from this loop, not from the stabilized
    // series above
    let mut working = costs.to_vec();
    let mut d = 0;
    let mut p_value = raw.p_value;
    while p_value > ADF_ALPHA && d < MAX_DIFFERENCING {
        working = difference(&working);
        d += 1;
        p_value = adf_test(&working)?.p_value;
    }

    let nlags = (costs.len() / 2).saturating_sub(1);
    let band = 1.96 / (working.len() as f64).sqrt();

    let pacf_values = pacf(&working, nlags)?;
    let p = cutoff_order(&pacf_values, band);

    let acf_values = acf(&working, nlags)?;
    let q = cutoff_order(&acf_values, band);

    let order = ModelOrder { p, d, q };
    debug!(
        raw_p = raw.p_value,
        stabilized_p = stabilized_p_value,
        differenced_p = p_value,
        p, d, q, "selected model order"
    );

    Ok((
        order,
        StationarityDiagnostics {
            raw_p_value: raw.p_value,
            stabilized,
            stabilized_p_value,
            nlags,
            band,
        },
    ))
}
