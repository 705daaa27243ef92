//! Regression and autocorrelation primitives shared by the diagnostic
//! and model-fitting code

use crate::error::{CostError, Result};

/// Ordinary least squares fit
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Number of observations used
    pub nobs: usize,
}

impl OlsFit {
    /// Akaike information criterion of the fit, Gaussian likelihood
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.coefficients.len() as f64;
        n * (self.ssr / n).ln() + 2.0 * k
    }
}

/// Fit y = X b by ordinary least squares
///
/// `rows` holds one design row per observation. Fails on underdetermined or
/// singular systems.
pub fn ols(y: &[f64], rows: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if n == 0 || rows.len() != n {
        return Err(CostError::Math(
            "OLS requires equally many responses and design rows".to_string(),
        ));
    }
    let k = rows[0].len();
    if k == 0 || n <= k {
        return Err(CostError::Math(format!(
            "OLS needs more observations ({}) than parameters ({})",
            n, k
        )));
    }

    // Normal equations: (X'X) b = X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in rows.iter().zip(y.iter()) {
        if row.len() != k {
            return Err(CostError::Math("Ragged design matrix".to_string()));
        }
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let coefficients = solve(&xtx, &xty)?;

    let mut ssr = 0.0;
    for (row, &yi) in rows.iter().zip(y.iter()) {
        let fitted: f64 = row.iter().zip(coefficients.iter()).map(|(x, b)| x * b).sum();
        ssr += (yi - fitted).powi(2);
    }

    // Var(b) = s^2 (X'X)^-1; only the diagonal is needed
    let sigma2 = ssr / (n - k) as f64;
    let mut std_errors = Vec::with_capacity(k);
    for j in 0..k {
        let mut unit = vec![0.0; k];
        unit[j] = 1.0;
        let col = solve(&xtx, &unit)?;
        std_errors.push((sigma2 * col[j]).max(0.0).sqrt());
    }

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
    })
}

/// Solve A x = b by Gaussian elimination with partial pivoting
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &bi)| {
            let mut r = row.clone();
            r.push(bi);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap();
        if m[pivot][col].abs() < 1e-12 {
            return Err(CostError::Math("Singular system".to_string()));
        }
        m.swap(col, pivot);

        let pivot_row = m[col].clone();
        for row in (col + 1)..n {
            let factor = m[row][col] / pivot_row[col];
            for j in col..=n {
                m[row][j] -= factor * pivot_row[j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = m[row][n];
        for j in (row + 1)..n {
            acc -= m[row][j] * x[j];
        }
        x[row] = acc / m[row][row];
    }

    Ok(x)
}

/// Sample autocorrelation function up to `nlags`, index 0 included
///
/// Uses the biased estimator (denominator n), so the sequence always starts
/// at exactly 1.
pub fn acf(series: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let n = series.len();
    if n < 2 {
        return Err(CostError::Degenerate(
            "Autocorrelation needs at least 2 observations".to_string(),
        ));
    }

    let nlags = nlags.min(n - 1);
    let mean = series.iter().sum::<f64>() / n as f64;
    let denom: f64 = series.iter().map(|x| (x - mean).powi(2)).sum();
    if denom == 0.0 {
        return Err(CostError::Degenerate(
            "Autocorrelation of a constant series".to_string(),
        ));
    }

    let mut values = Vec::with_capacity(nlags + 1);
    for lag in 0..=nlags {
        let cov: f64 = (lag..n)
            .map(|t| (series[t] - mean) * (series[t - lag] - mean))
            .sum();
        values.push(cov / denom);
    }

    Ok(values)
}

/// Partial autocorrelation function up to `nlags`, index 0 included
///
/// Durbin-Levinson recursion on the sample autocorrelations.
pub fn pacf(series: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let n = series.len();
    let nlags = nlags.min(n.saturating_sub(1));
    let r = acf(series, nlags)?;

    let mut values = vec![1.0];
    if nlags == 0 {
        return Ok(values);
    }

    // prev[j]: coefficient j of the autoregression one order down
    let mut prev = vec![0.0; nlags + 1];
    prev[1] = r[1];
    values.push(r[1]);

    for k in 2..=nlags {
        let num = r[k] - (1..k).map(|j| prev[j] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| prev[j] * r[j]).sum::<f64>();
        let phi_kk = if den.abs() < 1e-12 { 0.0 } else { num / den };

        let mut next = vec![0.0; nlags + 1];
        next[k] = phi_kk;
        for j in 1..k {
            next[j] = prev[j] - phi_kk * prev[k - j];
        }
        prev = next;
        values.push(phi_kk);
    }

    Ok(values)
}
