//! Outlier threshold calibration against an unsupervised anomaly scorer

use crate::error::Result;
use tracing::debug;

pub mod isolation_forest;

pub use isolation_forest::IsolationForest;

/// Step the threshold search decrements by on every iteration
pub const THRESHOLD_STEP: f64 = 1e-4;

/// Inputs of a calibration run
#[derive(Debug, Clone)]
pub struct CalibrationParams {
    /// Starting threshold for the search
    pub initial_threshold: f64,
    /// Detection accuracy the search aims for, in percent
    pub target_accuracy: f64,
    /// Hard cap on decrement steps
    pub max_iterations: usize,
}

/// Calibrated threshold and the accuracy it achieved
///
/// Budget exhaustion is not an error; the best-effort threshold is returned
/// with whatever accuracy was reached, and `iterations` shows whether the
/// cap was hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCalibration {
    /// Final threshold value
    pub threshold: f64,
    /// Accuracy achieved at that threshold, in percent
    pub accuracy: f64,
    /// Decrement steps actually performed
    pub iterations: usize,
}

/// Calibrate an outlier-score threshold for one cost series
///
/// Fits the fixed-hyperparameter isolation forest on the cost column,
/// then walks the threshold down from the starting point until the share of
/// points scoring below it reaches the target fraction of the points the
/// model itself labeled anomalous. With a fixed model seed the result is
/// reproducible for identical input.
pub fn calibrate_threshold(
    costs: &[f64],
    params: &CalibrationParams,
) -> Result<ThresholdCalibration> {
    let forest = IsolationForest::fit(costs)?;
    let decisions: Vec<f64> = costs.iter().map(|&c| forest.decision_function(c)).collect();
    let anomalous = decisions.iter().filter(|d| **d < 0.0).count();

    // Share of model-flagged anomalies captured below the candidate
    // threshold; defined as 0 when the model flagged nothing
    let accuracy_at = |threshold: f64| -> f64 {
        if anomalous == 0 {
            return 0.0;
        }
        let below = decisions.iter().filter(|d| **d < threshold).count();
        100.0 * below as f64 / anomalous as f64
    };

    let mut threshold = params.initial_threshold;
    let mut accuracy = accuracy_at(threshold);
    let mut iterations = 0;

    while accuracy < params.target_accuracy && iterations < params.max_iterations {
        threshold -= THRESHOLD_STEP;
        accuracy = accuracy_at(threshold);
        iterations += 1;
    }

    if accuracy < params.target_accuracy {
        debug!(
            threshold,
            accuracy,
            target = params.target_accuracy,
            iterations,
            "calibration stopped on iteration budget"
        );
    }

    Ok(ThresholdCalibration {
        threshold,
        accuracy,
        iterations,
    })
}
