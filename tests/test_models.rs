use chrono::NaiveDate;
use cost_forecast::data::{CostRecord, ServiceCostSeries};
use cost_forecast::error::CostError;
use cost_forecast::models::arima::ArimaModel;
use cost_forecast::models::{ForecastModel, ForecastResult, ModelOrder, TrainedForecastModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn series_from_values(values: Vec<f64>) -> ServiceCostSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let records = values
        .into_iter()
        .enumerate()
        .map(|(i, cost)| CostRecord {
            date: start + chrono::Duration::days(i as i64),
            service: "AmazonEC2".to_string(),
            region: None,
            cost,
        })
        .collect();
    ServiceCostSeries::from_records("AmazonEC2", records).unwrap()
}

fn noisy_level_series(n: usize, level: f64, sigma: f64, seed: u64) -> ServiceCostSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(level, sigma).unwrap();
    series_from_values((0..n).map(|_| dist.sample(&mut rng)).collect())
}

#[test]
fn test_forecast_length_and_date_continuity() {
    let series = noisy_level_series(60, 100.0, 5.0, 3);
    let trained = ArimaModel::new(ModelOrder { p: 1, d: 0, q: 0 })
        .train(&series)
        .unwrap();

    let forecast = trained.forecast(7).unwrap();
    assert_eq!(forecast.len(), 7);

    // First forecast date is exactly one day past the last observation
    let expected_start = series.last_date() + chrono::Duration::days(1);
    assert_eq!(forecast.dates()[0], expected_start);
    for pair in forecast.dates().windows(2) {
        assert_eq!(pair[1] - pair[0], chrono::Duration::days(1));
    }
}

#[test]
fn test_mean_model_forecasts_the_mean() {
    let series = noisy_level_series(40, 250.0, 1.0, 5);
    let trained = ArimaModel::new(ModelOrder { p: 0, d: 0, q: 0 })
        .train(&series)
        .unwrap();

    let forecast = trained.forecast(5).unwrap();
    for value in forecast.values() {
        assert!((value - series.mean()).abs() < 1e-9);
    }
}

#[test]
fn test_differenced_model_continues_a_linear_trend() {
    // Pure trend: after one difference the series is a constant slope, so
    // the forecast walks on at exactly that slope
    let values: Vec<f64> = (0..30).map(|t| 5.0 + 2.0 * t as f64).collect();
    let last = *values.last().unwrap();
    let series = series_from_values(values);

    let trained = ArimaModel::new(ModelOrder { p: 0, d: 1, q: 0 })
        .train(&series)
        .unwrap();
    let forecast = trained.forecast(4).unwrap();

    for (step, value) in forecast.values().iter().enumerate() {
        let expected = last + 2.0 * (step as f64 + 1.0);
        assert!((value - expected).abs() < 1e-6, "step {}: {}", step, value);
    }
}

#[test]
fn test_autoregressive_forecasts_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(11);
    let dist = Normal::new(0.0, 1.0).unwrap();
    let mut values = vec![100.0];
    for t in 1..200 {
        let next = 100.0 + 0.8 * (values[t - 1] - 100.0) + dist.sample(&mut rng);
        values.push(next);
    }
    let series = series_from_values(values);

    let trained = ArimaModel::new(ModelOrder { p: 1, d: 0, q: 1 })
        .train(&series)
        .unwrap();
    let forecast = trained.forecast(7).unwrap();

    for value in forecast.values() {
        assert!(value.is_finite());
        assert!(*value > 80.0 && *value < 120.0, "forecast {}", value);
    }
}

#[test]
fn test_fitted_values_cover_the_sample() {
    let series = noisy_level_series(50, 10.0, 1.0, 7);
    let trained = ArimaModel::new(ModelOrder { p: 1, d: 1, q: 0 })
        .train(&series)
        .unwrap();

    let fitted = trained.fitted().unwrap();
    assert_eq!(fitted.len(), series.len());
    assert_eq!(fitted.dates(), series.dates());

    let mae = fitted.mean_absolute_error(series.costs()).unwrap();
    assert!(mae.is_finite());
}

#[test]
fn test_constant_series_is_rejected() {
    let series = series_from_values(vec![3.0; 30]);
    let result = ArimaModel::new(ModelOrder { p: 1, d: 0, q: 0 }).train(&series);
    assert!(matches!(result, Err(CostError::ModelFit(_))));
}

#[test]
fn test_insufficient_data_is_rejected() {
    let series = series_from_values(vec![1.0, 2.0, 3.0]);
    let result = ArimaModel::new(ModelOrder { p: 1, d: 0, q: 1 }).train(&series);
    assert!(matches!(result, Err(CostError::ModelFit(_))));
}

#[test]
fn test_zero_horizon_is_rejected() {
    let series = noisy_level_series(30, 50.0, 2.0, 9);
    let trained = ArimaModel::new(ModelOrder { p: 0, d: 0, q: 0 })
        .train(&series)
        .unwrap();
    assert!(matches!(
        trained.forecast(0),
        Err(CostError::Validation(_))
    ));
}

#[test]
fn test_forecast_result_validates_lengths() {
    let dates = vec![NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()];
    let result = ForecastResult::new(dates, vec![1.0, 2.0]);
    assert!(matches!(result, Err(CostError::Validation(_))));
}
