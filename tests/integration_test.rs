use chrono::NaiveDate;
use cost_forecast::error::CostError;
use cost_forecast::ledger::ForecastRecord;
use cost_forecast::pipeline::{Pipeline, PipelineConfig, ServiceOutcome};
use cost_forecast::services::ServiceSpec;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

/// Combined billing table: 60 days of AmazonS3 costs around 100 with a
/// single 1000 spike, plus an AmazonEC2 series too short to forecast
fn write_billing_table(path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "date,product_servicecode,product_region_code,cost").unwrap();

    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let dist = Normal::new(100.0, 5.0).unwrap();

    for day in 0..60 {
        let date = start + chrono::Duration::days(day);
        let cost = if day == 30 { 1000.0 } else { dist.sample(&mut rng) };
        writeln!(file, "{},AmazonS3,eu-west-1,{}", date, cost).unwrap();
    }
    for day in 0..5 {
        let date = start + chrono::Duration::days(day);
        writeln!(file, "{},AmazonEC2,eu-west-1,{}", date, 40.0 + day as f64).unwrap();
    }
}

fn test_config(dir: &Path) -> PipelineConfig {
    let input = dir.join("clean-cost-and-usage-report.csv");
    write_billing_table(&input);

    let mut config = PipelineConfig::new(input, dir.join("out"));
    config.services = vec![
        ServiceSpec::new("AmazonS3", "amazonS3", 0.3),
        ServiceSpec::new("AmazonEC2", "amazonEC2", 0.3),
        ServiceSpec::new("AWSConfig", "awsConfig", 0.5),
    ];
    config.max_workers = 2;
    config
}

#[test]
fn test_batch_isolates_failures_and_writes_artifacts() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger_path = config.ledger_path.clone();
    let forecast_path = config.output_dir.join("forecasted_amazonS3_costs.csv");

    let report = Pipeline::new(config).run().unwrap();
    assert_eq!(report.services.len(), 3);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 2);

    // AmazonS3 completes both branches
    let s3 = &report.services[0];
    assert!(s3.is_success());
    match &s3.outcome {
        ServiceOutcome::Ran {
            calibration: Ok(calibration),
            forecast: Ok(artifact),
        } => {
            assert!(calibration.accuracy >= 95.0 || calibration.iterations == 100);
            assert_eq!(artifact.horizon, 7);
            assert_eq!(
                artifact.first_date,
                NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()
            );
        }
        other => panic!("unexpected AmazonS3 outcome: {:?}", other),
    }

    // AmazonEC2 calibrates but is too short to forecast
    match &report.services[1].outcome {
        ServiceOutcome::Ran {
            calibration,
            forecast,
        } => {
            assert!(calibration.is_ok());
            assert!(matches!(forecast, Err(CostError::ModelFit(_))));
        }
        other => panic!("unexpected AmazonEC2 outcome: {:?}", other),
    }

    // AWSConfig has no rows at all
    match &report.services[2].outcome {
        ServiceOutcome::Skipped { error } => {
            assert!(matches!(error, CostError::MissingServiceData { .. }))
        }
        other => panic!("unexpected AWSConfig outcome: {:?}", other),
    }

    // Ledger holds one line per successful calibration, in config order
    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    let lines: Vec<&str> = ledger.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("AmazonS3, "));
    assert!(lines[1].starts_with("AmazonEC2, "));

    // Forecast file: exactly the horizon, dated past the sample, and far
    // below the injected spike
    let mut reader = csv::Reader::from_path(&forecast_path).unwrap();
    let records: Vec<ForecastRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 7);
    assert_eq!(
        records[0].date,
        NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()
    );
    for record in &records {
        assert_eq!(record.product_servicecode, "AmazonS3");
        assert!(record.forecast.is_finite());
        assert!(record.forecast < 500.0, "forecast {}", record.forecast);
    }
}

#[test]
fn test_rerun_appends_to_the_ledger_but_replaces_forecasts() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger_path = config.ledger_path.clone();
    let forecast_path = config.output_dir.join("forecasted_amazonS3_costs.csv");

    let pipeline = Pipeline::new(config);
    pipeline.run().unwrap();
    pipeline.run().unwrap();

    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(ledger.lines().count(), 4);

    // Reruns append duplicate calibrations while the forecast file stays at
    // one header plus the horizon
    let forecast = std::fs::read_to_string(&forecast_path).unwrap();
    assert_eq!(forecast.lines().count(), 8);
}

#[test]
fn test_deterministic_across_runs() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger_path = config.ledger_path.clone();

    let pipeline = Pipeline::new(config);
    pipeline.run().unwrap();
    pipeline.run().unwrap();

    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    let lines: Vec<&str> = ledger.lines().collect();
    // Same input and seed, same calibrated thresholds
    assert_eq!(lines[0], lines[2]);
    assert_eq!(lines[1], lines[3]);
}
