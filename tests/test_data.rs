use cost_forecast::data::{ColumnSpec, DataLoader, ServiceCostSeries};
use cost_forecast::error::CostError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_sample_table() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_servicecode,product_region_code,cost").unwrap();
    // Dates deliberately out of order
    writeln!(file, "2023-01-03,AmazonS3,eu-west-1,3.5").unwrap();
    writeln!(file, "2023-01-01,AmazonS3,eu-west-1,1.5").unwrap();
    writeln!(file, "2023-01-02,AmazonS3,eu-west-1,2.5").unwrap();
    writeln!(file, "2023-01-01,AmazonEC2,eu-west-1,10.0").unwrap();
    writeln!(file, "2023-01-02,AmazonEC2,eu-west-1,11.0").unwrap();
    file
}

#[test]
fn test_loader_reads_combined_table() {
    let file = write_sample_table();
    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();

    assert_eq!(table.len(), 5);
    assert!(!table.is_empty());
    assert_eq!(table.records().unwrap().len(), 5);
}

#[test]
fn test_partitioner_sorts_by_date() {
    let file = write_sample_table();
    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();

    let series = table.service_series("AmazonS3").unwrap();
    assert_eq!(series.service(), "AmazonS3");
    assert_eq!(series.len(), 3);
    assert_eq!(series.costs(), &[1.5, 2.5, 3.5]);

    let dates = series.dates();
    assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(series.last_date().to_string(), "2023-01-03");
}

#[test]
fn test_partition_covers_all_services() {
    let file = write_sample_table();
    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();

    let partitions = table.partition().unwrap();
    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions["AmazonEC2"].len(), 2);
    assert_eq!(partitions["AmazonS3"].len(), 3);
}

#[test]
fn test_missing_service_is_signaled() {
    let file = write_sample_table();
    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();

    let result = table.service_series("AWSConfig");
    assert!(matches!(
        result,
        Err(CostError::MissingServiceData { service }) if service == "AWSConfig"
    ));
}

#[test]
fn test_missing_required_column_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_servicecode").unwrap();
    writeln!(file, "2023-01-01,AmazonS3").unwrap();

    let result = DataLoader::from_csv(file.path(), ColumnSpec::default());
    assert!(matches!(result, Err(CostError::Data(_))));
}

#[test]
fn test_region_column_is_optional() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_servicecode,cost").unwrap();
    writeln!(file, "2023-01-01,AmazonS3,1.0").unwrap();
    writeln!(file, "2023-01-02,AmazonS3,2.0").unwrap();

    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();
    let records = table.records().unwrap();
    assert!(records.iter().all(|r| r.region.is_none()));
}

#[test]
fn test_time_interval_suffix_is_stripped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,product_servicecode,cost").unwrap();
    writeln!(file, "2023-01-01T00:00:00Z/2023-01-02T00:00:00Z,awskms,0.2").unwrap();

    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();
    let series = table.service_series("awskms").unwrap();
    assert_eq!(series.dates()[0].to_string(), "2023-01-01");
}

#[test]
fn test_series_rejects_empty_records() {
    let result = ServiceCostSeries::from_records("AmazonVPC", Vec::new());
    assert!(matches!(
        result,
        Err(CostError::MissingServiceData { .. })
    ));
}

#[test]
fn test_series_statistics() {
    let file = write_sample_table();
    let table = DataLoader::from_csv(file.path(), ColumnSpec::default()).unwrap();
    let series = table.service_series("AmazonS3").unwrap();

    assert!((series.mean() - 2.5).abs() < 1e-12);
    assert!(series.std_dev() > 0.0);
}
