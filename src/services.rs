//! Enumerated cloud services whose costs are modeled independently

use serde::{Deserialize, Serialize};

/// One supported cloud service and its calibration defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Stable service identifier as it appears in the billing table
    pub code: String,
    /// File-name fragment used for this service's forecast file
    pub slug: String,
    /// Starting point for the outlier-threshold search
    pub initial_threshold: f64,
}

impl ServiceSpec {
    /// Create a service spec
    pub fn new(code: &str, slug: &str, initial_threshold: f64) -> Self {
        Self {
            code: code.to_string(),
            slug: slug.to_string(),
            initial_threshold,
        }
    }
}

/// The default set of supported services
///
/// Initial thresholds are per-service starting points for the calibration
/// search; they differ by orders of magnitude because the services' cost
/// scales do.
pub fn default_services() -> Vec<ServiceSpec> {
    vec![
        ServiceSpec::new("AmazonCloudWatch", "amazoncloudwatch", 0.0005),
        ServiceSpec::new("AmazonEKS", "amazonEKS", 1.5),
        ServiceSpec::new("AmazonVPC", "amazonVPC", 0.1),
        ServiceSpec::new("AmazonS3", "amazonS3", 0.00001),
        ServiceSpec::new("AmazonEC2", "amazonEC2", 0.3),
        ServiceSpec::new("AWSConfig", "awsConfig", 0.5),
        ServiceSpec::new("awskms", "awskms", 0.05),
        ServiceSpec::new("Compute Engine", "compute_engine", 14.0),
        ServiceSpec::new("Kubernetes Engine", "kubernetes_engine", 5.35),
        ServiceSpec::new("Networking", "networking", 1.4),
    ]
}
