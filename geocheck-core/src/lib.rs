use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

pub mod generators;
pub mod harness;
pub mod landmarks;
pub mod records;
pub mod seeding;
pub mod store;
pub mod suite;
pub mod transport;

// Re-export public types
pub use harness::{Rule, Verdict};
pub use landmarks::{LandmarkSource, OpenariumSource};
pub use records::{AddressRecord, BoundaryPair, QueryRecord};
pub use store::RecordStore;
pub use suite::{CaseOutcome, Outcome, SuiteReport, VerificationSuite};
pub use transport::{GeocodingTransport, NominatimClient};

/// Configuration options for a verification session
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the Nominatim-compatible service (without `/search`)
    pub base_url: String,
    /// Directory the record tables are regenerated into
    pub data_dir: PathBuf,
    /// Scrape the landmark table from `landmarks_url` (otherwise it stays empty)
    pub scrape_landmarks: bool,
    /// Listing page landmarks are scraped from
    pub landmarks_url: String,
    /// Seed for the probe generators; a random one is drawn and logged when unset
    pub seed: Option<u64>,
    /// Boundary pairs per generation mode (bad latitude, bad longitude)
    pub probe_count: usize,
    /// Number of garbage free-text queries
    pub garbage_count: usize,
    /// Bound for structured forward lookups, in degrees
    pub structured_tolerance: f64,
    /// Bound for free-text forward lookups, in degrees
    pub free_text_tolerance: f64,
    /// Minimum spacing between requests to the service
    pub request_interval: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: transport::DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("geocheck-data"),
            scrape_landmarks: true,
            landmarks_url: landmarks::DEFAULT_LANDMARKS_URL.to_string(),
            seed: None,
            probe_count: 5,
            garbage_count: 5,
            structured_tolerance: harness::STRUCTURED_TOLERANCE_DEG,
            free_text_tolerance: harness::FREE_TEXT_TOLERANCE_DEG,
            request_interval: Duration::from_secs(1), // Nominatim allows 1 request per second
            timeout: Duration::from_secs(30),
        }
    }
}

/// Seed the store, then verify every record against the live service
pub fn run_session(config: &HarnessConfig) -> Result<SuiteReport> {
    let store = RecordStore::new(config.data_dir.clone());

    let source = if config.scrape_landmarks {
        Some(OpenariumSource::new(&config.landmarks_url, config.timeout)?)
    } else {
        None
    };
    seeding::seed_store(&store, source.as_ref().map(|s| s as &dyn LandmarkSource))?;

    let client = NominatimClient::new(&config.base_url, config.timeout, config.request_interval)?;
    log::info!("Verifying {}", client.base_url());

    VerificationSuite::new(config, &client).run(&store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.structured_tolerance, 0.0001);
        assert_eq!(config.free_text_tolerance, 1.0);
        assert_eq!(config.probe_count, 5);
        assert_eq!(config.garbage_count, 5);
        assert!(config.base_url.starts_with("https://"));
        assert!(config.seed.is_none());
    }
}
