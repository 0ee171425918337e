use anyhow::{Context, Result};
use serde::Deserialize;
use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::records::AddressRecord;

/// Public Nominatim instance
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Black box that performs one geocoding request and hands back status and body
pub trait GeocodingTransport {
    /// Address or text to coordinates (`/search`)
    fn forward(&self, query: &ForwardQuery) -> Result<LookupResponse>;

    /// Coordinates to address (`/reverse`)
    fn reverse(&self, lat: f64, lon: f64) -> Result<LookupResponse>;
}

/// Structured search fields understood by Nominatim
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredAddress {
    pub street: String,
    pub city: String,
    pub county: String,
    pub state: String,
    pub country: String,
    pub postalcode: String,
}

impl From<&AddressRecord> for StructuredAddress {
    fn from(record: &AddressRecord) -> Self {
        Self {
            street: format!("{} {}", record.house_number, record.road),
            city: record.city.clone(),
            county: record.suburb.clone(),
            state: record.state.clone(),
            country: record.country.clone(),
            postalcode: record.postcode.clone(),
        }
    }
}

/// Forward lookup request: free text or structured fields, never both
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardQuery {
    FreeText(String),
    Structured(StructuredAddress),
}

impl ForwardQuery {
    /// Query-string parameters, always asking for JSON output
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = match self {
            ForwardQuery::FreeText(q) => vec![("q", q.clone())],
            ForwardQuery::Structured(address) => vec![
                ("street", address.street.clone()),
                ("city", address.city.clone()),
                ("county", address.county.clone()),
                ("state", address.state.clone()),
                ("country", address.country.clone()),
                ("postalcode", address.postalcode.clone()),
            ],
        };
        params.push(("format", "json".to_string()));
        params
    }
}

pub fn reverse_params(lat: f64, lon: f64) -> Vec<(&'static str, String)> {
    vec![
        ("lat", lat.to_string()),
        ("lon", lon.to_string()),
        ("format", "json".to_string()),
    ]
}

/// Raw outcome of one request
#[derive(Debug, Clone)]
pub struct LookupResponse {
    pub status: u16,
    pub body: String,
}

/// One forward-search candidate; Nominatim encodes coordinates as strings
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub lat: String,
    pub lon: String,
}

impl Candidate {
    pub fn coordinate(&self) -> Result<(f64, f64)> {
        let lat = self
            .lat
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Candidate latitude '{}' is not a number", self.lat))?;
        let lon = self
            .lon
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Candidate longitude '{}' is not a number", self.lon))?;
        Ok((lat, lon))
    }
}

/// Reverse lookup body: a resolved address or an error marker
#[derive(Debug, Clone, Deserialize)]
pub struct ReverseBody {
    pub address: Option<serde_json::Map<String, serde_json::Value>>,
    pub error: Option<serde_json::Value>,
}

impl LookupResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).with_context(|| {
            format!(
                "Response body is not JSON (status {}): {}",
                self.status,
                snippet(&self.body)
            )
        })
    }

    /// Forward candidates, best first
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        serde_json::from_str(&self.body).with_context(|| {
            format!(
                "Response body is not a candidate list (status {}): {}",
                self.status,
                snippet(&self.body)
            )
        })
    }

    pub fn reverse_body(&self) -> Result<ReverseBody> {
        serde_json::from_str(&self.body).with_context(|| {
            format!(
                "Response body is not a reverse result (status {}): {}",
                self.status,
                snippet(&self.body)
            )
        })
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(120).collect()
}

/// Blocking HTTP client for a Nominatim-compatible service
pub struct NominatimClient {
    base_url: String,
    client: reqwest::blocking::Client,
    request_interval: Duration,
    last_request: Cell<Option<Instant>>,
}

impl NominatimClient {
    pub fn new(base_url: &str, timeout: Duration, request_interval: Duration) -> Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent
        let user_agent = format!(
            "geocheck/{} (geocoding verification harness)",
            env!("CARGO_PKG_VERSION")
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            request_interval,
            last_request: Cell::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sleep until `request_interval` has passed since the previous request
    fn throttle(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.request_interval {
                let wait = self.request_interval - elapsed;
                log::debug!("Rate limiting: waiting {:?}", wait);
                std::thread::sleep(wait);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> Result<LookupResponse> {
        self.throttle();

        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {}", url))?;

        log::debug!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(LookupResponse { status, body })
    }
}

impl GeocodingTransport for NominatimClient {
    fn forward(&self, query: &ForwardQuery) -> Result<LookupResponse> {
        self.get("search", &query.params())
    }

    fn reverse(&self, lat: f64, lon: f64) -> Result<LookupResponse> {
        self.get("reverse", &reverse_params(lat, lon))
    }
}
