use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Column names of the eight address fields, in store order
pub const ADDRESS_FIELDS: [&str; 8] = [
    "house_number",
    "road",
    "suburb",
    "city",
    "state",
    "region",
    "postcode",
    "country",
];

/// Fully described address with its ground-truth coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub house_number: String,
    pub road: String,
    pub suburb: String,
    pub city: String,
    pub state: String,
    pub region: String,
    pub postcode: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl AddressRecord {
    /// The eight address fields paired with their column names
    pub fn address_fields(&self) -> [(&'static str, &str); 8] {
        [
            (ADDRESS_FIELDS[0], self.house_number.as_str()),
            (ADDRESS_FIELDS[1], self.road.as_str()),
            (ADDRESS_FIELDS[2], self.suburb.as_str()),
            (ADDRESS_FIELDS[3], self.city.as_str()),
            (ADDRESS_FIELDS[4], self.state.as_str()),
            (ADDRESS_FIELDS[5], self.region.as_str()),
            (ADDRESS_FIELDS[6], self.postcode.as_str()),
            (ADDRESS_FIELDS[7], self.country.as_str()),
        ]
    }

    /// Short human-readable label used in reports
    pub fn label(&self) -> String {
        format!("{} {}, {}", self.house_number, self.road, self.city)
    }

    /// Check that every address field is filled and the coordinate is on the globe
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.address_fields() {
            if value.trim().is_empty() {
                anyhow::bail!("Address record '{}' has an empty '{}' field", self.label(), name);
            }
        }
        validate_coordinate(self.lat, self.lon)
    }
}

/// Free-text place description paired with its ground-truth coordinate.
/// Curated queries and scraped landmarks share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl QueryRecord {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Query record at {},{} has an empty name", self.lat, self.lon);
        }
        validate_coordinate(self.lat, self.lon)
    }
}

/// Coordinate pair built so that at least one axis is outside its valid range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPair {
    pub lat: f64,
    pub lon: f64,
}

impl BoundaryPair {
    pub fn latitude_valid(&self) -> bool {
        is_valid_latitude(self.lat)
    }

    pub fn longitude_valid(&self) -> bool {
        is_valid_longitude(self.lon)
    }

    pub fn label(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lon)
    }
}

pub fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon)
}

/// Reject coordinates outside lat [-90,90] / lon [-180,180] (NaN included)
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<()> {
    if !is_valid_latitude(lat) {
        anyhow::bail!("Latitude {} is outside [-90, 90]", lat);
    }
    if !is_valid_longitude(lon) {
        anyhow::bail!("Longitude {} is outside [-180, 180]", lon);
    }
    Ok(())
}
