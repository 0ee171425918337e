//! Evaluation rules: one record, one request, one verdict.
//!
//! Every rule returns `Ok(Verdict)` when the service answered and the answer
//! could be judged, and `Err` only for transport failures (unreachable
//! service, a body that is not JSON where the body is inspected).

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::records::{AddressRecord, BoundaryPair, QueryRecord};
use crate::transport::{ForwardQuery, GeocodingTransport, LookupResponse, StructuredAddress};

/// Structured lookups should land on the building itself (about 11 m)
pub const STRUCTURED_TOLERANCE_DEG: f64 = 0.0001;

/// Free-text lookups may resolve to an area centroid (about 100 km)
pub const FREE_TEXT_TOLERANCE_DEG: f64 = 1.0;

/// Decimal places both coordinates are rounded to before comparison
pub const COMPARE_DECIMALS: usize = 4;

/// Rounded-coordinate steps per degree (one step is 10^-COMPARE_DECIMALS)
const STEPS_PER_DEGREE: f64 = 10_000.0;

/// The evaluation rules the harness knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    ForwardStructuredTolerance,
    ForwardFreeTextTolerance,
    ForwardStructuredStatus,
    ForwardFreeTextStatus,
    ForwardNoMatch,
    ReverseStatus,
    ReverseFieldEquality,
    ReverseErrorSignal,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::ForwardStructuredTolerance => "forward-structured-tolerance",
            Rule::ForwardFreeTextTolerance => "forward-free-text-tolerance",
            Rule::ForwardStructuredStatus => "forward-structured-status",
            Rule::ForwardFreeTextStatus => "forward-free-text-status",
            Rule::ForwardNoMatch => "forward-no-match",
            Rule::ReverseStatus => "reverse-status",
            Rule::ReverseFieldEquality => "reverse-field-equality",
            Rule::ReverseErrorSignal => "reverse-error-signal",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Judgement on a single response
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// The stored double rounded to `COMPARE_DECIMALS` places, as a whole number
/// of steps. Rounding works on the exact binary value, so 1.00005 (stored as
/// 1.0000499...) becomes 10000. `None` for NaN and infinities.
pub fn rounded_steps(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    format!("{:.*}", COMPARE_DECIMALS, value)
        .replace('.', "")
        .parse()
        .ok()
}

/// Tolerance expressed in steps, with float noise below a millionth of a
/// step snapped away (0.0001 is exactly 1 step)
fn tolerance_in_steps(tolerance: f64) -> f64 {
    (tolerance * STEPS_PER_DEGREE * 1e6).round() / 1e6
}

/// Compare rounded coordinates axis by axis against a strict bound
pub fn coordinate_verdict(expected: (f64, f64), actual: (f64, f64), tolerance: f64) -> Verdict {
    let steps = (
        rounded_steps(expected.0),
        rounded_steps(expected.1),
        rounded_steps(actual.0),
        rounded_steps(actual.1),
    );
    let (Some(exp_lat), Some(exp_lon), Some(act_lat), Some(act_lon)) = steps else {
        return Verdict::Fail(format!(
            "coordinate is not a finite number: expected {},{}, got {},{}",
            expected.0, expected.1, actual.0, actual.1
        ));
    };

    let dlat = (exp_lat - act_lat).unsigned_abs();
    let dlon = (exp_lon - act_lon).unsigned_abs();
    let bound = tolerance_in_steps(tolerance);

    if (dlat as f64) < bound && (dlon as f64) < bound {
        Verdict::Pass
    } else {
        Verdict::Fail(format!(
            "coordinate difference exceeds tolerance {}: expected {:.6},{:.6}, got {:.6},{:.6} (delta lat={:.4}, lon={:.4})",
            tolerance,
            expected.0,
            expected.1,
            actual.0,
            actual.1,
            dlat as f64 / STEPS_PER_DEGREE,
            dlon as f64 / STEPS_PER_DEGREE
        ))
    }
}

fn status_verdict(response: &LookupResponse) -> Verdict {
    if response.is_success() {
        Verdict::Pass
    } else {
        Verdict::Fail(format!("unexpected status code: expected 200, got {}", response.status))
    }
}

fn top_candidate_verdict(response: &LookupResponse, expected: (f64, f64), tolerance: f64) -> Result<Verdict> {
    let candidates = response.candidates()?;
    let Some(top) = candidates.first() else {
        return Ok(Verdict::Fail(format!(
            "no candidates returned (status {}), expected {:.6},{:.6}",
            response.status, expected.0, expected.1
        )));
    };
    Ok(coordinate_verdict(expected, top.coordinate()?, tolerance))
}

/// Structured forward lookup must land within `tolerance` of the stored coordinate
pub fn check_forward_structured(
    transport: &dyn GeocodingTransport,
    record: &AddressRecord,
    tolerance: f64,
) -> Result<Verdict> {
    let query = ForwardQuery::Structured(StructuredAddress::from(record));
    let response = transport.forward(&query)?;
    top_candidate_verdict(&response, (record.lat, record.lon), tolerance)
}

/// Free-text forward lookup must land within `tolerance` of the stored coordinate
pub fn check_forward_free_text(
    transport: &dyn GeocodingTransport,
    record: &QueryRecord,
    tolerance: f64,
) -> Result<Verdict> {
    let query = ForwardQuery::FreeText(record.name.clone());
    let response = transport.forward(&query)?;
    top_candidate_verdict(&response, (record.lat, record.lon), tolerance)
}

pub fn check_forward_structured_status(
    transport: &dyn GeocodingTransport,
    record: &AddressRecord,
) -> Result<Verdict> {
    let query = ForwardQuery::Structured(StructuredAddress::from(record));
    Ok(status_verdict(&transport.forward(&query)?))
}

pub fn check_forward_free_text_status(
    transport: &dyn GeocodingTransport,
    record: &QueryRecord,
) -> Result<Verdict> {
    let query = ForwardQuery::FreeText(record.name.clone());
    Ok(status_verdict(&transport.forward(&query)?))
}

/// Garbage text must find nothing
pub fn check_forward_no_match(transport: &dyn GeocodingTransport, text: &str) -> Result<Verdict> {
    let response = transport.forward(&ForwardQuery::FreeText(text.to_string()))?;
    let body = response.json()?;

    let empty = match &body {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };

    if empty {
        Ok(Verdict::Pass)
    } else {
        let count = body.as_array().map(|a| a.len()).unwrap_or(1);
        Ok(Verdict::Fail(format!(
            "query '{}' was unexpectedly resolved ({} result(s))",
            text, count
        )))
    }
}

pub fn check_reverse_status(transport: &dyn GeocodingTransport, lat: f64, lon: f64) -> Result<Verdict> {
    Ok(status_verdict(&transport.reverse(lat, lon)?))
}

/// Reverse lookup on the stored coordinate must reproduce all eight address fields
pub fn check_reverse_fields(transport: &dyn GeocodingTransport, record: &AddressRecord) -> Result<Verdict> {
    let response = transport.reverse(record.lat, record.lon)?;
    let body = response.reverse_body()?;

    let Some(address) = body.address else {
        return Ok(Verdict::Fail(format!(
            "no address in reverse result for {:.6},{:.6}",
            record.lat, record.lon
        )));
    };

    let mismatches: Vec<String> = record
        .address_fields()
        .iter()
        .filter_map(|(name, expected)| {
            let actual = address.get(*name).and_then(|v| v.as_str());
            if actual == Some(*expected) {
                None
            } else {
                Some(format!(
                    "{}: expected '{}', got '{}'",
                    name,
                    expected,
                    actual.unwrap_or("<missing>")
                ))
            }
        })
        .collect();

    if mismatches.is_empty() {
        Ok(Verdict::Pass)
    } else {
        Ok(Verdict::Fail(format!(
            "address fields do not match: {}",
            mismatches.join("; ")
        )))
    }
}

/// The service answers unresolvable coordinates with status 200 and an
/// `error` member, so the body is what gets checked here.
pub fn check_reverse_error(transport: &dyn GeocodingTransport, pair: &BoundaryPair) -> Result<Verdict> {
    let response = transport.reverse(pair.lat, pair.lon)?;
    let body = response.reverse_body()?;

    if body.error.is_some() {
        Ok(Verdict::Pass)
    } else {
        Ok(Verdict::Fail(format!(
            "coordinate {} was unexpectedly resolved (status {})",
            pair.label(),
            response.status
        )))
    }
}
