use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;
use std::path::Path;

use crate::records::{is_valid_latitude, is_valid_longitude, AddressRecord, BoundaryPair, QueryRecord};
use crate::store::RecordReplay;

/// Number of benign reverse probes drawn around the reference city
pub const VALID_PAIR_COUNT: usize = 10;

/// Reference city box (Moscow), 1 degree on each axis
pub const REFERENCE_LAT: Range<f64> = 55.0..56.0;
pub const REFERENCE_LON: Range<f64> = 36.0..37.0;

/// Alphabet for garbage queries: ASCII letters then digits
pub const GARBAGE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const GARBAGE_MIN_LEN: usize = 1;
pub const GARBAGE_MAX_LEN: usize = 10;

/// One sampling interval of a boundary generator together with the
/// predicate its samples are expected to satisfy.
#[derive(Debug, Clone)]
pub struct BoundaryRange {
    pub name: &'static str,
    pub lat: Range<f64>,
    pub lon: Range<f64>,
    pub lat_valid: bool,
    pub lon_valid: bool,
}

impl BoundaryRange {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BoundaryPair {
        BoundaryPair {
            lat: rng.gen_range(self.lat.clone()),
            lon: rng.gen_range(self.lon.clone()),
        }
    }

    /// True when `pair` has the validity shape this range promises
    pub fn holds_for(&self, pair: &BoundaryPair) -> bool {
        is_valid_latitude(pair.lat) == self.lat_valid
            && is_valid_longitude(pair.lon) == self.lon_valid
    }
}

/// Bad latitude, southern side
pub const BAD_LAT_SOUTH: BoundaryRange = BoundaryRange {
    name: "bad-lat-south",
    lat: -180.0..-91.0,
    lon: 1.0..89.0,
    lat_valid: false,
    lon_valid: true,
};

/// Bad latitude, northern side
pub const BAD_LAT_NORTH: BoundaryRange = BoundaryRange {
    name: "bad-lat-north",
    lat: 91.0..180.0,
    lon: 1.0..89.0,
    lat_valid: false,
    lon_valid: true,
};

/// Both axes drawn from (-180, -100). The latitude is what ends up out of
/// range; the longitude is still a legal value.
pub const BAD_LON_BOTH_NEGATIVE: BoundaryRange = BoundaryRange {
    name: "bad-lon-both-negative",
    lat: -180.0..-100.0,
    lon: -180.0..-100.0,
    lat_valid: false,
    lon_valid: true,
};

/// Valid latitude, longitude drawn from (91, 180).
pub const BAD_LON_EAST: BoundaryRange = BoundaryRange {
    name: "bad-lon-east",
    lat: 1.0..89.0,
    lon: 91.0..180.0,
    lat_valid: true,
    lon_valid: true,
};

/// Replay the structured-address table in store order
pub fn replay_full_records(source: &Path) -> Result<RecordReplay<AddressRecord>> {
    RecordReplay::open(source)
}

/// Replay a query or landmark table in store order
pub fn replay_query_records(source: &Path) -> Result<RecordReplay<QueryRecord>> {
    RecordReplay::open(source)
}

/// Ten in-range pairs from the reference city box
pub fn random_valid_pair<R: Rng + ?Sized>(rng: &mut R) -> impl Iterator<Item = (f64, f64)> + '_ {
    std::iter::repeat_with(move || {
        (
            rng.gen_range(REFERENCE_LAT),
            rng.gen_range(REFERENCE_LON),
        )
    })
    .take(VALID_PAIR_COUNT)
}

/// `count` pairs with an out-of-range latitude and a valid longitude
pub fn random_bad_latitude<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
) -> impl Iterator<Item = BoundaryPair> + '_ {
    std::iter::repeat_with(move || {
        let range = if rng.gen_bool(0.5) {
            &BAD_LAT_SOUTH
        } else {
            &BAD_LAT_NORTH
        };
        range.sample(&mut *rng)
    })
    .take(count)
}

/// `count` pairs aimed at the longitude axis. Neither branch yields a
/// longitude outside [-180, 180]; `lat_valid`/`lon_valid` on each range
/// record what a sample actually looks like.
pub fn random_bad_longitude<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
) -> impl Iterator<Item = BoundaryPair> + '_ {
    std::iter::repeat_with(move || {
        let range = if rng.gen_bool(0.5) {
            &BAD_LON_BOTH_NEGATIVE
        } else {
            &BAD_LON_EAST
        };
        range.sample(&mut *rng)
    })
    .take(count)
}

/// `count` random alphanumeric strings of length 1..=10 with no repeated character
pub fn random_garbage_text<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
) -> impl Iterator<Item = String> + '_ {
    std::iter::repeat_with(move || {
        let len = rng.gen_range(GARBAGE_MIN_LEN..=GARBAGE_MAX_LEN);
        GARBAGE_ALPHABET
            .choose_multiple(&mut *rng, len)
            .map(|&b| b as char)
            .collect::<String>()
    })
    .take(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_valid_pairs_stay_in_reference_box() {
        let mut rng = StdRng::seed_from_u64(7);
        let pairs: Vec<(f64, f64)> = random_valid_pair(&mut rng).collect();

        assert_eq!(pairs.len(), VALID_PAIR_COUNT);
        for (lat, lon) in pairs {
            assert!(REFERENCE_LAT.contains(&lat), "lat {} outside box", lat);
            assert!(REFERENCE_LON.contains(&lon), "lon {} outside box", lon);
        }
    }

    #[test]
    fn test_bad_latitude_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let pairs: Vec<BoundaryPair> = random_bad_latitude(&mut rng, 200).collect();

        assert_eq!(pairs.len(), 200);
        for pair in &pairs {
            assert!(!pair.latitude_valid(), "latitude {} should be invalid", pair.lat);
            assert!(pair.longitude_valid());
            assert!(pair.lat.abs() >= 91.0 && pair.lat.abs() <= 180.0);
            assert!(pair.lon >= 1.0 && pair.lon < 89.0);
        }
        // Both signs show up over 200 draws
        assert!(pairs.iter().any(|p| p.lat < 0.0));
        assert!(pairs.iter().any(|p| p.lat > 0.0));
    }

    #[test]
    fn test_bad_longitude_branches() {
        let mut rng = StdRng::seed_from_u64(13);
        let pairs: Vec<BoundaryPair> = random_bad_longitude(&mut rng, 200).collect();

        let both_negative = pairs
            .iter()
            .filter(|p| BAD_LON_BOTH_NEGATIVE.holds_for(p) && p.lat < -100.0)
            .count();
        let east = pairs
            .iter()
            .filter(|p| p.latitude_valid() && p.lon >= 91.0)
            .count();

        assert_eq!(both_negative + east, 200);
        assert!(both_negative > 0);
        assert!(east > 0);
        for pair in pairs.iter().filter(|p| p.lat < 0.0) {
            assert!(pair.lon >= -180.0 && pair.lon < -100.0);
        }
    }

    #[test]
    fn test_boundary_ranges_hold_for_their_samples() {
        let mut rng = StdRng::seed_from_u64(17);
        for range in [&BAD_LAT_SOUTH, &BAD_LAT_NORTH, &BAD_LON_BOTH_NEGATIVE, &BAD_LON_EAST] {
            for _ in 0..50 {
                let pair = range.sample(&mut rng);
                assert!(range.holds_for(&pair), "{} produced {:?}", range.name, pair);
            }
        }
    }

    #[test]
    fn test_garbage_text_shape() {
        let mut rng = StdRng::seed_from_u64(19);
        let samples: Vec<String> = random_garbage_text(&mut rng, 100).collect();

        assert_eq!(samples.len(), 100);
        for text in &samples {
            assert!((GARBAGE_MIN_LEN..=GARBAGE_MAX_LEN).contains(&text.len()));
            assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
            let unique: HashSet<char> = text.chars().collect();
            assert_eq!(unique.len(), text.len(), "repeated character in {}", text);
        }
    }

    #[test]
    fn test_seeded_generators_are_reproducible() {
        let first: Vec<String> = random_garbage_text(&mut StdRng::seed_from_u64(42), 5).collect();
        let second: Vec<String> = random_garbage_text(&mut StdRng::seed_from_u64(42), 5).collect();
        assert_eq!(first, second);

        let a: Vec<BoundaryPair> = random_bad_latitude(&mut StdRng::seed_from_u64(42), 5).collect();
        let b: Vec<BoundaryPair> = random_bad_latitude(&mut StdRng::seed_from_u64(42), 5).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_count_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_bad_longitude(&mut rng, 0).count(), 0);
        assert_eq!(random_garbage_text(&mut rng, 0).count(), 0);
    }
}
