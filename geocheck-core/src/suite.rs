use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::Path;

use crate::generators::{
    random_bad_latitude, random_bad_longitude, random_garbage_text, random_valid_pair,
    replay_full_records, replay_query_records,
};
use crate::harness::{self, Rule, Verdict};
use crate::store::RecordStore;
use crate::transport::GeocodingTransport;
use crate::HarnessConfig;

/// Final state of one case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    /// The service answered but the answer was wrong
    Fail(String),
    /// No answer could be judged (transport failure, unparseable body)
    Error(String),
}

/// One record evaluated under one rule
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub rule: Rule,
    pub subject: String,
    pub outcome: Outcome,
}

/// Everything a suite run produced
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Seed the probe generators ran with
    pub seed: u64,
    pub cases: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Pass))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Fail(_)))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Error(_)))
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Cases that did not pass
    pub fn problems(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.cases.iter().filter(|c| c.outcome != Outcome::Pass)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }
}

/// Runs every rule over every record of a seeded store, one request per case
pub struct VerificationSuite<'a> {
    config: &'a HarnessConfig,
    transport: &'a dyn GeocodingTransport,
}

impl<'a> VerificationSuite<'a> {
    pub fn new(config: &'a HarnessConfig, transport: &'a dyn GeocodingTransport) -> Self {
        Self { config, transport }
    }

    /// Evaluate all cases. A case failing never stops its siblings; only an
    /// unreadable store aborts the run.
    pub fn run(&self, store: &RecordStore) -> Result<SuiteReport> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        log::info!("Probe generator seed: {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut report = SuiteReport {
            seed,
            cases: Vec::new(),
        };

        self.run_address_rules(&store.full_data_path(), &mut report)?;
        self.run_query_rules(&store.queries_path(), &mut report)?;
        self.run_query_rules(&store.landmarks_path(), &mut report)?;

        log::info!("Running {} garbage queries", self.config.garbage_count);
        for text in random_garbage_text(&mut rng, self.config.garbage_count) {
            let result = harness::check_forward_no_match(self.transport, &text);
            record(&mut report, Rule::ForwardNoMatch, text, result);
        }

        log::info!("Running reverse probes around the reference city");
        for (lat, lon) in random_valid_pair(&mut rng) {
            let result = harness::check_reverse_status(self.transport, lat, lon);
            record(&mut report, Rule::ReverseStatus, format!("{:.6},{:.6}", lat, lon), result);
        }

        log::info!(
            "Running {} boundary probes per mode",
            self.config.probe_count
        );
        let bad_latitudes: Vec<_> = random_bad_latitude(&mut rng, self.config.probe_count).collect();
        let bad_longitudes: Vec<_> = random_bad_longitude(&mut rng, self.config.probe_count).collect();
        for pair in bad_latitudes.iter().chain(bad_longitudes.iter()) {
            let result = harness::check_reverse_error(self.transport, pair);
            record(&mut report, Rule::ReverseErrorSignal, pair.label(), result);
        }

        log::info!(
            "Suite finished: {} passed, {} failed, {} errors",
            report.passed(),
            report.failed(),
            report.errored()
        );
        Ok(report)
    }

    fn run_address_rules(&self, path: &Path, report: &mut SuiteReport) -> Result<()> {
        log::info!("Running address rules from {}", path.display());
        let tolerance = self.config.structured_tolerance;

        for address in replay_full_records(path)? {
            let address = address?;
            let result = harness::check_forward_structured(self.transport, &address, tolerance);
            record(report, Rule::ForwardStructuredTolerance, address.label(), result);
        }
        for address in replay_full_records(path)? {
            let address = address?;
            let result = harness::check_forward_structured_status(self.transport, &address);
            record(report, Rule::ForwardStructuredStatus, address.label(), result);
        }
        for address in replay_full_records(path)? {
            let address = address?;
            let result = harness::check_reverse_fields(self.transport, &address);
            record(report, Rule::ReverseFieldEquality, address.label(), result);
        }
        Ok(())
    }

    fn run_query_rules(&self, path: &Path, report: &mut SuiteReport) -> Result<()> {
        log::info!("Running query rules from {}", path.display());
        let tolerance = self.config.free_text_tolerance;

        for query in replay_query_records(path)? {
            let query = query?;
            let result = harness::check_forward_free_text(self.transport, &query, tolerance);
            record(report, Rule::ForwardFreeTextTolerance, query.name.clone(), result);
        }
        for query in replay_query_records(path)? {
            let query = query?;
            let result = harness::check_forward_free_text_status(self.transport, &query);
            record(report, Rule::ForwardFreeTextStatus, query.name.clone(), result);
        }
        for query in replay_query_records(path)? {
            let query = query?;
            let result = harness::check_reverse_status(self.transport, query.lat, query.lon);
            record(report, Rule::ReverseStatus, query.name.clone(), result);
        }
        Ok(())
    }
}

fn record(report: &mut SuiteReport, rule: Rule, subject: String, result: Result<Verdict>) {
    let outcome = match result {
        Ok(Verdict::Pass) => {
            log::debug!("[{}] {}: pass", rule, subject);
            Outcome::Pass
        }
        Ok(Verdict::Fail(reason)) => {
            log::warn!("[{}] {}: {}", rule, subject, reason);
            Outcome::Fail(reason)
        }
        Err(e) => {
            log::error!("[{}] {}: {:#}", rule, subject, e);
            Outcome::Error(format!("{:#}", e))
        }
    };
    report.cases.push(CaseOutcome {
        rule,
        subject,
        outcome,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::tests::{ScriptedTransport, KREMLIN_REVERSE};
    use crate::records::QueryRecord;
    use crate::seeding::seed_store;
    use crate::store::write_records;
    use crate::transport::{ForwardQuery, LookupResponse};
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> HarnessConfig {
        HarnessConfig {
            seed: Some(5),
            probe_count: 3,
            garbage_count: 2,
            ..HarnessConfig::default()
        }
    }

    fn count_rule(report: &SuiteReport, rule: Rule) -> usize {
        report.cases.iter().filter(|c| c.rule == rule).count()
    }

    #[test]
    fn test_case_counts_per_rule() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = RecordStore::new(temp_dir.path());
        seed_store(&store, None)?;
        write_records(&store.landmarks_path(), &[QueryRecord::new("Эрмитаж", 59.9398, 30.3146)])?;

        let config = test_config();
        let transport = ScriptedTransport::new("[]", KREMLIN_REVERSE);
        let report = VerificationSuite::new(&config, &transport).run(&store)?;

        assert_eq!(count_rule(&report, Rule::ForwardStructuredTolerance), 1);
        assert_eq!(count_rule(&report, Rule::ForwardStructuredStatus), 1);
        assert_eq!(count_rule(&report, Rule::ReverseFieldEquality), 1);
        assert_eq!(count_rule(&report, Rule::ForwardFreeTextTolerance), 7);
        assert_eq!(count_rule(&report, Rule::ForwardFreeTextStatus), 7);
        // 7 stored queries plus 10 reference-city probes
        assert_eq!(count_rule(&report, Rule::ReverseStatus), 17);
        assert_eq!(count_rule(&report, Rule::ForwardNoMatch), 2);
        assert_eq!(count_rule(&report, Rule::ReverseErrorSignal), 6);
        assert_eq!(report.seed, 5);
        Ok(())
    }

    #[test]
    fn test_failures_are_isolated() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = RecordStore::new(temp_dir.path());
        seed_store(&store, None)?;

        // Empty search results: tolerance rules fail, no-match passes.
        // Resolved reverse body: field equality passes, error probes fail.
        let config = test_config();
        let transport = ScriptedTransport::new("[]", KREMLIN_REVERSE);
        let report = VerificationSuite::new(&config, &transport).run(&store)?;

        assert_eq!(report.errored(), 0);
        assert_eq!(report.failed(), 1 + 6 + 6);
        assert_eq!(report.passed() + report.failed(), report.total());
        assert!(!report.all_passed());
        assert!(report
            .problems()
            .all(|c| matches!(
                c.rule,
                Rule::ForwardStructuredTolerance
                    | Rule::ForwardFreeTextTolerance
                    | Rule::ReverseErrorSignal
            )));
        Ok(())
    }

    struct FlakyTransport;

    impl GeocodingTransport for FlakyTransport {
        fn forward(&self, query: &ForwardQuery) -> Result<LookupResponse> {
            match query {
                ForwardQuery::FreeText(q) if q == "Дом Зингера" => anyhow::bail!("connection reset"),
                _ => Ok(LookupResponse {
                    status: 200,
                    body: r#"[{"lat":"59.935575","lon":"30.326008"}]"#.to_string(),
                }),
            }
        }

        fn reverse(&self, _lat: f64, _lon: f64) -> Result<LookupResponse> {
            Ok(LookupResponse {
                status: 200,
                body: r#"{"error":"Unable to geocode"}"#.to_string(),
            })
        }
    }

    #[test]
    fn test_transport_error_stays_with_its_case() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = RecordStore::new(temp_dir.path());
        seed_store(&store, None)?;

        let config = test_config();
        let report = VerificationSuite::new(&config, &FlakyTransport).run(&store)?;

        let errors: Vec<&CaseOutcome> = report
            .cases
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Error(_)))
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|c| c.subject == "Дом Зингера"));
        // Later cases still ran
        assert_eq!(count_rule(&report, Rule::ReverseErrorSignal), 6);
        assert!(report
            .cases
            .iter()
            .filter(|c| c.rule == Rule::ReverseErrorSignal)
            .all(|c| c.outcome == Outcome::Pass));
        Ok(())
    }

    #[test]
    fn test_unreadable_store_aborts_run() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = RecordStore::new(temp_dir.path());
        seed_store(&store, None)?;
        fs::write(store.queries_path(), "name,lat,lon\nBroken,north,east\n")?;

        let config = test_config();
        let transport = ScriptedTransport::new("[]", KREMLIN_REVERSE);
        assert!(VerificationSuite::new(&config, &transport).run(&store).is_err());
        Ok(())
    }

    #[test]
    fn test_same_seed_same_probes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = RecordStore::new(temp_dir.path());
        seed_store(&store, None)?;
        let config = test_config();

        let first = ScriptedTransport::new("[]", KREMLIN_REVERSE);
        VerificationSuite::new(&config, &first).run(&store)?;
        let second = ScriptedTransport::new("[]", KREMLIN_REVERSE);
        VerificationSuite::new(&config, &second).run(&store)?;

        assert_eq!(*first.reverse_calls.borrow(), *second.reverse_calls.borrow());
        assert_eq!(*first.forward_calls.borrow(), *second.forward_calls.borrow());
        Ok(())
    }
}
