use anyhow::Result;
use geocheck_core::{HarnessConfig, Outcome};
use std::time::Duration;

mod cli;

/// Command-line overrides on top of the library defaults
fn build_config(args: &cli::Args) -> HarnessConfig {
    let defaults = HarnessConfig::default();
    HarnessConfig {
        base_url: args.base_url.clone().unwrap_or(defaults.base_url),
        data_dir: args.data_dir.clone().unwrap_or(defaults.data_dir),
        scrape_landmarks: !args.no_landmarks, // Inverted: scraping is default, no_landmarks opts out
        landmarks_url: args.landmarks_url.clone().unwrap_or(defaults.landmarks_url),
        seed: args.seed,
        probe_count: args.probes.unwrap_or(defaults.probe_count),
        garbage_count: args.garbage.unwrap_or(defaults.garbage_count),
        structured_tolerance: args.structured_tolerance.unwrap_or(defaults.structured_tolerance),
        free_text_tolerance: args.free_text_tolerance.unwrap_or(defaults.free_text_tolerance),
        request_interval: args
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_interval),
        timeout: args
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args();

    // Initialize logger with appropriate level based on verbose flag
    if std::env::var("RUST_LOG").is_err() {
        if args.verbose {
            std::env::set_var("RUST_LOG", "debug");
        } else {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let config = build_config(&args);

    // Seeding or store failures end the run here
    let report = geocheck_core::run_session(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for case in report.problems() {
            match &case.outcome {
                Outcome::Fail(reason) => println!("FAIL  [{}] {}: {}", case.rule, case.subject, reason),
                Outcome::Error(reason) => println!("ERROR [{}] {}: {}", case.rule, case.subject, reason),
                Outcome::Pass => {}
            }
        }
        println!(
            "\n{} cases: {} passed, {} failed, {} errors (seed {})",
            report.total(),
            report.passed(),
            report.failed(),
            report.errored(),
            report.seed
        );
    }

    if !report.all_passed() {
        std::process::exit(1);
    }

    log::info!("All cases passed");
    Ok(())
}
