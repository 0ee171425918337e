use anyhow::{Context, Result};

use crate::landmarks::LandmarkSource;
use crate::records::{AddressRecord, QueryRecord};
use crate::store::{write_records, RecordStore};

/// The single fully described reference address
pub fn full_address_fixture() -> Vec<AddressRecord> {
    vec![AddressRecord {
        house_number: "1/9 с8".to_string(),
        road: "Кремлёвская набережная".to_string(),
        suburb: "Тверской район".to_string(),
        city: "Москва".to_string(),
        state: "Москва".to_string(),
        region: "Центральный федеральный округ".to_string(),
        postcode: "119019".to_string(),
        country: "Россия".to_string(),
        lat: 55.747624,
        lon: 37.610703,
    }]
}

/// Curated free-text queries around Saint Petersburg
pub fn query_fixtures() -> Vec<QueryRecord> {
    vec![
        QueryRecord::new("Европолис Спб", 59.987307, 30.354264),
        QueryRecord::new(
            "Санкт-Петербургский Политехнический Университет Петра Великого",
            60.007350,
            30.373067,
        ),
        QueryRecord::new("Место дуэли А. С. Пушкина", 59.995023, 30.302048),
        QueryRecord::new("Петропавловская крепость", 59.950254, 30.316758),
        QueryRecord::new("ТЮЗ Спб", 59.919858, 30.334794),
        QueryRecord::new("Дом Зингера", 59.935575, 30.326008),
    ]
}

/// Summary of what a seeding pass wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedStats {
    pub full_records: usize,
    pub queries: usize,
    pub landmarks: usize,
}

/// Regenerate all three tables.
/// With no landmark source the landmark table is written header-only.
/// Any failure here is fatal to the session.
pub fn seed_store(store: &RecordStore, landmarks: Option<&dyn LandmarkSource>) -> Result<SeedStats> {
    log::info!("Seeding record store in {}", store.root().display());

    let full = full_address_fixture();
    write_records(&store.full_data_path(), &full).context("Failed to seed full address table")?;

    let queries = query_fixtures();
    write_records(&store.queries_path(), &queries).context("Failed to seed query table")?;

    let scraped = match landmarks {
        Some(source) => source
            .fetch_landmarks()
            .context("Failed to scrape landmarks")?,
        None => {
            log::info!("Landmark scraping disabled");
            Vec::new()
        }
    };
    write_records(&store.landmarks_path(), &scraped).context("Failed to seed landmark table")?;

    let stats = SeedStats {
        full_records: full.len(),
        queries: queries.len(),
        landmarks: scraped.len(),
    };
    log::info!(
        "Seeded {} address, {} query and {} landmark records",
        stats.full_records,
        stats.queries,
        stats.landmarks
    );
    Ok(stats)
}
