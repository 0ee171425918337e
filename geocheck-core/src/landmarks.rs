use anyhow::{Context, Result};
use regex::Regex;
use std::time::Duration;

use crate::records::QueryRecord;

/// Saint Petersburg landmark listing used to seed the landmark table
pub const DEFAULT_LANDMARKS_URL: &str =
    "http://openarium.ru/Россия/Санкт-Петербург/Достопримечательности/";

/// Leading headings on the listing page that are not landmarks
const SKIPPED_HEADINGS: usize = 2;

lazy_static::lazy_static! {
    static ref SECTION_RE: Regex = Regex::new(r"(?is)<section\b[^>]*>(.*?)</section>").unwrap();
    static ref HEADING_RE: Regex = Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>").unwrap();
    static ref EMPHASIS_RE: Regex = Regex::new(r"(?is)<em\b[^>]*>(.*?)</em>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Somewhere to get named places with known coordinates from
pub trait LandmarkSource {
    fn fetch_landmarks(&self) -> Result<Vec<QueryRecord>>;
}

/// Scrapes landmark names and coordinates from an openarium.ru listing page
pub struct OpenariumSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl OpenariumSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("geocheck/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl LandmarkSource for OpenariumSource {
    fn fetch_landmarks(&self) -> Result<Vec<QueryRecord>> {
        log::info!("Fetching landmarks from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("Failed to fetch landmark page {}", self.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Landmark page returned status: {}", response.status());
        }

        let html = response.text().context("Failed to read landmark page")?;
        let landmarks = parse_landmarks(&html);
        log::info!("Scraped {} landmarks", landmarks.len());
        Ok(landmarks)
    }
}

/// Pair every `<section>` heading with the `<em>` coordinate at the same
/// position, skipping the leading non-landmark headings.
/// Entries whose coordinate does not parse are dropped.
pub fn parse_landmarks(html: &str) -> Vec<QueryRecord> {
    let names: Vec<String> = SECTION_RE
        .captures_iter(html)
        .filter_map(|section| section.get(1))
        .flat_map(|body| {
            HEADING_RE
                .captures_iter(body.as_str())
                .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
                .collect::<Vec<_>>()
        })
        .collect();

    let coords: Vec<String> = EMPHASIS_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
        .collect();

    names
        .iter()
        .zip(coords.iter())
        .skip(SKIPPED_HEADINGS)
        .filter_map(|(name, coord)| match parse_coordinate_text(coord) {
            Some((lat, lon)) => {
                let record = QueryRecord::new(name.clone(), lat, lon);
                match record.validate() {
                    Ok(()) => Some(record),
                    Err(e) => {
                        log::warn!("Skipping landmark '{}': {}", name, e);
                        None
                    }
                }
            }
            None => {
                log::warn!("Skipping landmark '{}': unreadable coordinate '{}'", name, coord);
                None
            }
        })
        .collect()
}

/// Parse "lat, lon"
fn parse_coordinate_text(text: &str) -> Option<(f64, f64)> {
    let (lat, lon) = text.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// Strip markup and decode the common entities
fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body>
<section><h2>Достопримечательности Санкт-Петербурга</h2><p>Список</p><em>59.93, 30.31</em></section>
<section><h2>Карта</h2><em>59.93, 30.31</em></section>
<section>
  <h2><a href="/pk">Петропавловская крепость</a></h2>
  <p>Крепость на Заячьем острове.</p>
  <em>59.950254, 30.316758</em>
</section>
<section><h2>Дом Зингера</h2><em>59.935575,30.326008</em></section>
<section><h2>Эрмитаж &amp; Зимний дворец</h2><em>нет данных</em></section>
</body></html>
"#;

    #[test]
    fn test_parse_landmarks_skips_leading_headings() {
        let landmarks = parse_landmarks(LISTING);

        assert_eq!(landmarks.len(), 2);
        assert_eq!(
            landmarks[0],
            QueryRecord::new("Петропавловская крепость", 59.950254, 30.316758)
        );
        assert_eq!(landmarks[1], QueryRecord::new("Дом Зингера", 59.935575, 30.326008));
    }

    #[test]
    fn test_parse_landmarks_empty_page() {
        assert!(parse_landmarks("<html><body>Not found</body></html>").is_empty());
    }

    #[test]
    fn test_out_of_range_coordinate_dropped() {
        let html = "<section><h2>a</h2><em>1,1</em></section>\
                    <section><h2>b</h2><em>1,1</em></section>\
                    <section><h2>Far away</h2><em>95.0, 30.0</em></section>";
        assert!(parse_landmarks(html).is_empty());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("<b>Эрмитаж</b> &amp;\n  Зимний"), "Эрмитаж & Зимний");
    }

    #[test]
    fn test_parse_coordinate_text() {
        assert_eq!(parse_coordinate_text(" 59.9, 30.3 "), Some((59.9, 30.3)));
        assert_eq!(parse_coordinate_text("59.9"), None);
        assert_eq!(parse_coordinate_text("north, east"), None);
    }
}
