use super::HttpFetcher;
use crate::dates;
use crate::model::{RawEvent, SourceConfig};
use crate::traits::{EventSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

const TITLE_SELECTOR: &str = r#"h1, h2, h3, h4, .title, [itemprop="name"]"#;
const DESCRIPTION_SELECTOR: &str = r#"p, .description, [itemprop="description"]"#;
const DATE_SELECTOR: &str =
    r#"[datetime], .date, [itemprop="startDate"], .event-date, .calendar-date, time"#;
const LINK_SELECTOR: &str = r#"a, [itemprop="url"]"#;
const LOCATION_SELECTOR: &str = r#".location, [itemprop="location"]"#;

struct CardSelectors {
    title: Selector,
    description: Selector,
    date: Selector,
    link: Selector,
    location: Selector,
}

fn card_selectors() -> &'static CardSelectors {
    static SELECTORS: OnceLock<CardSelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| CardSelectors {
        title: Selector::parse(TITLE_SELECTOR).expect("valid title selector"),
        description: Selector::parse(DESCRIPTION_SELECTOR).expect("valid description selector"),
        date: Selector::parse(DATE_SELECTOR).expect("valid date selector"),
        link: Selector::parse(LINK_SELECTOR).expect("valid link selector"),
        location: Selector::parse(LOCATION_SELECTOR).expect("valid location selector"),
    })
}

/// HTML page adapter; one event per element matching the source's selector.
pub struct ScraperSource {
    config: SourceConfig,
    http: HttpFetcher,
}

impl ScraperSource {
    pub fn new(config: SourceConfig, http: HttpFetcher) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl EventSource for ScraperSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
        let body = self.http.get_text(&self.config.url).await?;
        parse_cards(&body, &self.config, Utc::now())
    }
}

/// Whitespace-collapsed text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Event date of a card: `datetime` attribute, then the date element's
/// text, then a textual date anywhere in the card, else `now`.
pub fn extract_date(card: ElementRef<'_>, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(element) = card.select(&card_selectors().date).next() {
        if let Some(parsed) = element.value().attr("datetime").and_then(dates::parse_loose) {
            return parsed;
        }
        if let Some(parsed) = dates::parse_loose(&element_text(element)) {
            return parsed;
        }
    }
    dates::find_in_text(&element_text(card)).unwrap_or(now)
}

/// Resolves a card link against the origin of the page it came from.
pub fn resolve_url(page_url: &str, link: &str) -> String {
    let link = link.trim();
    if link.is_empty() {
        return page_url.to_string();
    }
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    let Ok(base) = Url::parse(page_url) else {
        return link.to_string();
    };
    let origin = base.origin().ascii_serialization();
    if link.starts_with('/') {
        format!("{origin}{link}")
    } else {
        format!("{origin}/{link}")
    }
}

/// Extracts one raw event per card matching the source's selector.
pub fn parse_cards(
    body: &str,
    config: &SourceConfig,
    now: DateTime<Utc>,
) -> Result<Vec<RawEvent>, SourceError> {
    let Some(card_selector) = config.selector.as_deref().filter(|s| !s.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    let card_selector = Selector::parse(card_selector)
        .map_err(|_| SourceError::Selector(card_selector.to_string()))?;
    let selectors = card_selectors();
    let document = Html::parse_document(body);

    let events = document
        .select(&card_selector)
        .enumerate()
        .map(|(index, card)| {
            let date = extract_date(card, now);
            let link = card
                .select(&selectors.link)
                .next()
                .and_then(|element| element.value().attr("href"))
                .unwrap_or_default();

            RawEvent {
                source_id: format!("{}-{}-{}", config.name, index, date.to_rfc3339()),
                title: first_text(card, &selectors.title).unwrap_or_else(|| "Unknown Event".to_string()),
                description: first_text(card, &selectors.description).unwrap_or_default(),
                date,
                link: resolve_url(&config.url, link),
                location: first_text(card, &selectors.location),
                category: None,
                source_data: Some(Value::String(card.html())),
                source: config.name.clone(),
                agency: Some(config.agency.clone()).filter(|agency| !agency.is_empty()),
            }
        })
        .collect();

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Jurisdiction, SourceType};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const PAGE: &str = r#"<html><body>
      <div class="meeting-card">
        <h3>Data Governance Council</h3>
        <p>Quarterly session, streamed on Webex.</p>
        <time datetime="2026-02-10T15:00:00Z">Feb 10</time>
        <a href="/meetings/42">Details</a>
        <span class="location">Albany</span>
      </div>
      <div class="meeting-card">
        <h3>Broadband Office Hours</h3>
        <p>event on January 15, 2026 at noon</p>
        <a href="register">Register</a>
      </div>
      <div class="meeting-card"><span>No details yet</span></div>
    </body></html>"#;

    fn config() -> SourceConfig {
        SourceConfig::new(
            "ny-tech-meetings",
            "https://meet.example.gov/dashboard?site=ny",
            Jurisdiction::State,
            "NY",
            SourceType::Executive,
            "New York Technology Services",
        )
        .with_selector(".meeting-card")
    }

    #[test]
    fn extracts_cards_with_machine_readable_dates() {
        let now: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
        let events = parse_cards(PAGE, &config(), now).unwrap();
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!(first.title, "Data Governance Council");
        assert_eq!(first.description, "Quarterly session, streamed on Webex.");
        assert_eq!(first.date.to_rfc3339(), "2026-02-10T15:00:00+00:00");
        assert_eq!(first.link, "https://meet.example.gov/meetings/42");
        assert_eq!(first.location.as_deref(), Some("Albany"));
        assert_eq!(first.source_id, "ny-tech-meetings-0-2026-02-10T15:00:00+00:00");
    }

    #[test]
    fn falls_back_to_textual_date_in_card() {
        let now: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
        let events = parse_cards(PAGE, &config(), now).unwrap();
        let second = &events[1];

        assert_eq!(second.date.date_naive().to_string(), "2026-01-15");
        assert_eq!(second.link, "https://meet.example.gov/register");
    }

    #[test]
    fn sparse_card_uses_defaults() {
        let now: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
        let events = parse_cards(PAGE, &config(), now).unwrap();
        let third = &events[2];

        assert_eq!(third.title, "Unknown Event");
        assert_eq!(third.description, "");
        assert_eq!(third.date, now);
        assert_eq!(third.link, "https://meet.example.gov/dashboard?site=ny");
        assert_eq!(third.location, None);
    }

    #[test]
    fn missing_selector_yields_no_cards() {
        let mut config = config();
        config.selector = None;
        assert!(parse_cards(PAGE, &config, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let config = config().with_selector("div[");
        assert!(matches!(
            parse_cards(PAGE, &config, Utc::now()),
            Err(SourceError::Selector(_))
        ));
    }

    #[rstest]
    #[case("", "https://a.gov/x/y?z=1")]
    #[case("https://b.gov/e", "https://b.gov/e")]
    #[case("/e/1", "https://a.gov/e/1")]
    #[case("e/1", "https://a.gov/e/1")]
    fn resolves_links(#[case] link: &str, #[case] expected: &str) {
        assert_eq!(resolve_url("https://a.gov/x/y?z=1", link), expected);
    }
}
