use super::HttpFetcher;
use crate::dates;
use crate::model::{Category, RawEvent, SourceConfig};
use crate::traits::{EventSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ical::parser::ical::component::IcalEvent;
use regex::Regex;
use serde_json::json;
use std::io::BufReader;
use std::sync::OnceLock;

/// iCalendar (ICS) adapter.
pub struct CalendarSource {
    config: SourceConfig,
    http: HttpFetcher,
}

impl CalendarSource {
    pub fn new(config: SourceConfig, http: HttpFetcher) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl EventSource for CalendarSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
        let body = self.http.get_text(&self.config.url).await?;
        parse_calendar(&body, &self.config, Utc::now())
    }
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("valid url regex"))
}

/// Reverses iCalendar TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|property| property.name.eq_ignore_ascii_case(name))
        .and_then(|property| property.value.as_deref())
}

fn text_property(event: &IcalEvent, name: &str) -> Option<String> {
    property(event, name)
        .map(unescape_text)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First URL mentioned in free text.
pub fn extract_url(text: &str) -> Option<String> {
    url_re().find(text).map(|found| found.as_str().to_string())
}

fn categories(event: &IcalEvent) -> Vec<String> {
    event
        .properties
        .iter()
        .filter(|property| property.name.eq_ignore_ascii_case("CATEGORIES"))
        .filter_map(|property| property.value.as_deref())
        .flat_map(|value| {
            // commas separate values unless escaped
            value
                .replace("\\,", "\u{0}")
                .split(',')
                .map(|part| unescape_text(&part.replace('\u{0}', "\\,")).trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parses an iCalendar document, keeping VEVENT entries only.
pub fn parse_calendar(
    body: &str,
    config: &SourceConfig,
    now: DateTime<Utc>,
) -> Result<Vec<RawEvent>, SourceError> {
    let parser = ical::IcalParser::new(BufReader::new(body.as_bytes()));
    let mut events = Vec::new();

    for calendar in parser {
        let calendar = calendar.map_err(|e| SourceError::Calendar(e.to_string()))?;
        for entry in &calendar.events {
            let start = property(entry, "DTSTART").and_then(dates::parse_ical);
            let date = start.unwrap_or(now);
            let description = text_property(entry, "DESCRIPTION").unwrap_or_default();
            let link = text_property(entry, "URL")
                .or_else(|| extract_url(&description))
                .unwrap_or_else(|| config.url.clone());
            let source_id = text_property(entry, "UID").unwrap_or_else(|| {
                let start = start.map(|d| d.to_rfc3339()).unwrap_or_default();
                format!("{}-{}", config.name, start)
            });

            let source_data = json!({
                "organizer": text_property(entry, "ORGANIZER"),
                "status": text_property(entry, "STATUS"),
                "recurrenceRule": property(entry, "RRULE"),
                "sequence": property(entry, "SEQUENCE"),
            });

            events.push(RawEvent {
                source_id,
                title: text_property(entry, "SUMMARY").unwrap_or_else(|| "Untitled Event".to_string()),
                description,
                date,
                link,
                location: text_property(entry, "LOCATION"),
                category: Category::from_values(categories(entry)),
                source_data: Some(source_data),
                source: config.name.clone(),
                agency: Some(config.agency.clone()).filter(|agency| !agency.is_empty()),
            });
        }
    }

    Ok(events)
}
