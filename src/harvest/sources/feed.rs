use super::HttpFetcher;
use crate::dates;
use crate::model::{Category, RawEvent, SourceConfig};
use crate::traits::{EventSource, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

/// RSS 2.0 feed adapter.
pub struct FeedSource {
    config: SourceConfig,
    http: HttpFetcher,
}

impl FeedSource {
    pub fn new(config: SourceConfig, http: HttpFetcher) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl EventSource for FeedSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_raw(&self) -> Result<Vec<RawEvent>, SourceError> {
        let body = self.http.get_text(&self.config.url).await?;
        parse_feed(&body, &self.config, Utc::now())
    }
}

/// Parses an RSS document into raw events.
///
/// `now` stands in for items whose publish date is missing or unreadable.
pub fn parse_feed(
    body: &str,
    config: &SourceConfig,
    now: DateTime<Utc>,
) -> Result<Vec<RawEvent>, SourceError> {
    let channel =
        rss::Channel::read_from(body.as_bytes()).map_err(|e| SourceError::Feed(e.to_string()))?;

    let events = channel
        .items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let title = item.title().unwrap_or_default().trim().to_string();
            let link = item.link().unwrap_or_default().trim().to_string();
            let description = item.description().unwrap_or_default().to_string();
            let guid = item.guid().map(|guid| guid.value().to_string());
            let categories: Vec<String> = item
                .categories()
                .iter()
                .map(|category| category.name().to_string())
                .collect();

            let date = item
                .pub_date()
                .and_then(dates::parse_loose)
                .unwrap_or_else(|| {
                    debug!(source = %config.name, title = %title, "Feed item without usable pubDate");
                    now
                });

            let source_id = guid
                .clone()
                .filter(|guid| !guid.is_empty())
                .or_else(|| Some(link.clone()).filter(|link| !link.is_empty()))
                .unwrap_or_else(|| format!("{}-{}", config.name, index));

            let category_value = match categories.as_slice() {
                [] => Value::Null,
                [single] => Value::String(single.clone()),
                many => json!(many),
            };
            let source_data = json!({
                "title": title,
                "link": link,
                "description": description,
                "pubDate": item.pub_date(),
                "guid": guid,
                "category": category_value,
            });

            RawEvent {
                source_id,
                title,
                description,
                date,
                link,
                location: None,
                category: Category::from_values(categories),
                source_data: Some(source_data),
                source: config.name.clone(),
                agency: Some(config.agency.clone()).filter(|agency| !agency.is_empty()),
            }
        })
        .collect();

    Ok(events)
}
