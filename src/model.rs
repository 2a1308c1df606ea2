use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Location placeholder used whenever a source does not say where an event is.
pub const LOCATION_TBD: &str = "TBD";

/// Government level an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Jurisdiction {
    State,
    Local,
    #[default]
    Unknown,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::State => "State",
            Jurisdiction::Local => "Local",
            Jurisdiction::Unknown => "Unknown",
        }
    }

    /// Lenient parse; anything unrecognized is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "state" => Jurisdiction::State,
            "local" => Jurisdiction::Local,
            _ => Jurisdiction::Unknown,
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects which normalization heuristics apply to a source's events.
///
/// Unrecognized strings are kept as [`SourceType::Other`] and routed to the
/// default normalizer; they are never an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    LegislatureCommittee,
    LegislatureCalendar,
    Executive,
    CityMeetings,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::LegislatureCommittee => "legislature-committee",
            SourceType::LegislatureCalendar => "legislature-calendar",
            SourceType::Executive => "executive",
            SourceType::CityMeetings => "city-meetings",
            SourceType::Other(other) => other,
        }
    }
}

impl From<&str> for SourceType {
    fn from(value: &str) -> Self {
        match value {
            "legislature-committee" => SourceType::LegislatureCommittee,
            "legislature-calendar" => SourceType::LegislatureCalendar,
            "executive" => SourceType::Executive,
            "city-meetings" => SourceType::CityMeetings,
            other => SourceType::Other(other.to_string()),
        }
    }
}

impl From<String> for SourceType {
    fn from(value: String) -> Self {
        SourceType::from(value.as_str())
    }
}

impl From<SourceType> for String {
    fn from(value: SourceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition protocol of a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProtocol {
    Feed,
    Calendar,
    Scraper,
}

/// Static descriptor of one event source. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub jurisdiction: Jurisdiction,
    #[serde(default)]
    pub state: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub agency: String,
    /// CSS selector for event cards (scraped sources only)
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        jurisdiction: Jurisdiction,
        state: impl Into<String>,
        source_type: SourceType,
        agency: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            jurisdiction,
            state: state.into(),
            source_type,
            agency: agency.into(),
            selector: None,
            options: serde_json::Map::new(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

/// Category as published by a source: one string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Single(String),
    Multiple(Vec<String>),
}

impl Category {
    /// Builds a category from collected values; `None` when there are none.
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Category::Single),
            _ => Some(Category::Multiple(values)),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Category::Single(value) => vec![value.as_str()],
            Category::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Source-native event as produced by one adapter fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Identifier scoped to the producing source
    pub source_id: String,
    pub title: String,
    /// May still contain markup
    pub description: String,
    pub date: DateTime<Utc>,
    pub link: String,
    pub location: Option<String>,
    pub category: Option<Category>,
    /// Opaque protocol-specific payload
    pub source_data: Option<serde_json::Value>,
    /// Name of the producing source
    pub source: String,
    pub agency: Option<String>,
}

/// Event in the canonical schema.
///
/// `tags` never holds duplicates. `id` is zero until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub jurisdiction: Jurisdiction,
    pub agency: String,
    pub url: Option<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub tags: Vec<String>,
}

impl NormalizedEvent {
    /// Calendar day (UTC) used for dedup keys and storage.
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}
