//! City council, planning and other municipal meetings.

use crate::model::{Jurisdiction, NormalizedEvent, RawEvent};
use crate::tags::searchable_text;
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_AGENCY: &str = "City Government";

const CITY_CODES: &[(&str, &str)] = &[
    ("nyc", "New York City"),
    ("la", "Los Angeles"),
    ("chicago", "Chicago"),
    ("houston", "Houston"),
    ("philly", "Philadelphia"),
    ("philadelphia", "Philadelphia"),
    ("phoenix", "Phoenix"),
    ("sd", "San Diego"),
    ("dallas", "Dallas"),
    ("sf", "San Francisco"),
];

const MEETING_TYPES: &[&str] = &[
    "City Council",
    "Planning Commission",
    "Zoning Board",
    "Budget Committee",
    "Public Hearing",
    "Town Hall",
    "Community Meeting",
    "Board Meeting",
    "Committee Meeting",
    "Special Session",
    "Working Group",
    "Task Force",
];

fn city_source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^([a-z]{2})-(.+?)(?:-|$)").expect("valid city source regex"))
}

fn city_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?i:city of|in) ([A-Z][a-z]+(?: [A-Z][a-z]+)?)")
            .expect("valid city text regex")
    })
}

fn meeting_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\w+\s+(?:meeting|hearing|session|board|commission|committee))")
            .expect("valid meeting type regex")
    })
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// City name from an `xx-cityname-...` source name.
pub fn city_from_source(source: &str) -> Option<String> {
    let caps = city_source_re().captures(source)?;
    let code = caps[2].to_lowercase();
    let name = CITY_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, city)| city.to_string())
        .unwrap_or_else(|| title_case(&code));
    Some(name)
}

/// City name from the source name, else from `city of X` / `in X` in the text.
pub fn extract_city_name(raw: &RawEvent) -> Option<String> {
    if let Some(city) = city_from_source(&raw.source) {
        return Some(city);
    }
    let text = format!("{} {}", raw.title, raw.description);
    city_text_re()
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// Meeting type from the fixed list, else a `<word> meeting|hearing|...` phrase.
pub fn extract_meeting_type(title: &str, description: &str) -> Option<String> {
    let text = searchable_text(title, description);
    if let Some(kind) = MEETING_TYPES
        .iter()
        .find(|kind| text.contains(&kind.to_lowercase()))
    {
        return Some(kind.to_string());
    }
    meeting_pattern_re()
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

pub fn normalize(raw: &RawEvent, event: NormalizedEvent) -> NormalizedEvent {
    let mut extra = vec!["Local Government".to_string(), "City Meeting".to_string()];
    extra.extend(extract_city_name(raw));
    extra.extend(extract_meeting_type(&raw.title, &raw.description));
    super::apply_defaults(event, Jurisdiction::Local, DEFAULT_AGENCY, extra)
}
