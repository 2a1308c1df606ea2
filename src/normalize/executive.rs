//! Executive branch announcements: governor's office, agencies, CIO offices.

use crate::model::{Jurisdiction, NormalizedEvent, RawEvent};
use crate::tags::searchable_text;

pub const DEFAULT_AGENCY: &str = "Executive Branch";

pub const TOPICS: &[(&str, &[&str])] = &[
    ("Budget", &["budget", "fiscal", "funding", "appropriation", "financial"]),
    (
        "Infrastructure",
        &["infrastructure", "roads", "bridges", "highway", "transportation"],
    ),
    (
        "Healthcare",
        &["healthcare", "health", "medical", "hospital", "medicaid", "medicare"],
    ),
    (
        "Education",
        &["education", "school", "university", "college", "student", "teacher"],
    ),
    (
        "Environment",
        &["environment", "climate", "pollution", "conservation", "sustainability"],
    ),
    (
        "Economic Development",
        &["economic", "economy", "business", "industry", "jobs", "workforce"],
    ),
    (
        "Public Safety",
        &["safety", "police", "emergency", "law enforcement", "crime", "criminal justice"],
    ),
    (
        "Press Conference",
        &["press", "media", "statement", "announcement", "announces", "unveils"],
    ),
    (
        "Technology",
        &["technology", "tech", "innovation", "digital", "modernization", "it ", "information technology"],
    ),
    (
        "Cybersecurity",
        &["cybersecurity", "cyber", "security", "hack", "breach", "data security", "privacy"],
    ),
    (
        "Broadband",
        &["broadband", "internet", "connectivity", "digital divide", "high-speed internet"],
    ),
    (
        "AI",
        &["ai", "artificial intelligence", "machine learning", "automation", "algorithm"],
    ),
    (
        "Open Data",
        &["open data", "data portal", "transparency", "data sharing", "public data"],
    ),
    (
        "Smart City",
        &["smart city", "smart cities", "iot", "internet of things", "sensors", "connected"],
    ),
];

/// Topic labels whose keywords appear in the title or description.
pub fn extract_topic_tags(title: &str, description: &str) -> Vec<String> {
    let text = searchable_text(title, description);
    TOPICS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}

pub fn normalize(raw: &RawEvent, event: NormalizedEvent) -> NormalizedEvent {
    let mut extra = vec!["Executive".to_string()];
    extra.extend(extract_topic_tags(&raw.title, &raw.description));
    super::apply_defaults(event, Jurisdiction::State, DEFAULT_AGENCY, extra)
}
