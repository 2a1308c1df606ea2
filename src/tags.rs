//! Keyword and pattern based classification of free text into topical tags.
//!
//! Every function here is pure: the same input always yields the same tags,
//! independent of call order.

use crate::model::{Category, RawEvent};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const VIRTUAL_KEYWORDS: &[&str] = &[
    "virtual", "online", "zoom", "teams", "webex", "remote", "webinar",
];

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&#x26;", "&"),
    ("&#x27;", "'"),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
];

/// Topic label and the lowercase keywords that trigger it.
pub const TECH_TOPICS: &[(&str, &[&str])] = &[
    (
        "Information Technology",
        &["it ", "information technology", "technology services", "tech department"],
    ),
    (
        "Cybersecurity",
        &["cybersecurity", "cyber security", "security breach", "ransomware", "malware", "phishing"],
    ),
    (
        "Digital Services",
        &["digital services", "e-government", "digital government", "online services"],
    ),
    (
        "Data Management",
        &["data management", "data governance", "database", "data warehouse", "data lake"],
    ),
    (
        "Cloud Computing",
        &["cloud", "aws", "azure", "google cloud", "cloud migration", "iaas", "paas", "saas"],
    ),
    (
        "Network Infrastructure",
        &["network", "infrastructure", "broadband", "internet access", "connectivity"],
    ),
    (
        "Software Development",
        &["software", "development", "programming", "code", "application development"],
    ),
    (
        "Enterprise Architecture",
        &["enterprise architecture", "it architecture", "system design"],
    ),
    (
        "AI & Machine Learning",
        &["artificial intelligence", "machine learning", "ai", "ml", "automation", "chatbot"],
    ),
    ("Blockchain", &["blockchain", "distributed ledger", "smart contract"]),
    ("IT Procurement", &["procurement", "contract", "vendor", "rfp", "acquisition"]),
    (
        "Digital Inclusion",
        &["digital divide", "digital inclusion", "digital literacy", "technology access"],
    ),
    ("Open Data", &["open data", "data portal", "transparency", "public data"]),
    (
        "IT Modernization",
        &["modernization", "legacy system", "system upgrade", "technology refresh"],
    ),
];

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>?").expect("valid html tag regex"))
}

fn html_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[#\w]+;").expect("valid html entity regex"))
}

fn state_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^([a-z]{2})-").expect("valid state prefix regex"))
}

fn tech_agency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)technology|IT|information|digital|cyber").expect("valid tech agency regex")
    })
}

/// Lowercased `title description`, the haystack for keyword tables.
pub fn searchable_text(title: &str, description: &str) -> String {
    format!("{title} {description}").to_lowercase()
}

/// Strips markup and decodes the common entities. Unknown entities are kept.
pub fn clean_description(description: &str) -> String {
    let stripped = html_tag_re().replace_all(description, "");
    html_entity_re()
        .replace_all(&stripped, |caps: &regex::Captures<'_>| {
            let entity = &caps[0];
            HTML_ENTITIES
                .iter()
                .find(|(name, _)| *name == entity)
                .map(|(_, decoded)| decoded.to_string())
                .unwrap_or_else(|| entity.to_string())
        })
        .trim()
        .to_string()
}

pub fn is_virtual(title: &str, description: &str) -> bool {
    let text = searchable_text(title, description);
    VIRTUAL_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Splits categories such as `SECOND CONSIDERATION|JUDICIARY BILLS` into parts.
pub fn split_categories(category: &Category) -> Vec<String> {
    category
        .values()
        .into_iter()
        .flat_map(|value| value.split(['|', ',', ';']))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Upper-cased two-letter prefix of names like `pa-house-committee`.
pub fn state_tag(source_name: &str) -> Option<String> {
    state_prefix_re()
        .captures(source_name)
        .map(|caps| caps[1].to_uppercase())
}

/// Technology topics found in the text, plus `Technology` for IT agencies.
pub fn tech_tags(title: &str, description: &str, agency: Option<&str>) -> Vec<String> {
    let text = searchable_text(title, description);
    let mut tags: Vec<String> = TECH_TOPICS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(label, _)| label.to_string())
        .collect();

    if agency.is_some_and(|agency| tech_agency_re().is_match(agency)) {
        tags.push("Technology".to_string());
    }
    tags
}

/// Category, state and technology tags for a raw event, deduplicated.
pub fn base_tags(event: &RawEvent) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(category) = &event.category {
        tags.extend(split_categories(category));
    }
    tags.extend(state_tag(&event.source));
    tags.extend(tech_tags(
        &event.title,
        &event.description,
        event.agency.as_deref(),
    ));
    dedup_tags(tags)
}

/// Removes repeated tags, keeping the first occurrence of each.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
