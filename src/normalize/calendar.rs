//! Legislative session calendars: bills scheduled for floor consideration.

use super::committee::extract_bill_number;
use crate::model::{Category, Jurisdiction, NormalizedEvent, RawEvent};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_AGENCY: &str = "Legislature";

const COMMITTEE_KEYWORDS: &[&str] = &[
    "FINANCE",
    "JUDICIARY",
    "TRANSPORTATION",
    "EDUCATION",
    "HEALTH",
    "APPROPRIATIONS",
    "RULES",
    "AGRICULTURE",
    "COMMERCE",
    "ENVIRONMENT",
    "ENERGY",
    "LABOR",
];

fn upper_bill_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z\s]+\sBILL").expect("valid bill category regex"))
}

/// Committee or subject area for a calendar item.
///
/// Looks at a single-string category first (`SECOND CONSIDERATION|CHILDREN & YOUTH BILL`),
/// then at the trailing `-` segment of the description.
pub fn extract_committee(category: Option<&Category>, description: &str) -> Option<String> {
    if let Some(Category::Single(category)) = category {
        for part in category.split('|').map(str::trim) {
            if part.contains('&') || upper_bill_re().is_match(part) {
                return Some(part.to_string());
            }
            if COMMITTEE_KEYWORDS.iter().any(|keyword| part.contains(keyword)) {
                return Some(part.to_string());
            }
        }
    }

    let segments: Vec<&str> = description.split('-').collect();
    if segments.len() > 1 {
        let last = segments[segments.len() - 1].trim();
        if last.len() > 3 && last.len() < 100 {
            return Some(last.to_string());
        }
    }
    None
}

pub fn normalize(raw: &RawEvent, event: NormalizedEvent) -> NormalizedEvent {
    let mut extra = vec![
        "Legislative Session".to_string(),
        "Bill Consideration".to_string(),
    ];
    extra.extend(extract_bill_number(&raw.title).map(|number| format!("Bill {number}")));
    extra.extend(extract_committee(raw.category.as_ref(), &raw.description));

    super::apply_defaults(event, Jurisdiction::State, DEFAULT_AGENCY, extra)
}
