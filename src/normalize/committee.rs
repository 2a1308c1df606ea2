//! Legislative committee meetings.

use crate::model::{Jurisdiction, NormalizedEvent, RawEvent};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const DEFAULT_LOCATION: &str = "Pennsylvania State Capitol";
pub const DEFAULT_AGENCY: &str = "Pennsylvania Legislature";

const COMMITTEE_KEYWORDS: &[&str] = &[
    "Finance",
    "Judiciary",
    "Transportation",
    "Education",
    "Health",
    "Appropriations",
    "Rules",
    "Agriculture",
    "Commerce",
    "Environment",
    "Energy",
    "Labor",
];

fn committee_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(.*?)\s(?:Committee|Commission)\s(?:Meeting|Hearing)")
            .expect("valid committee title regex")
    })
}

fn bill_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:House|Senate)\s+Bill\s+(\d+)").expect("valid bill number regex")
    })
}

fn regarding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)regarding\s+([^.]+)").expect("valid regarding regex"))
}

/// Bill and topic details pulled from a committee item's payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BillInfo {
    pub bill_number: Option<String>,
    pub topic: Option<String>,
}

/// Committee name from titles like `House Finance Committee Meeting`,
/// falling back to a known committee keyword in the title.
pub fn extract_committee_name(title: &str) -> Option<String> {
    if let Some(caps) = committee_title_re().captures(title) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    COMMITTEE_KEYWORDS
        .iter()
        .find(|keyword| title.contains(*keyword))
        .map(|keyword| keyword.to_string())
}

/// Number from `House Bill 156` / `Senate Bill 12`.
pub fn extract_bill_number(text: &str) -> Option<String> {
    bill_number_re()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

fn str_field<'a>(data: &'a Value, name: &str) -> Option<&'a str> {
    data.get(name).and_then(Value::as_str)
}

pub fn extract_bill_info(source_data: &Value) -> BillInfo {
    let mut info = BillInfo {
        bill_number: str_field(source_data, "title").and_then(extract_bill_number),
        topic: None,
    };

    if let Some(caps) = str_field(source_data, "description").and_then(|d| regarding_re().captures(d)) {
        info.topic = Some(caps[1].trim().to_string());
    }

    if let Some(category) = str_field(source_data, "category") {
        let parts: Vec<&str> = category.split(['|', ',', ';']).collect();
        if parts.len() > 1 {
            let candidate = parts[parts.len() - 1].trim();
            if candidate.len() > 3 && candidate != "BILL" {
                info.topic = Some(candidate.to_string());
            }
        }
    }
    info
}

pub fn normalize(raw: &RawEvent, mut event: NormalizedEvent) -> NormalizedEvent {
    event.location = raw
        .location
        .as_deref()
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .unwrap_or(DEFAULT_LOCATION)
        .to_string();

    let mut extra = vec!["Committee Meeting".to_string()];
    extra.extend(extract_committee_name(&raw.title));
    if let Some(data) = &raw.source_data {
        let info = extract_bill_info(data);
        extra.extend(info.bill_number.map(|number| format!("Bill {number}")));
        extra.extend(info.topic);
    }

    super::apply_defaults(event, Jurisdiction::State, DEFAULT_AGENCY, extra)
}
