//! Lenient date parsing shared by the source adapters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const MONTHS: &str = "Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?";

fn textual_date_patterns() -> &'static [Regex; 4] {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(&format!(r"(?i)\b(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}"))
                .expect("valid month-first date regex"),
            Regex::new(&format!(r"(?i)\b\d{{1,2}}\s+(?:{MONTHS})\.?,?\s+\d{{4}}"))
                .expect("valid day-first date regex"),
            Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("valid MM/DD/YYYY regex"),
            Regex::new(r"\b\d{4}-\d{1,2}-\d{1,2}\b").expect("valid YYYY-MM-DD regex"),
        ]
    })
}

fn ordinal_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").expect("valid ordinal regex"))
}

fn sept_abbrev_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bsept\b").expect("valid sept abbreviation regex"))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Parses the date forms found in feeds, calendars and pages.
///
/// Date-only values resolve to midnight UTC; values without an offset are
/// taken as UTC.
pub fn parse_loose(input: &str) -> Option<DateTime<Utc>> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    let cleaned = ordinal_suffix_re().replace_all(text, "$1").replace('.', "");
    // chrono knows `Sep` and `September` but not `Sept`.
    let cleaned = sept_abbrev_re().replace_all(&cleaned, "Sep");
    let cleaned = cleaned.trim().trim_end_matches(',');
    for format in [
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%B %d, %Y",
        "%B %d %Y",
        "%d %B %Y",
        "%d %B, %Y",
        "%A, %B %d, %Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(midnight(date));
        }
    }
    None
}

/// Finds the first recognizable date anywhere in free text.
///
/// Patterns are tried in order: month name first, day before month,
/// `MM/DD/YYYY`, then `YYYY-MM-DD`.
pub fn find_in_text(text: &str) -> Option<DateTime<Utc>> {
    textual_date_patterns()
        .iter()
        .filter_map(|pattern| pattern.find(text))
        .find_map(|found| parse_loose(found.as_str()))
}

/// Parses an iCalendar `DATE` or `DATE-TIME` value.
pub fn parse_ical(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Some(utc) = value.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|naive| naive.and_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d").map(midnight))
        .ok()
        .or_else(|| parse_loose(value))
}
