//! Source-type specific normalization of [`RawEvent`]s into [`NormalizedEvent`]s.
//!
//! [`format_event`] is total: every raw event, whatever its shape, yields an
//! event whose required fields are populated. Unknown source types route to
//! the default branch rather than failing.

pub mod calendar;
pub mod city;
pub mod committee;
pub mod executive;

use crate::model::{Jurisdiction, NormalizedEvent, RawEvent, SourceConfig, SourceType, LOCATION_TBD};
use crate::tags;
use crate::traits::{EventNormalizer, NormalizeError};

/// Builds the event every source type starts from.
pub fn base_event(raw: &RawEvent, jurisdiction: Jurisdiction) -> NormalizedEvent {
    let location = raw
        .location
        .as_deref()
        .map(str::trim)
        .filter(|location| !location.is_empty())
        .unwrap_or(LOCATION_TBD)
        .to_string();
    let url = Some(raw.link.trim())
        .filter(|link| !link.is_empty())
        .map(str::to_string);

    NormalizedEvent {
        id: 0,
        title: raw.title.clone(),
        description: tags::clean_description(&raw.description),
        date: raw.date,
        location,
        jurisdiction,
        agency: raw.agency.clone().unwrap_or_default(),
        url,
        is_virtual: tags::is_virtual(&raw.title, &raw.description),
        tags: tags::base_tags(raw),
    }
}

/// Fills fields a source left unset with the source type's defaults.
pub(crate) fn apply_defaults(
    mut event: NormalizedEvent,
    jurisdiction: Jurisdiction,
    agency: &str,
    extra_tags: Vec<String>,
) -> NormalizedEvent {
    if event.jurisdiction == Jurisdiction::Unknown {
        event.jurisdiction = jurisdiction;
    }
    if event.agency.trim().is_empty() {
        event.agency = agency.to_string();
    }
    event.tags.extend(extra_tags);
    event.tags = tags::dedup_tags(std::mem::take(&mut event.tags));
    event
}

/// Normalizes one raw event according to its source type.
pub fn format_event(
    raw: &RawEvent,
    source_type: &SourceType,
    jurisdiction: Jurisdiction,
) -> NormalizedEvent {
    let base = base_event(raw, jurisdiction);
    match source_type {
        SourceType::LegislatureCommittee => committee::normalize(raw, base),
        SourceType::LegislatureCalendar => calendar::normalize(raw, base),
        SourceType::Executive => executive::normalize(raw, base),
        SourceType::CityMeetings => city::normalize(raw, base),
        SourceType::Other(_) => normalize_default(base),
    }
}

fn normalize_default(base: NormalizedEvent) -> NormalizedEvent {
    apply_defaults(base, Jurisdiction::Unknown, "", Vec::new())
}

/// The normalizer the harvest pipeline uses unless told otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardNormalizer;

impl EventNormalizer for StandardNormalizer {
    fn normalize(
        &self,
        raw: &RawEvent,
        config: &SourceConfig,
    ) -> Result<NormalizedEvent, NormalizeError> {
        Ok(format_event(raw, &config.source_type, config.jurisdiction))
    }
}
