//! Reconciliation passes over a harvested batch.
//!
//! Each pass is pure. The pipeline applies them in a fixed order:
//! [`deduplicate_events`], then [`filter_past_events`] when enabled, then
//! [`limit_events_per_source`].

use crate::model::{NormalizedEvent, LOCATION_TBD};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Group label for events without an agency.
pub const UNKNOWN_AGENCY: &str = "Unknown";

/// Merges `incoming` into `existing`. Only tags, description and location move.
fn merge_into(existing: &mut NormalizedEvent, incoming: NormalizedEvent) {
    for tag in incoming.tags {
        if !existing.tags.contains(&tag) {
            existing.tags.push(tag);
        }
    }
    if incoming.description.chars().count() > existing.description.chars().count() {
        existing.description = incoming.description;
    }
    if existing.location == LOCATION_TBD
        && incoming.location != LOCATION_TBD
        && !incoming.location.trim().is_empty()
    {
        existing.location = incoming.location;
    }
}

/// Collapses events sharing a title and calendar day into the first one seen.
pub fn deduplicate_events(events: Vec<NormalizedEvent>) -> Vec<NormalizedEvent> {
    let mut index: HashMap<(String, NaiveDate), usize> = HashMap::with_capacity(events.len());
    let mut unique: Vec<NormalizedEvent> = Vec::with_capacity(events.len());

    for event in events {
        let key = (event.title.clone(), event.day());
        match index.get(&key) {
            Some(&position) => merge_into(&mut unique[position], event),
            None => {
                index.insert(key, unique.len());
                unique.push(event);
            }
        }
    }
    unique
}

/// Drops events dated strictly before `now`.
pub fn filter_past_events(events: Vec<NormalizedEvent>, now: DateTime<Utc>) -> Vec<NormalizedEvent> {
    events.into_iter().filter(|event| event.date >= now).collect()
}

/// Keeps at most `limit` events per agency, soonest first.
///
/// Groups come out in the order their agency was first seen.
pub fn limit_events_per_source(events: Vec<NormalizedEvent>, limit: usize) -> Vec<NormalizedEvent> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<NormalizedEvent>> = HashMap::new();

    for event in events {
        let agency = if event.agency.is_empty() {
            UNKNOWN_AGENCY.to_string()
        } else {
            event.agency.clone()
        };
        groups
            .entry(agency.clone())
            .or_insert_with(|| {
                order.push(agency);
                Vec::new()
            })
            .push(event);
    }

    order
        .into_iter()
        .filter_map(|agency| groups.remove(&agency))
        .flat_map(|mut group| {
            group.sort_by_key(|event| event.date);
            group.into_iter().take(limit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Jurisdiction;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn event(title: &str, date: DateTime<Utc>, agency: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: 0,
            title: title.to_string(),
            description: String::new(),
            date,
            location: LOCATION_TBD.to_string(),
            jurisdiction: Jurisdiction::State,
            agency: agency.to_string(),
            url: None,
            is_virtual: false,
            tags: Vec::new(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 3, hour, 0, 0).unwrap()
    }

    #[test]
    fn merges_same_title_and_day() {
        let mut first = event("Budget Meeting", at(10), "A");
        first.description = "short text".into();
        first.tags = vec!["Budget".into(), "PA".into()];
        let mut second = event("Budget Meeting", at(18), "B");
        second.description = "a considerably longer description of the meeting".into();
        second.location = "City Hall".into();
        second.tags = vec!["PA".into(), "Finance".into()];

        let merged = deduplicate_events(vec![first, second]);
        assert_eq!(merged.len(), 1);
        let merged = &merged[0];
        assert_eq!(merged.date, at(10));
        assert_eq!(merged.agency, "A");
        assert_eq!(merged.location, "City Hall");
        assert_eq!(merged.description, "a considerably longer description of the meeting");
        assert_eq!(merged.tags, vec!["Budget", "PA", "Finance"]);
    }

    #[test]
    fn equal_length_description_keeps_first() {
        let mut first = event("Hearing", at(9), "A");
        first.description = "aaaa".into();
        let mut second = event("Hearing", at(11), "A");
        second.description = "bbbb".into();

        assert_eq!(deduplicate_events(vec![first, second])[0].description, "aaaa");
    }

    #[test]
    fn merge_order_only_matters_for_text_fields() {
        let mut brief = event("Town Hall", at(9), "A");
        brief.description = "Agenda TBA".into();
        brief.tags = vec!["Budget".into(), "PA".into()];
        let mut detailed = event("Town Hall", at(14), "A");
        detailed.description = "Annual budget review and public comment".into();
        detailed.location = "Council Chambers".into();
        detailed.tags = vec!["PA".into(), "Open Data".into()];

        let forward = deduplicate_events(vec![brief.clone(), detailed.clone()]);
        let backward = deduplicate_events(vec![detailed.clone(), brief.clone()]);
        assert_eq!((forward.len(), backward.len()), (1, 1));

        let tag_set = |e: &NormalizedEvent| e.tags.iter().cloned().collect::<BTreeSet<_>>();
        assert_eq!(tag_set(&forward[0]), tag_set(&backward[0]));

        // Longer text and a known location win from either side.
        for merged in [&forward[0], &backward[0]] {
            assert_eq!(merged.description, detailed.description);
            assert_eq!(merged.location, "Council Chambers");
        }
        // The first-seen event keeps its date.
        assert_eq!(forward[0].date, at(9));
        assert_eq!(backward[0].date, at(14));

        // Equal lengths and two known locations: first seen wins.
        let mut left = event("Town Hall", at(9), "A");
        left.description = "left".into();
        left.location = "Room 1".into();
        let mut right = event("Town Hall", at(10), "A");
        right.description = "rght".into();
        right.location = "Room 2".into();

        let lr = deduplicate_events(vec![left.clone(), right.clone()]);
        let rl = deduplicate_events(vec![right, left]);
        assert_eq!((lr[0].description.as_str(), lr[0].location.as_str()), ("left", "Room 1"));
        assert_eq!((rl[0].description.as_str(), rl[0].location.as_str()), ("rght", "Room 2"));
    }

    #[test]
    fn known_location_is_not_overwritten() {
        let mut first = event("Hearing", at(9), "A");
        first.location = "Room 1".into();
        let mut second = event("Hearing", at(11), "A");
        second.location = "Room 2".into();

        assert_eq!(deduplicate_events(vec![first, second])[0].location, "Room 1");
    }

    #[test]
    fn title_match_is_case_sensitive_and_day_scoped() {
        let events = vec![
            event("Hearing", at(9), "A"),
            event("hearing", at(9), "A"),
            event("Hearing", at(9) + Duration::days(1), "A"),
        ];
        assert_eq!(deduplicate_events(events).len(), 3);
    }

    #[test]
    fn past_filter_keeps_events_at_now() {
        let now = at(12);
        let events = vec![
            event("now", now, "A"),
            event("earlier", now - Duration::microseconds(1), "A"),
            event("later", now + Duration::seconds(1), "A"),
        ];
        let kept: Vec<String> = filter_past_events(events, now)
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(kept, vec!["now", "later"]);
    }

    #[test]
    fn cap_keeps_soonest_per_agency() {
        let events = vec![
            event("a5", at(15), "A"),
            event("b1", at(1), ""),
            event("a1", at(11), "A"),
            event("a3", at(13), "A"),
            event("b2", at(2), ""),
        ];
        let titles: Vec<String> = limit_events_per_source(events, 2)
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["a1", "a3", "b1", "b2"]);
    }

    fn arb_event() -> impl Strategy<Value = NormalizedEvent> {
        (
            prop::sample::select(vec!["Budget", "Hearing", "Session"]),
            0u32..48,
            prop::sample::select(vec!["A", "B", ""]),
            prop::sample::select(vec!["TBD", "Capitol", "City Hall"]),
            "[a-z ]{0,20}",
            prop::collection::vec(prop::sample::select(vec!["X", "Y", "Z"]), 0..3),
        )
            .prop_map(|(title, hours, agency, location, description, tags)| {
                let mut e = event(title, at(0) + Duration::hours(hours as i64), agency);
                e.location = location.to_string();
                e.description = description;
                e.tags = crate::tags::dedup_tags(tags.into_iter().map(String::from).collect());
                e
            })
    }

    proptest! {
        #[test]
        fn dedup_is_idempotent(events in prop::collection::vec(arb_event(), 0..30)) {
            let once = deduplicate_events(events);
            let twice = deduplicate_events(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn cap_bounds_every_agency(events in prop::collection::vec(arb_event(), 0..30), limit in 0usize..5) {
            let capped = limit_events_per_source(events.clone(), limit);
            for agency in ["A", "B", UNKNOWN_AGENCY] {
                let label = |e: &NormalizedEvent| if e.agency.is_empty() { UNKNOWN_AGENCY.to_string() } else { e.agency.clone() };
                let kept: Vec<_> = capped.iter().filter(|e| label(e) == agency).map(|e| e.date).collect();
                let mut all: Vec<_> = events.iter().filter(|e| label(e) == agency).map(|e| e.date).collect();
                all.sort();
                all.truncate(limit);
                prop_assert_eq!(kept, all);
            }
        }
    }
}
