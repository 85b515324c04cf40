//! Day-indexed event lookup.
//!
//! Build cost is proportional to the total number of days spanned by all
//! events, not the number of events.

use std::collections::BTreeMap;

use serde::Serialize;

use super::day::DayKey;
use super::event::{Event, EventList};
use super::month::{Month, MonthGrid};

/// What to show when a visitor picks a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DayPick<'a> {
    /// Exactly one event covers the day.
    Single { event: &'a Event },
    /// Several events, in index order.
    Multi {
        title: String,
        day: DayKey,
        events: Vec<&'a Event>,
    },
}

impl DayPick<'_> {
    pub fn len(&self) -> usize {
        match self {
            DayPick::Single { .. } => 1,
            DayPick::Multi { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only multi-map from day key to the events covering that day.
///
/// Buckets keep input order, and every present key has a non-empty bucket.
#[derive(Debug, Clone, Default)]
pub struct EventCalendarIndex {
    events: Vec<Event>,
    by_day: BTreeMap<DayKey, Vec<usize>>,
}

impl EventCalendarIndex {
    pub fn build(events: Vec<Event>) -> Self {
        let mut by_day: BTreeMap<DayKey, Vec<usize>> = BTreeMap::new();
        for (pos, event) in events.iter().enumerate() {
            for day in event.days() {
                by_day.entry(day).or_default().push(pos);
            }
        }
        tracing::debug!(events = events.len(), days = by_day.len(), "event calendar index built");
        Self { events, by_day }
    }

    /// Sort by start day (stable) before indexing, as the events page lists them.
    pub fn build_chronological(mut list: EventList) -> Self {
        list.sort_chronologically();
        Self::build(list.into_events())
    }

    pub fn has_events(&self, day: DayKey) -> bool {
        self.by_day.contains_key(&day)
    }

    /// Events covering `day`, in input order. Empty when nothing is on.
    pub fn events_on(&self, day: DayKey) -> Vec<&Event> {
        self.by_day
            .get(&day)
            .map(|positions| positions.iter().map(|&i| &self.events[i]).collect())
            .unwrap_or_default()
    }

    /// One event shows alone; several show as a combined listing with no
    /// re-ordering by time of day.
    pub fn pick_day(&self, day: DayKey) -> Option<DayPick<'_>> {
        let mut events = self.events_on(day);
        match events.len() {
            0 => None,
            1 => events.pop().map(|event| DayPick::Single { event }),
            _ => Some(DayPick::Multi {
                title: format!("Events on {}", day.display_long()),
                day,
                events,
            }),
        }
    }

    /// Days with at least one event, ascending.
    pub fn active_days(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.by_day.keys().copied()
    }

    /// The indexed events in index order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Month grid with active days marked. `None` for the first and last
    /// months chrono can represent, whose grid would leave its date range.
    pub fn month_grid(&self, month: Month) -> Option<MonthGrid> {
        MonthGrid::build(month, |day| self.has_events(day))
    }
}
