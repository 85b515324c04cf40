//! Calendar events and event list loading.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::day::DayKey;
use crate::error::{CoreError, ValidationError};

/// Event category. Unknown values are kept verbatim and shown generically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventCategory {
    Contest,
    Webinar,
    Program,
    Workshop,
    Announcement,
    Other(String),
}

impl EventCategory {
    /// Badge label: the upper-cased category name.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventCategory::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventCategory::Contest => "contest",
            EventCategory::Webinar => "webinar",
            EventCategory::Program => "program",
            EventCategory::Workshop => "workshop",
            EventCategory::Announcement => "announcement",
            EventCategory::Other(raw) => raw,
        }
    }
}

impl Default for EventCategory {
    fn default() -> Self {
        EventCategory::Other("event".into())
    }
}

impl From<String> for EventCategory {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "contest" => EventCategory::Contest,
            "webinar" => EventCategory::Webinar,
            "program" => EventCategory::Program,
            "workshop" => EventCategory::Workshop,
            "announcement" => EventCategory::Announcement,
            _ => EventCategory::Other(raw),
        }
    }
}

impl From<EventCategory> for String {
    fn from(category: EventCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External link shown on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    pub label: String,
    pub href: String,
}

/// One calendar-worthy item. `end` absent means a single-day event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: EventCategory,
    pub start: DayKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DayKey>,
    /// Free text, never parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<CallToAction>,
    /// Badge text such as "Featured".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

impl Event {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: DayKey) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: EventCategory::default(),
            start,
            end: None,
            time: None,
            location: None,
            description: Vec::new(),
            cta: None,
            highlight: None,
        }
    }

    /// Last day, clamped so it is never before `start`.
    pub fn last_day(&self) -> DayKey {
        self.end.map_or(self.start, |end| end.max(self.start))
    }

    pub fn is_multi_day(&self) -> bool {
        self.last_day() != self.start
    }

    pub fn has_inverted_range(&self) -> bool {
        self.end.is_some_and(|end| end < self.start)
    }

    /// Every day this event occupies.
    pub fn days(&self) -> impl Iterator<Item = DayKey> {
        DayKey::span(self.start, self.last_day())
    }

    pub fn covers(&self, day: DayKey) -> bool {
        self.start <= day && day <= self.last_day()
    }

    /// `"25 Aug 2025 – 03 Sep 2025"`, or a single date for one-day events.
    pub fn span_label(&self) -> String {
        if self.is_multi_day() {
            format!(
                "{} \u{2013} {}",
                self.start.display_long(),
                self.last_day().display_long()
            )
        } else {
            self.start.display_long()
        }
    }
}

#[derive(Deserialize)]
struct EventFile {
    #[serde(default)]
    events: Vec<Event>,
}

/// A validated, ordered list of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    /// Wrap and validate.
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn new(events: Vec<Event>) -> Result<Self, ValidationError> {
        let list = Self { events };
        list.validate()?;
        Ok(list)
    }

    /// Parse a TOML document with an `[[events]]` array.
    ///
    /// # Errors
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let file: EventFile = toml::from_str(content)?;
        Ok(Self::new(file.events)?)
    }

    /// Parse a JSON array of events.
    ///
    /// # Errors
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_json_str(content: &str) -> Result<Self, CoreError> {
        let events: Vec<Event> = serde_json::from_str(content)?;
        Ok(Self::new(events)?)
    }

    /// Load from a `.toml` or `.json` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, has an unknown
    /// extension, does not parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = std::fs::read_to_string(path)?;
        match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ValidationError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for event in &self.events {
            if !seen.insert(event.id.as_str()) {
                return Err(ValidationError::DuplicateEventId(event.id.clone()));
            }
            if event.title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle(event.id.clone()));
            }
            if let Some(cta) = &event.cta {
                url::Url::parse(&cta.href).map_err(|e| ValidationError::InvalidCtaUrl {
                    id: event.id.clone(),
                    href: cta.href.clone(),
                    message: e.to_string(),
                })?;
            }
            if event.has_inverted_range() {
                tracing::warn!(
                    id = %event.id,
                    start = %event.start,
                    "event ends before it starts; indexing start day only"
                );
            }
        }
        Ok(())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stable sort by start day.
    pub fn sort_chronologically(&mut self) {
        self.events.sort_by_key(|e| e.start);
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
