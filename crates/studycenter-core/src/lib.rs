//! # Study Center Core Library
//!
//! The logic behind the study center site's interactive widgets, kept free
//! of any rendering layer so it can be driven and tested directly.
//!
//! ## Architecture
//!
//! - **Engagement**: a caller-driven state machine that decides when the
//!   daily tip and newsletter prompts (and the floating contact button)
//!   appear, from elapsed-time, scroll and idle triggers. The host calls
//!   `tick()` periodically; no internal threads.
//! - **Calendar**: expands dated events into a day-keyed index for the
//!   events page month grid.
//! - **Storage**: key-value capability for dismissal flags (in-memory or
//!   SQLite) and TOML-based configuration.
//!
//! ## Key Components
//!
//! - [`EngagementPromptScheduler`]: prompt arbitration state machine
//! - [`EventCalendarIndex`]: day key to events lookup
//! - [`KeyValueStore`]: durable storage capability
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod engagement;
pub mod error;
pub mod storage;

pub use calendar::{DayKey, DayPick, Event, EventCalendarIndex, EventCategory, EventList, Month, MonthGrid};
pub use engagement::{
    Clock, EngagementPromptScheduler, ManualClock, PromptEvent, PromptKind, SchedulerConfig,
    ScrollMetrics, SystemClock, Visibility,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
