//! Integration tests for the engagement prompt scheduler.
//!
//! Drives whole visits over virtual time against in-memory, SQLite,
//! counting and failing stores.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use proptest::prelude::*;
use studycenter_core::engagement::{
    EngagementPromptScheduler, ManualClock, PromptEvent, PromptKind, SchedulerConfig,
    TriggerSource, Visibility,
};
use studycenter_core::error::StoreError;
use studycenter_core::storage::{Database, KeyValueStore, MemoryStore};

// ============================================================================
// Test Stores
// ============================================================================

/// Records every write so tests can count persistence calls.
#[derive(Default)]
struct CountingStore {
    values: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl CountingStore {
    fn seeded(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.values.borrow_mut().insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.set(self.writes.get() + 1);
        self.values.borrow_mut().insert(key.into(), value.into());
        Ok(())
    }
}

/// Storage disabled entirely.
struct DisabledStore;

impl KeyValueStore for DisabledStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
}

fn config() -> SchedulerConfig {
    SchedulerConfig {
        daily_tip_delay_ms: 5_000,
        newsletter_idle_ms: 15_000,
        scroll_threshold: 0.70,
        reset_idle_on_activity: false,
        contact_button: None,
    }
}

fn visible(daily_tip: bool, newsletter: bool) -> Visibility {
    Visibility { daily_tip, newsletter }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scroll_while_tip_open_queues_until_tip_closes() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();

    clock.advance(5_001);
    scheduler.tick();
    assert_eq!(scheduler.current_visibility(), visible(true, false));

    let events = scheduler.on_scroll(0.75);
    assert_eq!(
        events,
        vec![
            PromptEvent::NewsletterTriggered { source: TriggerSource::Scroll, at_ms: 5_001 },
            PromptEvent::NewsletterQueued { at_ms: 5_001 },
        ]
    );
    assert_eq!(scheduler.current_visibility(), visible(true, false));

    clock.advance(2_000);
    scheduler.tick();
    assert_eq!(scheduler.current_visibility(), visible(true, false));

    scheduler.close_daily_tip();
    assert_eq!(scheduler.current_visibility(), visible(false, true));
    assert_eq!(store.get("dismissedDailyLearning").unwrap().as_deref(), Some("true"));
}

#[test]
fn test_pre_dismissed_newsletter_never_shows() {
    let store = MemoryStore::with_entries([("dismissedNewsletter", "true")]);
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();
    assert!(!scheduler.current_visibility().newsletter);

    clock.advance(6_000);
    scheduler.tick();
    assert!(!scheduler.current_visibility().newsletter);

    scheduler.on_scroll(0.9);
    assert!(!scheduler.current_visibility().newsletter);

    clock.advance(20_000);
    scheduler.tick();
    assert!(!scheduler.current_visibility().newsletter);

    scheduler.close_daily_tip();
    let state = scheduler.state();
    assert!(!state.newsletter_visible);
    assert!(!state.newsletter_queued);
}

#[test]
fn test_pre_dismissed_tip_never_arms() {
    let store = MemoryStore::with_entries([("dismissedDailyLearning", "true")]);
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();
    assert_eq!(scheduler.next_deadline_ms(), Some(15_000));

    clock.advance(60_000);
    let events = scheduler.tick();
    assert!(!events.iter().any(|e| matches!(e, PromptEvent::DailyTipShown { .. })));
    assert_eq!(scheduler.current_visibility(), visible(false, true));
}

#[test]
fn test_close_daily_tip_twice_writes_once() {
    let store = CountingStore::default();
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();

    clock.advance(5_000);
    scheduler.tick();
    scheduler.on_scroll(0.8);

    let first = scheduler.close_daily_tip();
    assert_eq!(first.len(), 2);
    assert!(first.contains(&PromptEvent::NewsletterShown { at_ms: 5_000 }));

    let second = scheduler.close_daily_tip();
    assert!(second.is_empty());
    assert_eq!(store.writes.get(), 1);
    assert_eq!(scheduler.current_visibility(), visible(false, true));
}

#[test]
fn test_close_newsletter_twice_writes_once() {
    let store = CountingStore::seeded("dismissedDailyLearning", "true");
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();
    scheduler.on_scroll(1.0);

    scheduler.close_newsletter();
    scheduler.close_newsletter();
    assert_eq!(store.writes.get(), 1);
    assert_eq!(scheduler.current_visibility(), visible(false, false));
}

#[test]
fn test_disabled_storage_degrades_to_showing_once() {
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(DisabledStore, clock.clone(), config());
    scheduler.start();

    clock.advance(5_000);
    scheduler.tick();
    assert!(scheduler.current_visibility().daily_tip);

    scheduler.close_daily_tip();
    assert!(scheduler.is_dismissed(PromptKind::DailyTip));

    clock.advance(10_000);
    scheduler.tick();
    assert_eq!(scheduler.current_visibility(), visible(false, true));

    // The next visit sees nothing persisted.
    let clock = ManualClock::new(0);
    let mut next = EngagementPromptScheduler::new(DisabledStore, clock.clone(), config());
    next.start();
    clock.advance(5_000);
    next.tick();
    assert!(next.current_visibility().daily_tip);
}

#[test]
fn test_malformed_flag_counts_as_not_dismissed() {
    let store = MemoryStore::with_entries([
        ("dismissedDailyLearning", "yes"),
        ("dismissedNewsletter", "True"),
    ]);
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    assert!(!scheduler.is_dismissed(PromptKind::DailyTip));
    assert!(!scheduler.is_dismissed(PromptKind::Newsletter));

    scheduler.start();
    clock.advance(5_000);
    scheduler.tick();
    assert!(scheduler.current_visibility().daily_tip);
}

#[test]
fn test_dismissals_persist_across_visits_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studycenter.db");

    {
        let db = Database::open_at(&path).unwrap();
        let clock = ManualClock::new(0);
        let mut visit = EngagementPromptScheduler::new(&db, clock.clone(), config());
        visit.start();
        clock.advance(15_000);
        visit.tick();
        visit.close_daily_tip();
        visit.close_newsletter();
    }

    let db = Database::open_at(&path).unwrap();
    let clock = ManualClock::new(0);
    let mut visit = EngagementPromptScheduler::new(&db, clock.clone(), config());
    visit.start();
    assert_eq!(visit.next_deadline_ms(), None);
    clock.advance(60_000);
    assert!(visit.tick().is_empty());
    assert!(visit.on_scroll(1.0).is_empty());
    assert_eq!(visit.current_visibility(), visible(false, false));
}

#[test]
fn test_teardown_stops_pending_timers() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(0);
    let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), config());
    scheduler.start();
    clock.advance(1_000);
    scheduler.teardown();

    clock.advance(30_000);
    assert!(scheduler.tick().is_empty());
    assert!(scheduler.close_newsletter().is_empty());
    assert!(store.is_empty());
}

// ============================================================================
// Property: mutual exclusion under any interleaving
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Advance(u64),
    Scroll(f64),
    Activity,
    CloseTip,
    CloseNewsletter,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u64..8_000).prop_map(Step::Advance),
        (0.0f64..1.0).prop_map(Step::Scroll),
        Just(Step::Activity),
        Just(Step::CloseTip),
        Just(Step::CloseNewsletter),
    ]
}

proptest! {
    #[test]
    fn prop_prompts_never_visible_together(
        steps in prop::collection::vec(step(), 0..40),
        tip_delay in 0u64..10_000,
        idle in 0u64..20_000,
        reset_idle in any::<bool>(),
        tip_dismissed in any::<bool>(),
        newsletter_dismissed in any::<bool>(),
    ) {
        let store = MemoryStore::new();
        if tip_dismissed {
            store.set("dismissedDailyLearning", "true").unwrap();
        }
        if newsletter_dismissed {
            store.set("dismissedNewsletter", "true").unwrap();
        }
        let clock = ManualClock::new(0);
        let cfg = SchedulerConfig {
            daily_tip_delay_ms: tip_delay,
            newsletter_idle_ms: idle,
            reset_idle_on_activity: reset_idle,
            ..config()
        };
        let mut scheduler = EngagementPromptScheduler::new(&store, clock.clone(), cfg);
        scheduler.start();

        let mut tip_shown = 0;
        for step in steps {
            let events = match step {
                Step::Advance(ms) => { clock.advance(ms); scheduler.tick() }
                Step::Scroll(r) => scheduler.on_scroll(r),
                Step::Activity => scheduler.on_activity(),
                Step::CloseTip => scheduler.close_daily_tip(),
                Step::CloseNewsletter => scheduler.close_newsletter(),
            };
            tip_shown += events.iter().filter(|e| matches!(e, PromptEvent::DailyTipShown { .. })).count();

            let state = scheduler.state();
            prop_assert!(!(state.daily_tip_visible && state.newsletter_visible));
            prop_assert!(!(state.newsletter_queued && state.newsletter_visible));
            if newsletter_dismissed {
                prop_assert!(!state.newsletter_visible && !state.newsletter_queued);
            }
            if tip_dismissed {
                prop_assert!(!state.daily_tip_visible);
            }
        }
        prop_assert!(tip_shown <= 1);
    }
}
