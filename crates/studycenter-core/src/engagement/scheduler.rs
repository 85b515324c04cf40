//! Engagement prompt scheduler.
//!
//! Arbitrates the daily tip and the newsletter prompt over one page visit.
//! Like a wall-clock timer engine it has no internal thread: the host calls
//! [`EngagementPromptScheduler::tick`] periodically and forwards scroll,
//! activity and close actions. Every call returns the transitions it caused.
//!
//! ## Per-prompt states
//!
//! ```text
//! DailyTip:   Hidden -[delay]-> Visible -[close]-> Dismissed
//!             Hidden -[delay, newsletter open]-> Deferred -[newsletter closes]-> Visible
//! Newsletter: Hidden -[scroll|idle]-> Visible -[close]-> Dismissed
//!             Hidden -[scroll|idle, tip open]-> Queued -[tip closes]-> Visible
//! ```
//!
//! The two prompts are never visible at the same time.

use serde::{Deserialize, Serialize};

use super::clock::{Clock, Deadline};
use super::dismissal::{is_dismissed, persist_dismissal};
use super::prompt::{PromptEvent, PromptKind, TriggerSource, Visibility};
use super::scroll::{sanitize_ratio, ScrollMetrics};
use crate::storage::KeyValueStore;

/// Floating contact button reveal rule: whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactButtonTrigger {
    pub delay_ms: u64,
    /// Scroll offset in pixels strictly above which the button appears.
    pub scroll_px: f64,
}

/// Trigger timings. None of these values are load-bearing contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub daily_tip_delay_ms: u64,
    pub newsletter_idle_ms: u64,
    /// The newsletter is requested once the scroll ratio exceeds this.
    /// Ratios are clamped to `[0, 1]`, so 1.0 or more disables the scroll trigger.
    pub scroll_threshold: f64,
    pub reset_idle_on_activity: bool,
    pub contact_button: Option<ContactButtonTrigger>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_tip_delay_ms: 5_000,
            newsletter_idle_ms: 15_000,
            scroll_threshold: 0.70,
            reset_idle_on_activity: false,
            contact_button: Some(ContactButtonTrigger {
                delay_ms: 3_000,
                scroll_px: 100.0,
            }),
        }
    }
}

/// Transient per-visit prompt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerState {
    pub daily_tip_visible: bool,
    pub newsletter_visible: bool,
    /// Newsletter requested while the tip was open.
    pub newsletter_queued: bool,
    /// Scroll or idle already requested the newsletter this visit.
    pub newsletter_trigger_fired: bool,
    /// Tip timer fired while the newsletter was open.
    pub daily_tip_queued: bool,
}

impl SchedulerState {
    fn holds_invariants(&self) -> bool {
        !(self.daily_tip_visible && self.newsletter_visible)
            && !(self.newsletter_queued && self.newsletter_visible)
            && !(self.daily_tip_queued && self.daily_tip_visible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerKind {
    DailyTip,
    Idle,
    ContactButton,
}

/// Per-visit prompt coordinator.
pub struct EngagementPromptScheduler<S: KeyValueStore, C: Clock> {
    store: S,
    clock: C,
    config: SchedulerConfig,
    state: SchedulerState,
    daily_tip_dismissed: bool,
    newsletter_dismissed: bool,
    daily_tip_timer: Deadline,
    idle_timer: Deadline,
    contact_timer: Deadline,
    scroll_listener: bool,
    contact_button_visible: bool,
    phase: Phase,
}

impl<S: KeyValueStore, C: Clock> EngagementPromptScheduler<S, C> {
    /// Read both dismissal flags. Nothing is armed until [`start`](Self::start).
    pub fn new(store: S, clock: C, config: SchedulerConfig) -> Self {
        let daily_tip_dismissed = is_dismissed(&store, PromptKind::DailyTip);
        let newsletter_dismissed = is_dismissed(&store, PromptKind::Newsletter);
        tracing::debug!(daily_tip_dismissed, newsletter_dismissed, "engagement scheduler created");
        Self {
            store,
            clock,
            config,
            state: SchedulerState::default(),
            daily_tip_dismissed,
            newsletter_dismissed,
            daily_tip_timer: Deadline::disarmed(),
            idle_timer: Deadline::disarmed(),
            contact_timer: Deadline::disarmed(),
            scroll_listener: false,
            contact_button_visible: false,
            phase: Phase::Created,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current_visibility(&self) -> Visibility {
        if self.phase == Phase::TornDown {
            return Visibility::default();
        }
        Visibility {
            daily_tip: self.state.daily_tip_visible,
            newsletter: self.state.newsletter_visible,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Dismissal as this visit sees it (read at construction, updated on close).
    pub fn is_dismissed(&self, kind: PromptKind) -> bool {
        match kind {
            PromptKind::DailyTip => self.daily_tip_dismissed,
            PromptKind::Newsletter => self.newsletter_dismissed,
        }
    }

    pub fn contact_button_visible(&self) -> bool {
        self.phase != Phase::TornDown && self.contact_button_visible
    }

    pub fn is_torn_down(&self) -> bool {
        self.phase == Phase::TornDown
    }

    /// Whether scroll events can still change anything.
    pub fn is_listening_for_scroll(&self) -> bool {
        self.phase == Phase::Running
            && (self.scroll_listener || self.contact_listener_active())
    }

    /// Earliest armed timer, so hosts know when to call `tick()` next.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        [self.daily_tip_timer, self.idle_timer, self.contact_timer]
            .iter()
            .filter_map(Deadline::due_at_ms)
            .min()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm the elapsed, idle and contact-button timers and attach the
    /// scroll listener. Only the first call has an effect.
    pub fn start(&mut self) -> Vec<PromptEvent> {
        if self.phase != Phase::Created {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        if !self.daily_tip_dismissed {
            self.daily_tip_timer.arm(now, self.config.daily_tip_delay_ms);
        }
        if !self.newsletter_dismissed {
            self.idle_timer.arm(now, self.config.newsletter_idle_ms);
            self.scroll_listener = true;
        }
        if let Some(contact) = self.config.contact_button {
            self.contact_timer.arm(now, contact.delay_ms);
        }
        self.phase = Phase::Running;
        tracing::debug!(at_ms = now, "engagement timers armed");
        Vec::new()
    }

    /// Fire every timer whose deadline has passed, in due order.
    pub fn tick(&mut self) -> Vec<PromptEvent> {
        let mut events = Vec::new();
        if self.phase != Phase::Running {
            return events;
        }
        let now = self.clock.now_ms();

        let mut due = Vec::with_capacity(3);
        if let Some(at) = self.daily_tip_timer.take_if_due(now) {
            due.push((at, TimerKind::DailyTip));
        }
        if let Some(at) = self.idle_timer.take_if_due(now) {
            due.push((at, TimerKind::Idle));
        }
        if let Some(at) = self.contact_timer.take_if_due(now) {
            due.push((at, TimerKind::ContactButton));
        }
        due.sort();

        for (at, kind) in due {
            match kind {
                TimerKind::DailyTip => self.fire_daily_tip(at, &mut events),
                TimerKind::Idle => self.fire_newsletter_trigger(TriggerSource::Idle, at, &mut events),
                TimerKind::ContactButton => self.show_contact_button(at, &mut events),
            }
        }
        self.check_invariants();
        events
    }

    /// Host scroll callback with a ratio of the scrollable height.
    pub fn on_scroll(&mut self, ratio: f64) -> Vec<PromptEvent> {
        let mut events = self.tick();
        if self.phase != Phase::Running || !self.scroll_listener {
            return events;
        }
        let Some(ratio) = sanitize_ratio(ratio) else {
            return events;
        };
        if ratio > self.config.scroll_threshold {
            let now = self.clock.now_ms();
            self.fire_newsletter_trigger(TriggerSource::Scroll, now, &mut events);
        }
        self.check_invariants();
        events
    }

    /// Host scroll callback with raw page measurements.
    ///
    /// Also feeds the contact button's pixel threshold.
    pub fn on_scroll_metrics(&mut self, metrics: ScrollMetrics) -> Vec<PromptEvent> {
        let mut events = self.tick();
        if self.phase != Phase::Running {
            return events;
        }
        if let Some(contact) = self.config.contact_button {
            if !self.contact_button_visible && metrics.scroll_y > contact.scroll_px {
                self.contact_timer.cancel();
                let now = self.clock.now_ms();
                self.show_contact_button(now, &mut events);
            }
        }
        if let Some(ratio) = metrics.ratio() {
            events.extend(self.on_scroll(ratio));
        }
        events
    }

    /// User activity (pointer, keys, scroll). Restarts the idle countdown
    /// when `reset_idle_on_activity` is set; otherwise only flushes timers.
    pub fn on_activity(&mut self) -> Vec<PromptEvent> {
        let events = self.tick();
        if self.phase == Phase::Running
            && self.config.reset_idle_on_activity
            && self.idle_timer.is_armed()
        {
            let now = self.clock.now_ms();
            self.idle_timer.arm(now, self.config.newsletter_idle_ms);
        }
        events
    }

    /// The user closed the daily tip. Persists its dismissal and hands over
    /// to a queued newsletter. Repeated calls do nothing.
    pub fn close_daily_tip(&mut self) -> Vec<PromptEvent> {
        let mut events = self.tick();
        if self.phase == Phase::TornDown || self.daily_tip_dismissed {
            return events;
        }
        let now = self.clock.now_ms();

        self.state.daily_tip_visible = false;
        self.state.daily_tip_queued = false;
        self.daily_tip_timer.cancel();
        self.daily_tip_dismissed = true;
        persist_dismissal(&self.store, PromptKind::DailyTip);
        events.push(PromptEvent::DailyTipClosed { at_ms: now });

        if self.state.newsletter_queued && !self.newsletter_dismissed {
            self.state.newsletter_queued = false;
            self.state.newsletter_visible = true;
            events.push(PromptEvent::NewsletterShown { at_ms: now });
        }
        self.check_invariants();
        events
    }

    /// The user closed the newsletter prompt. Persists its dismissal and
    /// hands over to a deferred daily tip. Repeated calls do nothing.
    pub fn close_newsletter(&mut self) -> Vec<PromptEvent> {
        let mut events = self.tick();
        if self.phase == Phase::TornDown || self.newsletter_dismissed {
            return events;
        }
        let now = self.clock.now_ms();

        self.state.newsletter_visible = false;
        self.state.newsletter_queued = false;
        self.state.newsletter_trigger_fired = true;
        self.idle_timer.cancel();
        self.scroll_listener = false;
        self.newsletter_dismissed = true;
        persist_dismissal(&self.store, PromptKind::Newsletter);
        events.push(PromptEvent::NewsletterClosed { at_ms: now });

        if self.state.daily_tip_queued && !self.daily_tip_dismissed {
            self.state.daily_tip_queued = false;
            self.state.daily_tip_visible = true;
            events.push(PromptEvent::DailyTipShown { at_ms: now });
        }
        self.check_invariants();
        events
    }

    /// Cancel every timer and detach the scroll listener. Afterwards all
    /// commands are no-ops and nothing is reported visible.
    pub fn teardown(&mut self) -> Vec<PromptEvent> {
        if self.phase == Phase::TornDown {
            return Vec::new();
        }
        self.daily_tip_timer.cancel();
        self.idle_timer.cancel();
        self.contact_timer.cancel();
        self.scroll_listener = false;
        self.state = SchedulerState::default();
        self.contact_button_visible = false;
        self.phase = Phase::TornDown;
        let now = self.clock.now_ms();
        tracing::debug!(at_ms = now, "engagement scheduler torn down");
        vec![PromptEvent::TornDown { at_ms: now }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fire_daily_tip(&mut self, at: u64, events: &mut Vec<PromptEvent>) {
        if self.daily_tip_dismissed {
            return;
        }
        if self.state.newsletter_visible {
            self.state.daily_tip_queued = true;
            events.push(PromptEvent::DailyTipDeferred { at_ms: at });
        } else {
            self.state.daily_tip_visible = true;
            events.push(PromptEvent::DailyTipShown { at_ms: at });
        }
    }

    /// Scroll and idle share one latch; the first to fire disarms both.
    fn fire_newsletter_trigger(
        &mut self,
        source: TriggerSource,
        at: u64,
        events: &mut Vec<PromptEvent>,
    ) {
        if self.state.newsletter_trigger_fired {
            return;
        }
        self.state.newsletter_trigger_fired = true;
        self.scroll_listener = false;
        self.idle_timer.cancel();
        events.push(PromptEvent::NewsletterTriggered { source, at_ms: at });
        self.request_newsletter(at, events);
    }

    fn request_newsletter(&mut self, at: u64, events: &mut Vec<PromptEvent>) {
        if self.newsletter_dismissed {
            return;
        }
        if self.state.daily_tip_visible {
            self.state.newsletter_queued = true;
            events.push(PromptEvent::NewsletterQueued { at_ms: at });
        } else {
            self.state.newsletter_visible = true;
            events.push(PromptEvent::NewsletterShown { at_ms: at });
        }
    }

    fn show_contact_button(&mut self, at: u64, events: &mut Vec<PromptEvent>) {
        if self.contact_button_visible {
            return;
        }
        self.contact_button_visible = true;
        events.push(PromptEvent::ContactButtonShown { at_ms: at });
    }

    fn contact_listener_active(&self) -> bool {
        self.config.contact_button.is_some() && !self.contact_button_visible
    }

    fn check_invariants(&self) {
        debug_assert!(self.state.holds_invariants(), "prompt invariants broken: {:?}", self.state);
    }
}

impl<S: KeyValueStore, C: Clock> Drop for EngagementPromptScheduler<S, C> {
    fn drop(&mut self) {
        if self.phase == Phase::Running {
            tracing::debug!("engagement scheduler dropped while running");
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn no_contact() -> SchedulerConfig {
        SchedulerConfig {
            contact_button: None,
            ..SchedulerConfig::default()
        }
    }

    fn started<'a>(
        store: &'a MemoryStore,
        clock: &ManualClock,
    ) -> EngagementPromptScheduler<&'a MemoryStore, ManualClock> {
        let mut s = EngagementPromptScheduler::new(store, clock.clone(), no_contact());
        s.start();
        s
    }

    #[test]
    fn nothing_visible_before_start() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = EngagementPromptScheduler::new(&store, clock.clone(), no_contact());
        clock.advance(60_000);
        assert!(s.tick().is_empty());
        assert!(s.on_scroll(0.99).is_empty());
        assert_eq!(s.current_visibility(), Visibility::default());
    }

    #[test]
    fn daily_tip_appears_exactly_at_delay() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(1_000);
        let mut s = started(&store, &clock);

        clock.advance(4_999);
        assert!(s.tick().is_empty());
        assert!(!s.current_visibility().daily_tip);

        clock.advance(1);
        assert_eq!(s.tick(), vec![PromptEvent::DailyTipShown { at_ms: 6_000 }]);
        assert!(s.current_visibility().daily_tip);

        clock.advance(1_000);
        assert!(s.tick().is_empty());
    }

    #[test]
    fn idle_shows_newsletter_when_tip_closed_already() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);

        clock.set(5_000);
        s.tick();
        s.close_daily_tip();
        clock.set(15_000);
        let events = s.tick();
        assert_eq!(
            events,
            vec![
                PromptEvent::NewsletterTriggered { source: TriggerSource::Idle, at_ms: 15_000 },
                PromptEvent::NewsletterShown { at_ms: 15_000 },
            ]
        );
        assert_eq!(s.current_visibility(), Visibility { daily_tip: false, newsletter: true });
    }

    #[test]
    fn scroll_below_threshold_does_nothing() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        assert!(s.on_scroll(0.70).is_empty());
        assert!(!s.state().newsletter_trigger_fired);
        assert_eq!(s.on_scroll(0.71).len(), 2);
    }

    #[test]
    fn scroll_latch_disarms_idle() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        s.on_scroll(0.8);
        s.close_newsletter();
        clock.advance(60_000);
        let events = s.tick();
        assert_eq!(events, vec![PromptEvent::DailyTipShown { at_ms: 5_000 }]);
        assert!(!s.current_visibility().newsletter);
    }

    #[test]
    fn tick_fires_overdue_timers_in_due_order() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        clock.advance(20_000);
        let events = s.tick();
        assert_eq!(
            events,
            vec![
                PromptEvent::DailyTipShown { at_ms: 5_000 },
                PromptEvent::NewsletterTriggered { source: TriggerSource::Idle, at_ms: 15_000 },
                PromptEvent::NewsletterQueued { at_ms: 15_000 },
            ]
        );
        let state = s.state();
        assert!(state.daily_tip_visible && state.newsletter_queued && !state.newsletter_visible);
    }

    #[test]
    fn newsletter_first_defers_daily_tip() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);

        clock.advance(1_000);
        s.on_scroll(0.95);
        assert!(s.current_visibility().newsletter);

        clock.advance(10_000);
        assert_eq!(s.tick(), vec![PromptEvent::DailyTipDeferred { at_ms: 5_000 }]);
        assert_eq!(s.current_visibility(), Visibility { daily_tip: false, newsletter: true });

        let events = s.close_newsletter();
        assert_eq!(
            events,
            vec![
                PromptEvent::NewsletterClosed { at_ms: 11_000 },
                PromptEvent::DailyTipShown { at_ms: 11_000 },
            ]
        );
        assert_eq!(s.current_visibility(), Visibility { daily_tip: true, newsletter: false });
    }

    #[test]
    fn close_newsletter_drops_queue() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        clock.set(5_000);
        s.tick();
        s.on_scroll(0.9);
        assert!(s.state().newsletter_queued);

        s.close_newsletter();
        assert!(!s.state().newsletter_queued);
        let events = s.close_daily_tip();
        assert_eq!(events, vec![PromptEvent::DailyTipClosed { at_ms: 5_000 }]);
        assert_eq!(s.current_visibility(), Visibility::default());
    }

    #[test]
    fn closing_tip_before_it_shows_cancels_timer() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        s.close_daily_tip();
        clock.advance(10_000);
        assert!(s.tick().is_empty());
        assert!(s.is_dismissed(PromptKind::DailyTip));
    }

    #[test]
    fn activity_resets_idle_when_enabled() {
        let store = MemoryStore::with_entries([("dismissedDailyLearning", "true")]);
        let clock = ManualClock::new(0);
        let config = SchedulerConfig {
            reset_idle_on_activity: true,
            ..no_contact()
        };
        let mut s = EngagementPromptScheduler::new(&store, clock.clone(), config);
        s.start();

        clock.set(10_000);
        s.on_activity();
        clock.set(20_000);
        assert!(s.tick().is_empty());
        assert_eq!(s.next_deadline_ms(), Some(25_000));
        clock.set(25_000);
        assert!(s.tick().contains(&PromptEvent::NewsletterShown { at_ms: 25_000 }));
    }

    #[test]
    fn activity_is_ignored_by_default() {
        let store = MemoryStore::with_entries([("dismissedDailyLearning", "true")]);
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        clock.set(10_000);
        s.on_activity();
        clock.set(15_000);
        assert!(s.tick().contains(&PromptEvent::NewsletterShown { at_ms: 15_000 }));
    }

    #[test]
    fn contact_button_by_timer_or_scroll() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = EngagementPromptScheduler::new(&store, clock.clone(), SchedulerConfig::default());
        s.start();
        clock.set(3_000);
        assert_eq!(s.tick(), vec![PromptEvent::ContactButtonShown { at_ms: 3_000 }]);
        assert!(s.contact_button_visible());

        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = EngagementPromptScheduler::new(&store, clock.clone(), SchedulerConfig::default());
        s.start();
        clock.set(500);
        let events = s.on_scroll_metrics(ScrollMetrics {
            scroll_y: 150.0,
            scroll_height: 5_000.0,
            viewport_height: 1_000.0,
        });
        assert_eq!(events, vec![PromptEvent::ContactButtonShown { at_ms: 500 }]);
        clock.set(3_000);
        assert!(s.tick().is_empty());
    }

    #[test]
    fn scroll_metrics_feed_newsletter_trigger() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        let events = s.on_scroll_metrics(ScrollMetrics {
            scroll_y: 3_000.0,
            scroll_height: 4_000.0,
            viewport_height: 1_000.0,
        });
        assert!(events.contains(&PromptEvent::NewsletterShown { at_ms: 0 }));
    }

    #[test]
    fn teardown_cancels_everything() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        clock.set(5_000);
        s.tick();
        assert!(!s.is_torn_down());
        assert_eq!(s.teardown(), vec![PromptEvent::TornDown { at_ms: 5_000 }]);
        assert!(s.is_torn_down());

        clock.set(100_000);
        assert!(s.tick().is_empty());
        assert!(s.on_scroll(1.0).is_empty());
        assert!(s.close_daily_tip().is_empty());
        assert!(s.teardown().is_empty());
        assert_eq!(s.current_visibility(), Visibility::default());
        assert_eq!(s.next_deadline_ms(), None);
        assert!(!s.is_listening_for_scroll());
        assert!(store.is_empty());
    }

    #[test]
    fn threshold_of_one_never_fires_on_scroll() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let config = SchedulerConfig {
            scroll_threshold: 1.0,
            ..no_contact()
        };
        let mut s = EngagementPromptScheduler::new(&store, clock.clone(), config);
        s.start();
        clock.set(1_000);
        assert!(s.on_scroll(1.0).is_empty());
        assert!(s.on_scroll(7.0).is_empty());
        assert!(!s.state().newsletter_trigger_fired);
    }

    #[test]
    fn start_is_idempotent() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        clock.set(4_000);
        s.start();
        clock.set(5_000);
        assert_eq!(s.tick(), vec![PromptEvent::DailyTipShown { at_ms: 5_000 }]);
    }

    #[test]
    fn nan_scroll_is_ignored() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut s = started(&store, &clock);
        assert!(s.on_scroll(f64::NAN).is_empty());
        assert!(s.is_listening_for_scroll());
    }
}
