//! Time sources and one-shot deadlines.
//!
//! The scheduler never reads the system clock directly. Hosts pass a
//! [`SystemClock`]; tests and simulations pass a [`ManualClock`] and advance
//! it by hand.

use std::cell::Cell;
use std::rc::Rc;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall clock, milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Virtual clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, ms: u64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A one-shot timer: armed with a due time, fires once, can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    due_at_ms: Option<u64>,
}

impl Deadline {
    pub fn disarmed() -> Self {
        Self { due_at_ms: None }
    }

    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.due_at_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn cancel(&mut self) {
        self.due_at_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due_at_ms.is_some()
    }

    pub fn due_at_ms(&self) -> Option<u64> {
        self.due_at_ms
    }

    /// Disarm and return the due time if it has passed.
    pub fn take_if_due(&mut self, now_ms: u64) -> Option<u64> {
        match self.due_at_ms {
            Some(due) if due <= now_ms => {
                self.due_at_ms = None;
                Some(due)
            }
            _ => None,
        }
    }
}
