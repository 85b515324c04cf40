//! Durable per-device dismissal flags.
//!
//! A flag is dismissed only when the stored value is exactly `"true"`.
//! Every failure path reads as "not dismissed"; writes are best-effort.

use super::prompt::PromptKind;
use crate::storage::KeyValueStore;

const DISMISSED: &str = "true";

pub fn is_dismissed<S: KeyValueStore + ?Sized>(store: &S, kind: PromptKind) -> bool {
    match store.get(kind.dismissal_key()) {
        Ok(Some(value)) => value == DISMISSED,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(key = kind.dismissal_key(), error = %e, "dismissal read failed, treating as not dismissed");
            false
        }
    }
}

/// Returns whether the write reached the store.
pub fn persist_dismissal<S: KeyValueStore + ?Sized>(store: &S, kind: PromptKind) -> bool {
    match store.set(kind.dismissal_key(), DISMISSED) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key = kind.dismissal_key(), error = %e, "dismissal write dropped");
            false
        }
    }
}
