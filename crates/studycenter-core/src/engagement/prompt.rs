use serde::{Deserialize, Serialize};

/// One of the two attention prompts arbitrated per visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    DailyTip,
    Newsletter,
}

impl PromptKind {
    pub const ALL: [PromptKind; 2] = [PromptKind::DailyTip, PromptKind::Newsletter];

    /// Key of this prompt's dismissal flag in the device store.
    pub fn dismissal_key(self) -> &'static str {
        match self {
            PromptKind::DailyTip => "dismissedDailyLearning",
            PromptKind::Newsletter => "dismissedNewsletter",
        }
    }
}

/// Which trigger requested the newsletter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Scroll,
    Idle,
}

/// What the host should render right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub daily_tip: bool,
    pub newsletter: bool,
}

/// Every scheduler transition produces a PromptEvent.
/// Times are in the scheduler clock's milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PromptEvent {
    DailyTipShown {
        at_ms: u64,
    },
    /// Tip timer fired while the newsletter was open; shown once it closes.
    DailyTipDeferred {
        at_ms: u64,
    },
    DailyTipClosed {
        at_ms: u64,
    },
    NewsletterTriggered {
        source: TriggerSource,
        at_ms: u64,
    },
    NewsletterShown {
        at_ms: u64,
    },
    /// Newsletter requested while the tip was open; shown once it closes.
    NewsletterQueued {
        at_ms: u64,
    },
    NewsletterClosed {
        at_ms: u64,
    },
    ContactButtonShown {
        at_ms: u64,
    },
    TornDown {
        at_ms: u64,
    },
}
