mod clock;
mod dismissal;
mod prompt;
mod scheduler;
mod scroll;

pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use dismissal::{is_dismissed, persist_dismissal};
pub use prompt::{PromptEvent, PromptKind, TriggerSource, Visibility};
pub use scheduler::{
    ContactButtonTrigger, EngagementPromptScheduler, SchedulerConfig, SchedulerState,
};
pub use scroll::ScrollMetrics;
