mod day;
mod event;
mod index;
mod month;

pub use day::DayKey;
pub use event::{CallToAction, Event, EventCategory, EventList};
pub use index::{DayPick, EventCalendarIndex};
pub use month::{DayCell, Month, MonthGrid, WEEKDAY_LABELS};
