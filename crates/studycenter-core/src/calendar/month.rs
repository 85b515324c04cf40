//! Month navigation and the Monday-first 6x7 calendar grid.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::day::DayKey;
use crate::error::ValidationError;

pub const WEEKS: usize = 6;
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A calendar month chrono can represent. Only built through [`Month::new`]
/// and [`Month::of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(day: DayKey) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> DayKey {
        // Constructors only admit months chrono can represent.
        DayKey::from_ymd(self.year, self.month, 1).unwrap_or_else(|| DayKey::new(NaiveDate::MIN))
    }

    /// `None` past the last month chrono can represent.
    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year.checked_add(1)?, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// `None` before the first month chrono can represent.
    pub fn prev(&self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year.checked_sub(1)?, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn contains(&self, day: DayKey) -> bool {
        day.year() == self.year && day.month() == self.month
    }

    /// `"September 2025"`.
    pub fn label(&self) -> String {
        self.first_day().date().format("%B %Y").to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

/// One square of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub day: DayKey,
    /// False for the leading/trailing days of adjacent months.
    pub in_month: bool,
    pub has_events: bool,
}

/// Six Monday-first weeks covering a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub month: Month,
    pub weeks: Vec<[DayCell; 7]>,
}

impl MonthGrid {
    /// `None` when the six-week window would run outside chrono's date range,
    /// which only happens for the first and last representable months.
    pub fn build(month: Month, has_events: impl Fn(DayKey) -> bool) -> Option<Self> {
        let first = month.first_day().date();
        let offset = i64::from(first.weekday().num_days_from_monday());
        let grid_start = first.checked_sub_signed(Duration::days(offset))?;
        let last_offset = (WEEKS * 7 - 1) as i64;
        grid_start.checked_add_signed(Duration::days(last_offset))?;

        let mut date = grid_start;
        let weeks = (0..WEEKS)
            .map(|_| {
                std::array::from_fn(|_| {
                    let day = DayKey::new(date);
                    date = date.succ_opt().unwrap_or(date);
                    DayCell {
                        day,
                        in_month: month.contains(day),
                        has_events: has_events(day),
                    }
                })
            })
            .collect();

        Some(Self { month, weeks })
    }

    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten()
    }

    /// Plain-text rendering; days with events are marked `*`, other months' days are dimmed with `.`.
    pub fn render_text(&self) -> String {
        let mut out = format!("{:^28}\n", self.month.label());
        for label in WEEKDAY_LABELS {
            out.push_str(&format!("{label:>4}"));
        }
        out.push('\n');
        for week in &self.weeks {
            for cell in week {
                let marker = if cell.has_events {
                    '*'
                } else if cell.in_month {
                    ' '
                } else {
                    '.'
                };
                out.push_str(&format!("{:>3}{marker}", cell.day.day()));
            }
            out.push('\n');
        }
        out
    }
}
