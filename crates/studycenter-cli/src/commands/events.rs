use std::path::PathBuf;

use clap::Subcommand;
use studycenter_core::calendar::{DayKey, EventCalendarIndex, EventList, Month};
use studycenter_core::Config;

#[derive(Subcommand)]
pub enum EventsAction {
    /// List events in chronological order as JSON
    List {
        /// Event list (.toml or .json); defaults to calendar.events_file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show what is on a given day (YYYY-MM-DD)
    Day {
        day: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Render a month grid (YYYY-MM) with active days marked
    Month {
        month: String,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the grid as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn load_index(file: Option<PathBuf>) -> Result<EventCalendarIndex, Box<dyn std::error::Error>> {
    let path = match file {
        Some(path) => path,
        None => Config::load_or_default()
            .calendar
            .events_file
            .map(PathBuf::from)
            .ok_or("no event file given; pass --file or set calendar.events_file")?,
    };
    let list = EventList::load(&path)?;
    Ok(EventCalendarIndex::build_chronological(list))
}

pub fn run(action: EventsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EventsAction::List { file } => {
            let index = load_index(file)?;
            println!("{}", serde_json::to_string_pretty(index.events())?);
        }
        EventsAction::Day { day, file } => {
            let day: DayKey = day.parse()?;
            let index = load_index(file)?;
            match index.pick_day(day) {
                Some(pick) => println!("{}", serde_json::to_string_pretty(&pick)?),
                None => println!("no events on {}", day.display_long()),
            }
        }
        EventsAction::Month { month, file, json } => {
            let month: Month = month.parse()?;
            let index = load_index(file)?;
            let grid = index
                .month_grid(month)
                .ok_or_else(|| format!("no full calendar grid fits around {month}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&grid)?);
            } else {
                print!("{}", grid.render_text());
            }
        }
    }
    Ok(())
}
