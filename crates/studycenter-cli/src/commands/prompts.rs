use clap::Subcommand;
use studycenter_core::engagement::{is_dismissed, EngagementPromptScheduler, ManualClock, PromptKind};
use studycenter_core::storage::{Database, KeyValueStore, MemoryStore};
use studycenter_core::Config;

#[derive(Subcommand)]
pub enum PromptsAction {
    /// Print the stored dismissal flags as JSON
    Status,
    /// Run one visit over virtual time and print every transition as JSON lines
    Simulate {
        /// Scroll report as AT_MS:RATIO (repeatable)
        #[arg(long = "scroll", value_parser = parse_scroll)]
        scrolls: Vec<(u64, f64)>,
        /// User activity at AT_MS (repeatable)
        #[arg(long = "activity")]
        activity: Vec<u64>,
        /// Close the daily tip at this time
        #[arg(long)]
        close_tip_at: Option<u64>,
        /// Close the newsletter prompt at this time
        #[arg(long)]
        close_newsletter_at: Option<u64>,
        /// End of the visit (ms)
        #[arg(long, default_value = "30000")]
        until: u64,
        /// Use a throwaway in-memory store instead of the device database
        #[arg(long)]
        memory: bool,
    },
}

#[derive(Debug, Clone, Copy)]
enum HostAction {
    Scroll(f64),
    Activity,
    CloseTip,
    CloseNewsletter,
}

fn parse_scroll(raw: &str) -> Result<(u64, f64), String> {
    let (at, ratio) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected AT_MS:RATIO, got '{raw}'"))?;
    let at = at.parse::<u64>().map_err(|e| format!("bad time '{at}': {e}"))?;
    let ratio = ratio
        .parse::<f64>()
        .map_err(|e| format!("bad ratio '{ratio}': {e}"))?;
    Ok((at, ratio))
}

pub fn run(action: PromptsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PromptsAction::Status => {
            let db = Database::open()?;
            let status = serde_json::json!({
                "dailyTip": { "dismissed": is_dismissed(&db, PromptKind::DailyTip) },
                "newsletter": { "dismissed": is_dismissed(&db, PromptKind::Newsletter) },
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        PromptsAction::Simulate {
            scrolls,
            activity,
            close_tip_at,
            close_newsletter_at,
            until,
            memory,
        } => {
            let store: Box<dyn KeyValueStore> = if memory {
                Box::new(MemoryStore::new())
            } else {
                Box::new(Database::open()?)
            };

            let mut timeline: Vec<(u64, HostAction)> = scrolls
                .into_iter()
                .map(|(at, ratio)| (at, HostAction::Scroll(ratio)))
                .chain(activity.into_iter().map(|at| (at, HostAction::Activity)))
                .chain(close_tip_at.map(|at| (at, HostAction::CloseTip)))
                .chain(close_newsletter_at.map(|at| (at, HostAction::CloseNewsletter)))
                .filter(|(at, _)| *at <= until)
                .collect();
            timeline.sort_by_key(|(at, _)| *at);

            let config = Config::load_or_default().scheduler_config();
            let clock = ManualClock::new(0);
            let mut scheduler = EngagementPromptScheduler::new(store, clock.clone(), config);
            scheduler.start();

            for (at, action) in timeline {
                clock.set(at);
                let events = match action {
                    HostAction::Scroll(ratio) => scheduler.on_scroll(ratio),
                    HostAction::Activity => scheduler.on_activity(),
                    HostAction::CloseTip => scheduler.close_daily_tip(),
                    HostAction::CloseNewsletter => scheduler.close_newsletter(),
                };
                for event in events {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }

            clock.set(until);
            for event in scheduler.tick() {
                println!("{}", serde_json::to_string(&event)?);
            }

            let summary = serde_json::json!({
                "visibility": scheduler.current_visibility(),
                "contactButton": scheduler.contact_button_visible(),
                "state": scheduler.state(),
            });
            println!("{}", serde_json::to_string(&summary)?);
            scheduler.teardown();
        }
    }
    Ok(())
}
