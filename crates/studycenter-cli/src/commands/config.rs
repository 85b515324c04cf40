use clap::Subcommand;
use studycenter_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting ("prompts.daily_tip_delay_ms") or a whole table ("prompts")
    Get {
        key: String,
    },
    /// Set a setting and save
    Set {
        /// Setting key (table.field)
        key: String,
        /// New value
        value: String,
    },
    /// List every setting as `table.field = value`
    List {
        /// Print the raw config as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Show the scheduler timings the prompt simulator runs with
    Scheduler,
    /// Reset config to defaults
    Reset,
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "(unset)".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_entries<'a>(entries: impl Iterator<Item = &'a (String, serde_json::Value)>) {
    for (key, value) in entries {
        println!("{key} = {}", render(value));
    }
}

fn unknown_key(key: &str, config: &Config) -> Box<dyn std::error::Error> {
    let known: Vec<String> = config.entries().into_iter().map(|(k, _)| k).collect();
    format!("unknown key: {key} (known keys: {})", known.join(", ")).into()
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let entries = config.entries();
            if Config::TABLES.contains(&key.as_str()) {
                let prefix = format!("{key}.");
                print_entries(entries.iter().filter(|(k, _)| k.starts_with(&prefix)));
            } else {
                let (_, value) = entries
                    .iter()
                    .find(|(k, _)| *k == key)
                    .ok_or_else(|| unknown_key(&key, &config))?;
                println!("{}", render(value));
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            if !config.entries().iter().any(|(k, _)| *k == key) {
                return Err(unknown_key(&key, &config));
            }
            config.set(&key, &value)?;
            let stored = config.get(&key).unwrap_or_default();
            println!("{key} = {stored}");
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_entries(config.entries().iter());
            }
        }
        ConfigAction::Scheduler => {
            let scheduler = Config::load()?.scheduler_config();
            println!("{}", serde_json::to_string_pretty(&scheduler)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
