/// Configuration and preset command handlers
use anyhow::Result;
use std::path::Path;
use tabled::{Table, Tabled};
use vigil_core::config::default_config_path;
use vigil_core::status::format_countdown;
use vigil_core::MonitorConfig;

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "Preset")]
    minutes: String,
    #[tabled(rename = "Countdown")]
    countdown: String,
    #[tabled(rename = "Default")]
    default: String,
}

pub fn handle_config_show(config: &MonitorConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn handle_config_path(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let state = if path.exists() { "" } else { " (not created)" };
    println!("{}{state}", path.display());
    Ok(())
}

pub fn handle_presets(config: &MonitorConfig) {
    let rows = preset_rows(config);
    println!("{}", Table::new(rows));
}

fn preset_rows(config: &MonitorConfig) -> Vec<PresetRow> {
    config
        .session
        .presets_minutes
        .iter()
        .map(|&minutes| PresetRow {
            minutes: format!("{minutes} min"),
            countdown: format_countdown(minutes.saturating_mul(60)),
            default: if minutes == config.session.default_minutes {
                "yes".to_string()
            } else {
                String::new()
            },
        })
        .collect()
}
