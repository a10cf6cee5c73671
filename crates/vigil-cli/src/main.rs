mod bell;
mod commands;
mod trace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_core::MonitorConfig;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Focus session monitor", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a focus session against a recorded landmark trace
    Run {
        /// JSON-lines trace file
        trace: PathBuf,
        /// Session length in minutes
        #[arg(short, long, conflicts_with = "seconds")]
        minutes: Option<u32>,
        /// Session length in seconds
        #[arg(short, long)]
        seconds: Option<u32>,
        /// Replay rate in frames per second
        #[arg(long, default_value = "30")]
        fps: u32,
        /// Replay the trace from the start when it runs out
        #[arg(short = 'l', long = "loop")]
        repeat: bool,
        /// Do not ring the terminal bell
        #[arg(long)]
        mute: bool,
    },
    /// Classify a trace offline and summarize attention states
    Analyze {
        /// JSON-lines trace file
        trace: PathBuf,
        /// List every state change
        #[arg(short, long)]
        transitions: bool,
    },
    /// List session length presets
    Presets,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::Run {
            trace,
            minutes,
            seconds,
            fps,
            repeat,
            mute,
        } => {
            let config = MonitorConfig::load(cli.config.as_deref())?;
            let options = commands::run::RunOptions {
                trace,
                duration_seconds: seconds.or_else(|| minutes.map(|m| m.saturating_mul(60))),
                fps,
                repeat,
                mute,
            };
            commands::run::handle_run(config, options).await
        }
        Commands::Analyze { trace, transitions } => {
            let config = MonitorConfig::load(cli.config.as_deref())?;
            commands::analyze::handle_analyze(&config, &trace, transitions)
        }
        Commands::Presets => {
            let config = MonitorConfig::load(cli.config.as_deref())?;
            commands::config::handle_presets(&config);
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = MonitorConfig::load(cli.config.as_deref())?;
                commands::config::handle_config_show(&config)
            }
            ConfigAction::Path => commands::config::handle_config_path(cli.config.as_deref()),
        },
    }
}
