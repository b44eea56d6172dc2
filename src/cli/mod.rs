mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config_manager::ConfigManager;
use crate::probe::ProbeKind;
use commands::{print_config_info, resolve_event, run_probe, setup_config};

#[derive(Parser)]
#[clap(
    name = "execwatch",
    about = "Attach kernel probes to a system call and report what they see",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log a trace line on every call of the event.
    Hello {
        #[clap(long)]
        event: Option<String>,
    },
    /// Count calls of the event per user ID and print the table periodically.
    Count {
        #[clap(long)]
        event: Option<String>,
        #[clap(long)]
        interval_ms: Option<u64>,
    },
    /// Print the kernel symbol an event name resolves to.
    Resolve { event: String },
    /// Print the effective configuration.
    Info,
    /// Persist configuration values.
    Setup {
        #[clap(long)]
        probe: Option<ProbeKind>,
        #[clap(long)]
        event: Option<String>,
        #[clap(long)]
        interval_ms: Option<u64>,
        #[clap(long)]
        object_path: Option<PathBuf>,
    },
}

pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigManager::load_config();

    match cli.command {
        Commands::Hello { event } => {
            config.probe = ProbeKind::Hello;
            if let Some(event) = event {
                config.event = event;
            }
            run_probe(config)
        }
        Commands::Count { event, interval_ms } => {
            config.probe = ProbeKind::Count;
            if let Some(event) = event {
                config.event = event;
            }
            if let Some(interval_ms) = interval_ms {
                config.polling_interval_ms = interval_ms;
            }
            config.validate()?;
            run_probe(config)
        }
        Commands::Resolve { event } => resolve_event(&config, &event),
        Commands::Info => {
            print_config_info(&config);
            Ok(())
        }
        Commands::Setup {
            probe,
            event,
            interval_ms,
            object_path,
        } => setup_config(&probe, &event, &interval_ms, &object_path),
    }
}
