use std::path::PathBuf;

use anyhow::Result;
use log::info;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::config_manager::{Config, ConfigManager};
use crate::load_ebpf::AyaPlatform;
use crate::monitor::run_session;
use crate::platform::Platform;
use crate::probe::ProbeKind;

pub fn print_config_info(config: &Config) {
    println!("Probe: {}", config.probe);
    println!("Event: {}", config.event);
    println!("Polling interval: {} ms", config.polling_interval_ms);
    println!("Probe object: {}", config.object_path.display());
    println!("Kernel symbols: {}", config.kallsyms_path.display());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}

pub fn setup_config(
    probe: &Option<ProbeKind>,
    event: &Option<String>,
    polling_interval_ms: &Option<u64>,
    object_path: &Option<PathBuf>,
) -> Result<()> {
    let config = ConfigManager::modify_config(probe, event, polling_interval_ms, object_path)?;
    print_config_info(&config);
    Ok(())
}

pub fn resolve_event(config: &Config, event: &str) -> Result<()> {
    let handle = AyaPlatform::new(config).resolve(event)?;
    println!("{} -> {}", handle.name(), handle.symbol());
    Ok(())
}

fn cancel_on_shutdown_signal(cancellation: CancellationToken) -> Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
        info!("shutting down");
        cancellation.cancel();
    });
    Ok(())
}

#[tokio::main]
pub async fn run_probe(config: Config) -> Result<()> {
    let cancellation = CancellationToken::new();
    cancel_on_shutdown_signal(cancellation.clone())?;

    let mut platform = AyaPlatform::new(&config);
    let mut stdout = std::io::stdout();
    run_session(&mut platform, &config, &mut stdout, cancellation).await
}
