mod attachment;
mod cli;
mod config_manager;
mod errors;
mod load_ebpf;
mod monitor;
mod platform;
mod probe;
mod reporter;
mod snapshot;
mod symbols;

use crate::cli::process_cli;
use crate::errors::{exit_code_for, ProbeError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = process_cli() {
        match error.downcast_ref::<ProbeError>() {
            Some(probe_error) => eprintln!("Error during {}: {}", probe_error.step(), probe_error),
            None => eprintln!("Error: {:#}", error),
        }
        std::process::exit(exit_code_for(&error));
    }
}
