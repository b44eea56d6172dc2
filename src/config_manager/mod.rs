use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::probe::ProbeKind;

const DEFAULT_CONFIG_FILE_LOCATION_FROM_HOME: &str = ".config/execwatch/execwatch.toml";
const DEFAULT_EVENT: &str = "execve";
const DEFAULT_OBJECT_PATH: &str = "/usr/lib/execwatch/execwatch-ebpf";
const DEFAULT_KALLSYMS_PATH: &str = "/proc/kallsyms";
const POLLING_INTERVAL_MS: u64 = 2000;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConfigFile {
    pub probe: Option<ProbeKind>,
    pub event: Option<String>,
    pub polling_interval_ms: Option<u64>,
    pub object_path: Option<PathBuf>,
    pub kallsyms_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub probe: ProbeKind,
    pub event: String,
    pub polling_interval_ms: u64,
    pub object_path: PathBuf,
    pub kallsyms_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.polling_interval_ms == 0 {
            bail!("polling interval must be greater than zero");
        }
        Ok(())
    }
}

pub struct ConfigManager;

impl ConfigManager {
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("EXECWATCH_CONFIG_PATH") {
            return Some(PathBuf::from(config_path));
        }

        let path = homedir::get_my_home();

        match path {
            Ok(Some(path)) => {
                let path = path.join(DEFAULT_CONFIG_FILE_LOCATION_FROM_HOME);
                Some(path)
            }
            _ => None,
        }
    }

    fn load_config_from_file(path: &Path) -> Result<Config> {
        let config = std::fs::read_to_string(path)?;
        let config: ConfigFile = toml::from_str(&config)?;
        let defaults = ConfigManager::load_default_config();
        Ok(Config {
            probe: config.probe.unwrap_or(defaults.probe),
            event: config.event.unwrap_or(defaults.event),
            polling_interval_ms: config
                .polling_interval_ms
                .unwrap_or(defaults.polling_interval_ms),
            object_path: config.object_path.unwrap_or(defaults.object_path),
            kallsyms_path: config.kallsyms_path.unwrap_or(defaults.kallsyms_path),
        })
    }

    pub fn load_default_config() -> Config {
        Config {
            probe: ProbeKind::Count,
            event: DEFAULT_EVENT.to_string(),
            polling_interval_ms: POLLING_INTERVAL_MS,
            object_path: PathBuf::from(DEFAULT_OBJECT_PATH),
            kallsyms_path: PathBuf::from(DEFAULT_KALLSYMS_PATH),
        }
    }

    pub fn load_config() -> Config {
        let config_file_location = ConfigManager::get_config_path();

        let mut config = match config_file_location {
            Some(path) if path.exists() => ConfigManager::load_config_from_file(&path)
                .unwrap_or_else(|e| {
                    warn!(
                        "Failed to load config from {:?}, using default config: {:#}",
                        path, e
                    );
                    ConfigManager::load_default_config()
                }),
            _ => ConfigManager::load_default_config(),
        };

        if let Ok(object_path) = std::env::var("EXECWATCH_OBJECT_PATH") {
            config.object_path = PathBuf::from(object_path);
        }

        if let Ok(event) = std::env::var("EXECWATCH_EVENT") {
            config.event = event;
        }

        config
    }

    pub fn save_config(config: &Config) -> Result<()> {
        let config_file_location =
            ConfigManager::get_config_path().context("Failed to locate home directory")?;
        let config_out = ConfigFile {
            probe: Some(config.probe),
            event: Some(config.event.clone()),
            polling_interval_ms: Some(config.polling_interval_ms),
            object_path: Some(config.object_path.clone()),
            kallsyms_path: Some(config.kallsyms_path.clone()),
        };
        let config = toml::to_string(&config_out)?;
        if let Some(parent) = config_file_location.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        std::fs::write(&config_file_location, config)
            .with_context(|| format!("Failed to write {:?}", config_file_location))?;
        Ok(())
    }

    pub fn modify_config(
        probe: &Option<ProbeKind>,
        event: &Option<String>,
        polling_interval_ms: &Option<u64>,
        object_path: &Option<PathBuf>,
    ) -> Result<Config> {
        let mut current_config = ConfigManager::load_config();
        if let Some(probe) = probe {
            current_config.probe = *probe;
        }
        if let Some(event) = event {
            current_config.event.clone_from(event);
        }
        if let Some(polling_interval_ms) = polling_interval_ms {
            current_config.polling_interval_ms = *polling_interval_ms;
        }
        if let Some(object_path) = object_path {
            current_config.object_path.clone_from(object_path);
        }
        current_config.validate()?;
        ConfigManager::save_config(&current_config)?;
        Ok(current_config)
    }
}
