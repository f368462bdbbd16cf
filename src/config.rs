//! Runtime configuration loaded from `config/system_config.toml`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::actuator::{ServoSpec, SweepConfig};
use crate::error::ConfigError;
use crate::scheduler::{SchedulerConfig, DEFAULT_BLOCKING_SLOTS, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::sensor::{MonitorConfig, UltrasonicSpec};

pub const DEFAULT_CONFIG_PATH: &str = "config/system_config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub servo: ServoSpec,
    pub sweep: SweepConfig,
    pub ranger: UltrasonicSpec,
    pub monitor: MonitorConfig,
    pub scheduler: ContextConfig,
}

/// Settings for execution contexts that only host submitted work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub shutdown_timeout_s: f64,
    pub blocking_slots: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_s: DEFAULT_SHUTDOWN_TIMEOUT.as_secs_f64(),
            blocking_slots: DEFAULT_BLOCKING_SLOTS,
        }
    }
}

impl ContextConfig {
    /// Scheduler settings for a host context. The interval only paces the
    /// (absent) recurring unit, so any positive value works.
    pub fn host_scheduler(&self) -> SchedulerConfig {
        let timeout = Duration::try_from_secs_f64(self.shutdown_timeout_s).unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        SchedulerConfig::every(Duration::from_secs(1))
            .with_shutdown_timeout(timeout)
            .with_blocking_slots(self.blocking_slots.max(1))
    }
}

impl SystemConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

/// Load config from `path`. A missing file yields the defaults; a file that
/// exists but does not parse is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<SystemConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(source) => SystemConfig::from_toml_str(&source),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SystemConfig::default()),
        Err(err) => Err(err.into()),
    }
}
