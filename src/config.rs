use std::path::PathBuf;
use std::time::Duration;

use crate::bus::{BusId, DEVICE_ADDRESS};
use crate::cache::CACHE_FRESHNESS;
use crate::status::DEFAULT_CHARGE_THRESHOLD;

/// Settings for opening a [`TelemetrySession`](crate::TelemetrySession).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Use this bus without consulting the cache or scanning.
    pub bus: Option<BusId>,
    pub address: u8,
    /// Where the `i2c-N` device nodes live.
    pub device_dir: PathBuf,
    pub cache_path: PathBuf,
    pub cache_freshness: Duration,
    /// See [`DEFAULT_CHARGE_THRESHOLD`].
    pub charge_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: None,
            address: DEVICE_ADDRESS,
            device_dir: PathBuf::from("/dev"),
            cache_path: default_cache_path(),
            cache_freshness: CACHE_FRESHNESS,
            charge_threshold: DEFAULT_CHARGE_THRESHOLD,
        }
    }
}

/// `$XDG_CACHE_HOME/gaugeread/bus.json`, then `~/.cache/...`, then the temp dir.
pub fn default_cache_path() -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|dir| !dir.is_empty())
                .map(|home| PathBuf::from(home).join(".cache"))
        })
        .unwrap_or_else(std::env::temp_dir);
    base.join("gaugeread").join("bus.json")
}
