use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// The 7-bit address a MAX17048 answers on, whichever bus it sits on.
pub const DEVICE_ADDRESS: u8 = 0x36;

/// The number of an I2C bus as assigned by the host, e.g. `11` for `/dev/i2c-11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub u32);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BusId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BusId)
    }
}

/// Access to the I2C buses a host exposes.
///
/// A handle returned by [`BusProvider::open`] owns the underlying connection and
/// releases it when dropped.
pub trait BusProvider {
    type Bus: I2c;

    /// The buses currently present, in whatever order the host lists them.
    fn enumerate(&self) -> Vec<BusId>;

    fn open(&self, bus: BusId) -> Result<Self::Bus, TransportError>;
}

/// Buses exposed as `i2c-N` character devices by the Linux `i2c-dev` driver.
#[derive(Debug, Clone)]
pub struct LinuxBuses {
    device_dir: PathBuf,
}

impl LinuxBuses {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    fn node_path(&self, bus: BusId) -> PathBuf {
        self.device_dir.join(format!("i2c-{bus}"))
    }
}

/// Parse a device node name such as `i2c-13` into its bus number.
fn parse_node_name(name: &str) -> Option<BusId> {
    let suffix = name.strip_prefix("i2c-")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

impl BusProvider for LinuxBuses {
    type Bus = I2cdev;

    // Not sorted: read_dir order is whatever the filesystem hands back.
    fn enumerate(&self) -> Vec<BusId> {
        let entries = match fs::read_dir(&self.device_dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("cannot list {}: {err}", self.device_dir.display());
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_node_name(&entry.file_name().to_string_lossy()))
            .collect()
    }

    fn open(&self, bus: BusId) -> Result<I2cdev, TransportError> {
        I2cdev::new(self.node_path(bus)).map_err(|err| TransportError::Open {
            bus,
            reason: err.to_string(),
        })
    }
}
