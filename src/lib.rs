//! Read state of charge telemetry from a MAX17048 fuel gauge over I2C.
//!
//! Boards like the Hackberry Pi wire the gauge to one of several I2C buses, and
//! which bus number it ends up on can change between boots. A session therefore
//! starts by binding to the right bus: an explicitly configured bus is used as is,
//! otherwise the bus remembered from the last scan is checked with a single probe,
//! and only if that fails is every bus scanned. A successful scan is remembered
//! for the next 24 hours.
//!
//! Currently the following data can be read:
//!
//! - Cell voltage (V)
//! - State of charge (%)
//! - Charge rate (%/hr)
//!
//! from which a charging flag and a coarse status label are derived.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), gaugeread::GaugeError> {
//! let config = gaugeread::Config::default();
//! let mut session = gaugeread::TelemetrySession::open(&config)?;
//! let snapshot = session.read_snapshot();
//! println!("{snapshot}");
//! session.close();
//! # Ok(())
//! # }
//! ```

mod binder;
mod bus;
mod cache;
mod config;
mod error;
mod probe;
mod register;
mod scan;
mod session;
mod snapshot;
mod status;
#[cfg(test)]
mod testing;

pub use binder::{BindState, BusBinding, DeviceBinder};
pub use bus::{BusId, BusProvider, LinuxBuses, DEVICE_ADDRESS};
pub use cache::{BindingCache, CacheRecord, CacheStore, FileStore, CACHE_FRESHNESS};
pub use config::{default_cache_path, Config};
pub use error::{CacheError, DecodeError, GaugeError, TransportError};
pub use probe::probe;
pub use register::{decode_charge_rate, decode_percentage, decode_voltage, read_register, Register};
pub use scan::scan;
pub use session::TelemetrySession;
pub use snapshot::{ErrorReport, TelemetrySnapshot};
pub use status::{classify, Status, DEFAULT_CHARGE_THRESHOLD};
