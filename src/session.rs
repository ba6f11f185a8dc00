use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;

use crate::binder::{BusBinding, DeviceBinder};
use crate::bus::{BusId, BusProvider, LinuxBuses};
use crate::cache::{BindingCache, CacheStore, FileStore};
use crate::config::Config;
use crate::error::{DecodeError, GaugeError};
use crate::register::{self, read_register, Register};
use crate::snapshot::TelemetrySnapshot;
use crate::status::classify;

/// A bound connection to the fuel gauge.
///
/// The bus stays open for the life of the session and is closed by
/// [`TelemetrySession::close`] or when the session is dropped, whichever
/// comes first.
pub struct TelemetrySession<B> {
    binding: BusBinding<B>,
    charge_threshold: f64,
}

impl TelemetrySession<I2cdev> {
    /// Find the gauge on the host's `i2c-N` buses, using the cache file from `config`.
    pub fn open(config: &Config) -> Result<Self, GaugeError> {
        let buses = LinuxBuses::new(&config.device_dir);
        let cache = BindingCache::with_freshness(
            FileStore::new(&config.cache_path),
            config.cache_freshness,
        );
        Self::open_with(&buses, &cache, config)
    }
}

impl<B: I2c> TelemetrySession<B> {
    pub fn open_with<P, S>(
        provider: &P,
        cache: &BindingCache<S>,
        config: &Config,
    ) -> Result<Self, GaugeError>
    where
        P: BusProvider<Bus = B>,
        S: CacheStore,
    {
        let binding = DeviceBinder::new(provider, cache, config.address).bind(config.bus)?;
        Ok(Self {
            binding,
            charge_threshold: config.charge_threshold,
        })
    }

    pub fn bus_id(&self) -> BusId {
        self.binding.bus_id
    }

    fn read(
        &mut self,
        register: Register,
        decode: fn(&[u8]) -> Result<f64, DecodeError>,
    ) -> Option<f64> {
        let address = self.binding.address;
        let result = read_register(self.binding.handle_mut(), address, register)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| decode(&bytes).map_err(anyhow::Error::from));

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("bus {}: {register:?} unavailable: {err}", self.binding.bus_id);
                None
            }
        }
    }

    /// Read voltage, state of charge and charge rate. A register that fails to
    /// read leaves only its own field empty.
    pub fn read_snapshot(&mut self) -> TelemetrySnapshot {
        let voltage = self.read(Register::Vcell, register::decode_voltage);
        let percentage = self.read(Register::Soc, register::decode_percentage);
        let charge_rate = self.read(Register::Crate, register::decode_charge_rate);
        let (status, charging) = classify(percentage, charge_rate, self.charge_threshold);

        TelemetrySnapshot {
            voltage,
            percentage,
            status,
            charging,
            charge_rate,
        }
    }

    /// Close the bus.
    pub fn close(self) {
        log::debug!("closing i2c bus {}", self.binding.bus_id);
    }
}
