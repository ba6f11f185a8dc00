use crate::bus::{BusId, BusProvider};
use crate::error::GaugeError;
use crate::probe::probe;

/// Probe every bus the host lists and return the first one the gauge answers on.
///
/// Buses are tried in enumeration order, which is not sorted. If gauges answer
/// on several buses, which one wins is up to the host.
pub fn scan<P: BusProvider>(provider: &P, address: u8) -> Result<BusId, GaugeError> {
    let candidates = provider.enumerate();
    log::debug!("scanning {} i2c buses for {address:#04x}", candidates.len());

    candidates
        .into_iter()
        .find(|&bus| probe(provider, bus, address))
        .ok_or(GaugeError::NotFound { address })
}
