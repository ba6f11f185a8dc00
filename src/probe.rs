use crate::bus::{BusId, BusProvider};
use crate::register::{read_register, Register};

/// Check whether a gauge answers at `address` on `bus` by reading its voltage
/// register once. The bus is closed again before returning.
pub fn probe<P: BusProvider>(provider: &P, bus: BusId, address: u8) -> bool {
    let mut handle = match provider.open(bus) {
        Ok(handle) => handle,
        Err(err) => {
            log::debug!("probe bus {bus}: {err}");
            return false;
        }
    };

    match read_register(&mut handle, address, Register::Vcell) {
        Ok(_) => {
            log::debug!("probe bus {bus}: gauge answered at {address:#04x}");
            true
        }
        Err(err) => {
            log::debug!("probe bus {bus}: {err}");
            false
        }
    }
}
