use embedded_hal::i2c::{Error as _, I2c};

use crate::error::{DecodeError, TransportError};

/// MAX17048 registers read by this crate. Every register is 16 bits, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Cell voltage, LSB = 78.125 uV
    Vcell = 0x02,
    /// State of charge, LSB = 1/256 %
    Soc = 0x04,
    /// Charge rate, signed, LSB = 0.208 %/hr
    Crate = 0x16,
}

impl Register {
    pub fn addr(self) -> u8 {
        self as u8
    }
}

const VCELL_MV_PER_LSB: f64 = 0.078125;
const SOC_LSB_PER_PERCENT: f64 = 256.0;
const CRATE_PCT_PER_HOUR_PER_LSB: f64 = 0.208;

fn raw16(bytes: &[u8]) -> Result<[u8; 2], DecodeError> {
    bytes.try_into().map_err(|_| DecodeError(bytes.len()))
}

/// Cell voltage in volts.
pub fn decode_voltage(bytes: &[u8]) -> Result<f64, DecodeError> {
    let raw = u16::from_be_bytes(raw16(bytes)?);
    Ok(raw as f64 * VCELL_MV_PER_LSB / 1000.0)
}

/// State of charge in %, clamped to 0..=100.
pub fn decode_percentage(bytes: &[u8]) -> Result<f64, DecodeError> {
    let raw = u16::from_be_bytes(raw16(bytes)?);
    Ok((raw as f64 / SOC_LSB_PER_PERCENT).clamp(0.0, 100.0))
}

/// Charge rate in %/hour. Negative while discharging.
pub fn decode_charge_rate(bytes: &[u8]) -> Result<f64, DecodeError> {
    let raw = i16::from_be_bytes(raw16(bytes)?);
    Ok(raw as f64 * CRATE_PCT_PER_HOUR_PER_LSB)
}

/// Read the two bytes of `register` from the chip at `address`.
pub fn read_register<B: I2c>(
    bus: &mut B,
    address: u8,
    register: Register,
) -> Result<[u8; 2], TransportError> {
    let mut buf = [0u8; 2];
    bus.write_read(address, &[register.addr()], &mut buf)
        .map_err(|err| TransportError::Read {
            address,
            register: register.addr(),
            kind: err.kind(),
        })?;

    log::debug!("RX {register:?} ({:#04x}): 0x{}", register.addr(), hex::encode(buf));

    Ok(buf)
}
