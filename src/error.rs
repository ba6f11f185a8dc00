use std::path::PathBuf;

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

use crate::bus::BusId;

/// A single bus operation failed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to open i2c bus {bus}: {reason}")]
    Open { bus: BusId, reason: String },
    #[error("read of register {register:#04x} at address {address:#04x} failed: {kind}")]
    Read {
        address: u8,
        register: u8,
        kind: ErrorKind,
    },
}

/// A register read returned the wrong number of bytes.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("expected 2 register bytes, got {0}")]
pub struct DecodeError(pub usize);

/// Reading or writing the persisted bus binding failed. Never fatal.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode cache record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that stop a telemetry session from being opened.
#[derive(Error, Debug)]
pub enum GaugeError {
    #[error("fuel gauge not found at address {address:#04x} on any i2c bus")]
    NotFound { address: u8 },
    #[error(transparent)]
    Open(#[from] TransportError),
}
