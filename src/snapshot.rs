use std::fmt;

use serde::Serialize;

use crate::status::Status;

/// One reading of the fuel gauge. A field is `None` when its register could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Cell voltage in V
    pub voltage: Option<f64>,
    /// State of charge in %, within 0..=100
    pub percentage: Option<f64>,
    pub status: Status,
    pub charging: bool,
    /// Rate of change of the state of charge in %/hr, negative while discharging
    pub charge_rate: Option<f64>,
}

/// What is reported instead of a snapshot when no gauge could be bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

impl ErrorReport {
    pub fn new(err: impl fmt::Display) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

fn field(f: &mut fmt::Formatter<'_>, value: Option<f64>, unit: &str) -> fmt::Result {
    match value {
        Some(value) => write!(f, "{value:.2} {unit}"),
        None => f.write_str("--"),
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Battery Voltage: ")?;
        field(f, self.voltage, "V")?;
        f.write_str("\nBattery Level: ")?;
        field(f, self.percentage, "%")?;
        f.write_str("\nCharge Rate: ")?;
        field(f, self.charge_rate, "%/hr")?;
        write!(f, "\nStatus: {}", self.status)
    }
}
