use std::fmt;

use serde::Serialize;

/// Charge rate, in %/hr, beyond which the battery counts as charging or
/// discharging. Anything closer to zero is idle.
pub const DEFAULT_CHARGE_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Charging,
    Discharging,
    Idle,
    Full,
    Good,
    Medium,
    Low,
    Critical,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Charging => "charging",
            Status::Discharging => "discharging",
            Status::Idle => "idle",
            Status::Full => "full",
            Status::Good => "good",
            Status::Medium => "medium",
            Status::Low => "low",
            Status::Critical => "critical",
        }
    }

    fn from_percentage(percentage: f64) -> Self {
        if percentage > 80.0 {
            Status::Full
        } else if percentage > 60.0 {
            Status::Good
        } else if percentage > 40.0 {
            Status::Medium
        } else if percentage > 20.0 {
            Status::Low
        } else {
            Status::Critical
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn a reading into a status label and a charging flag.
///
/// Charging wins over everything. Otherwise a known percentage picks the label,
/// falling back to the charge-rate direction; the charging flag is only ever
/// set by the charge rate.
pub fn classify(
    percentage: Option<f64>,
    charge_rate: Option<f64>,
    threshold: f64,
) -> (Status, bool) {
    let status = match charge_rate {
        Some(rate) if rate > threshold => return (Status::Charging, true),
        Some(rate) if rate < -threshold => Status::Discharging,
        Some(_) => Status::Idle,
        None => Status::Unknown,
    };

    match percentage {
        Some(percentage) => (Status::from_percentage(percentage), false),
        None => (status, false),
    }
}
