use std::fmt;

/// InfluxDB measurement all tracker outputs are written to.
pub const MEASUREMENT: &str = "power_max_tracker";

/// The values a tracker exposes.
///
/// Each kind is published under its own key and rounded to its own
/// presentation precision.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OutputKind {
    /// Ranked maximum hourly average, 1-based rank.
    MaxValue(usize),
    /// Mean of the ranked maxima.
    AverageMax,
    /// Gated instantaneous source power.
    Source,
    /// Average power of the current hour so far.
    HourlyAveragePower,
    /// Energy accumulated in the current hour.
    HourlyEnergy,
}

impl OutputKind {
    pub fn unit(&self) -> Unit {
        match self {
            OutputKind::MaxValue(_) | OutputKind::AverageMax | OutputKind::HourlyAveragePower => {
                Unit::Kilowatt
            }
            OutputKind::Source => Unit::Watt,
            OutputKind::HourlyEnergy => Unit::Kwh,
        }
    }

    /// Decimal places of the published value, `None` for pass-through.
    pub fn precision(&self) -> Option<u32> {
        match self {
            OutputKind::MaxValue(_) | OutputKind::AverageMax | OutputKind::HourlyEnergy => Some(2),
            OutputKind::HourlyAveragePower => Some(3),
            OutputKind::Source => None,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputKind::MaxValue(rank) => write!(f, "max_values_{}", rank),
            OutputKind::AverageMax => write!(f, "average_max"),
            OutputKind::Source => write!(f, "source"),
            OutputKind::HourlyAveragePower => write!(f, "hourly_average_power"),
            OutputKind::HourlyEnergy => write!(f, "hourly_energy"),
        }
    }
}

/// Units of the published values.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Unit {
    /// Watts (W) - instantaneous power
    Watt,
    /// Kilowatts (kW) - hourly averages
    Kilowatt,
    /// Kilowatt-hours (kWh) - energy over time
    Kwh,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unit::Watt => write!(f, "W"),
            Unit::Kilowatt => write!(f, "kW"),
            Unit::Kwh => write!(f, "kWh"),
        }
    }
}
