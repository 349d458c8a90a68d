use crate::error::StorageError;
use crate::tracker::Snapshot;
use chrono::{DateTime, Local};
use influxdb2::models::DataPoint;

use super::traits::DataPointBuilder;
use super::types::{OutputKind, MEASUREMENT};
use super::utilities::round_to;

/// One published value of a tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    /// Source entity the tracker follows
    pub source: String,
    pub kind: OutputKind,
    /// Value already rounded to the kind's precision
    pub value: f64,
    pub timestamp: DateTime<Local>,
}

impl DataPointBuilder for OutputValue {
    fn to_point(&self) -> Result<DataPoint, StorageError> {
        let timestamp = self
            .timestamp
            .timestamp_nanos_opt()
            .ok_or_else(|| StorageError::InvalidDataPoint("Timestamp overflow".to_string()))?;

        DataPoint::builder(MEASUREMENT)
            .tag("source", self.source.clone())
            .tag("sensor", self.kind.to_string())
            .tag("unit", self.kind.unit().to_string())
            .field("value", self.value)
            .timestamp(timestamp)
            .build()
            .map_err(|e| {
                StorageError::InvalidDataPoint(format!("Failed to build OutputValue: {}", e))
            })
    }
}

fn output(source: &str, kind: OutputKind, raw: f64, timestamp: DateTime<Local>) -> OutputValue {
    let value = match kind.precision() {
        Some(decimals) => round_to(raw, decimals),
        None => raw,
    };
    OutputValue {
        source: source.to_string(),
        kind,
        value,
        timestamp,
    }
}

/// Projects a snapshot onto the published values.
///
/// Exactly `num_max_values` ranked outputs are produced; ranks not filled
/// yet read `0.0`.
pub fn project_snapshot(source: &str, num_max_values: usize, snapshot: &Snapshot) -> Vec<OutputValue> {
    let at = snapshot.taken_at;
    let mut outputs: Vec<OutputValue> = (0..num_max_values)
        .map(|i| {
            let value = snapshot.ranked_maxima.get(i).copied().unwrap_or(0.0);
            output(source, OutputKind::MaxValue(i + 1), value, at)
        })
        .collect();

    outputs.push(output(source, OutputKind::AverageMax, snapshot.average_of_maxima, at));
    outputs.push(output(
        source,
        OutputKind::Source,
        snapshot.gated_instantaneous_power_w,
        at,
    ));
    outputs.push(output(
        source,
        OutputKind::HourlyAveragePower,
        snapshot.current_hour_average_kw,
        at,
    ));
    outputs.push(output(
        source,
        OutputKind::HourlyEnergy,
        snapshot.current_hour_energy_kwh,
        at,
    ));
    outputs
}
