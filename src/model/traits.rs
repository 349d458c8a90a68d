use crate::error::StorageError;
use crate::model::metrics::OutputValue;
use async_trait::async_trait;
use influxdb2::models::DataPoint;

/// Trait for types that can be converted to InfluxDB data points.
///
/// Implementors must be thread-safe (Send + Sync) so batches can be handed
/// to the publisher task.
pub trait DataPointBuilder: Send + Sync {
    /// Converts the value into an InfluxDB DataPoint.
    ///
    /// # Returns
    /// - `Ok(DataPoint)` if conversion succeeds
    /// - `Err` if the value cannot be represented as a valid DataPoint
    fn to_point(&self) -> Result<DataPoint, StorageError>;
}

/// Destination of the projected output values of a snapshot.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    /// Publishes one batch of output values, all taken from the same snapshot.
    async fn publish(&self, outputs: &[OutputValue]) -> Result<(), StorageError>;
}
