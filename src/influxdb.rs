use crate::config::InfluxConfig;
use crate::error::StorageError;
use crate::model::{build_points, OutputValue, SnapshotPublisher};
use async_trait::async_trait;
use futures::prelude::stream;

pub struct Client {
    client: influxdb2::Client,
    bucket: String,
}

impl Client {
    pub(crate) fn new(config: InfluxConfig) -> Self {
        let client = influxdb2::Client::new(config.url, config.org, config.token);
        Self {
            client,
            bucket: config.bucket,
        }
    }

    pub async fn write(&self, points: Vec<influxdb2::models::DataPoint>) -> Result<(), StorageError> {
        Ok(self
            .client
            .write(self.bucket.as_str(), stream::iter(points))
            .await?)
    }
}

/// Writes every snapshot to InfluxDB.
pub struct InfluxPublisher {
    client: Client,
}

impl InfluxPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotPublisher for InfluxPublisher {
    async fn publish(&self, outputs: &[OutputValue]) -> Result<(), StorageError> {
        let points = build_points(outputs);
        for point in &points {
            tracing::trace!("{:?}", point);
        }
        self.client.write(points).await?;
        tracing::debug!("Successfully wrote {} points to InfluxDB", outputs.len());
        Ok(())
    }
}

/// Publisher used when InfluxDB is not configured: outputs go to the log.
pub struct LogPublisher;

#[async_trait]
impl SnapshotPublisher for LogPublisher {
    async fn publish(&self, outputs: &[OutputValue]) -> Result<(), StorageError> {
        for output in outputs {
            tracing::debug!(
                source = %output.source,
                sensor = %output.kind,
                unit = %output.kind.unit(),
                value = output.value,
                "Output"
            );
        }
        Ok(())
    }
}
