use influxdb2::models::DataPoint;

use super::traits::DataPointBuilder;

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Converts values to InfluxDB data points.
///
/// Values that fail to convert are logged and skipped so the rest of the
/// batch is still written.
pub fn build_points<B: DataPointBuilder>(values: &[B]) -> Vec<DataPoint> {
    values
        .iter()
        .filter_map(|value| match value.to_point() {
            Ok(point) => Some(point),
            Err(e) => {
                tracing::error!("Failed to convert to point: {:?}", e);
                None
            }
        })
        .collect()
}
