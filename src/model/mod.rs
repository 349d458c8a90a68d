//! Output model of the tracker.
//!
//! Projects engine snapshots onto named, rounded output values and converts
//! them to InfluxDB data points.

pub mod metrics;
pub mod traits;
pub mod types;
pub mod utilities;

pub use metrics::{project_snapshot, OutputValue};
pub use traits::SnapshotPublisher;
pub use utilities::build_points;
