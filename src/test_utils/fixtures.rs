//! Test fixtures and common test data.

use chrono::{DateTime, Local, TimeDelta, TimeZone};

/// Tolerance used by [`assert_close`].
pub const TOLERANCE: f64 = 1e-9;

/// Asserts two floats are equal within a small relative tolerance.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    let scale = 1.0 + expected.abs();
    assert!(
        (actual - expected).abs() <= TOLERANCE * scale,
        "expected {} to be close to {}",
        actual,
        expected
    );
}

/// Common entity ids.
pub mod constants {
    pub const TEST_SOURCE: &str = "sensor.test_power";
    pub const TEST_BINARY: &str = "binary_sensor.test_gate";
}

/// Test date and time generators.
///
/// All dates are in January so no DST transition is involved.
pub mod dates {
    use super::*;

    /// 2024-01-15 10:00:00 local time.
    pub fn test_hour_start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    /// `seconds` after [`test_hour_start`] (negative is before).
    pub fn test_at(seconds: i64) -> DateTime<Local> {
        test_hour_start() + TimeDelta::seconds(seconds)
    }

    /// A time on the test day.
    pub fn test_date_at(hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 15, hour, minute, second)
            .unwrap()
    }
}

/// Sample domain values.
pub mod samples {
    use super::dates::test_at;
    use crate::tracker::Snapshot;

    /// A tracking snapshot with two ranked maxima.
    pub fn tracking_snapshot() -> Snapshot {
        Snapshot {
            taken_at: test_at(1800),
            tracking: true,
            ranked_maxima: vec![5.4321, 3.4],
            average_of_maxima: 4.41605,
            gated_instantaneous_power_w: 1234.5678,
            current_hour_average_kw: 0.123456,
            current_hour_energy_kwh: 0.061728,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_date_generators() {
        let start = dates::test_hour_start();
        assert_eq!(start.hour(), 10);
        assert_eq!(start.minute(), 0);

        assert_eq!(dates::test_at(90).minute(), 1);
        assert_eq!(dates::test_at(-60).hour(), 9);
        assert_eq!(dates::test_date_at(15, 30, 45).second(), 45);
    }

    #[test]
    fn test_assert_close_accepts_float_noise() {
        assert_close(0.1 + 0.2, 0.3);
    }

    #[test]
    #[should_panic]
    fn test_assert_close_rejects_different_values() {
        assert_close(0.1, 0.2);
    }
}
