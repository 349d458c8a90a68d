//! Trapezoidal energy integration over the current clock-hour.

use crate::error::ClockAnomaly;
use crate::tracker::sanitizer::Reading;
use chrono::{DateTime, Local};

const WATTS_PER_KILOWATT: f64 = 1000.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Elapsed hours below this are treated as "window just opened".
const ELAPSED_EPSILON_HOURS: f64 = 1e-9;

fn seconds_between(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// State of the hour currently being integrated.
#[derive(Debug, Clone, PartialEq)]
pub struct HourWindow {
    pub start: DateTime<Local>,
    pub last_value_w: f64,
    pub last_timestamp: DateTime<Local>,
    pub accumulated_energy_kwh: f64,
    // whether last_value_w/last_timestamp form the left edge of a trapezoid
    sampled: bool,
}

impl HourWindow {
    fn open(start: DateTime<Local>) -> Self {
        Self {
            start,
            last_value_w: 0.0,
            last_timestamp: start,
            accumulated_energy_kwh: 0.0,
            sampled: false,
        }
    }

    fn elapsed_hours(&self, now: DateTime<Local>) -> f64 {
        seconds_between(self.start, now) / SECONDS_PER_HOUR
    }
}

/// Outcome of feeding one reading to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Accrual {
    /// A trapezoid was closed and this much energy was added.
    Added { kwh: f64 },
    /// First sample of a trapezoid chain, nothing to integrate yet.
    FirstSample,
    /// Gate was closed: value zeroed and the chain broken.
    Suspended,
    /// Reading carried no value: value zeroed.
    Invalid,
    /// Timestamp did not advance; increment skipped.
    ClockAnomaly(ClockAnomaly),
}

/// Summary of a window closed by an hour boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedHour {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub elapsed_hours: f64,
    pub energy_kwh: f64,
    pub average_kw: f64,
}

#[derive(Debug, Clone)]
pub struct HourEnergyAccumulator {
    window: HourWindow,
}

impl HourEnergyAccumulator {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            window: HourWindow::open(start),
        }
    }

    pub fn accumulated_energy_kwh(&self) -> f64 {
        self.window.accumulated_energy_kwh
    }

    #[cfg(test)]
    pub fn last_value_w(&self) -> f64 {
        self.window.last_value_w
    }

    /// Breaks the trapezoid chain while the gate is closed.
    ///
    /// The next valid reading starts a new chain, so nothing accrues for the
    /// gated interval even when no reading arrived during it.
    pub fn suspend(&mut self) {
        self.window.last_value_w = 0.0;
        self.window.sampled = false;
    }

    /// Integrates one reading at the time it was taken.
    ///
    /// Energy of the segment since the previous reading is
    /// `(previous + current) / 2 * dt`, converted from W·s to kWh.
    pub fn on_reading(&mut self, reading: Reading, gate_active: bool) -> Accrual {
        if !gate_active {
            self.suspend();
            return Accrual::Suspended;
        }

        let window = &mut self.window;
        let (watts, now) = match reading {
            Reading::Valid { watts, at } => (watts, at),
            Reading::Invalid => {
                window.last_value_w = 0.0;
                return Accrual::Invalid;
            }
        };

        let accrual = if !window.sampled {
            Accrual::FirstSample
        } else {
            let dt_seconds = seconds_between(window.last_timestamp, now);
            if dt_seconds <= 0.0 {
                Accrual::ClockAnomaly(ClockAnomaly::NonPositiveDelta {
                    seconds: dt_seconds,
                })
            } else {
                let average_w = (window.last_value_w + watts) / 2.0;
                let kwh = average_w * dt_seconds / SECONDS_PER_HOUR / WATTS_PER_KILOWATT;
                window.accumulated_energy_kwh += kwh;
                Accrual::Added { kwh }
            }
        };

        window.last_value_w = watts;
        if now > window.last_timestamp {
            window.last_timestamp = now;
        }
        window.sampled = true;

        accrual
    }

    /// Closes the current window at `now` and opens a fresh one.
    ///
    /// The average uses the actual elapsed time, so late or early firing is
    /// tolerated. A window with no elapsed time averages to `0.0`.
    pub fn on_hour_boundary(&mut self, now: DateTime<Local>) -> FinalizedHour {
        let elapsed_hours = self.window.elapsed_hours(now);
        let energy_kwh = self.window.accumulated_energy_kwh;
        let average_kw = if elapsed_hours > 0.0 {
            energy_kwh / elapsed_hours
        } else {
            0.0
        };

        let finalized = FinalizedHour {
            start: self.window.start,
            end: now,
            elapsed_hours,
            energy_kwh,
            average_kw,
        };

        let next_start = if now > self.window.start {
            now
        } else {
            self.window.start
        };
        self.window = HourWindow::open(next_start);

        finalized
    }

    /// Average power of the window so far, in kW.
    pub fn current_average_kw(&self, now: DateTime<Local>) -> f64 {
        let elapsed_hours = self.window.elapsed_hours(now);
        if elapsed_hours <= ELAPSED_EPSILON_HOURS {
            return 0.0;
        }
        self.window.accumulated_energy_kwh / elapsed_hours
    }
}
