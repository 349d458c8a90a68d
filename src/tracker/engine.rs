//! Aggregation engine: routes notifications to the gate, the hour
//! accumulator and the ranking, and produces the published snapshot.

use crate::config::TrackerConfig;
use crate::error::{ClockAnomaly, ConfigError};
use crate::tracker::accumulator::{Accrual, FinalizedHour, HourEnergyAccumulator};
use crate::tracker::gate::{Gate, StateLookup};
use crate::tracker::ranker::TopNRanker;
use crate::tracker::sanitizer::sanitize;
use chrono::{DateTime, Local};
use std::sync::Arc;

/// Boundaries closer than this to the window start are duplicate deliveries.
pub const DUPLICATE_BOUNDARY_SECONDS: f64 = 60.0;

/// Lifecycle of an engine.
#[derive(Debug, Clone)]
pub enum EngineState {
    /// Created, waiting for the first hour boundary to open a window.
    Uninitialized,
    /// Integrating the current hour.
    Tracking(HourEnergyAccumulator),
}

/// One canonical view of everything the tracker exposes, at full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: DateTime<Local>,
    pub tracking: bool,
    pub ranked_maxima: Vec<f64>,
    pub average_of_maxima: f64,
    pub gated_instantaneous_power_w: f64,
    pub current_hour_average_kw: f64,
    pub current_hour_energy_kwh: f64,
}

/// What an hour boundary did.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryOutcome {
    /// The closed window, `None` for the boundary that started tracking.
    pub finalized: Option<FinalizedHour>,
    /// Whether the ranked maxima changed.
    pub ranking_changed: bool,
    /// Set when the boundary was a duplicate delivery.
    pub anomaly: Option<ClockAnomaly>,
}

#[derive(Debug)]
pub struct AggregationEngine {
    source_sensor: String,
    monthly_reset: bool,
    gate: Gate,
    state: EngineState,
    ranker: TopNRanker,
    last_source_w: f64,
    // end of the most recent hour closed live or by replay
    last_finalized: Option<DateTime<Local>>,
    // the open window was started by the first boundary, not a wall-clock hour
    window_from_startup: bool,
}

impl AggregationEngine {
    /// Creates an engine for `config`, seeding the ranking with `restored` maxima.
    pub fn new(
        config: &TrackerConfig,
        states: Arc<dyn StateLookup>,
        restored: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let ranker = TopNRanker::restore(config.num_max_values, restored)?;
        Ok(Self {
            source_sensor: config.source_sensor.clone(),
            monthly_reset: config.monthly_reset,
            gate: Gate::new(config.binary_sensor.clone(), states),
            state: EngineState::Uninitialized,
            ranker,
            last_source_w: 0.0,
            last_finalized: None,
            window_from_startup: false,
        })
    }

    /// Restores the end of the last hour closed before a restart.
    pub fn with_last_finalized(mut self, last_finalized: Option<DateTime<Local>>) -> Self {
        self.last_finalized = last_finalized;
        self
    }

    pub fn source_sensor(&self) -> &str {
        &self.source_sensor
    }

    pub fn last_finalized(&self) -> Option<DateTime<Local>> {
        self.last_finalized
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, EngineState::Tracking(_))
    }

    pub fn ranked_maxima(&self) -> &[f64] {
        self.ranker.snapshot()
    }

    pub fn num_max_values(&self) -> usize {
        self.ranker.capacity()
    }

    /// Handles a new raw value of the source sensor.
    pub fn on_value_changed(&mut self, raw: Option<&str>, now: DateTime<Local>) -> Snapshot {
        let reading = sanitize(&self.source_sensor, raw, now);
        self.last_source_w = reading.watts_or_zero();

        match &mut self.state {
            EngineState::Uninitialized => {
                tracing::debug!(
                    source = %self.source_sensor,
                    "No hour window yet, reading not integrated"
                );
            }
            EngineState::Tracking(accumulator) => {
                let gate_active = self.gate.is_active();
                match accumulator.on_reading(reading, gate_active) {
                    Accrual::Added { kwh } => tracing::debug!(
                        source = %self.source_sensor,
                        watts = self.last_source_w,
                        kwh,
                        total_kwh = accumulator.accumulated_energy_kwh(),
                        "Energy accumulated"
                    ),
                    Accrual::FirstSample => tracing::debug!(
                        source = %self.source_sensor,
                        watts = self.last_source_w,
                        "First sample of the window"
                    ),
                    Accrual::Suspended => tracing::debug!(
                        source = %self.source_sensor,
                        "Gate closed, reading ignored"
                    ),
                    Accrual::Invalid => {}
                    Accrual::ClockAnomaly(anomaly) => tracing::warn!(
                        source = %self.source_sensor,
                        %anomaly,
                        "Clock anomaly, energy increment skipped"
                    ),
                }
            }
        }

        self.snapshot(now)
    }

    /// Handles a change of the gate's binary sensor.
    ///
    /// The gate is derived, so the returned snapshot already reflects the new
    /// gate state. A closed gate breaks the trapezoid chain right away, so the
    /// gated interval accrues nothing even if no reading arrives during it.
    pub fn on_binary_changed(&mut self, raw: Option<&str>, now: DateTime<Local>) -> Snapshot {
        let active = self.gate.is_active();
        tracing::debug!(
            source = %self.source_sensor,
            binary_sensor = ?self.gate.binary_sensor(),
            state = ?raw,
            active,
            "Gate signal changed"
        );
        if !active {
            if let EngineState::Tracking(accumulator) = &mut self.state {
                accumulator.suspend();
            }
        }
        self.snapshot(now)
    }

    /// Closes the current hour and ranks its average.
    ///
    /// The first boundary after creation only opens the initial window.
    pub fn on_hour_boundary(&mut self, now: DateTime<Local>) -> BoundaryOutcome {
        let finalized = match &mut self.state {
            EngineState::Tracking(accumulator) => accumulator.on_hour_boundary(now),
            EngineState::Uninitialized => return self.start_tracking(now),
        };
        let from_startup = std::mem::replace(&mut self.window_from_startup, false);
        let elapsed_seconds = finalized.elapsed_hours * 3600.0;

        if elapsed_seconds < DUPLICATE_BOUNDARY_SECONDS {
            if from_startup {
                // started just before the top of the hour, left for a later backfill
                tracing::debug!(
                    source = %self.source_sensor,
                    seconds = elapsed_seconds,
                    "Startup window closed within a minute, average not ranked"
                );
                return BoundaryOutcome {
                    finalized: Some(finalized),
                    ranking_changed: false,
                    anomaly: None,
                };
            }
            self.mark_finalized(finalized.end);
            let anomaly = ClockAnomaly::EarlyBoundary {
                seconds: elapsed_seconds,
            };
            tracing::warn!(
                source = %self.source_sensor,
                %anomaly,
                "Duplicate hour boundary, average not ranked"
            );
            return BoundaryOutcome {
                finalized: Some(finalized),
                ranking_changed: false,
                anomaly: Some(anomaly),
            };
        }

        self.mark_finalized(finalized.end);
        let ranking_changed = self.ranker.offer(finalized.average_kw);
        tracing::info!(
            source = %self.source_sensor,
            average_kw = finalized.average_kw,
            energy_kwh = finalized.energy_kwh,
            ranked = ranking_changed,
            maxima = ?self.ranker.snapshot(),
            "Hour finalized"
        );

        BoundaryOutcome {
            finalized: Some(finalized),
            ranking_changed,
            anomaly: None,
        }
    }

    fn mark_finalized(&mut self, end: DateTime<Local>) {
        if self.last_finalized.map_or(true, |last| end > last) {
            self.last_finalized = Some(end);
        }
    }

    fn start_tracking(&mut self, now: DateTime<Local>) -> BoundaryOutcome {
        tracing::info!(
            source = %self.source_sensor,
            window_start = %now,
            "Tracking started"
        );
        self.state = EngineState::Tracking(HourEnergyAccumulator::new(now));
        self.window_from_startup = true;
        BoundaryOutcome {
            finalized: None,
            ranking_changed: false,
            anomaly: None,
        }
    }

    /// Handles the month-boundary notification. Returns `true` when the ranking was cleared.
    pub fn on_month_boundary(&mut self, now: DateTime<Local>) -> bool {
        if !self.monthly_reset {
            return false;
        }
        tracing::info!(
            source = %self.source_sensor,
            at = %now,
            "Monthly reset of {} max values",
            self.ranker.capacity()
        );
        self.reset_maxima();
        true
    }

    pub fn reset_maxima(&mut self) {
        self.ranker.reset();
    }

    /// Integrates a recorded hour of raw source states and ranks its average.
    ///
    /// Uses a scratch accumulator, so the live window is untouched. The gate
    /// is evaluated once, against its current state.
    pub fn replay_hour<'a>(
        &mut self,
        start: DateTime<Local>,
        end: DateTime<Local>,
        readings: impl IntoIterator<Item = (Option<&'a str>, DateTime<Local>)>,
    ) -> BoundaryOutcome {
        let gate_active = self.gate.is_active();
        let mut accumulator = HourEnergyAccumulator::new(start);

        for (raw, at) in readings {
            if at > end {
                break;
            }
            let at = if at < start { start } else { at };
            let reading = sanitize(&self.source_sensor, raw, at);
            accumulator.on_reading(reading, gate_active);
        }

        let finalized = accumulator.on_hour_boundary(end);
        self.mark_finalized(end);
        let ranking_changed = self.ranker.offer(finalized.average_kw);
        tracing::debug!(
            source = %self.source_sensor,
            hour_start = %start,
            average_kw = finalized.average_kw,
            ranked = ranking_changed,
            "Replayed hour"
        );

        BoundaryOutcome {
            finalized: Some(finalized),
            ranking_changed,
            anomaly: None,
        }
    }

    pub fn snapshot(&self, now: DateTime<Local>) -> Snapshot {
        let (current_hour_average_kw, current_hour_energy_kwh) = match &self.state {
            EngineState::Uninitialized => (0.0, 0.0),
            EngineState::Tracking(accumulator) => (
                accumulator.current_average_kw(now),
                accumulator.accumulated_energy_kwh(),
            ),
        };
        let gated_instantaneous_power_w = if self.gate.is_active() {
            self.last_source_w
        } else {
            0.0
        };

        Snapshot {
            taken_at: now,
            tracking: self.is_tracking(),
            ranked_maxima: self.ranker.snapshot().to_vec(),
            average_of_maxima: self.ranker.average(),
            gated_instantaneous_power_w,
            current_hour_average_kw,
            current_hour_energy_kwh,
        }
    }
}
