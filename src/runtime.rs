//! The tracker task: owns the engine and handles notifications one at a time.

use crate::model::{project_snapshot, SnapshotPublisher};
use crate::store::{PersistedState, StateStore};
use crate::tracker::{AggregationEngine, Snapshot};
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Input of the tracker task.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// New raw state of the source sensor. `None` when the entity is gone.
    ValueChanged {
        raw: Option<String>,
        at: DateTime<Local>,
    },
    /// New raw state of the gate's binary sensor.
    BinaryChanged {
        raw: Option<String>,
        at: DateTime<Local>,
    },
    HourBoundary(DateTime<Local>),
    MonthBoundary(DateTime<Local>),
}

pub struct Tracker {
    engine: AggregationEngine,
    store: Arc<dyn StateStore>,
    publisher: Arc<dyn SnapshotPublisher>,
}

impl Tracker {
    pub fn new(
        engine: AggregationEngine,
        store: Arc<dyn StateStore>,
        publisher: Arc<dyn SnapshotPublisher>,
    ) -> Self {
        Self {
            engine,
            store,
            publisher,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AggregationEngine {
        &mut self.engine
    }

    /// Drains `rx` until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Notification>) {
        tracing::info!(source = %self.engine.source_sensor(), "Tracker started");
        while let Some(notification) = rx.recv().await {
            self.handle(notification).await;
        }
        tracing::info!(source = %self.engine.source_sensor(), "Tracker stopped");
    }

    pub async fn handle(&mut self, notification: Notification) {
        let snapshot = match notification {
            Notification::ValueChanged { raw, at } => {
                self.engine.on_value_changed(raw.as_deref(), at)
            }
            Notification::BinaryChanged { raw, at } => {
                self.engine.on_binary_changed(raw.as_deref(), at)
            }
            Notification::HourBoundary(at) => {
                // every closed hour moves the backfill cut-off
                let outcome = self.engine.on_hour_boundary(at);
                if outcome.finalized.is_some() && outcome.anomaly.is_none() {
                    self.persist().await;
                }
                self.engine.snapshot(at)
            }
            Notification::MonthBoundary(at) => {
                if self.engine.on_month_boundary(at) {
                    self.persist().await;
                }
                self.engine.snapshot(at)
            }
        };
        self.publish(&snapshot).await;
    }

    /// Saves the current ranking. Failures are logged.
    pub async fn persist(&self) {
        let state = PersistedState::new(
            self.engine.source_sensor(),
            self.engine.ranked_maxima(),
            Utc::now(),
        )
        .with_last_finalized(
            self.engine
                .last_finalized()
                .map(|at| at.with_timezone(&Utc)),
        );
        match self.store.save(&state).await {
            Ok(()) => tracing::debug!(
                source = %self.engine.source_sensor(),
                "Saved max values: {:?}",
                state.max_values
            ),
            Err(e) => tracing::error!(
                source = %self.engine.source_sensor(),
                "Failed to save max values: {:?}",
                e
            ),
        }
    }

    async fn publish(&self, snapshot: &Snapshot) {
        let outputs = project_snapshot(
            self.engine.source_sensor(),
            self.engine.num_max_values(),
            snapshot,
        );
        if let Err(e) = self.publisher.publish(&outputs).await {
            tracing::error!(
                source = %self.engine.source_sensor(),
                "Failed to publish snapshot: {:?}",
                e
            );
        }
    }
}
