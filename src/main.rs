//! Power Max Tracker
//!
//! Follows a Home Assistant power sensor, integrates its readings into hourly
//! average power and keeps the highest hourly averages seen so far (e.g. for
//! capacity-based grid tariffs). Results are written to InfluxDB2.
//!
//! # Architecture
//!
//! One tracker task owns the aggregation engine and handles notifications one
//! at a time. Producers feed it through a bounded channel:
//! - **Entity watcher**: polls the source (and optional gate) entity
//! - **Hour boundary scheduler**: closes every wall-clock hour
//! - **Month boundary scheduler**: optional monthly reset of the maxima
//!
//! # Features
//!
//! - Max values survive restarts (JSON state file, atomic replace)
//! - Optional replay of today's hours from Home Assistant history
//! - Graceful shutdown on SIGTERM/SIGINT
//! - Timeout protection for the final drain

mod config;
mod error;
mod hass;
mod influxdb;
mod model;
mod runtime;
mod schedule;
mod store;
mod tracker;

#[cfg(test)]
mod test_utils;

use crate::model::SnapshotPublisher;
use crate::runtime::{Notification, Tracker};
use crate::store::{FileStateStore, StateStore};
use crate::tracker::AggregationEngine;
use chrono::Local;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Duration};

const CHANNEL_CAPACITY: usize = 64;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application entry point.
///
/// Loads configuration, restores the max values, wires the producers to the
/// tracker task and waits for a termination signal.
#[tokio::main]
async fn main() {
    let app_config = config::load_app_config().expect("Failed to load AppConfig");
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .init();

    let tracker_config = config::load_tracker_config().expect("Failed to load TrackerConfig");
    let hass_config = config::load_hass_config().expect("Failed to load HassConfig");
    let hass_client = Arc::new(
        hass::Client::new(hass_config.clone()).expect("Failed to create Home Assistant client"),
    );

    hass::check_power_source(&hass_client, &tracker_config.source_sensor)
        .await
        .expect("Source sensor must be a power sensor");

    let publisher = create_publisher();
    let store: Arc<dyn StateStore> =
        Arc::new(FileStateStore::new(tracker_config.state_path.clone()));
    let restored = store::load_restored(store.as_ref(), &tracker_config.source_sensor).await;

    let cache = hass::StateCache::new();
    let engine =
        AggregationEngine::new(&tracker_config, Arc::new(cache.clone()), restored.max_values)
            .expect("Failed to create AggregationEngine")
            .with_last_finalized(restored.last_finalized.map(|at| at.with_timezone(&Local)));
    let mut tracker = Tracker::new(engine, store, publisher);

    if tracker_config.backfill_from_midnight {
        if let Some(binary_sensor) = &tracker_config.binary_sensor {
            prime_state(&hass_client, &cache, binary_sensor).await;
        }
        if hass::backfill_from_midnight(&hass_client, tracker.engine_mut(), Local::now()).await {
            tracker.persist().await;
        }
    }

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    // opens the first hour window, closed at the next wall-clock hour
    tx.send(Notification::HourBoundary(Local::now()))
        .await
        .expect("Failed to start tracking");
    let mut tracker_task = tokio::spawn(tracker.run(rx));

    let watcher = hass::EntityWatcher::new(
        Arc::clone(&hass_client),
        cache,
        &tracker_config.source_sensor,
        tracker_config.binary_sensor.as_deref(),
        Duration::from_secs(hass_config.poll_interval_sec),
    );
    let mut producers = JoinSet::new();
    producers.spawn(watcher.run(tx.clone()));
    producers.spawn(schedule::run_hour_boundaries(tx.clone()));
    producers.spawn(schedule::run_month_boundaries(tx));

    let mut sig_term = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    tracing::info!("Running... Press Ctrl-C or send SIGTERM to terminate.");
    let tracker_finished = loop {
        tokio::select! {
            // Handle SIGTERM for graceful shutdown in containers
            _ = sig_term.recv() => {
                tracing::info!("Received SIGTERM. Exiting...");
                break false;
            }
            // Handle Ctrl-C for manual termination
            _ = ctrl_c() => {
                tracing::info!("Received SIGINT. Exiting...");
                break false;
            }
            Some(result) = producers.join_next() => {
                handle_task_result("producer", result);
            }
            result = &mut tracker_task => {
                handle_task_result("tracker", result);
                break true;
            }
        }
    };

    // dropping the last sender lets the tracker drain and stop
    producers.abort_all();
    while producers.join_next().await.is_some() {}
    if !tracker_finished {
        with_timeout("tracker", tracker_task, SHUTDOWN_TIMEOUT).await;
    }
    tracing::info!("Stopped.");
}

/// Chooses InfluxDB when it is configured, the log otherwise.
fn create_publisher() -> Arc<dyn SnapshotPublisher> {
    match config::load_influx_config() {
        Ok(influx_config) => {
            tracing::info!("Publishing to InfluxDB at {}", influx_config.url);
            Arc::new(influxdb::InfluxPublisher::new(influxdb::Client::new(
                influx_config,
            )))
        }
        Err(e) => {
            tracing::warn!("InfluxDB is not configured, publishing to the log only: {}", e);
            Arc::new(influxdb::LogPublisher)
        }
    }
}

/// Loads the current state of `entity_id` into the cache before the watcher runs.
async fn prime_state(client: &hass::Client, cache: &hass::StateCache, entity_id: &str) {
    match client.get_state(entity_id).await {
        Ok(state) => cache.set(entity_id, state.map(|s| s.state)),
        Err(e) => tracing::warn!(entity_id = %entity_id, "Failed to get state: {:?}", e),
    }
}

/// Wraps a future with a timeout so shutdown cannot hang.
///
/// Logs an error if the task times out but doesn't propagate the error.
async fn with_timeout<F>(task_name: &'static str, future: F, timeout: Duration)
where
    F: IntoFuture,
{
    match time::timeout(timeout, future).await {
        Ok(_) => {}
        Err(_) => tracing::error!("Task {} timed out.", task_name),
    }
}

/// Logs the result of a finished tokio task.
fn handle_task_result(task_name: &str, result: Result<(), JoinError>) {
    match result {
        Ok(_) => {
            tracing::debug!("Task {} completed.", task_name);
        }
        Err(e) => {
            tracing::error!("Task {} failed: {:?}", task_name, e);
        }
    }
}
