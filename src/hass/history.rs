//! Startup replay of today's completed hours from Home Assistant history.

use crate::hass::client::Client;
use crate::schedule::{hour_start, local_midnight, next_hour_boundary};
use crate::tracker::AggregationEngine;
use chrono::{DateTime, Local};

/// Replays every completed hour since local midnight into `engine`'s ranking.
///
/// Returns `true` when the ranking changed. Hours that ended before the
/// engine's last finalized hour were already offered and are skipped, as are
/// hours whose history cannot be fetched.
pub async fn backfill_from_midnight(
    client: &Client,
    engine: &mut AggregationEngine,
    now: DateTime<Local>,
) -> bool {
    let source = engine.source_sensor().to_string();
    let already_finalized = engine.last_finalized();
    let current_hour = hour_start(&now);
    let mut start = local_midnight(&now);
    let mut changed = false;
    let mut replayed = 0;

    tracing::info!(source = %source, from = %start, to = %current_hour, "Backfilling max values");

    while start < current_hour {
        let end = next_hour_boundary(&start);
        if already_finalized.is_some_and(|last| end <= last) {
            tracing::debug!(source = %source, hour_start = %start, "Hour already ranked, skipping");
            start = end;
            continue;
        }
        match client.history(&source, start, end).await {
            Ok(states) => {
                let readings = states
                    .iter()
                    .map(|s| (Some(s.state.as_str()), s.last_updated.with_timezone(&Local)));
                changed |= engine.replay_hour(start, end, readings).ranking_changed;
                replayed += 1;
            }
            Err(e) => tracing::error!(
                source = %source,
                hour_start = %start,
                "Failed to fetch history: {:?}",
                e
            ),
        }
        start = end;
    }

    tracing::info!(
        source = %source,
        hours = replayed,
        "Finished backfill, max values: {:?}",
        engine.ranked_maxima()
    );
    changed
}
