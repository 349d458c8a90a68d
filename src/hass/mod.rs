//! Home Assistant collaborator: REST client, state cache, entity watcher and
//! history backfill.

pub mod client;
pub mod history;
pub mod state;
pub mod watcher;

pub use client::Client;
pub use history::backfill_from_midnight;
pub use state::StateCache;
pub use watcher::EntityWatcher;

use crate::error::{ConfigError, Result};

const POWER_DEVICE_CLASS: &str = "power";

/// Checks that `source_sensor` reports power.
///
/// Fails only when Home Assistant positively reports another device class;
/// an unreachable server or a missing attribute is logged and accepted.
pub async fn check_power_source(client: &Client, source_sensor: &str) -> Result<()> {
    match client.get_state(source_sensor).await {
        Ok(Some(state)) => match state.device_class() {
            Some(POWER_DEVICE_CLASS) => Ok(()),
            Some(other) => Err(ConfigError::invalid(
                "source_sensor",
                format!(
                    "'{}' has device_class '{}', expected '{}'",
                    source_sensor, other, POWER_DEVICE_CLASS
                ),
            )
            .into()),
            None => {
                tracing::warn!(source = %source_sensor, "Source sensor has no device_class");
                Ok(())
            }
        },
        Ok(None) => {
            tracing::warn!(source = %source_sensor, "Source sensor not found in Home Assistant");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                source = %source_sensor,
                "Could not verify source sensor: {:?}",
                e
            );
            Ok(())
        }
    }
}
