//! Polls Home Assistant entities and turns state changes into notifications.

use crate::hass::client::Client;
use crate::hass::state::StateCache;
use crate::runtime::Notification;
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendError};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    Source,
    Binary,
}

/// Last observation of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Observed {
    Updated(DateTime<Utc>),
    Absent,
}

pub struct EntityWatcher {
    client: Arc<Client>,
    cache: StateCache,
    // polled in order: the binary sensor first so the gate is current
    // when the source value is handled
    entities: Vec<(EntityRole, String)>,
    poll_interval: Duration,
    last_seen: HashMap<String, Observed>,
}

impl EntityWatcher {
    pub fn new(
        client: Arc<Client>,
        cache: StateCache,
        source_sensor: &str,
        binary_sensor: Option<&str>,
        poll_interval: Duration,
    ) -> Self {
        let mut entities = Vec::with_capacity(2);
        if let Some(binary_sensor) = binary_sensor {
            entities.push((EntityRole::Binary, binary_sensor.to_string()));
        }
        entities.push((EntityRole::Source, source_sensor.to_string()));

        Self {
            client,
            cache,
            entities,
            poll_interval,
            last_seen: HashMap::new(),
        }
    }

    /// Polls until the notification channel is closed.
    pub async fn run(mut self, tx: mpsc::Sender<Notification>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.poll(&tx).await.is_err() {
                tracing::info!("Notification channel closed, watcher stopping");
                return;
            }
        }
    }

    /// Polls every watched entity once. Returns the number of notifications sent.
    ///
    /// Request failures are logged and the entity is retried on the next poll.
    pub async fn poll(
        &mut self,
        tx: &mpsc::Sender<Notification>,
    ) -> Result<usize, SendError<Notification>> {
        let mut sent = 0;

        for (role, entity_id) in &self.entities {
            let (observed, raw) = match self.client.get_state(entity_id).await {
                Ok(Some(state)) => (Observed::Updated(state.last_updated), Some(state.state)),
                Ok(None) => (Observed::Absent, None),
                Err(e) => {
                    tracing::error!(entity_id = %entity_id, "Failed to get state: {:?}", e);
                    continue;
                }
            };

            if self.last_seen.get(entity_id) == Some(&observed) {
                continue;
            }
            if observed == Observed::Absent {
                tracing::warn!(entity_id = %entity_id, "Entity not found in Home Assistant");
            }

            self.last_seen.insert(entity_id.clone(), observed);
            self.cache.set(entity_id, raw.clone());

            let at = Local::now();
            let notification = match role {
                EntityRole::Source => Notification::ValueChanged { raw, at },
                EntityRole::Binary => Notification::BinaryChanged { raw, at },
            };
            tracing::debug!(entity_id = %entity_id, "{:?}", notification);
            tx.send(notification).await?;
            sent += 1;
        }

        Ok(sent)
    }
}
