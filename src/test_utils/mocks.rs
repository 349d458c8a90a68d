//! In-memory collaborators and mock servers for testing.

use crate::error::StorageError;
use crate::model::{OutputValue, SnapshotPublisher};
use crate::store::{PersistedState, StateStore};
use crate::tracker::StateLookup;
use async_trait::async_trait;
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock as WireMock, MockServer, ResponseTemplate};

/// Entity states set directly by the test.
#[derive(Debug, Default)]
pub struct StaticStates {
    states: Mutex<HashMap<String, String>>,
}

impl StaticStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, entity_id: &str, state: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), state.to_string());
    }

    pub fn remove(&self, entity_id: &str) {
        self.states.lock().unwrap().remove(entity_id);
    }
}

impl StateLookup for StaticStates {
    fn state_of(&self, entity_id: &str) -> Option<String> {
        self.states.lock().unwrap().get(entity_id).cloned()
    }
}

/// State store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PersistedState>>,
    saves: AtomicUsize,
    fail: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// A store whose every operation fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<PersistedState> {
        self.state.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn failure() -> StorageError {
        StorageError::io(
            "memory",
            std::io::Error::new(std::io::ErrorKind::Other, "store failure"),
        )
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        if self.fail {
            return Err(Self::failure());
        }
        Ok(self.saved())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if self.fail {
            return Err(Self::failure());
        }
        *self.state.lock().unwrap() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Publisher that records every batch.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<OutputValue>>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher that records nothing and always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<OutputValue>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Vec<OutputValue>> {
        self.batches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SnapshotPublisher for RecordingPublisher {
    async fn publish(&self, outputs: &[OutputValue]) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::InvalidDataPoint("publisher failure".to_string()));
        }
        self.batches.lock().unwrap().push(outputs.to_vec());
        Ok(())
    }
}

/// Builder for mockito server mocks of the Home Assistant REST API.
pub struct MockHassServerBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockHassServerBuilder {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Adds a mock for `GET /api/states/<entity_id>`.
    pub async fn mock_state(
        mut self,
        entity_id: &str,
        state: &str,
        last_updated: &str,
        attributes: serde_json::Value,
    ) -> Self {
        let body = responses::entity_state(entity_id, state, last_updated, attributes);
        let mock = self
            .server
            .mock("GET", format!("/api/states/{}", entity_id).as_str())
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Adds a mock answering `404` for an unknown entity.
    pub async fn mock_missing(mut self, entity_id: &str) -> Self {
        let mock = self
            .server
            .mock("GET", format!("/api/states/{}", entity_id).as_str())
            .with_status(404)
            .with_body(r#"{"message":"Entity not found."}"#)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Adds a mock for one history window of `entity_id`.
    pub async fn mock_history(
        mut self,
        entity_id: &str,
        start: &str,
        end: &str,
        states: Vec<serde_json::Value>,
    ) -> Self {
        let body = serde_json::Value::Array(vec![serde_json::Value::Array(states)]);
        let mock = self
            .server
            .mock("GET", format!("/api/history/period/{}", start).as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter_entity_id".into(), entity_id.into()),
                Matcher::UrlEncoded("end_time".into(), end.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Adds a mock for an error response.
    pub async fn mock_error(mut self, path: &str, status: u16, body: &str) -> Self {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(status as usize)
            .with_body(body)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    pub fn build(self) -> ServerGuard {
        self.server
    }
}

/// Builder for creating wiremock server mocks for InfluxDB endpoints.
pub struct MockInfluxServerBuilder {
    server: MockServer,
}

impl MockInfluxServerBuilder {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Mocks successful writes, expected exactly `times` times.
    pub async fn mock_write_success(self, times: u64) -> Self {
        WireMock::given(method("POST"))
            .and(path("/api/v2/write"))
            .respond_with(ResponseTemplate::new(204))
            .expect(times)
            .mount(&self.server)
            .await;
        self
    }

    /// Mocks a write error response.
    pub async fn mock_write_error(self, status: u16, message: &str) -> Self {
        WireMock::given(method("POST"))
            .and(path("/api/v2/write"))
            .respond_with(ResponseTemplate::new(status).set_body_string(message))
            .mount(&self.server)
            .await;
        self
    }

    pub fn build(self) -> MockServer {
        self.server
    }
}

/// Response bodies of the Home Assistant API.
pub mod responses {
    use serde_json::{json, Value};

    /// A state object as returned by `/api/states/<entity_id>`.
    pub fn entity_state(entity_id: &str, state: &str, last_updated: &str, attributes: Value) -> Value {
        json!({
            "entity_id": entity_id,
            "state": state,
            "attributes": attributes,
            "last_changed": last_updated,
            "last_updated": last_updated,
        })
    }

    /// Attributes of a power sensor.
    pub fn power_attributes() -> Value {
        json!({
            "device_class": "power",
            "unit_of_measurement": "W",
            "state_class": "measurement",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_states() {
        let states = StaticStates::new();
        states.set("binary_sensor.a", "on");
        assert_eq!(states.state_of("binary_sensor.a").as_deref(), Some("on"));
        states.remove("binary_sensor.a");
        assert_eq!(states.state_of("binary_sensor.a"), None);
    }

    #[tokio::test]
    async fn test_memory_store_counts_saves() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        let state = PersistedState::new("sensor.a", &[1.0], chrono::Utc::now());
        store.save(&state).await.unwrap();

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().await.unwrap(), Some(state));
    }
}
