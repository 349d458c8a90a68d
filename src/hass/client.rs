use crate::config::HassConfig;
use crate::error::HassError;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use reqwest::{Client as HttpClient, StatusCode};
use serde_derive::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// State object of a Home Assistant entity.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn device_class(&self) -> Option<&str> {
        self.attributes.get("device_class").and_then(|v| v.as_str())
    }
}

fn to_api_time(at: DateTime<Local>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct Client {
    http_client: HttpClient,
    config: HassConfig,
}

impl Client {
    pub fn new(config: HassConfig) -> Result<Self, HassError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Option<String>, HassError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .bearer_auth(&self.config.token)
            .header("content-type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(HassError::server_error(status, body));
        }
        Ok(Some(body))
    }

    /// Current state of `entity_id`, `None` when Home Assistant does not know it.
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HassError> {
        let url = self.url(&format!("/api/states/{}", entity_id));
        match self.get(&url, &[]).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| HassError::decode(entity_id, e)),
            None => Ok(None),
        }
    }

    /// Recorded states of `entity_id` between `start` and `end`, oldest first.
    ///
    /// The first entry is the state in effect at `start`.
    pub async fn history(
        &self,
        entity_id: &str,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Vec<EntityState>, HassError> {
        let url = self.url(&format!("/api/history/period/{}", to_api_time(start)));
        let end_time = to_api_time(end);
        let query = [("filter_entity_id", entity_id), ("end_time", end_time.as_str())];

        let body = match self.get(&url, &query).await? {
            Some(body) => body,
            None => return Ok(vec![]),
        };
        let series: Vec<Vec<EntityState>> =
            serde_json::from_str(&body).map_err(|e| HassError::decode(entity_id, e))?;

        Ok(series
            .into_iter()
            .flatten()
            .filter(|state| state.entity_id == entity_id)
            .collect())
    }
}
