use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored circuit breaker record. `state` is 0 closed, 1 open, 2 half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breaker {
    #[serde(rename = "deviceID")]
    pub device_id: u64,
    pub state: u8,
    /// RFC 3339 timestamp.
    pub last_changed: String,
    pub errors_threshold: u32,
    pub errors_cnt_reset_timeout_ms: u64,
    pub reset_timeout_ms: u64,
}

/// Fields to set on a breaker. Unset fields take the server's defaults.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors_cnt_reset_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub errors_threshold: u32,
    pub errors_cnt_reset_timeout_ms: u64,
    pub reset_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigUpdated {
    #[serde(flatten)]
    pub breaker: Breaker,
    pub config: Thresholds,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResult {
    #[serde(rename = "deviceID")]
    pub device_id: u64,
    pub new_state: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerPage {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub circuit_breakers: Vec<Breaker>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct BreakerClient {
    client: Client,
    base_url: String,
    auth_key: String,
}

impl BreakerClient {
    pub fn new(base_url: &str, auth_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_key: auth_key.to_string(),
        }
    }

    /// Create or replace the breaker of `device_id`.
    pub async fn update_config(
        &self,
        device_id: u64,
        update: &ConfigUpdate,
    ) -> Result<ConfigUpdated, ClientError> {
        let resp = self
            .client
            .put(format!("{}/circuit-breaker/{}/config", self.base_url, device_id))
            .bearer_auth(&self.auth_key)
            .json(update)
            .send()
            .await?;
        decode(resp).await
    }

    /// Force the breaker of `device_id` back to closed.
    pub async fn reset(&self, device_id: u64) -> Result<ResetResult, ClientError> {
        let resp = self
            .client
            .post(format!("{}/circuit-breaker/{}/reset", self.base_url, device_id))
            .bearer_auth(&self.auth_key)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn status(&self, device_id: u64) -> Result<Breaker, ClientError> {
        let resp = self
            .client
            .get(format!("{}/circuit-breaker/{}/status", self.base_url, device_id))
            .bearer_auth(&self.auth_key)
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch one page; `None` leaves the server default in place.
    pub async fn list(
        &self,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Result<BreakerPage, ClientError> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page));
        }
        if let Some(page_size) = page_size {
            query.push(("pageSize", page_size));
        }

        let resp = self
            .client
            .get(format!("{}/circuit-breakers/", self.base_url))
            .bearer_auth(&self.auth_key)
            .query(&query)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        };
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(resp.json().await?)
}
