use crate::metrics::{LatestPayload, Snapshot};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("backend has no data: {0}")]
    Backend(String),
}

/// Read side of the monitoring backend.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    /// Most recent reading.
    async fn latest(&self) -> Result<Snapshot, FetchError>;

    /// Up to `n` readings, oldest first, optionally for a single device.
    async fn history(&self, n: u32, device: Option<&str>) -> Result<Vec<Snapshot>, FetchError>;
}

pub struct HttpMonitorClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMonitorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = response.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        debug!(url = %url, bytes = body.len(), "Fetched");
        serde_json::from_str(&body).map_err(|source| FetchError::Malformed { url, source })
    }
}

#[async_trait]
impl MonitorApi for HttpMonitorClient {
    async fn latest(&self) -> Result<Snapshot, FetchError> {
        let payload: LatestPayload = self.get_json("/api/latest", &[]).await?;
        match payload.error {
            Some(error) => {
                let detail = match payload.path {
                    Some(path) => format!("{} ({})", error, path),
                    None => error,
                };
                Err(FetchError::Backend(detail))
            }
            None => Ok(payload.snapshot),
        }
    }

    async fn history(&self, n: u32, device: Option<&str>) -> Result<Vec<Snapshot>, FetchError> {
        let mut query = vec![("n", n.to_string())];
        if let Some(device) = device {
            query.push(("device", device.to_string()));
        }
        let series: Option<Vec<Snapshot>> = self.get_json("/api/history", &query).await?;
        Ok(series.unwrap_or_default())
    }
}
