//! REST client for the appliance. Thin typed wrappers over reqwest, with
//! errors split into the two kinds the console treats differently.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::types::{
    BackupCreated, DeviceStatus, HealthSample, LogEntry, UpdateAvailability, UpdateProgress,
};

/// Transport: the request never completed (refused, reset, timed out).
/// Device: the request completed and the appliance answered with an error.
/// Only the latter is a user-facing failure; transport failures during
/// polling mean "offline" or, mid-update, "restarting".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("device unreachable: {0}")]
    Transport(String),
    #[error("device error ({status}): {message}")]
    Device { status: u16, message: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

// The event loop awaits poll requests inline, so they get a short
// per-request timeout; the default only covers the slow maintenance
// calls (backup download, restore upload).
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DeviceClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl DeviceClient {
    pub fn new(base_url: &str, token: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path)
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let resp = Self::check(resp).await?;
        resp.json::<T>().await.map_err(ApiError::from)
    }

    // Non-2xx becomes a Device error carrying whatever body the appliance sent
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .text()
            .await
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ApiError::Device {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(resp).await
    }

    // Same as get_json but bounded by POLL_TIMEOUT
    async fn poll_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(self.url(path))
            .timeout(POLL_TIMEOUT)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(resp).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::check(resp).await.map(|_| ())
    }

    /// Polled every 5s.
    pub async fn status(&self) -> Result<DeviceStatus, ApiError> {
        self.poll_json("health/status").await
    }

    /// Called once per session to seed the history store.
    pub async fn health_history(&self) -> Result<Vec<HealthSample>, ApiError> {
        self.get_json("health/history").await
    }

    /// Polled every 30s.
    pub async fn logs(&self, limit: usize) -> Result<Vec<LogEntry>, ApiError> {
        self.poll_json(&format!("logs?limit={limit}")).await
    }

    pub async fn create_backup(&self) -> Result<BackupCreated, ApiError> {
        let resp = self
            .http
            .post(self.url("backup"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(resp).await
    }

    /// Fetch the named backup artifact as an opaque blob.
    pub async fn download_backup(&self, name: &str) -> Result<Vec<u8>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("backup/{name}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        Ok(bytes.to_vec())
    }

    /// Upload a database file for restore. The caller has already validated
    /// the `.db` suffix; the body is sent as-is.
    pub async fn restore(&self, file_name: &str, data: Vec<u8>) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(self.url("restore"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::check(resp).await.map(|_| ())
    }

    pub async fn reboot(&self) -> Result<(), ApiError> {
        self.post_empty("reboot").await
    }

    pub async fn factory_reset(&self) -> Result<BackupCreated, ApiError> {
        let resp = self
            .http
            .post(self.url("factory-reset"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::parse(resp).await
    }

    pub async fn check_updates(&self) -> Result<UpdateAvailability, ApiError> {
        self.get_json("update/check").await
    }

    pub async fn apply_update(&self) -> Result<(), ApiError> {
        self.post_empty("update/apply").await
    }

    /// Polled at 1.5s while an update run is in flight.
    pub async fn update_status(&self) -> Result<UpdateProgress, ApiError> {
        self.poll_json("update/status").await
    }
}
