//! HTTP client for the attendance API.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::types::{AttendanceRecord, ManualClockOut};
use super::AttendanceStore;
use crate::error::{DataError, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Responses arrive wrapped in a `{ "data": ... }` envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Attendance store backed by the HR backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpAttendanceStore {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpAttendanceStore {
    /// Build a client against `base_url`, attaching `access_token` as a
    /// bearer header when present.
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, StoreError> {
        // A base URL without a trailing slash would swallow its last path
        // segment on join().
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| StoreError::BaseUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            access_token,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| StoreError::BaseUrl(e.to_string()))?;
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Fire a command endpoint, caring only about success.
    async fn command(&self, method: Method, path: &str) -> Result<(), StoreError> {
        debug!(%path, "issuing attendance command");
        self.send(self.request(method, path)?).await?;
        Ok(())
    }
}

impl AttendanceStore for HttpAttendanceStore {
    async fn clock_in(&self) -> Result<(), StoreError> {
        self.command(Method::POST, "attendance/create").await
    }

    async fn clock_out(&self) -> Result<(), StoreError> {
        self.command(Method::POST, "attendance/clock-out").await
    }

    async fn take_break(&self) -> Result<(), StoreError> {
        self.command(Method::GET, "attendance/take-a-break").await
    }

    async fn resume_work(&self) -> Result<(), StoreError> {
        self.command(Method::GET, "attendance/resume-work").await
    }

    async fn fetch_attendance(&self) -> Result<Option<AttendanceRecord>, StoreError> {
        let response = self
            .send(self.request(Method::GET, "attendance/get-individual-attendance")?)
            .await?;
        let body = response.text().await?;
        let envelope: Envelope<AttendanceRecord> =
            serde_json::from_str(&body).map_err(|e| DataError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn manual_clock_out(&self, correction: &ManualClockOut) -> Result<(), StoreError> {
        debug!("submitting manual clock-out correction");
        self.send(
            self.request(Method::POST, "attendance/manual-clockout")?
                .json(correction),
        )
        .await?;
        Ok(())
    }
}
