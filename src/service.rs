//! Ingestion service client.
//!
//! The bridge forwards two record kinds:
//!
//! - `POST /put-repeater` with a [`RepeaterUpload`]
//! - `POST /put-sample` with a [`SampleUpload`]
//!
//! Maintenance endpoints (`/consolidate`, `/clean-up?op=repeaters`) are
//! triggered by `wardrive maintain`. Every request is bounded by the
//! configured timeout; failures are reported to the caller and never retried.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use tokio::time::timeout;

use crate::config::ServiceConfig;
use crate::error::UploadError;

pub const PUT_REPEATER_PATH: &str = "/put-repeater";
pub const PUT_SAMPLE_PATH: &str = "/put-sample";
pub const CONSOLIDATE_PATH: &str = "/consolidate";
pub const CLEAN_UP_PATH: &str = "/clean-up";

/// Repeater location learned from an advert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeaterUpload {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Always empty for repeaters.
    pub path: Vec<String>,
}

/// Coverage sample: a position heard via `path[0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleUpload {
    pub lat: f64,
    pub lon: f64,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadRecord {
    Repeater(RepeaterUpload),
    Sample(SampleUpload),
}

impl UploadRecord {
    pub fn repeater(id: String, name: String, lat: f64, lon: f64) -> Self {
        UploadRecord::Repeater(RepeaterUpload {
            id,
            name,
            lat,
            lon,
            path: Vec::new(),
        })
    }

    pub fn sample(lat: f64, lon: f64, hop: String) -> Self {
        UploadRecord::Sample(SampleUpload {
            lat,
            lon,
            path: vec![hop],
        })
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            UploadRecord::Repeater(_) => PUT_REPEATER_PATH,
            UploadRecord::Sample(_) => PUT_SAMPLE_PATH,
        }
    }

    /// JSON body as sent to the service.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            UploadRecord::Repeater(r) => serde_json::to_value(r),
            UploadRecord::Sample(s) => serde_json::to_value(s),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Destination for upload records.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, record: &UploadRecord) -> Result<(), UploadError>;
}

/// HTTP client for the ingestion service.
pub struct ServiceClient {
    base_url: String,
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, UploadError> {
        let timeout_duration = Duration::from_secs(self.timeout_seconds);
        let response = timeout(timeout_duration, request.send())
            .await
            .map_err(|_| UploadError::Timeout(self.timeout_seconds))??;

        if !response.status().is_success() {
            return Err(UploadError::Status(response.status()));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, UploadError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;
        let timeout_duration = Duration::from_secs(self.timeout_seconds);
        let body = timeout(timeout_duration, response.json::<serde_json::Value>())
            .await
            .map_err(|_| UploadError::Timeout(self.timeout_seconds))??;
        Ok(body)
    }

    /// Ask the service to merge recent samples into coverage.
    pub async fn consolidate(&self) -> Result<serde_json::Value, UploadError> {
        self.get_json(CONSOLIDATE_PATH).await
    }

    /// Ask the service to run a clean-up pass, e.g. `op = "repeaters"`.
    pub async fn clean_up(&self, op: &str) -> Result<serde_json::Value, UploadError> {
        self.get_json(&format!("{}?op={}", CLEAN_UP_PATH, op)).await
    }
}

#[async_trait]
impl Uploader for ServiceClient {
    async fn upload(&self, record: &UploadRecord) -> Result<(), UploadError> {
        let url = self.url(record.endpoint());
        let request = match record {
            UploadRecord::Repeater(r) => self.client.post(&url).json(r),
            UploadRecord::Sample(s) => self.client.post(&url).json(s),
        };
        let response = self.send(request).await?;
        debug!("POST {} -> {}", url, response.status());
        Ok(())
    }
}
