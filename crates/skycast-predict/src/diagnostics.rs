//! Read-only diagnostic endpoints: model metrics and backend status.
//!
//! Consumed for display only; failures here never block anything, so
//! these calls use no retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use skycast_core::error::{FetchError, ReqwestErrorExt};
use skycast_core::resilient::{send_with_retry, RetryPolicy};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "skycast/0.1";

/// Accuracy figures and optional per-feature importance maps.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub temperature_accuracy: Option<f64>,
    #[serde(default)]
    pub rainfall_accuracy: Option<f64>,
    /// Model name -> feature -> importance
    #[serde(default)]
    pub feature_importance: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Backend/model availability report.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    #[serde(default)]
    pub models_dir_exists: Option<bool>,
    #[serde(default)]
    pub models_in_dir: Vec<String>,
    #[serde(default)]
    pub cache_loaded: Option<bool>,
    #[serde(default)]
    pub cache_error: Option<String>,
    #[serde(default)]
    pub lstm_loaded: Option<bool>,
    #[serde(default)]
    pub lstm_error: Option<String>,
}

impl BackendStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online" || self.status == "healthy"
    }
}

/// Diagnostics client
#[derive(Debug, Clone)]
pub struct DiagnosticsClient {
    base_url: Url,
    client: Arc<Client>,
    policy: RetryPolicy,
}

impl DiagnosticsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API base URL")?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
            policy: RetryPolicy::none(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::InvalidResponse(format!("invalid endpoint {path}: {e}")))
    }

    pub async fn metrics(&self, cancel: &CancellationToken) -> Result<ModelMetrics, FetchError> {
        let url = self.endpoint("api/metrics/")?;

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.get(url.clone()).send()
        })
        .await?;

        response.json().await.map_err(|e| e.into_fetch_error())
    }

    pub async fn status(&self, cancel: &CancellationToken) -> Result<BackendStatus, FetchError> {
        let url = self.endpoint("api/status/")?;

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.get(url.clone()).send()
        })
        .await?;

        response.json().await.map_err(|e| e.into_fetch_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_deserialization() {
        let metrics: ModelMetrics = serde_json::from_value(serde_json::json!({
            "temperature_accuracy": 95.2,
            "rainfall_accuracy": 87.8,
            "feature_importance": {
                "temperature_model": {
                    "humidity": 0.31,
                    "wind_speed": 0.12
                }
            }
        }))
        .unwrap();

        assert_eq!(metrics.temperature_accuracy, Some(95.2));
        assert_eq!(
            metrics.feature_importance["temperature_model"]["humidity"],
            0.31
        );
    }

    #[test]
    fn test_metrics_tolerates_minimal_payload() {
        let metrics: ModelMetrics = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(metrics.temperature_accuracy.is_none());
        assert!(metrics.feature_importance.is_empty());
    }

    #[test]
    fn test_status_online() {
        let status: BackendStatus = serde_json::from_value(serde_json::json!({
            "status": "online",
            "models_in_dir": ["model_temp.pkl", "model_rain.pkl"],
            "cache_loaded": true,
            "lstm_loaded": false
        }))
        .unwrap();

        assert!(status.is_online());
        assert_eq!(status.models_in_dir.len(), 2);
    }

    #[test]
    fn test_status_offline() {
        let status: BackendStatus =
            serde_json::from_value(serde_json::json!({ "status": "degraded" })).unwrap();
        assert!(!status.is_online());
    }
}
