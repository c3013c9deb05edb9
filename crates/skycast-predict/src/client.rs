//! HTTP client for the prediction endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use skycast_core::config::ModelKind;
use skycast_core::error::{FetchError, ReqwestErrorExt};
use skycast_core::resilient::{send_with_retry, RetryPolicy};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = "skycast/0.1";

/// The four numeric inputs every prediction endpoint takes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PredictorInputs {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
}

/// Raw predictor response. `classification` and `alerts` are optional -
/// the view-model fills them in when the backend omits them.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorResponse {
    pub predicted_temperature: f64,
    pub predicted_rainfall: f64,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub alerts: Vec<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Per-model breakdown returned by the ensemble endpoint.
    #[serde(default)]
    pub breakdown: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ConditionResponse {
    condition: String,
}

fn endpoint_path(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Standard => "api/predict/",
        ModelKind::Lstm => "api/predict_lstm/",
        ModelKind::Ensemble => "api/predict_ensemble/",
    }
}

/// Prediction API client
#[derive(Debug, Clone)]
pub struct PredictorClient {
    base_url: Url,
    client: Arc<Client>,
    policy: RetryPolicy,
}

impl PredictorClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_policy(base_url, RetryPolicy::default())
    }

    pub fn with_policy(base_url: &str, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API base URL")?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
            policy,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::InvalidResponse(format!("invalid endpoint {path}: {e}")))
    }

    /// Run a prediction with the model selected by `kind`.
    pub async fn predict(
        &self,
        kind: ModelKind,
        inputs: &PredictorInputs,
        cancel: &CancellationToken,
    ) -> Result<PredictorResponse, FetchError> {
        let url = self.endpoint(endpoint_path(kind))?;
        tracing::debug!("Requesting {} prediction", kind);

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.post(url.clone()).json(inputs).send()
        })
        .await?;

        response.json().await.map_err(|e| e.into_fetch_error())
    }

    /// Ask the classifier for a condition label.
    pub async fn classify(
        &self,
        inputs: &PredictorInputs,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let url = self.endpoint("api/predict_condition/")?;

        let response = send_with_retry(&self.policy, cancel, || {
            self.client.post(url.clone()).json(inputs).send()
        })
        .await?;

        let body: ConditionResponse = response.json().await.map_err(|e| e.into_fetch_error())?;
        Ok(body.condition)
    }
}
