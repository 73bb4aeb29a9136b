//! Visual-analysis HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{VisionError, VisionResult};
use crate::types::{AnalyzeRequest, FrameAnalysis, HealthResponse};
use crate::VisualAnalysisProvider;

/// Configuration for the vision client.
#[derive(Debug, Clone)]
pub struct VisionClientConfig {
    /// Base URL of the vision service
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
}

impl Default for VisionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl VisionClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VISION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            timeout: Duration::from_secs(
                std::env::var("VISION_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("VISION_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Client for the visual-analysis service.
pub struct VisionClient {
    http: Client,
    config: VisionClientConfig,
}

impl VisionClient {
    /// Create a new vision client.
    pub fn new(config: VisionClientConfig) -> VisionResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(VisionError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> VisionResult<Self> {
        Self::new(VisionClientConfig::from_env())
    }

    pub fn config(&self) -> &VisionClientConfig {
        &self.config
    }

    /// Check if the vision service is healthy.
    pub async fn health_check(&self) -> VisionResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Vision service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Vision service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Analyze one JPEG frame.
    pub async fn analyze(&self, jpeg: &[u8], timestamp: f64) -> VisionResult<FrameAnalysis> {
        let url = format!("{}/analyze", self.config.base_url);
        let request = AnalyzeRequest {
            image: STANDARD.encode(jpeg),
            timestamp,
        };

        debug!(timestamp = timestamp, bytes = jpeg.len(), "Sending frame to {}", url);

        let url = url.as_str();
        let request = &request;
        self.with_retry(|| async move {
            let response = self
                .http
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.map_network_error(e))?;

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                let body = response.text().await.unwrap_or_default();
                return Err(VisionError::ServiceUnavailable(format!(
                    "vision service returned {}: {}",
                    status, body
                )));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(VisionError::RequestFailed(format!(
                    "vision service returned {}: {}",
                    status, body
                )));
            }

            let bytes = response.bytes().await.map_err(|e| self.map_network_error(e))?;
            serde_json::from_slice::<FrameAnalysis>(&bytes)
                .map_err(|e| VisionError::InvalidResponse(e.to_string()))
        })
        .await
    }

    fn map_network_error(&self, e: reqwest::Error) -> VisionError {
        if e.is_timeout() {
            VisionError::Timeout(self.config.timeout.as_secs())
        } else {
            VisionError::Network(e)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> VisionResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = VisionResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Vision request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl VisualAnalysisProvider for VisionClient {
    fn name(&self) -> &str {
        "vision"
    }

    async fn analyze_frame(&self, jpeg: &[u8], timestamp: f64) -> VisionResult<FrameAnalysis> {
        self.analyze(jpeg, timestamp).await
    }
}
