/// HTTP client abstraction for prediction endpoint tasks.
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the prediction route on the target server.
pub const PREDICT_PATH: &str = "/predict";

/// Raw outcome of a completed prediction request.
///
/// The response is never validated: any HTTP status, 5xx included, is a
/// completed request. Only transport failures surface as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// HTTP status code returned by the server
    pub status: u16,
    /// Response body length in bytes
    pub body_bytes: usize,
}

/// Trait for prediction endpoint tasks.
#[async_trait::async_trait]
pub trait PredictTask: Send + Sync {
    /// Send one prediction request and report the raw outcome.
    async fn send_request(&self) -> Result<PredictResponse, AppError>;

    /// Get the task name.
    fn task_name(&self) -> &str;
}

/// Enum wrapper for the concrete tasks.
pub enum PredictTaskEnum {
    EmptyPost(crate::http::tasks::empty_post::EmptyPostTask),
    Upload(crate::http::tasks::upload::UploadTask),
}

#[async_trait::async_trait]
impl PredictTask for PredictTaskEnum {
    async fn send_request(&self) -> Result<PredictResponse, AppError> {
        match self {
            PredictTaskEnum::EmptyPost(task) => task.send_request().await,
            PredictTaskEnum::Upload(task) => task.send_request().await,
        }
    }

    fn task_name(&self) -> &str {
        match self {
            PredictTaskEnum::EmptyPost(task) => task.task_name(),
            PredictTaskEnum::Upload(task) => task.task_name(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the target server
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Additional headers
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(60),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Full URL of the prediction route.
    pub fn predict_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), PREDICT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_url_joins_base() {
        let config = ClientConfig {
            base_url: "http://localhost:8080".into(),
            ..Default::default()
        };
        assert_eq!(config.predict_url(), "http://localhost:8080/predict");
    }

    #[test]
    fn predict_url_tolerates_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/".into(),
            ..Default::default()
        };
        assert_eq!(config.predict_url(), "http://localhost:8080/predict");
    }

    #[test]
    fn default_config_has_sane_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.headers.is_empty());
    }
}
