/// Empty-POST task implementation.
use crate::error::AppError;
use crate::http::client::{ClientConfig, PredictResponse, PredictTask};
use reqwest::Client;

/// Sends a bare `POST /predict` with no body on every iteration.
pub struct EmptyPostTask {
    client: Client,
    config: ClientConfig,
}

impl EmptyPostTask {
    /// Create a new empty-POST task.
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl PredictTask for EmptyPostTask {
    async fn send_request(&self) -> Result<PredictResponse, AppError> {
        if self.config.base_url.is_empty() {
            return Err(AppError::Config(
                "Empty-post task requires a base URL. Specify one with --base-url.".to_string(),
            ));
        }

        // No body, no Content-Type: Content-Length is 0 and only the
        // configured extra headers go on the wire.
        let mut req = self.client.post(self.config.predict_url());

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| AppError::Http(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read response body: {}", e)))?;

        Ok(PredictResponse {
            status,
            body_bytes: body.len(),
        })
    }

    fn task_name(&self) -> &str {
        "empty-post"
    }
}
