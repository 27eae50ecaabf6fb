/// File-upload task implementation.
use crate::error::AppError;
use crate::http::client::{ClientConfig, PredictResponse, PredictTask};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::PathBuf;

/// Default image uploaded when no file is configured.
pub const DEFAULT_UPLOAD_FILE: &str = "input.jpg";

/// Uploads a local image to `POST /predict` as multipart form data on every
/// iteration. The file is re-read per iteration, so the handle is opened and
/// released inside the iteration and concurrent users never share one.
pub struct UploadTask {
    client: Client,
    config: ClientConfig,
    file_path: PathBuf,
}

impl UploadTask {
    /// Create a new upload task for the given file path.
    pub fn new(config: ClientConfig, file_path: PathBuf) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            file_path,
        })
    }

    fn part_file_name(&self) -> String {
        self.file_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_UPLOAD_FILE)
            .to_string()
    }
}

#[async_trait::async_trait]
impl PredictTask for UploadTask {
    async fn send_request(&self) -> Result<PredictResponse, AppError> {
        if self.config.base_url.is_empty() {
            return Err(AppError::Config(
                "Upload task requires a base URL. Specify one with --base-url.".to_string(),
            ));
        }

        // A failed read aborts this iteration before anything hits the wire;
        // the next iteration attempts the read again.
        let bytes = tokio::fs::read(&self.file_path).await.map_err(AppError::Io)?;

        // One file part named "file", no other form fields.
        let part = Part::bytes(bytes).file_name(self.part_file_name());
        let form = Form::new().part("file", part);

        let mut req = self.client.post(self.config.predict_url());

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req
            .multipart(form)
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
        "upload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig {
            base_url: server.base_url(),
            timeout: Duration::from_secs(15),
            headers: Vec::new(),
        }
    }

    fn image_fixture(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(content).expect("write fixture");
        file.flush().expect("flush fixture");
        file
    }

    #[tokio::test]
    async fn uploads_file_as_single_multipart_part() {
        let server = MockServer::start_async().await;
        let image = image_fixture(b"fake jpeg bytes for upload");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/predict")
                    .body_contains("name=\"file\"")
                    .body_contains("fake jpeg bytes for upload");
                then.status(200).body("ok");
            })
            .await;

        let task =
            UploadTask::new(config_for(&server), image.path().to_path_buf()).expect("task init");
        let response = task.send_request().await.expect("request should succeed");

        assert_eq!(response.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn part_filename_is_file_basename() {
        let server = MockServer::start_async().await;
        let image = image_fixture(b"pixels");
        let basename = image
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();

        let mock = server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/predict")
                    .body_contains(format!("filename=\"{}\"", basename));
                then.status(200);
            })
            .await;

        let task =
            UploadTask::new(config_for(&server), image.path().to_path_buf()).expect("task init");
        task.send_request().await.expect("request should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_request() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/predict");
                then.status(200);
            })
            .await;

        let task = UploadTask::new(
            config_for(&server),
            PathBuf::from("/nonexistent/input.jpg"),
        )
        .expect("task init");

        let result = task.send_request().await;
        assert!(matches!(result, Err(AppError::Io(_))));
        assert_eq!(mock.hits_async().await, 0, "nothing must reach the wire");
    }

    #[tokio::test]
    async fn rereads_file_content_each_iteration() {
        let server = MockServer::start_async().await;
        let image = image_fixture(b"first version");

        let first = server
            .mock_async(|when, then| {
                when.method(POST).path("/predict").body_contains("first version");
                then.status(200);
            })
            .await;

        let task =
            UploadTask::new(config_for(&server), image.path().to_path_buf()).expect("task init");
        task.send_request().await.expect("first upload");
        assert_eq!(first.hits_async().await, 1);

        std::fs::write(image.path(), b"second version").expect("rewrite fixture");

        let second = server
            .mock_async(|when, then| {
                when.method(POST).path("/predict").body_contains("second version");
                then.status(200);
            })
            .await;

        task.send_request().await.expect("second upload");
        assert_eq!(second.hits_async().await, 1);
    }
}
