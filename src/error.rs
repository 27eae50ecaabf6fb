/// Error types for the predbench crate.
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_variants_construct() {
        let _ = AppError::Http("connection refused".into());
        let _ = AppError::Config("bad wait interval".into());
        let _ = AppError::Io(std::io::Error::other("disk gone"));
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let _ = AppError::Json(json_err);
    }

    #[test]
    fn io_errors_convert_via_from() {
        fn read_missing() -> Result<String, AppError> {
            let content = std::fs::read_to_string("/nonexistent/predbench-file")?;
            Ok(content)
        }

        let err = read_missing().unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
