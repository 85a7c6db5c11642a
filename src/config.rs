use crate::error::WorkflowError;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_BACKEND_URL: &str = "PII_BACKEND_URL";
pub const ENV_TIMEOUT_SECS: &str = "PII_BACKEND_TIMEOUT_SECS";

/// Where the redaction service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Load `.env` from the working directory if present. Missing file is fine.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

impl BackendConfig {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, WorkflowError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(WorkflowError::Config("backend URL is empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(WorkflowError::Config(format!(
                "backend URL must start with http:// or https:// (got '{}')",
                base_url
            )));
        }
        if timeout_secs == 0 {
            return Err(WorkflowError::Config("timeout must be at least 1 second".to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_service() {
        let cfg = BackendConfig::default();
        assert_eq!(cfg.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.timeout, Duration::from_secs(120));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let cfg = BackendConfig::new("http://pii.local:8080/", 5).unwrap();
        assert_eq!(cfg.endpoint("upload"), "http://pii.local:8080/upload");
        assert_eq!(cfg.endpoint("/mask"), "http://pii.local:8080/mask");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(BackendConfig::new("", 5), Err(WorkflowError::Config(_))));
        assert!(matches!(BackendConfig::new("ftp://x", 5), Err(WorkflowError::Config(_))));
        assert!(matches!(
            BackendConfig::new("http://x", 0),
            Err(WorkflowError::Config(_))
        ));
    }
}
