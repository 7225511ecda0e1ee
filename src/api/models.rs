use serde::Deserialize;
use serde_json::Value;

/// Error body the service sends with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// `detail` as display text; structured details are rendered as JSON.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Token that takes precedence over the stored one
    pub token_override: Option<String>,
    pub token_file: Option<std::path::PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/downloader".to_string(),
            token_override: None,
            token_file: dirs::config_dir().map(|dir| dir.join("alex-downloader").join("token")),
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
