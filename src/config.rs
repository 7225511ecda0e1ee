use std::path::PathBuf;

use tracing::warn;
use url::Url;

use crate::api::ApiConfig;

pub const BASE_URL_VAR: &str = "ALEX_API_BASE_URL";
pub const TOKEN_VAR: &str = "ALEX_API_TOKEN";
pub const TOKEN_FILE_VAR: &str = "ALEX_TOKEN_FILE";
pub const DOWNLOAD_DIR_VAR: &str = "ALEX_DOWNLOAD_DIR";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    /// Save straight into this directory instead of asking with a dialog
    pub download_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(base_url) = lookup(BASE_URL_VAR) {
            match Url::parse(base_url.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    config.api.base_url = url.as_str().trim_end_matches('/').to_string();
                }
                Ok(url) => warn!("Ignoring {}: unsupported scheme {}", BASE_URL_VAR, url.scheme()),
                Err(e) => warn!("Ignoring {}={}: {}", BASE_URL_VAR, base_url, e),
            }
        }

        config.api.token_override = lookup(TOKEN_VAR);
        if let Some(path) = lookup(TOKEN_FILE_VAR) {
            config.api.token_file = Some(PathBuf::from(path));
        }
        config.download_dir = lookup(DOWNLOAD_DIR_VAR).map(PathBuf::from);

        config
    }
}
