use std::path::PathBuf;

use tracing::debug;

/// Read-only view of the bearer token the login flow stores under `token`.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    token_override: Option<String>,
    token_file: Option<PathBuf>,
}

impl CredentialStore {
    pub fn new(token_override: Option<String>, token_file: Option<PathBuf>) -> Self {
        Self {
            token_override,
            token_file,
        }
    }

    /// Current token, re-read on every call. A missing or blank token means an
    /// anonymous request.
    pub async fn bearer_token(&self) -> Option<String> {
        if let Some(token) = self.token_override.as_deref().map(str::trim) {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }

        let path = self.token_file.as_ref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                debug!("No stored token at {}: {}", path.display(), e);
                None
            }
        }
    }
}
