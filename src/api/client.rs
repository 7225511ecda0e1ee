use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::debug;

use super::credentials::CredentialStore;
use super::models::{ApiConfig, ErrorBody};
use crate::domain::{FormatKind, MediaInfo};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Outcome of a `/download` call that produced a response.
///
/// The service uses the body for both the media and its JSON error report, so
/// the status alone decides which variant a response becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResponse {
    Payload {
        body: Bytes,
        content_disposition: Option<String>,
        content_type: Option<String>,
    },
    ServiceError {
        status: StatusCode,
        body: Bytes,
    },
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    credentials: CredentialStore,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let credentials =
            CredentialStore::new(config.token_override.clone(), config.token_file.clone());

        Self {
            config,
            credentials,
            client: Client::new(),
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch title, uploader and thumbnail without downloading the media
    pub async fn fetch_info(&self, source_url: &str) -> Result<MediaInfo> {
        let request = self
            .client
            .get(self.config.endpoint("info"))
            .query(&[("url", source_url)]);

        let response = self.authorized(request).await.send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail_text())
                .unwrap_or_else(|| "no detail".to_string());
            return Err(ApiError::ApiError(format!(
                "Info request failed with {}: {}",
                status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// Request the encoded media for `source_url`.
    ///
    /// `Err` means no response was obtained at all (or the payload body broke
    /// off); any response is returned as a [`DownloadResponse`].
    pub async fn download(&self, source_url: &str, format: FormatKind) -> Result<DownloadResponse> {
        let request = self
            .client
            .post(self.config.endpoint("download"))
            .query(&[("url", source_url), ("format_type", format.as_str())]);

        let response = self.authorized(request).await.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Could not read error body of {} response: {}", status, e);
                    Bytes::new()
                }
            };
            return Ok(DownloadResponse::ServiceError { status, body });
        }

        let content_disposition = header_text(response.headers(), CONTENT_DISPOSITION);
        let content_type = header_text(response.headers(), CONTENT_TYPE);
        let body = response.bytes().await?;

        Ok(DownloadResponse::Payload {
            body,
            content_disposition,
            content_type,
        })
    }

    /// Thumbnails live on third-party hosts, so no credential is attached.
    pub async fn fetch_thumbnail(&self, thumbnail_url: &str) -> Result<Bytes> {
        let bytes = self
            .client
            .get(thumbnail_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes)
    }
}

fn header_text(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server, token: Option<&str>) -> ApiClient {
        ApiClient::new(ApiConfig {
            base_url: format!("{}/downloader", server.url()),
            token_override: token.map(str::to_string),
            token_file: None,
        })
    }

    #[tokio::test]
    async fn test_fetch_info_sends_url_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/downloader/info")
            .match_query(Matcher::UrlEncoded(
                "url".into(),
                "https://example.com/watch?v=abc".into(),
            ))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"title":"Demo","uploader":"Chan","thumbnail":"https://x/thumb.jpg","duration":12}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("secret"));
        let info = client
            .fetch_info("https://example.com/watch?v=abc")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(info.title, "Demo");
        assert_eq!(info.uploader, "Chan");
        assert_eq!(info.thumbnail, "https://x/thumb.jpg");
        assert_eq!(info.duration, Some(12.0));
    }

    #[tokio::test]
    async fn test_fetch_info_is_anonymous_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/downloader/info")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"title":"Demo","uploader":"Chan","thumbnail":""}"#)
            .create_async()
            .await;

        client_for(&server, None).fetch_info("x").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_info_accepts_null_extractor_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/downloader/info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title":"Demo","thumbnail":null,"duration":null,"uploader":null,"ext":"mp4",
                    "formats":[{"format_id":"18","ext":"mp4","resolution":null,"filesize":null}]}"#,
            )
            .create_async()
            .await;

        let info = client_for(&server, None).fetch_info("x").await.unwrap();
        assert_eq!(info.title, "Demo");
        assert_eq!(info.uploader, "");
        assert_eq!(info.thumbnail, "");
        assert_eq!(info.formats.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_info_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/downloader/info")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"detail":"Unsupported URL"}"#)
            .create_async()
            .await;

        let err = client_for(&server, None).fetch_info("x").await.unwrap_err();
        match err {
            ApiError::ApiError(message) => assert!(message.contains("Unsupported URL")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_info_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/downloader/info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client_for(&server, None).fetch_info("x").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_download_payload_keeps_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/downloader/download")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), "https://example.com/watch?v=abc".into()),
                Matcher::UrlEncoded("format_type".into(), "audio".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_header("content-disposition", r#"attachment; filename="demo.mp3""#)
            .with_body(b"ID3\x00\x01")
            .create_async()
            .await;

        let response = client_for(&server, None)
            .download("https://example.com/watch?v=abc", FormatKind::Audio)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            response,
            DownloadResponse::Payload {
                body: Bytes::from_static(b"ID3\x00\x01"),
                content_disposition: Some(r#"attachment; filename="demo.mp3""#.into()),
                content_type: Some("audio/mpeg".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_download_error_status_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/downloader/download")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"too large"}"#)
            .create_async()
            .await;

        let response = client_for(&server, None)
            .download("x", FormatKind::Video)
            .await
            .unwrap();

        assert_eq!(
            response,
            DownloadResponse::ServiceError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: Bytes::from_static(br#"{"detail":"too large"}"#),
            }
        );
    }

    #[tokio::test]
    async fn test_download_connection_refused() {
        let client = ApiClient::new(ApiConfig {
            base_url: "http://127.0.0.1:1".into(),
            token_override: None,
            token_file: None,
        });

        let err = client.download("x", FormatKind::Video).await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
    }
}
