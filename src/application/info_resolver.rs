use tracing::{debug, warn};

use crate::{
    api::ApiClient,
    domain::{AppError, MediaInfo},
};

const THUMBNAIL_WIDTH: u32 = 320;
const THUMBNAIL_HEIGHT: u32 = 180;

/// Decoded preview image, ready to hand to the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Looks up media metadata. Nothing is cached: every call asks the service.
#[derive(Clone)]
pub struct MediaInfoResolver {
    api_client: ApiClient,
}

impl MediaInfoResolver {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub async fn resolve(&self, source_url: &str) -> Result<MediaInfo, AppError> {
        debug!("Resolving info for {}", source_url);

        self.api_client.fetch_info(source_url).await.map_err(|e| {
            warn!("Failed to resolve {}: {}", source_url, e);
            AppError::Resolution(e.to_string())
        })
    }

    /// Fetches and downscales the preview image. Failures only hide the image.
    pub async fn load_thumbnail(&self, info: &MediaInfo) -> Option<Thumbnail> {
        if info.thumbnail.trim().is_empty() {
            return None;
        }

        let bytes = match self.api_client.fetch_thumbnail(&info.thumbnail).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to fetch thumbnail {}: {}", info.thumbnail, e);
                return None;
            }
        };

        decode_thumbnail(&bytes)
    }
}

pub fn decode_thumbnail(bytes: &[u8]) -> Option<Thumbnail> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("Failed to decode thumbnail: {}", e);
            return None;
        }
    };

    let rgba = img.thumbnail(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT).to_rgba8();
    let (width, height) = rgba.dimensions();

    Some(Thumbnail {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use mockito::Matcher;
    use std::io::Cursor;

    const INFO_BODY: &str =
        r#"{"title":"Demo","uploader":"Chan","thumbnail":"https://x/thumb.jpg"}"#;

    fn resolver(base_url: String) -> MediaInfoResolver {
        MediaInfoResolver::new(ApiClient::new(ApiConfig {
            base_url,
            token_override: None,
            token_file: None,
        }))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_resolve_twice_yields_same_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/info")
            .match_query(Matcher::UrlEncoded(
                "url".into(),
                "https://example.com/watch?v=abc".into(),
            ))
            .with_status(200)
            .with_body(INFO_BODY)
            .expect(2)
            .create_async()
            .await;

        let resolver = resolver(server.url());
        let first = resolver.resolve("https://example.com/watch?v=abc").await.unwrap();
        let second = resolver.resolve("https://example.com/watch?v=abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.title, "Demo");
    }

    #[tokio::test]
    async fn test_resolve_failure_is_resolution_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/info")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"detail":"Unsupported URL"}"#)
            .create_async()
            .await;

        let err = resolver(server.url()).resolve("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Resolution(_)));
        assert_eq!(err.to_string(), "Failed to fetch media info. check the URL.");
    }

    #[tokio::test]
    async fn test_resolve_connection_refused() {
        let err = resolver("http://127.0.0.1:1".into())
            .resolve("https://example.com/watch?v=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_load_thumbnail_downscales() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/thumb.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png_bytes(640, 360))
            .create_async()
            .await;

        let mut info: MediaInfo = serde_json::from_str(INFO_BODY).unwrap();
        info.thumbnail = format!("{}/thumb.png", server.url());

        let thumbnail = resolver(server.url()).load_thumbnail(&info).await.unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (320, 180));
        assert_eq!(thumbnail.rgba.len(), 320 * 180 * 4);
    }

    #[tokio::test]
    async fn test_load_thumbnail_failure_hides_image() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let mut info: MediaInfo = serde_json::from_str(INFO_BODY).unwrap();
        info.thumbnail = format!("{}/missing.jpg", server.url());
        assert!(resolver(server.url()).load_thumbnail(&info).await.is_none());

        info.thumbnail = String::new();
        assert!(resolver(server.url()).load_thumbnail(&info).await.is_none());
    }

    #[test]
    fn test_decode_thumbnail_rejects_garbage() {
        assert!(decode_thumbnail(b"not an image").is_none());
        assert!(decode_thumbnail(&png_bytes(4, 2)).is_some());
    }
}
