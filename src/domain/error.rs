use thiserror::Error;

/// User-facing failures of the retrieval pipeline.
///
/// The `Display` output is exactly what the view shows; the payloads carry the
/// underlying cause for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Failed to fetch media info. check the URL.")]
    Resolution(String),

    #[error("Download failed. Please check your connection or try another video.")]
    DownloadTransport(String),

    #[error("Download failed: {}", .0.as_deref().unwrap_or("Unknown error"))]
    DownloadService(Option<String>),

    #[error("Download failed. The video might be restricted or too large.")]
    DownloadServiceUnparseable,

    #[error("Saving failed: {0}")]
    Save(String),
}
