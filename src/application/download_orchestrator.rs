use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::save_sink::{MediaSink, PendingSave};
use crate::{
    api::{models::ErrorBody, ApiClient, DownloadResponse},
    domain::{AppError, FormatKind, SaveReceipt, SavedFile},
    utils::{get_timestamp_millis, resolve_filename},
};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A payload that has been handed to the sink.
#[derive(Debug)]
pub struct StartedSave {
    pub receipt: SaveReceipt,
    pub pending: PendingSave,
}

/// Requests a rendition from the service and hands the payload to a sink.
///
/// Holds no per-download state: concurrent calls run independently, and gating
/// repeated clicks is up to the caller.
#[derive(Clone)]
pub struct MediaDownloadOrchestrator {
    api_client: ApiClient,
    sink: Arc<dyn MediaSink>,
}

impl MediaDownloadOrchestrator {
    pub fn new(api_client: ApiClient, sink: Arc<dyn MediaSink>) -> Self {
        Self { api_client, sink }
    }

    pub async fn download(
        &self,
        source_url: &str,
        format: FormatKind,
    ) -> Result<StartedSave, AppError> {
        info!("Requesting {} rendition of {}", format, source_url);

        let response = self
            .api_client
            .download(source_url, format)
            .await
            .map_err(|e| {
                warn!("Download of {} got no response: {}", source_url, e);
                AppError::DownloadTransport(e.to_string())
            })?;

        match response {
            DownloadResponse::Payload {
                body,
                content_disposition,
                content_type,
            } => {
                let file = SavedFile {
                    filename: resolve_filename(
                        content_disposition.as_deref(),
                        format,
                        get_timestamp_millis(),
                    ),
                    mime_type: content_type.unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()),
                    payload: body,
                };
                let receipt = file.receipt();

                info!(
                    "Saving {} ({}, {} bytes)",
                    receipt.filename, receipt.mime_type, receipt.size
                );
                let pending = self.sink.trigger_save(file);

                Ok(StartedSave { receipt, pending })
            }
            DownloadResponse::ServiceError { status, body } => {
                let error = classify_error_body(&body);
                warn!("Download of {} failed with {}: {:?}", source_url, status, error);
                Err(error)
            }
        }
    }
}

/// Interprets the body of a non-2xx download response as a JSON error report.
pub fn classify_error_body(body: &[u8]) -> AppError {
    let text = String::from_utf8_lossy(body);
    let text = text.trim_start_matches('\u{feff}');

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) | Err(_) => AppError::DownloadServiceUnparseable,
        Ok(value @ Value::Object(_)) => {
            let detail = serde_json::from_value::<ErrorBody>(value)
                .ok()
                .and_then(|body| body.detail_text())
                .filter(|detail| !detail.is_empty());
            AppError::DownloadService(detail)
        }
        Ok(_) => AppError::DownloadService(None),
    }
}
