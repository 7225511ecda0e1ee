use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Deserializer};

use super::AppError;

/// Requested rendition of a piece of media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Video,
    Audio,
}

impl FormatKind {
    /// Value of the `format_type` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            FormatKind::Video => "video",
            FormatKind::Audio => "audio",
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            FormatKind::Video => "mp4",
            FormatKind::Audio => "mp3",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata returned by the `/info` endpoint.
///
/// The service passes extractor fields through as-is, so any of them may be
/// `null`; the three preview fields must be present but read `null` as empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uploader: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatSummary>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatSummary {
    pub format_id: String,
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

impl MediaInfo {
    /// Duration as `m:ss` or `h:mm:ss`
    pub fn duration_label(&self) -> Option<String> {
        let total = self.duration.filter(|d| d.is_finite() && *d >= 0.0)? as u64;
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

        Some(if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{}:{:02}", minutes, seconds)
        })
    }
}

/// A payload ready to be handed to a save sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub filename: String,
    pub mime_type: String,
    pub payload: Bytes,
}

impl SavedFile {
    pub fn receipt(&self) -> SaveReceipt {
        SaveReceipt {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size: self.payload.len(),
        }
    }
}

/// What the caller keeps once the payload has been handed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

/// Where a triggered save ended up: `None` when the user dismissed the dialog.
pub type SaveOutcome = Result<Option<PathBuf>, AppError>;

/// Identifies one resolve attempt. Only the latest ticket may write to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTicket(u64);

/// Session-visible state of the retrieval pipeline.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub url: String,
    pub loading: bool,
    pub info: Option<MediaInfo>,
    pub error: String,
    pub downloading: bool,
    resolved_url: Option<String>,
    resolve_seq: u64,
}

impl PipelineState {
    pub fn set_url(&mut self, url: String) {
        self.url = url;
    }

    /// Drops everything, including results still in flight.
    pub fn reset(&mut self) {
        *self = Self {
            resolve_seq: self.resolve_seq + 1,
            ..Self::default()
        };
    }

    /// Starts a resolve for the current URL. Returns `None` for a blank URL.
    pub fn begin_resolve(&mut self) -> Option<(ResolveTicket, String)> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return None;
        }

        self.resolve_seq += 1;
        self.loading = true;
        self.error.clear();
        self.info = None;
        self.resolved_url = Some(url.clone());

        Some((ResolveTicket(self.resolve_seq), url))
    }

    pub fn is_current(&self, ticket: ResolveTicket) -> bool {
        ticket.0 == self.resolve_seq
    }

    /// Applies a resolve result. Returns `false` when the ticket was superseded
    /// and the result has been discarded.
    pub fn finish_resolve(
        &mut self,
        ticket: ResolveTicket,
        result: Result<MediaInfo, AppError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        self.loading = false;
        match result {
            Ok(info) => {
                self.info = Some(info);
                self.error.clear();
            }
            Err(e) => {
                self.info = None;
                self.error = e.to_string();
            }
        }
        true
    }

    /// Starts a download for the previewed URL (or the typed one when nothing
    /// was previewed). Returns `None` while another download is in flight.
    pub fn begin_download(&mut self) -> Option<String> {
        if self.downloading {
            return None;
        }

        let url = match &self.resolved_url {
            Some(url) => url.clone(),
            None => self.url.trim().to_string(),
        };
        if url.is_empty() {
            return None;
        }

        self.downloading = true;
        self.error.clear();
        Some(url)
    }

    pub fn finish_download(&mut self, result: &Result<SaveReceipt, AppError>) {
        self.downloading = false;
        if let Err(e) = result {
            self.error = e.to_string();
        }
    }

    /// Saves finish after the download itself, so only a failure is recorded.
    pub fn finish_save(&mut self, outcome: &SaveOutcome) {
        if let Err(e) = outcome {
            self.error = e.to_string();
        }
    }
}
