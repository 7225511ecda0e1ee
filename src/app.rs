use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use iced::widget::image;
use iced::Task;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::application::{
    DialogSink, DirectorySink, MediaDownloadOrchestrator, MediaInfoResolver, MediaSink,
    PendingSave, Thumbnail,
};
use crate::config::AppConfig;
use crate::domain::{AppError, FormatKind, MediaInfo, ResolveTicket, SaveOutcome, SaveReceipt};
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    view: DownloadView,
    resolver: MediaInfoResolver,
    orchestrator: MediaDownloadOrchestrator,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(AppConfig::from_env())
    }
}

impl DownloadApp {
    pub fn new(config: AppConfig) -> Self {
        info!("Using media service at {}", config.api.base_url);
        let api_client = ApiClient::new(config.api);

        let sink: Arc<dyn MediaSink> = match config.download_dir {
            Some(dir) => {
                info!("Saving downloads into {}", dir.display());
                Arc::new(DirectorySink::new(dir))
            }
            None => Arc::new(DialogSink),
        };

        Self {
            view: DownloadView::default(),
            resolver: MediaInfoResolver::new(api_client.clone()),
            orchestrator: MediaDownloadOrchestrator::new(api_client, sink),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    InfoResolved(ResolveTicket, Result<MediaInfo, AppError>),
    ThumbnailLoaded(ResolveTicket, Option<Thumbnail>),
    /// The payload has been handed to the sink (or the download failed)
    DownloadFinished(Result<SaveReceipt, AppError>),
    /// Where the handed-off payload ended up
    SaveFinished(SaveOutcome),
}

/// Internal state for the download-then-save stream
enum DownloadState {
    Start {
        orchestrator: MediaDownloadOrchestrator,
        url: String,
        format: FormatKind,
    },
    Saving(PendingSave),
    Finished,
}

/// Emits `DownloadFinished` as soon as the save is triggered, then
/// `SaveFinished` once the sink reports back.
fn download_stream(
    orchestrator: MediaDownloadOrchestrator,
    url: String,
    format: FormatKind,
) -> BoxStream<'static, Message> {
    futures::stream::unfold(
        DownloadState::Start {
            orchestrator,
            url,
            format,
        },
        |state| async move {
            match state {
                DownloadState::Start {
                    orchestrator,
                    url,
                    format,
                } => match orchestrator.download(&url, format).await {
                    Ok(started) => Some((
                        Message::DownloadFinished(Ok(started.receipt)),
                        DownloadState::Saving(started.pending),
                    )),
                    Err(e) => Some((Message::DownloadFinished(Err(e)), DownloadState::Finished)),
                },
                DownloadState::Saving(pending) => Some((
                    Message::SaveFinished(pending.outcome().await),
                    DownloadState::Finished,
                )),
                DownloadState::Finished => None,
            }
        },
    )
    .boxed()
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::PreviewPressed => {
                    if let Some((ticket, url)) = app.view.state.begin_resolve() {
                        let resolver = app.resolver.clone();

                        app.view.thumbnail = None;
                        app.view.status_message = format!("Fetching info for: {}", url);

                        return Task::perform(
                            async move { resolver.resolve(&url).await },
                            move |result| Message::InfoResolved(ticket, result),
                        );
                    }
                }
                DownloadMessage::DownloadPressed(format) => {
                    if let Some(url) = app.view.state.begin_download() {
                        let orchestrator = app.orchestrator.clone();

                        app.view.status_message = format!("Downloading {}...", format);

                        return Task::stream(download_stream(orchestrator, url, format));
                    }
                }
                DownloadMessage::UrlChanged(_) | DownloadMessage::ClearPressed => {}
            }
        }
        Message::InfoResolved(ticket, result) => {
            let resolved = result.as_ref().ok().cloned();

            if !app.view.state.finish_resolve(ticket, result) {
                debug!("Discarding result of a superseded preview");
                return Task::none();
            }

            match resolved {
                Some(info) => {
                    app.view.status_message = "Choose a format to download".to_string();
                    let resolver = app.resolver.clone();

                    return Task::perform(
                        async move { resolver.load_thumbnail(&info).await },
                        move |thumbnail| Message::ThumbnailLoaded(ticket, thumbnail),
                    );
                }
                None => {
                    app.view.status_message = "Try another link".to_string();
                }
            }
        }
        Message::ThumbnailLoaded(ticket, thumbnail) => {
            if app.view.state.is_current(ticket) {
                app.view.thumbnail = thumbnail
                    .map(|t| image::Handle::from_rgba(t.width, t.height, t.rgba));
            }
        }
        Message::DownloadFinished(result) => {
            app.view.state.finish_download(&result);
            app.view.status_message = match &result {
                Ok(receipt) => format!("Saving {}", receipt.filename),
                Err(_) => "Download failed".to_string(),
            };
        }
        Message::SaveFinished(outcome) => {
            app.view.state.finish_save(&outcome);
            app.view.status_message = match &outcome {
                Ok(Some(path)) => format!("Saved: {}", path.display()),
                Ok(None) => "Save cancelled".to_string(),
                Err(_) => "Save failed".to_string(),
            };
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
