use iced::{
    widget::{button, column, image, row, text, text_input, Space},
    Color, Element, Length,
};

use crate::domain::{FormatKind, PipelineState};

/// Main view state
pub struct DownloadView {
    pub state: PipelineState,
    pub thumbnail: Option<image::Handle>,
    pub status_message: String,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            state: PipelineState::default(),
            thumbnail: None,
            status_message: "Paste a YouTube, Instagram or TikTok link".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    PreviewPressed,
    DownloadPressed(FormatKind),
    ClearPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.state.set_url(url);
            }
            DownloadMessage::ClearPressed => {
                self.state.reset();
                self.thumbnail = None;
                self.status_message = Self::default().status_message;
            }
            DownloadMessage::PreviewPressed | DownloadMessage::DownloadPressed(_) => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let state = &self.state;
        let can_preview = !state.loading && !state.url.trim().is_empty();

        let input = row![
            text_input("Enter YouTube, Instagram, or TikTok URL...", &state.url)
                .on_input(DownloadMessage::UrlChanged)
                .on_submit(DownloadMessage::PreviewPressed)
                .padding(10)
                .width(Length::Fill),
            button(if state.loading { "Scanning..." } else { "Preview" })
                .on_press_maybe(can_preview.then_some(DownloadMessage::PreviewPressed))
                .padding([10, 20]),
            button("Clear")
                .on_press(DownloadMessage::ClearPressed)
                .padding([10, 20]),
        ]
        .spacing(10);

        let mut content = column![
            text("Alex Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            input,
            text(&self.status_message).size(14),
        ]
        .spacing(10);

        if !state.error.is_empty() {
            content = content.push(
                text(&state.error)
                    .size(14)
                    .color(Color::from_rgb(0.85, 0.2, 0.2)),
            );
        }

        if let Some(info) = &state.info {
            let mut details = column![text(&info.title).size(22), text(&info.uploader).size(14)]
                .spacing(6);

            if let Some(duration) = info.duration_label() {
                details = details.push(text(format!("Duration: {}", duration)).size(14));
            }
            if !info.formats.is_empty() {
                details = details
                    .push(text(format!("{} video formats available", info.formats.len())).size(14));
            }

            let gate = |format| (!state.downloading).then_some(DownloadMessage::DownloadPressed(format));
            details = details.push(
                row![
                    button(if state.downloading { "Processing..." } else { "Video (MP4)" })
                        .on_press_maybe(gate(FormatKind::Video))
                        .padding([10, 20]),
                    button(if state.downloading { "Extracting..." } else { "Audio (MP3)" })
                        .on_press_maybe(gate(FormatKind::Audio))
                        .padding([10, 20]),
                ]
                .spacing(15),
            );

            let mut preview = row![].spacing(30);
            if let Some(handle) = &self.thumbnail {
                preview = preview.push(image(handle.clone()).width(Length::Fixed(320.0)));
            }
            content = content.push(Space::new().height(Length::Fixed(20.0)));
            content = content.push(preview.push(details));
        }

        content.padding(20).into()
    }
}
