mod api;
mod app;
mod application;
mod config;
mod domain;
mod ui;
mod utils;

use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    iced::application(app::DownloadApp::default, app::update, app::view)
        .title("Alex Downloader")
        .run()
}
