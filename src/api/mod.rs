pub mod client;
pub mod credentials;
pub mod models;

pub use client::{ApiClient, ApiError, DownloadResponse};
pub use models::ApiConfig;
