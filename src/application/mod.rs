pub mod download_orchestrator;
pub mod info_resolver;
pub mod save_sink;

pub use download_orchestrator::{MediaDownloadOrchestrator, StartedSave};
pub use info_resolver::{MediaInfoResolver, Thumbnail};
pub use save_sink::{DialogSink, DirectorySink, MediaSink, PendingSave};
