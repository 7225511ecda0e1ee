pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    FormatKind, MediaInfo, PipelineState, ResolveTicket, SaveOutcome, SaveReceipt, SavedFile,
};
