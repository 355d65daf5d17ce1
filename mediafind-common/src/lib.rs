mod content_type;
mod models;
mod upload_batch;

pub use content_type::ContentType;
pub use models::{
    AlbumInfo, CreateAlbumRequest, ErrorBody, MediaResult, SearchResponse, ServerInfo,
    TextSearchRequest, UploadResponse,
};
pub use upload_batch::{
    percent_complete, BatchKind, BatchProgress, TaskOutcome, UploadBatchState, UploadTask,
};
