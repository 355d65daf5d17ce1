//! Batch upload: metadata validation, the bounded submission queue and
//! partial-failure accounting.

mod orchestrator;
mod queue;

pub use orchestrator::{
    parse_metadata, BatchOutcome, UploadError, UploadFailure, UploadOrchestrator, UploadProgress,
};
pub use queue::UploadQueue;
pub use mediafind_common::BatchKind;
