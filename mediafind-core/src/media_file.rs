use mediafind_common::ContentType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Upload limit enforced by the selection filter (30 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 30 * 1024 * 1024;

/// Where the bytes of a media file come from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// Handle to a file the user picked for upload or content search.
///
/// Bytes are only read when the file is submitted, so a file that vanished
/// since selection fails its own submission and nothing else. Cloning is
/// cheap: in-memory bytes are shared.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: ContentType,
    pub source: MediaSource,
}

impl MediaFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            content_type: ContentType::from_file_name(&file_name),
            file_name,
            source: MediaSource::Path(path),
        }
    }

    pub fn from_bytes(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            content_type: ContentType::from_file_name(&file_name),
            file_name,
            source: MediaSource::Bytes(data.into()),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            MediaSource::Path(path) => Some(path),
            MediaSource::Bytes(_) => None,
        }
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            MediaSource::Path(path) => tokio::fs::read(path).await,
            MediaSource::Bytes(data) => Ok(data.to_vec()),
        }
    }

    pub async fn size(&self) -> std::io::Result<u64> {
        match &self.source {
            MediaSource::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
            MediaSource::Bytes(data) => Ok(data.len() as u64),
        }
    }
}

/// Why a file was left out of a batch by [`select_media_files`].
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    UnsupportedType(ContentType),
    TooLarge { size: u64, max: u64 },
    Unreadable(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType(ct) => write!(f, "not an image or video ({ct})"),
            Self::TooLarge { size, max } => write!(f, "{size} bytes exceeds the {max} byte limit"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RejectedFile {
    pub file: MediaFile,
    pub reason: RejectReason,
}

/// Split picked files into uploadable media and rejects.
///
/// Accepts only `image/*` and `video/*` up to `max_bytes`. Input order is
/// preserved in both outputs.
pub async fn select_media_files(
    files: Vec<MediaFile>,
    max_bytes: u64,
) -> (Vec<MediaFile>, Vec<RejectedFile>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for file in files {
        if !file.content_type.is_media() {
            debug!("Skipping {}: {}", file.file_name, file.content_type);
            let reason = RejectReason::UnsupportedType(file.content_type.clone());
            rejected.push(RejectedFile { file, reason });
            continue;
        }

        match file.size().await {
            Ok(size) if size > max_bytes => {
                debug!("Skipping {}: {} bytes", file.file_name, size);
                rejected.push(RejectedFile {
                    file,
                    reason: RejectReason::TooLarge {
                        size,
                        max: max_bytes,
                    },
                });
            }
            Ok(_) => accepted.push(file),
            Err(e) => rejected.push(RejectedFile {
                file,
                reason: RejectReason::Unreadable(e.to_string()),
            }),
        }
    }

    (accepted, rejected)
}
