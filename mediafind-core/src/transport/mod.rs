//! TransportPort: the remote media index as seen by the client.
//!
//! The orchestrator, dispatcher and album registry only ever talk to a
//! `dyn TransportPort`. `HttpTransport` speaks the JSON/multipart wire
//! contract; `InMemoryTransport` is a network-free stand-in with the same
//! observable shapes.

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::{InMemoryTransport, RecordedCall};

use async_trait::async_trait;
use mediafind_common::{AlbumInfo, SearchResponse, ServerInfo, TextSearchRequest, UploadResponse};

use crate::media_file::MediaFile;

/// Errors from a single remote exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status for server-side rejections, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Remote operations consumed by the client core.
///
/// Every method is one request/response pair. Implementations must not
/// retry, re-rank or rewrite the album id they are given.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// `POST /search`
    async fn submit_text_query(
        &self,
        request: &TextSearchRequest,
    ) -> Result<SearchResponse, TransportError>;

    /// `POST /media-search` (multipart `media`, `maxResults`, `albumId?`)
    async fn submit_content_query(
        &self,
        file: &MediaFile,
        max_results: u32,
        album_id: Option<&str>,
    ) -> Result<SearchResponse, TransportError>;

    /// `POST /upload` (multipart `media`, `albumId?`, `metadata?`)
    async fn submit_upload(
        &self,
        file: &MediaFile,
        album_id: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<UploadResponse, TransportError>;

    /// `GET /info`
    async fn server_info(&self) -> Result<ServerInfo, TransportError>;

    /// Album list, taken from the server info.
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, TransportError> {
        Ok(self.server_info().await?.albums)
    }

    /// `POST /albums`
    async fn create_album(&self, name: &str) -> Result<AlbumInfo, TransportError>;
}
