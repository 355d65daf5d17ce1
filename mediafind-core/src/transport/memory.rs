//! Network-free `TransportPort`.
//!
//! Keeps uploaded items and albums in memory and answers searches with the
//! stored items in insertion order. It does not rank anything: scores are
//! placeholders that only preserve the "higher first" shape.

use async_trait::async_trait;
use mediafind_common::{
    AlbumInfo, MediaResult, SearchResponse, ServerInfo, TextSearchRequest, UploadResponse,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::{TransportError, TransportPort};
use crate::media_file::MediaFile;

const VERSION: &str = "0.1.0";

const SUPPORTED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "video/mp4",
    "video/quicktime",
];

/// A call as the transport received it, for asserting on forwarded arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    TextQuery {
        query: String,
        max_results: u32,
        album_id: Option<String>,
    },
    ContentQuery {
        file_name: String,
        max_results: u32,
        album_id: Option<String>,
    },
    Upload {
        file_name: String,
        album_id: Option<String>,
        metadata: Option<String>,
    },
    ServerInfo,
    CreateAlbum {
        name: String,
    },
}

struct StoredMedia {
    result: MediaResult,
    album_id: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    albums: Vec<AlbumInfo>,
    media: Vec<StoredMedia>,
    calls: Vec<RecordedCall>,
    upload_attempts: usize,
    fail_uploads_at: HashSet<usize>,
    unavailable: bool,
}

#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<MemoryState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_albums(albums: Vec<AlbumInfo>) -> Self {
        let transport = Self::new();
        transport.lock().albums = albums;
        transport
    }

    /// The three albums the demo backend starts with.
    pub fn with_sample_albums() -> Self {
        Self::with_albums(vec![
            album("album-1", "Vacation Photos"),
            album("album-2", "Work Projects"),
            album("album-3", "Nature"),
        ])
    }

    /// Reject the upload attempts at these 0-based positions (counted
    /// across the lifetime of the transport) with a 500.
    pub fn fail_uploads_at(self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.lock().fail_uploads_at.extend(attempts);
        self
    }

    /// Make every call fail with a 503 until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn upload_attempts(&self) -> usize {
        self.lock().upload_attempts
    }

    pub fn media_count(&self) -> usize {
        self.lock().media.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(state: &MemoryState) -> Result<(), TransportError> {
        if state.unavailable {
            return Err(status(503, "Service unavailable"));
        }
        Ok(())
    }

    fn search(state: &MemoryState, max_results: u32, album_id: Option<&str>) -> SearchResponse {
        let matching: Vec<&StoredMedia> = state
            .media
            .iter()
            .filter(|m| album_id.is_none() || m.album_id.as_deref() == album_id)
            .collect();
        let total_results = matching.len() as u64;
        let results: Vec<MediaResult> = matching
            .into_iter()
            .take(max_results as usize)
            .enumerate()
            .map(|(rank, m)| MediaResult {
                score: (1.0 - rank as f32 * 0.05).max(0.0),
                ..m.result.clone()
            })
            .collect();
        SearchResponse {
            truncated: total_results > results.len() as u64,
            results,
            total_results,
        }
    }
}

fn album(id: &str, name: &str) -> AlbumInfo {
    AlbumInfo {
        id: id.to_string(),
        name: name.to_string(),
        media_count: 0,
    }
}

/// First `album-N` id, counting up from the album count, that is not taken.
fn next_album_id(albums: &[AlbumInfo]) -> String {
    (albums.len() + 1..)
        .map(|n| format!("album-{n}"))
        .find(|id| albums.iter().all(|a| &a.id != id))
        .unwrap_or_default()
}

fn status(status: u16, message: &str) -> TransportError {
    TransportError::Status {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl TransportPort for InMemoryTransport {
    async fn submit_text_query(
        &self,
        request: &TextSearchRequest,
    ) -> Result<SearchResponse, TransportError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall::TextQuery {
            query: request.query.clone(),
            max_results: request.max_results,
            album_id: request.album_id.clone(),
        });
        Self::check_available(&state)?;
        if request.query.trim().is_empty() {
            return Err(status(400, "Query is required"));
        }
        Ok(Self::search(
            &state,
            request.max_results,
            request.album_id.as_deref(),
        ))
    }

    async fn submit_content_query(
        &self,
        file: &MediaFile,
        max_results: u32,
        album_id: Option<&str>,
    ) -> Result<SearchResponse, TransportError> {
        let data = file.read().await;
        let mut state = self.lock();
        state.calls.push(RecordedCall::ContentQuery {
            file_name: file.file_name.clone(),
            max_results,
            album_id: album_id.map(str::to_string),
        });
        Self::check_available(&state)?;
        data?;
        Ok(Self::search(&state, max_results, album_id))
    }

    async fn submit_upload(
        &self,
        file: &MediaFile,
        album_id: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<UploadResponse, TransportError> {
        let data = file.read().await;
        let mut state = self.lock();
        state.calls.push(RecordedCall::Upload {
            file_name: file.file_name.clone(),
            album_id: album_id.map(str::to_string),
            metadata: metadata.map(str::to_string),
        });
        let attempt = state.upload_attempts;
        state.upload_attempts += 1;
        Self::check_available(&state)?;
        data?;
        if state.fail_uploads_at.contains(&attempt) {
            return Err(status(500, "Internal server error"));
        }

        let media_id = uuid::Uuid::new_v4().to_string();
        state.media.push(StoredMedia {
            result: MediaResult {
                media_id: media_id.clone(),
                score: 1.0,
                media_type: file.content_type.as_str().to_string(),
                url: format!("memory://media/{media_id}"),
                thumbnail_url: None,
                metadata: metadata.map(str::to_string),
            },
            album_id: album_id.map(str::to_string),
        });
        if let Some(album) = album_id.and_then(|id| state.albums.iter_mut().find(|a| a.id == id))
        {
            album.media_count += 1;
        }

        Ok(UploadResponse { media_id })
    }

    async fn server_info(&self) -> Result<ServerInfo, TransportError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall::ServerInfo);
        Self::check_available(&state)?;
        Ok(ServerInfo {
            version: VERSION.to_string(),
            total_media_count: state.media.len() as u64,
            albums: state.albums.clone(),
            supported_types: SUPPORTED_TYPES.iter().map(|t| t.to_string()).collect(),
        })
    }

    async fn create_album(&self, name: &str) -> Result<AlbumInfo, TransportError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall::CreateAlbum {
            name: name.to_string(),
        });
        Self::check_available(&state)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(status(400, "Album name is required"));
        }
        let created = album(&next_album_id(&state.albums), name);
        state.albums.push(created.clone());
        Ok(created)
    }
}
