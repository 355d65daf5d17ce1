//! Client-side album cache.
//!
//! Populated wholesale from the server info and appended to optimistically
//! when an album is created. Only `refresh` and `create` write to it; the
//! upload orchestrator and search dispatcher hold clones for reads.

use mediafind_common::AlbumInfo;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::transport::{TransportError, TransportPort};

#[derive(Debug, thiserror::Error)]
pub enum AlbumError {
    #[error("album name is required")]
    EmptyName,
    #[error("failed to create album: {0}")]
    Create(#[source] TransportError),
    #[error("failed to load albums: {0}")]
    Refresh(#[source] TransportError),
}

/// Shared handle to the album cache and the transport used to fill it.
#[derive(Clone)]
pub struct AlbumRegistry {
    transport: Arc<dyn TransportPort>,
    albums: Arc<RwLock<Vec<AlbumInfo>>>,
}

impl AlbumRegistry {
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self {
            transport,
            albums: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AlbumInfo>> {
        self.albums.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AlbumInfo>> {
        self.albums.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace the cache with the albums from the latest server info.
    ///
    /// On failure the previous cache is kept.
    pub async fn refresh(&self) -> Result<Vec<AlbumInfo>, AlbumError> {
        let albums = self
            .transport
            .list_albums()
            .await
            .map_err(AlbumError::Refresh)?;
        info!("Loaded {} albums", albums.len());
        *self.write() = albums.clone();
        Ok(albums)
    }

    /// Create an album and append it to the cache without re-fetching.
    ///
    /// The name is trimmed; an empty name is rejected before any request.
    /// On failure the cache is untouched.
    pub async fn create(&self, name: &str) -> Result<AlbumInfo, AlbumError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AlbumError::EmptyName);
        }

        let album = self.transport.create_album(name).await.map_err(|e| {
            warn!("Failed to create album {:?}: {}", name, e);
            AlbumError::Create(e)
        })?;

        info!("Created album {} ({})", album.name, album.id);
        self.write().push(album.clone());
        Ok(album)
    }

    /// Snapshot of the cached albums, in server order.
    pub fn albums(&self) -> Vec<AlbumInfo> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<AlbumInfo> {
        self.read().iter().find(|a| a.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|a| a.id == id)
    }

    /// Display label, e.g. `"Nature (5)"`.
    pub fn label(&self, id: &str) -> Option<String> {
        self.get(id)
            .map(|album| format!("{} ({})", album.name, album.media_count))
    }

    /// Log when an album scope is not in the cache. The id is never altered.
    pub(crate) fn check_scope(&self, album_id: Option<&str>) {
        if let Some(id) = album_id {
            if !self.contains(id) {
                warn!("Album {} is not in the cached album list", id);
            }
        }
    }
}
