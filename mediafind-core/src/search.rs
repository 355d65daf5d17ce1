//! Search dispatch: text vs content mode, album scope, result state.

use mediafind_common::{SearchResponse, TextSearchRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::albums::AlbumRegistry;
use crate::media_file::MediaFile;
use crate::transport::{TransportError, TransportPort};

pub const DEFAULT_MAX_RESULTS: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("max_results must be greater than zero")]
    InvalidMaxResults,
    #[error("search failed: {0}")]
    Transport(#[from] TransportError),
}

/// One search request. Exactly one mode per call.
#[derive(Debug, Clone)]
pub enum SearchQuery {
    Text(String),
    Content(MediaFile),
}

/// What the user filled in: a text box and an optional example file.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub text: String,
    pub file: Option<MediaFile>,
}

impl SearchForm {
    /// A picked file wins; the text is ignored for that call.
    pub fn into_query(self) -> SearchQuery {
        match self.file {
            Some(file) => SearchQuery::Content(file),
            None => SearchQuery::Text(self.text),
        }
    }
}

/// How responses that resolve out of order are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Every response is applied; the one that resolves last wins.
    #[default]
    LastResolvedWins,
    /// A response older than the latest issued search is dropped.
    LatestIssuedWins,
}

/// Monotonic token handed to each network-bound search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchGeneration(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Blank text; nothing was sent and state is unchanged.
    Skipped,
    /// The response is now the current result set.
    Applied(SearchResponse),
    /// A newer search was issued first; state is unchanged.
    Stale(SearchResponse),
}

#[derive(Debug, Default)]
struct DispatchState {
    current: Option<SearchResponse>,
    last_error: Option<String>,
}

pub struct SearchDispatcher {
    transport: Arc<dyn TransportPort>,
    albums: Option<AlbumRegistry>,
    policy: StalePolicy,
    state: Mutex<DispatchState>,
    issued: AtomicU64,
}

impl SearchDispatcher {
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self {
            transport,
            albums: None,
            policy: StalePolicy::default(),
            state: Mutex::new(DispatchState::default()),
            issued: AtomicU64::new(0),
        }
    }

    pub fn with_albums(mut self, albums: AlbumRegistry) -> Self {
        self.albums = Some(albums);
        self
    }

    pub fn with_policy(mut self, policy: StalePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run one search.
    ///
    /// `max_results` and `album_id` are forwarded as given. The response is
    /// returned in backend order; nothing is trimmed, re-ranked or
    /// re-derived. Overlapping calls are not serialized.
    pub async fn search(
        &self,
        query: SearchQuery,
        max_results: u32,
        album_id: Option<&str>,
    ) -> Result<SearchOutcome, SearchError> {
        if max_results == 0 {
            return Err(SearchError::InvalidMaxResults);
        }
        if let SearchQuery::Text(text) = &query {
            if text.trim().is_empty() {
                debug!("Ignoring empty text search");
                return Ok(SearchOutcome::Skipped);
            }
        }
        if let Some(albums) = &self.albums {
            albums.check_scope(album_id);
        }

        let generation = SearchGeneration(self.issued.fetch_add(1, Ordering::SeqCst) + 1);

        let result = match &query {
            SearchQuery::Text(text) => {
                debug!("Text search {:?} ({:?})", text, generation);
                let request = TextSearchRequest {
                    query: text.clone(),
                    max_results,
                    album_id: album_id.map(str::to_string),
                };
                self.transport.submit_text_query(&request).await
            }
            SearchQuery::Content(file) => {
                debug!("Content search with {} ({:?})", file.file_name, generation);
                self.transport
                    .submit_content_query(file, max_results, album_id)
                    .await
            }
        };

        let stale = self.is_stale(generation);
        let mut state = self.lock();
        match result {
            Ok(response) if stale => {
                debug!(
                    "Dropping stale response {:?}, latest is {:?}",
                    generation,
                    self.latest_generation()
                );
                Ok(SearchOutcome::Stale(response))
            }
            Ok(response) => {
                info!(
                    "Search returned {} of {} result(s){}",
                    response.len(),
                    response.total_results,
                    if response.truncated { " (truncated)" } else { "" }
                );
                state.current = Some(response.clone());
                state.last_error = None;
                Ok(SearchOutcome::Applied(response))
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                if !stale {
                    state.last_error = Some(e.to_string());
                }
                Err(SearchError::Transport(e))
            }
        }
    }

    fn is_stale(&self, generation: SearchGeneration) -> bool {
        self.policy == StalePolicy::LatestIssuedWins && generation < self.latest_generation()
    }

    /// Generation of the most recently issued search, `0` before any.
    pub fn latest_generation(&self) -> SearchGeneration {
        SearchGeneration(self.issued.load(Ordering::SeqCst))
    }

    pub fn policy(&self) -> StalePolicy {
        self.policy
    }

    /// Last applied result set.
    pub fn current_results(&self) -> Option<SearchResponse> {
        self.lock().current.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn clear_results(&self) {
        let mut state = self.lock();
        state.current = None;
        state.last_error = None;
    }
}
