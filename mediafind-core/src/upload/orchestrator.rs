//! Upload orchestrator: drives one batch of files through the transport.
//!
//! Metadata is validated once up front; after that every file is submitted
//! on its own and a failure only affects that file's outcome.

use mediafind_common::{BatchKind, TaskOutcome, UploadBatchState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::queue::UploadQueue;
use crate::albums::AlbumRegistry;
use crate::media_file::MediaFile;
use crate::transport::TransportPort;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid metadata JSON: {0}")]
    MetadataParse(String),
}

/// Progress updates emitted during a batch
#[derive(Debug, Clone, PartialEq)]
pub enum UploadProgress {
    /// Batch started
    Started { total: usize },
    /// A file submission resolved (success or failure)
    FileProgress {
        index: usize,
        file_name: String,
        succeeded: bool,
        completed: usize,
        total: usize,
        percent: u8,
    },
    /// Every file has been submitted
    Complete { success_count: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub index: usize,
    pub file_name: String,
    pub message: String,
}

/// Result of one `upload_batch` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub kind: BatchKind,
    pub success_count: usize,
    pub total: usize,
    /// Ids returned by successful submissions, in input order
    pub media_ids: Vec<String>,
    pub failures: Vec<UploadFailure>,
}

impl BatchOutcome {
    fn empty() -> Self {
        Self {
            kind: BatchKind::Empty,
            success_count: 0,
            total: 0,
            media_ids: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.total - self.success_count
    }
}

/// Validate optional metadata text.
///
/// Blank text counts as absent. Anything else must be a JSON object; it is
/// returned compactly re-encoded with its keys in the caller's order, ready
/// to send as the `metadata` form field.
pub fn parse_metadata(text: Option<&str>) -> Result<Option<String>, UploadError> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| UploadError::MetadataParse(e.to_string()))?;
    if !value.is_object() {
        return Err(UploadError::MetadataParse(
            "metadata must be a JSON object".to_string(),
        ));
    }
    Ok(Some(value.to_string()))
}

pub struct UploadOrchestrator {
    transport: Arc<dyn TransportPort>,
    albums: Option<AlbumRegistry>,
    queue: UploadQueue,
    state: UploadBatchState<MediaFile>,
    progress_tx: Option<mpsc::UnboundedSender<UploadProgress>>,
}

impl UploadOrchestrator {
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self {
            transport,
            albums: None,
            queue: UploadQueue::sequential(),
            state: UploadBatchState::new(),
            progress_tx: None,
        }
    }

    /// Check album scopes against this registry (read-only).
    pub fn with_albums(mut self, albums: AlbumRegistry) -> Self {
        self.albums = Some(albums);
        self
    }

    pub fn with_queue(mut self, queue: UploadQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Subscribe to progress updates for subsequent batches.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<UploadProgress> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress_tx = Some(tx);
        rx
    }

    /// Files kept for retry by the last batch.
    pub fn retained_files(&self) -> &[MediaFile] {
        self.state.retained()
    }

    /// Upload `files` in order.
    ///
    /// An empty batch is a no-op, whatever the metadata. Otherwise returns
    /// `MetadataParse` without submitting anything when
    /// `metadata_text` is not a JSON object. Per-file failures are logged
    /// and counted in the outcome, never returned as errors.
    pub async fn upload_batch(
        &mut self,
        files: Vec<MediaFile>,
        album_id: Option<&str>,
        metadata_text: Option<&str>,
    ) -> Result<BatchOutcome, UploadError> {
        if files.is_empty() {
            return Ok(BatchOutcome::empty());
        }
        let metadata = parse_metadata(metadata_text)?;
        Ok(self.run_batch(files, album_id, metadata).await)
    }

    /// Re-run the retained files from the last batch.
    ///
    /// Metadata is validated before the retry list is taken, so a bad
    /// metadata string leaves the list in place.
    pub async fn retry_retained(
        &mut self,
        album_id: Option<&str>,
        metadata_text: Option<&str>,
    ) -> Result<BatchOutcome, UploadError> {
        if self.state.retained().is_empty() {
            return Ok(BatchOutcome::empty());
        }
        let metadata = parse_metadata(metadata_text)?;
        let files = self.state.take_retained();
        Ok(self.run_batch(files, album_id, metadata).await)
    }

    async fn run_batch(
        &mut self,
        files: Vec<MediaFile>,
        album_id: Option<&str>,
        metadata: Option<String>,
    ) -> BatchOutcome {
        if let Some(albums) = &self.albums {
            albums.check_scope(album_id);
        }

        let total = files.len();
        info!(
            "Uploading {} file(s){}",
            total,
            album_id
                .map(|id| format!(" to album {id}"))
                .unwrap_or_default()
        );

        let submissions = files.clone();
        self.state.start_batch(files);
        emit(&self.progress_tx, UploadProgress::Started { total });

        let mut media_ids = Vec::new();
        let mut failures = Vec::new();
        let transport = &self.transport;
        let metadata = metadata.as_deref();
        let state = &mut self.state;
        let progress_tx = &self.progress_tx;

        self.queue
            .run(
                submissions,
                move |_, file: MediaFile| async move {
                    transport.submit_upload(&file, album_id, metadata).await
                },
                |index, result| {
                    let file_name = state.tasks()[index].file.file_name.clone();
                    let outcome = match result {
                        Ok(resp) => {
                            info!("Uploaded {} as {}", file_name, resp.media_id);
                            media_ids.push(resp.media_id);
                            TaskOutcome::Succeeded
                        }
                        Err(e) => {
                            warn!("Failed to upload {}: {}", file_name, e);
                            failures.push(UploadFailure {
                                index,
                                file_name: file_name.clone(),
                                message: e.to_string(),
                            });
                            TaskOutcome::Failed
                        }
                    };

                    if let Some(progress) = state.record_outcome(index, outcome) {
                        emit(
                            progress_tx,
                            UploadProgress::FileProgress {
                                index,
                                file_name,
                                succeeded: outcome == TaskOutcome::Succeeded,
                                completed: progress.completed,
                                total: progress.total,
                                percent: progress.percent,
                            },
                        );
                    }
                },
            )
            .await;

        let success_count = self.state.success_count();
        let kind = self.state.finalize();
        emit(
            &self.progress_tx,
            UploadProgress::Complete {
                success_count,
                total,
            },
        );

        match kind {
            BatchKind::AllSucceeded => info!("Uploaded all {} file(s)", total),
            BatchKind::PartialSuccess { .. } => warn!(
                "Uploaded {} of {} file(s), {} kept for retry",
                success_count,
                total,
                self.state.retained().len()
            ),
            BatchKind::AllFailed => warn!("All {} upload(s) failed", total),
            BatchKind::Empty => {}
        }

        BatchOutcome {
            kind,
            success_count,
            total,
            media_ids,
            failures,
        }
    }
}

fn emit(tx: &Option<mpsc::UnboundedSender<UploadProgress>>, progress: UploadProgress) {
    if let Some(tx) = tx {
        let _ = tx.send(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{InMemoryTransport, RecordedCall, TransportError};
    use async_trait::async_trait;
    use mediafind_common::{
        AlbumInfo, SearchResponse, ServerInfo, TextSearchRequest, UploadResponse,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn files(names: &[&str]) -> Vec<MediaFile> {
        names
            .iter()
            .map(|n| MediaFile::from_bytes(*n, vec![0u8; 4]))
            .collect()
    }

    fn names(files: &[MediaFile]) -> Vec<&str> {
        files.iter().map(|f| f.file_name.as_str()).collect()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<UploadProgress>) -> Vec<UploadProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn orchestrator(transport: InMemoryTransport) -> (UploadOrchestrator, Arc<InMemoryTransport>) {
        let transport = Arc::new(transport);
        (UploadOrchestrator::new(transport.clone()), transport)
    }

    #[test]
    fn metadata_validation() {
        assert_eq!(parse_metadata(None).unwrap(), None);
        assert_eq!(parse_metadata(Some("  \n")).unwrap(), None);
        assert_eq!(
            parse_metadata(Some(r#"{ "tags": ["beach"] }"#)).unwrap(),
            Some(r#"{"tags":["beach"]}"#.to_string())
        );
        assert!(matches!(
            parse_metadata(Some("{tags: beach")),
            Err(UploadError::MetadataParse(_))
        ));
        assert_eq!(
            parse_metadata(Some(r#"{ "zeta": 1, "alpha": { "b": 2, "a": 3 } }"#)).unwrap(),
            Some(r#"{"zeta":1,"alpha":{"b":2,"a":3}}"#.to_string())
        );
        assert!(matches!(
            parse_metadata(Some("[1, 2]")),
            Err(UploadError::MetadataParse(_))
        ));
    }

    #[tokio::test]
    async fn all_succeeded() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new());
        let mut rx = orch.subscribe();

        let outcome = orch
            .upload_batch(files(&["a.jpg", "b.jpg", "c.mp4"]), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.kind, BatchKind::AllSucceeded);
        assert_eq!(outcome.success_count, 3);
        assert_eq!(outcome.media_ids.len(), 3);
        assert!(outcome.failures.is_empty());
        assert!(orch.retained_files().is_empty());
        assert_eq!(transport.media_count(), 3);

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&UploadProgress::Started { total: 3 }));
        assert_eq!(
            events.last(),
            Some(&UploadProgress::Complete {
                success_count: 3,
                total: 3
            })
        );
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_100() {
        let (mut orch, _) = orchestrator(InMemoryTransport::new().fail_uploads_at([1, 3]));
        let mut rx = orch.subscribe();

        let outcome = orch
            .upload_batch(files(&["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]), None, None)
            .await
            .unwrap();
        assert_eq!(outcome.total, 5);

        let progress: Vec<(usize, u8)> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                UploadProgress::FileProgress {
                    completed, percent, ..
                } => Some((completed, percent)),
                _ => None,
            })
            .collect();

        assert_eq!(progress.len(), 5);
        assert_eq!(
            progress.iter().map(|p| p.0).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert!(progress.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(progress.last().map(|p| p.1), Some(100));
    }

    #[tokio::test]
    async fn invalid_metadata_submits_nothing() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new());
        let mut rx = orch.subscribe();

        let err = orch
            .upload_batch(files(&["a.jpg", "b.jpg"]), None, Some("{not json"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::MetadataParse(_)));
        assert_eq!(transport.upload_attempts(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn partial_success_keeps_positional_suffix() {
        let (mut orch, _) = orchestrator(InMemoryTransport::new().fail_uploads_at([2, 3]));

        let outcome = orch
            .upload_batch(files(&["A.jpg", "B.jpg", "C.jpg", "D.jpg"]), None, None)
            .await
            .unwrap();

        assert_eq!(
            outcome.kind,
            BatchKind::PartialSuccess {
                success_count: 2,
                total: 4
            }
        );
        assert_eq!(outcome.failed_count(), 2);
        assert_eq!(names(orch.retained_files()), vec!["C.jpg", "D.jpg"]);
    }

    #[tokio::test]
    async fn suffix_rule_ignores_which_files_failed() {
        let (mut orch, _) = orchestrator(InMemoryTransport::new().fail_uploads_at([0, 2]));

        let outcome = orch
            .upload_batch(files(&["A.jpg", "B.jpg", "C.jpg", "D.jpg"]), None, None)
            .await
            .unwrap();

        let failed: Vec<_> = outcome.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![0, 2]);
        assert_eq!(names(orch.retained_files()), vec!["C.jpg", "D.jpg"]);
    }

    #[tokio::test]
    async fn all_failed_keeps_every_file() {
        let (mut orch, _) = orchestrator(InMemoryTransport::new().fail_uploads_at([0, 1]));

        let outcome = orch
            .upload_batch(files(&["A.jpg", "B.jpg"]), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.kind, BatchKind::AllFailed);
        assert_eq!(outcome.success_count, 0);
        assert_eq!(names(orch.retained_files()), vec!["A.jpg", "B.jpg"]);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new());
        let mut rx = orch.subscribe();

        let outcome = orch.upload_batch(Vec::new(), None, None).await.unwrap();

        assert_eq!(outcome.kind, BatchKind::Empty);
        assert_eq!(outcome.total, 0);
        assert_eq!(transport.upload_attempts(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn empty_batch_skips_metadata_validation() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new());

        let outcome = orch
            .upload_batch(Vec::new(), None, Some("{bad"))
            .await
            .unwrap();
        assert_eq!(outcome.kind, BatchKind::Empty);

        let outcome = orch.retry_retained(None, Some("{bad")).await.unwrap();
        assert_eq!(outcome.kind, BatchKind::Empty);
        assert_eq!(transport.upload_attempts(), 0);
    }

    #[tokio::test]
    async fn metadata_key_order_reaches_the_index() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new());

        orch.upload_batch(files(&["a.jpg"]), None, Some(r#"{"zeta": 1, "alpha": 2}"#))
            .await
            .unwrap();

        let response = transport
            .submit_text_query(&TextSearchRequest {
                query: "anything".to_string(),
                max_results: 1,
                album_id: None,
            })
            .await
            .unwrap();
        assert_eq!(
            response.results[0].metadata.as_deref(),
            Some(r#"{"zeta":1,"alpha":2}"#)
        );
    }

    #[tokio::test]
    async fn album_and_metadata_are_forwarded_unchanged() {
        let transport = Arc::new(InMemoryTransport::with_sample_albums());
        let albums = AlbumRegistry::new(transport.clone());
        albums.refresh().await.unwrap();
        let mut orch = UploadOrchestrator::new(transport.clone()).with_albums(albums.clone());

        // Unknown album ids are still sent as given.
        for album_id in ["album-2", "album-does-not-exist"] {
            orch.upload_batch(
                files(&["a.jpg"]),
                Some(album_id),
                Some(r#"{"trip": "coast"}"#),
            )
            .await
            .unwrap();
        }

        let uploads: Vec<_> = transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Upload {
                    album_id, metadata, ..
                } => Some((album_id, metadata)),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploads,
            vec![
                (
                    Some("album-2".to_string()),
                    Some(r#"{"trip":"coast"}"#.to_string())
                ),
                (
                    Some("album-does-not-exist".to_string()),
                    Some(r#"{"trip":"coast"}"#.to_string())
                ),
            ]
        );
        // The orchestrator never writes to the album cache.
        assert_eq!(albums.len(), 3);
    }

    #[tokio::test]
    async fn unreadable_file_fails_alone() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut orch, _) = orchestrator(InMemoryTransport::new());

        let batch = vec![
            MediaFile::from_bytes("a.jpg", vec![1]),
            MediaFile::from_path(dir.path().join("missing.jpg")),
            MediaFile::from_bytes("c.jpg", vec![1]),
        ];
        let outcome = orch.upload_batch(batch, None, None).await.unwrap();

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file_name, "missing.jpg");
    }

    #[tokio::test]
    async fn retry_retained_uploads_the_suffix() {
        let (mut orch, transport) = orchestrator(InMemoryTransport::new().fail_uploads_at([2]));

        orch.upload_batch(files(&["A.jpg", "B.jpg", "C.jpg"]), None, None)
            .await
            .unwrap();
        assert_eq!(names(orch.retained_files()), vec!["C.jpg"]);

        let err = orch.retry_retained(None, Some("nope")).await.unwrap_err();
        assert!(matches!(err, UploadError::MetadataParse(_)));
        assert_eq!(names(orch.retained_files()), vec!["C.jpg"]);

        let outcome = orch.retry_retained(None, None).await.unwrap();
        assert_eq!(outcome.kind, BatchKind::AllSucceeded);
        assert!(orch.retained_files().is_empty());
        assert_eq!(transport.upload_attempts(), 4);
    }

    /// Transport that tracks how many uploads are running at once.
    #[derive(Default)]
    struct CountingTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TransportPort for CountingTransport {
        async fn submit_text_query(
            &self,
            _request: &TextSearchRequest,
        ) -> Result<SearchResponse, TransportError> {
            unimplemented!()
        }

        async fn submit_content_query(
            &self,
            _file: &MediaFile,
            _max_results: u32,
            _album_id: Option<&str>,
        ) -> Result<SearchResponse, TransportError> {
            unimplemented!()
        }

        async fn submit_upload(
            &self,
            file: &MediaFile,
            _album_id: Option<&str>,
            _metadata: Option<&str>,
        ) -> Result<UploadResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(UploadResponse {
                media_id: format!("id-{}", file.file_name),
            })
        }

        async fn server_info(&self) -> Result<ServerInfo, TransportError> {
            unimplemented!()
        }

        async fn create_album(&self, _name: &str) -> Result<AlbumInfo, TransportError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn default_queue_allows_one_upload_in_flight() {
        let transport = Arc::new(CountingTransport::default());
        let mut orch = UploadOrchestrator::new(transport.clone());

        let outcome = orch
            .upload_batch(files(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.kind, BatchKind::AllSucceeded);
        assert_eq!(transport.peak.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome.media_ids,
            vec!["id-a.jpg", "id-b.jpg", "id-c.jpg", "id-d.jpg"]
        );
    }

    #[tokio::test]
    async fn wider_queue_is_respected() {
        let transport = Arc::new(CountingTransport::default());
        let mut orch = UploadOrchestrator::new(transport.clone()).with_queue(UploadQueue::new(2));

        let outcome = orch
            .upload_batch(files(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]), None, None)
            .await
            .unwrap();

        assert_eq!(outcome.success_count, 4);
        assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
    }
}
