//! Single-page and batch generation.
//!
//! The orchestrator reads the page under generation, builds its reference
//! chain, calls the [`PageImageGenerator`] and records the result as a new
//! artifact version. Only one generation runs at a time; a call made while
//! another is in flight is rejected, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use panelkit_core::artifact::{ArtifactVersion, DEFAULT_REFERENCE_CAPACITY, build_reference_chain};
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::generation::{PageImageGenerator, PageImageRequest};
use panelkit_core::session::{EventBus, Session, SessionEvent, SessionStore};
use panelkit_infrastructure::config::GenerationConfig;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Tunables for generation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Preceding pages sent as references
    pub reference_capacity: usize,
    /// Pause after moving the cursor to a batch page
    pub render_delay: Duration,
    /// Pause between batch pages
    pub step_delay: Duration,
    pub credentials: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            reference_capacity: DEFAULT_REFERENCE_CAPACITY,
            render_delay: Duration::from_millis(300),
            step_delay: Duration::from_millis(500),
            credentials: None,
        }
    }
}

impl GenerationSettings {
    pub fn from_config(config: &GenerationConfig, credentials: Option<String>) -> Self {
        Self {
            reference_capacity: config.reference_capacity,
            render_delay: Duration::from_millis(config.render_delay_ms),
            step_delay: Duration::from_millis(config.step_delay_ms),
            credentials,
        }
    }

    /// No delays; for tests and scripted runs.
    pub fn immediate() -> Self {
        Self {
            render_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// A generation call either ran or was turned away because another one was
/// still in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome<T> {
    Finished(T),
    Rejected,
}

impl<T> GenerationOutcome<T> {
    pub fn finished(self) -> Option<T> {
        match self {
            GenerationOutcome::Finished(value) => Some(value),
            GenerationOutcome::Rejected => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, GenerationOutcome::Rejected)
    }
}

/// The artifact version recorded for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPage {
    pub page_index: usize,
    pub version: ArtifactVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    /// Every page was generated.
    Completed,
    /// Stopped at `page_index`; earlier pages keep their new versions.
    Failed {
        page_index: usize,
        error: PanelkitError,
    },
    /// `page_index` was generated and kept in memory, but saving it failed;
    /// the batch stopped there.
    PersistFailed {
        page_index: usize,
        error: PanelkitError,
    },
    /// Cancelled before `next_page_index` was started.
    Cancelled { next_page_index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub session_id: String,
    /// Pages generated in this batch, ascending
    pub generated: Vec<GeneratedPage>,
    pub total_pages: usize,
    pub status: BatchStatus,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

/// A version recorded in memory and the outcome of saving it.
struct RecordedPage {
    page: GeneratedPage,
    persisted: Result<()>,
}

/// Clears the in-flight flag when dropped.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct GenerationOrchestrator {
    store: Arc<Mutex<SessionStore>>,
    generator: Arc<dyn PageImageGenerator>,
    settings: GenerationSettings,
    events: EventBus,
    is_generating: AtomicBool,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        generator: Arc<dyn PageImageGenerator>,
        settings: GenerationSettings,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
            events,
            is_generating: AtomicBool::new(false),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Claims the single generation slot, or `None` if it is taken.
    pub(crate) fn begin(&self) -> Option<InFlight<'_>> {
        self.is_generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.is_generating))
    }

    /// Generates the page under the current session's cursor.
    ///
    /// # Errors
    ///
    /// - `Validation` if the current session has no pages
    /// - `GenerationFailed` if the generator fails or is unreachable; no
    ///   artifact is recorded
    /// - storage errors from persisting the new version, which stays in memory
    pub async fn generate_current_page(&self) -> Result<GenerationOutcome<GeneratedPage>> {
        let Some(_in_flight) = self.begin() else {
            tracing::warn!("Generation already in progress, ignoring request");
            return Ok(GenerationOutcome::Rejected);
        };

        let (session_id, page_index) = {
            let store = self.store.lock().await;
            let session = store.current();
            if session.pages.is_empty() {
                return Err(PanelkitError::validation("No pages to generate"));
            }
            (session.id.clone(), session.pages.current_index())
        };

        let RecordedPage { page, persisted } = self.generate_page(&session_id, page_index).await?;
        persisted?;
        Ok(GenerationOutcome::Finished(page))
    }

    /// Generates every page of the current session in ascending order.
    ///
    /// Each page is persisted as soon as it is generated. The first failure
    /// stops the batch; pages generated before it are kept. A page whose
    /// version was recorded but could not be saved is still listed in
    /// [`BatchReport::generated`] and ends the batch with
    /// [`BatchStatus::PersistFailed`]. When `cancel`
    /// fires, the batch stops before starting the next page. The page cursor
    /// is restored to where it was before the batch in every case.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the current session has no pages. Failures
    /// during the batch are reported in [`BatchReport::status`].
    pub async fn generate_all(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<GenerationOutcome<BatchReport>> {
        let Some(_in_flight) = self.begin() else {
            tracing::warn!("Generation already in progress, ignoring batch request");
            return Ok(GenerationOutcome::Rejected);
        };

        let (session_id, total_pages, original_cursor) = {
            let store = self.store.lock().await;
            let session = store.current();
            if session.pages.is_empty() {
                return Err(PanelkitError::validation("No pages to generate"));
            }
            (
                session.id.clone(),
                session.pages.count(),
                session.pages.current_index(),
            )
        };

        tracing::info!(session_id = %session_id, total_pages, "Starting batch generation");

        let mut generated = Vec::with_capacity(total_pages);
        let mut status = BatchStatus::Completed;

        for page_index in 0..total_pages {
            if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                tracing::info!(session_id = %session_id, page_index, "Batch cancelled");
                status = BatchStatus::Cancelled {
                    next_page_index: page_index,
                };
                break;
            }

            if let Err(error) = self.move_cursor(&session_id, page_index).await {
                status = BatchStatus::Failed { page_index, error };
                break;
            }
            tokio::time::sleep(self.settings.render_delay).await;

            match self.generate_page(&session_id, page_index).await {
                Ok(RecordedPage { page, persisted }) => {
                    generated.push(page);
                    if let Err(error) = persisted {
                        tracing::warn!(
                            session_id = %session_id,
                            page_index,
                            error = %error,
                            "Batch stopped, page could not be saved"
                        );
                        status = BatchStatus::PersistFailed { page_index, error };
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        page_index,
                        error = %error,
                        "Batch stopped"
                    );
                    status = BatchStatus::Failed { page_index, error };
                    break;
                }
            }

            if page_index + 1 < total_pages {
                tokio::time::sleep(self.settings.step_delay).await;
            }
        }

        self.restore_cursor(&session_id, original_cursor).await;

        self.events.emit(SessionEvent::BatchFinished {
            session_id: session_id.clone(),
            generated: generated.len(),
            total: total_pages,
        });
        tracing::info!(
            session_id = %session_id,
            generated = generated.len(),
            total_pages,
            "Batch generation finished"
        );

        Ok(GenerationOutcome::Finished(BatchReport {
            session_id,
            generated,
            total_pages,
            status,
        }))
    }

    async fn move_cursor(&self, session_id: &str, page_index: usize) -> Result<()> {
        let mut store = self.store.lock().await;
        store.modify(session_id, |session| session.pages.go_to(page_index))?;
        self.events.emit(SessionEvent::PageChanged {
            session_id: session_id.to_string(),
            page_index,
        });
        Ok(())
    }

    async fn restore_cursor(&self, session_id: &str, cursor: usize) {
        let mut store = self.store.lock().await;
        let restored = store.modify(session_id, |session| {
            let index = cursor.min(session.pages.count().saturating_sub(1));
            session.pages.go_to(index).map(|()| index)
        });
        let result = match restored {
            Ok(index) => store.persist().await.map(|()| index),
            Err(e) => Err(e),
        };
        match result {
            Ok(page_index) => self.events.emit(SessionEvent::PageChanged {
                session_id: session_id.to_string(),
                page_index,
            }),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to restore page cursor");
            }
        }
    }

    fn build_request(&self, session: &Session, page_index: usize) -> Result<PageImageRequest> {
        let page = session
            .pages
            .get(page_index)
            .cloned()
            .ok_or_else(|| PanelkitError::not_found("page", page_index.to_string()))?;
        let references = build_reference_chain(
            &session.artifacts,
            page_index,
            session.user_reference_image.as_deref(),
            self.settings.reference_capacity,
        );
        Ok(PageImageRequest {
            page,
            style: session.config.style.clone(),
            language: session.config.language.clone(),
            rows_per_page: session.config.rows_per_page,
            references,
            credentials: self.settings.credentials.clone(),
        })
    }

    /// Requests one page and records the result. The store lock is not held
    /// while the generator runs.
    ///
    /// Errors mean nothing was recorded; a failed save is reported in
    /// [`RecordedPage::persisted`].
    async fn generate_page(&self, session_id: &str, page_index: usize) -> Result<RecordedPage> {
        let request = {
            let store = self.store.lock().await;
            let session = store
                .get(session_id)
                .ok_or_else(|| PanelkitError::not_found("session", session_id))?;
            self.build_request(session, page_index)?
        };
        let page_title = request.page.display_title(page_index);

        tracing::info!(
            session_id = %session_id,
            page_index,
            references = request.references.len(),
            "Requesting page image"
        );
        self.events.emit(SessionEvent::GenerationStarted {
            session_id: session_id.to_string(),
            page_index,
        });

        let image = match self.generator.generate(request).await {
            Ok(result) => result.into_image(),
            Err(PanelkitError::GenerationFailed { message, .. }) => Err(message),
            Err(e) => Err(e.to_string()),
        };
        let image = match image {
            Ok(image) => image,
            Err(message) => {
                self.events.emit(SessionEvent::GenerationFailed {
                    session_id: session_id.to_string(),
                    page_index,
                    message: message.clone(),
                });
                return Err(PanelkitError::generation_failed(Some(page_index), message));
            }
        };

        let mut store = self.store.lock().await;
        let version = store.modify(session_id, |session| {
            Ok(session
                .artifacts
                .append_version(page_index, page_title, image))
        })?;
        self.events.emit(SessionEvent::ArtifactAdded {
            session_id: session_id.to_string(),
            page_index,
            version_number: version.version_number,
        });
        tracing::info!(
            session_id = %session_id,
            page_index,
            version = version.version_number,
            "Recorded page image"
        );

        let persisted = store.persist().await;
        if persisted.is_ok() {
            self.events.emit(SessionEvent::Persisted);
        }

        Ok(RecordedPage {
            page: GeneratedPage {
                page_index,
                version,
            },
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panelkit_core::artifact::ReferenceImage;
    use panelkit_core::generation::PageImageResult;
    use panelkit_core::page::{Page, Panel, Row};
    use panelkit_core::session::{SessionConfig, UuidGenerator};
    use panelkit_infrastructure::MemoryStorage;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    // Fails for the listed page indices, succeeds otherwise
    #[derive(Default)]
    struct ScriptedGenerator {
        failing_pages: HashSet<usize>,
        requests: StdMutex<Vec<PageImageRequest>>,
        calls: StdMutex<usize>,
    }

    impl ScriptedGenerator {
        fn failing(pages: &[usize]) -> Self {
            Self {
                failing_pages: pages.iter().copied().collect(),
                ..Default::default()
            }
        }

        fn requested_pages(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.page.title.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PageImageGenerator for ScriptedGenerator {
        async fn generate(&self, request: PageImageRequest) -> Result<PageImageResult> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            let index: usize = request.page.title.trim_start_matches('p').parse().unwrap();
            self.requests.lock().unwrap().push(request);
            if self.failing_pages.contains(&index) {
                Ok(PageImageResult::failed(format!("page {index} blocked")))
            } else {
                Ok(PageImageResult::succeeded(format!("img-{index}-call{call}")))
            }
        }
    }

    fn pages(n: usize) -> Vec<Page> {
        (0..n)
            .map(|i| Page {
                title: format!("p{i}"),
                rows: vec![Row::new(vec![Panel::new("text")])],
            })
            .collect()
    }

    async fn setup(
        generator: Arc<ScriptedGenerator>,
        page_count: usize,
    ) -> (GenerationOrchestrator, Arc<Mutex<SessionStore>>) {
        setup_with_storage(generator, Arc::new(MemoryStorage::new()), page_count).await
    }

    async fn setup_with_storage(
        generator: Arc<dyn PageImageGenerator>,
        storage: Arc<MemoryStorage>,
        page_count: usize,
    ) -> (GenerationOrchestrator, Arc<Mutex<SessionStore>>) {
        let mut store = SessionStore::open(storage, Arc::new(UuidGenerator), SessionConfig::default())
            .await
            .unwrap();
        let id = store.current_session_id().to_string();
        store
            .modify(&id, |s| {
                s.pages.set_pages(pages(page_count));
                Ok(())
            })
            .unwrap();
        let store = Arc::new(Mutex::new(store));
        let orchestrator = GenerationOrchestrator::new(
            store.clone(),
            generator,
            GenerationSettings::immediate(),
            EventBus::new(),
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_single_page_appends_versions() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (orchestrator, store) = setup(generator, 2).await;

        let first = orchestrator.generate_current_page().await.unwrap().finished().unwrap();
        let second = orchestrator.generate_current_page().await.unwrap().finished().unwrap();
        assert_eq!(first.version.version_number, 1);
        assert_eq!(second.version.version_number, 2);

        let store = store.lock().await;
        let entry = store.current().artifacts.get(0).unwrap();
        assert_eq!(entry.current_version_index(), 1);
        assert!(!orchestrator.is_generating());
    }

    #[tokio::test]
    async fn test_empty_session_is_validation_error() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (orchestrator, _) = setup(generator, 0).await;
        assert!(orchestrator.generate_current_page().await.unwrap_err().is_validation());
        assert!(orchestrator.generate_all(None).await.unwrap_err().is_validation());
        assert!(!orchestrator.is_generating());
    }

    #[tokio::test]
    async fn test_failed_single_page_records_nothing() {
        let generator = Arc::new(ScriptedGenerator::failing(&[0]));
        let (orchestrator, store) = setup(generator, 1).await;
        let err = orchestrator.generate_current_page().await.unwrap_err();
        assert_eq!(
            err,
            PanelkitError::generation_failed(Some(0), "page 0 blocked")
        );
        assert!(store.lock().await.current().artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_batch_runs_in_order_and_references_earlier_pages() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (orchestrator, store) = setup(generator.clone(), 3).await;

        let report = orchestrator.generate_all(None).await.unwrap().finished().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.generated.len(), 3);
        assert_eq!(generator.requested_pages(), vec!["p0", "p1", "p2"]);

        let requests = generator.requests.lock().unwrap();
        assert!(requests[0].references.is_empty());
        assert_eq!(
            requests[2]
                .references
                .iter()
                .map(ReferenceImage::image_reference)
                .collect::<Vec<_>>(),
            vec!["img-0-call1", "img-1-call2"]
        );
        drop(requests);

        assert_eq!(store.lock().await.current().artifacts.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_earlier_pages_and_restores_cursor() {
        let generator = Arc::new(ScriptedGenerator::failing(&[2]));
        let (orchestrator, store) = setup(generator.clone(), 4).await;
        {
            let mut store = store.lock().await;
            let id = store.current_session_id().to_string();
            store.modify(&id, |s| s.pages.go_to(1)).unwrap();
        }

        let report = orchestrator.generate_all(None).await.unwrap().finished().unwrap();
        assert!(matches!(report.status, BatchStatus::Failed { page_index: 2, .. }));
        assert_eq!(report.generated.len(), 2);
        // Page 3 was never requested
        assert_eq!(generator.requested_pages(), vec!["p0", "p1", "p2"]);

        let store = store.lock().await;
        let session = store.current();
        assert!(session.artifacts.has_any(0));
        assert!(session.artifacts.has_any(1));
        assert!(!session.artifacts.has_any(2));
        assert_eq!(session.pages.current_index(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_stops_before_next_page() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (orchestrator, store) = setup(generator.clone(), 3).await;
        let token = CancellationToken::new();
        token.cancel();

        let report = orchestrator
            .generate_all(Some(token))
            .await
            .unwrap()
            .finished()
            .unwrap();
        assert_eq!(report.status, BatchStatus::Cancelled { next_page_index: 0 });
        assert!(generator.requested_pages().is_empty());
        assert!(store.lock().await.current().artifacts.is_empty());
    }

    // Cancels the batch token while serving its first request
    struct CancelDuringFirstPage {
        token: CancellationToken,
        calls: StdMutex<usize>,
    }

    #[async_trait]
    impl PageImageGenerator for CancelDuringFirstPage {
        async fn generate(&self, request: PageImageRequest) -> Result<PageImageResult> {
            *self.calls.lock().unwrap() += 1;
            self.token.cancel();
            Ok(PageImageResult::succeeded(format!("img-{}", request.page.title)))
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_finished_page() {
        let token = CancellationToken::new();
        let generator = Arc::new(CancelDuringFirstPage {
            token: token.clone(),
            calls: StdMutex::new(0),
        });
        let storage = Arc::new(MemoryStorage::new());
        let (orchestrator, store) =
            setup_with_storage(generator.clone(), storage.clone(), 3).await;
        {
            let mut store = store.lock().await;
            let id = store.current_session_id().to_string();
            store.modify(&id, |s| s.pages.go_to(2)).unwrap();
        }

        let report = orchestrator
            .generate_all(Some(token))
            .await
            .unwrap()
            .finished()
            .unwrap();
        assert_eq!(report.status, BatchStatus::Cancelled { next_page_index: 1 });
        assert_eq!(report.generated.len(), 1);
        assert_eq!(*generator.calls.lock().unwrap(), 1);
        assert_eq!(store.lock().await.current().pages.current_index(), 2);

        let reloaded = SessionStore::open(storage, Arc::new(UuidGenerator), SessionConfig::default())
            .await
            .unwrap();
        let session = reloaded.current();
        assert_eq!(session.artifacts.len(), 1);
        assert_eq!(session.artifacts.get_current(0).unwrap().image_reference, "img-p0");
        assert_eq!(session.pages.current_index(), 2);
    }

    // Every image is large enough that only one fits under the test quota
    struct LargeImages;

    #[async_trait]
    impl PageImageGenerator for LargeImages {
        async fn generate(&self, request: PageImageRequest) -> Result<PageImageResult> {
            Ok(PageImageResult::succeeded(format!(
                "{}:{}",
                request.page.title,
                "x".repeat(4000)
            )))
        }
    }

    #[tokio::test]
    async fn test_failed_save_is_reported_with_the_recorded_page() {
        let storage = Arc::new(MemoryStorage::with_quota(6000));
        let (orchestrator, store) = setup_with_storage(Arc::new(LargeImages), storage.clone(), 2).await;

        let report = orchestrator.generate_all(None).await.unwrap().finished().unwrap();
        match &report.status {
            BatchStatus::PersistFailed { page_index, error } => {
                assert_eq!(*page_index, 1);
                assert!(error.is_quota_exceeded());
            }
            other => panic!("unexpected batch status: {other:?}"),
        }
        let recorded: Vec<usize> = report.generated.iter().map(|p| p.page_index).collect();
        assert_eq!(recorded, vec![0, 1]);

        // Both versions are in memory; storage still holds the last successful save
        let session = store.lock().await.current().clone();
        assert!(session.artifacts.has_any(0));
        assert!(session.artifacts.has_any(1));

        let reloaded = SessionStore::open(storage, Arc::new(UuidGenerator), SessionConfig::default())
            .await
            .unwrap();
        let saved = reloaded.get(&session.id).unwrap();
        assert!(saved.artifacts.has_any(0));
        assert!(!saved.artifacts.has_any(1));
    }

    #[tokio::test]
    async fn test_failed_save_of_single_page_is_a_storage_error() {
        let storage = Arc::new(MemoryStorage::with_quota(1000));
        let (orchestrator, store) = setup_with_storage(Arc::new(LargeImages), storage, 1).await;

        let err = orchestrator.generate_current_page().await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.lock().await.current().artifacts.has_any(0));
    }

    #[tokio::test]
    async fn test_reentrant_call_is_rejected() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (orchestrator, _) = setup(generator, 1).await;

        let held = orchestrator.begin().unwrap();
        assert!(orchestrator.generate_current_page().await.unwrap().is_rejected());
        assert!(orchestrator.generate_all(None).await.unwrap().is_rejected());
        drop(held);
        assert!(!orchestrator.generate_current_page().await.unwrap().is_rejected());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = GenerationSettings::from_config(&GenerationConfig::default(), None);
        assert_eq!(settings, GenerationSettings::default());
    }
}
