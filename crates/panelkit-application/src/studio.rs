//! Application context.
//!
//! `Studio` is constructed once and handed to whatever drives the app (the
//! CLI, tests). It owns the session store and the collaborators, and every
//! mutating call follows the same sequence: mutate in memory, persist, emit.

use std::sync::Arc;

use panelkit_core::artifact::ArtifactEntry;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::generation::{
    PageImageGenerator, PromptOptimizer, ScriptGenerator, ScriptRequest, SessionTitler,
    TextRequestContext,
};
use panelkit_core::page::{Page, PageInput, parse_pages};
use panelkit_core::session::{
    EventBus, Session, SessionConfig, SessionEvent, SessionPatch, SessionStore, UuidGenerator,
    is_default_session_name,
};
use panelkit_core::storage::StateStorage;
use panelkit_infrastructure::{AppConfig, JsonFileStorage};
use panelkit_interaction::{
    BackendClient, HttpPageImageGenerator, HttpPromptOptimizer, HttpScriptGenerator,
    HttpSessionTitler,
};
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{
    BatchReport, GeneratedPage, GenerationOrchestrator, GenerationOutcome, GenerationSettings,
};

/// Where the page cursor should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Next,
    Prev,
    To(usize),
}

pub struct Studio {
    store: Arc<Mutex<SessionStore>>,
    orchestrator: GenerationOrchestrator,
    script_generator: Option<Arc<dyn ScriptGenerator>>,
    prompt_optimizer: Option<Arc<dyn PromptOptimizer>>,
    session_titler: Option<Arc<dyn SessionTitler>>,
    events: EventBus,
}

impl Studio {
    pub fn new(
        store: SessionStore,
        generator: Arc<dyn PageImageGenerator>,
        settings: GenerationSettings,
    ) -> Self {
        let store = Arc::new(Mutex::new(store));
        let events = EventBus::new();
        let orchestrator =
            GenerationOrchestrator::new(store.clone(), generator, settings, events.clone());
        Self {
            store,
            orchestrator,
            script_generator: None,
            prompt_optimizer: None,
            session_titler: None,
            events,
        }
    }

    pub fn with_script_generator(mut self, generator: Arc<dyn ScriptGenerator>) -> Self {
        self.script_generator = Some(generator);
        self
    }

    pub fn with_prompt_optimizer(mut self, optimizer: Arc<dyn PromptOptimizer>) -> Self {
        self.prompt_optimizer = Some(optimizer);
        self
    }

    pub fn with_session_titler(mut self, titler: Arc<dyn SessionTitler>) -> Self {
        self.session_titler = Some(titler);
        self
    }

    /// Wires file storage and the HTTP backend from `config`.
    ///
    /// Credentials are read from the environment.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let storage: Arc<dyn StateStorage> = Arc::new(
            JsonFileStorage::new(config.storage_dir()?).with_quota(config.storage.quota_bytes),
        );
        let store = SessionStore::open(
            storage,
            Arc::new(UuidGenerator),
            config.session_defaults(),
        )
        .await?;

        let client = BackendClient::new(config.backend.base_url.clone())
            .with_timeout(std::time::Duration::from_secs(config.backend.timeout_secs));
        let settings = GenerationSettings::from_config(&config.generation, AppConfig::api_key());

        Ok(Self::new(
            store,
            Arc::new(HttpPageImageGenerator::new(client.clone())),
            settings,
        )
        .with_script_generator(Arc::new(HttpScriptGenerator::new(client.clone())))
        .with_prompt_optimizer(Arc::new(HttpPromptOptimizer::new(client.clone())))
        .with_session_titler(Arc::new(HttpSessionTitler::new(client))))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.orchestrator.is_generating()
    }

    /// Persists and emits `Persisted`. The store guard is held by the caller
    /// so the mutation and its write are never interleaved with another one.
    async fn persist(&self, store: &MutexGuard<'_, SessionStore>) -> Result<()> {
        store.persist().await?;
        self.events.emit(SessionEvent::Persisted);
        Ok(())
    }

    /// All sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Vec<Session> {
        self.store.lock().await.list().into_iter().cloned().collect()
    }

    pub async fn current_session(&self) -> Session {
        self.store.lock().await.current().clone()
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.store.lock().await.get(id).cloned()
    }

    /// Config given to sessions created without one.
    pub async fn session_defaults(&self) -> SessionConfig {
        self.store.lock().await.defaults().clone()
    }

    /// Creates a session without switching to it.
    pub async fn create_session(&self, name: &str, config: Option<SessionConfig>) -> Result<Session> {
        if let Some(config) = &config {
            config.validate()?;
        }
        let mut store = self.store.lock().await;
        let session = store.create(name, config);
        self.persist(&store).await?;
        self.events.emit(SessionEvent::SessionCreated {
            session_id: session.id.clone(),
        });
        Ok(session)
    }

    pub async fn switch_session(&self, id: &str) -> Result<Session> {
        let mut store = self.store.lock().await;
        let session = store.switch(id)?.clone();
        self.persist(&store).await?;
        self.events.emit(SessionEvent::SessionSwitched {
            session_id: id.to_string(),
        });
        Ok(session)
    }

    pub async fn rename_session(&self, id: &str, name: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.rename(id, name)?;
        self.persist(&store).await?;
        self.events.emit(SessionEvent::SessionRenamed {
            session_id: id.to_string(),
            name: name.trim().to_string(),
        });
        Ok(())
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.delete(id)?;
        self.persist(&store).await?;
        self.events.emit(SessionEvent::SessionDeleted {
            session_id: id.to_string(),
        });
        Ok(())
    }

    /// Drops every session and starts over with a single default one.
    pub async fn clear_all_sessions(&self) -> Result<Session> {
        let mut store = self.store.lock().await;
        let session = store.reset().clone();
        self.persist(&store).await?;
        self.events.emit(SessionEvent::SessionCreated {
            session_id: session.id.clone(),
        });
        Ok(session)
    }

    /// Updates the current session's settings and prompt fields.
    ///
    /// Pages and artifacts in `patch` are ignored; use the page operations.
    pub async fn update_current(&self, patch: SessionPatch) -> Result<Session> {
        let mut store = self.store.lock().await;
        let id = store.current_session_id().to_string();
        patch.config_over(&store.current().config).validate()?;
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(PanelkitError::validation("Session name must not be empty"));
            }
        }
        let patch = SessionPatch {
            name: patch.name.map(|n| n.trim().to_string()),
            pages: None,
            artifacts: None,
            ..patch
        };
        store.update(&id, patch);
        self.persist(&store).await?;
        Ok(store.current().clone())
    }

    /// Writes the current session's pages from its prompt.
    ///
    /// The new pages replace the old ones and the session's generated images
    /// are cleared, since they were drawn for the previous script. A
    /// default-named session is then given a title (best effort). Returns the
    /// number of pages written. Shares the single generation slot with image
    /// generation, so it is rejected while a page is being drawn.
    ///
    /// # Errors
    ///
    /// - `Validation` if the prompt is blank, the page settings are out of
    ///   range, or no script generator is configured
    /// - `GenerationFailed` if the generator fails; the session is unchanged
    /// - storage errors from persisting the new pages
    pub async fn generate_pages(&self) -> Result<GenerationOutcome<usize>> {
        let Some(generator) = &self.script_generator else {
            return Err(PanelkitError::validation("No script generator configured"));
        };
        let Some(in_flight) = self.orchestrator.begin() else {
            tracing::warn!("Generation already in progress, ignoring script request");
            return Ok(GenerationOutcome::Rejected);
        };

        let (id, request) = {
            let store = self.store.lock().await;
            let session = store.current();
            let prompt = session.prompt_text.trim();
            if prompt.is_empty() {
                return Err(PanelkitError::validation("Prompt must not be empty"));
            }
            session.config.validate()?;
            let request = ScriptRequest {
                prompt: prompt.to_string(),
                page_count: session.config.page_count,
                rows_per_page: session.config.rows_per_page,
                style: session.config.style.clone(),
                language: session.config.language.clone(),
                credentials: self.orchestrator.settings().credentials.clone(),
            };
            (session.id.clone(), request)
        };

        tracing::info!(session_id = %id, page_count = request.page_count, "Requesting page script");
        let pages = generator.generate_script(request).await?;
        let count = pages.len();

        {
            let mut store = self.store.lock().await;
            store.modify(&id, |session| {
                session.pages.set_pages(pages);
                session.artifacts.clear();
                Ok(())
            })?;
            self.persist(&store).await?;
        }
        drop(in_flight);
        tracing::info!(session_id = %id, pages = count, "Pages written from prompt");
        self.events.emit(SessionEvent::PageChanged {
            session_id: id,
            page_index: 0,
        });

        self.auto_title().await;
        Ok(GenerationOutcome::Finished(count))
    }

    /// Replaces the current session's pages with a parsed page script, then
    /// tries to give a default-named session a real title.
    ///
    /// Returns the number of pages set.
    pub async fn import_pages(&self, json: &str) -> Result<usize> {
        let pages = parse_pages(json)?;
        let count = pages.len();
        self.set_pages(pages).await?;
        self.auto_title().await;
        Ok(count)
    }

    /// Replaces the current session's pages and resets the cursor.
    pub async fn set_pages(&self, input: impl Into<PageInput>) -> Result<()> {
        let input = input.into();
        let mut store = self.store.lock().await;
        let id = store.current_session_id().to_string();
        store.modify(&id, |session| {
            session.pages.set_pages(input);
            Ok(())
        })?;
        self.persist(&store).await?;
        self.events.emit(SessionEvent::PageChanged {
            session_id: id,
            page_index: 0,
        });
        Ok(())
    }

    /// Moves the page cursor. Returns false for a boundary move.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for `PageMove::To` outside the page range.
    pub async fn move_page(&self, movement: PageMove) -> Result<bool> {
        let mut store = self.store.lock().await;
        let id = store.current_session_id().to_string();
        let (moved, page_index) = store.modify(&id, |session| {
            let moved = match movement {
                PageMove::Next => session.pages.next(),
                PageMove::Prev => session.pages.prev(),
                PageMove::To(index) => session.pages.go_to(index).map(|()| true)?,
            };
            Ok((moved, session.pages.current_index()))
        })?;
        if moved {
            self.persist(&store).await?;
            self.events.emit(SessionEvent::PageChanged {
                session_id: id,
                page_index,
            });
        }
        Ok(moved)
    }

    /// Replaces the page under the cursor with a hand-edited copy.
    pub async fn update_current_page(&self, page: Page) -> Result<()> {
        self.edit_current_page(|session| {
            if session.pages.update_current(page) {
                Ok(())
            } else {
                Err(PanelkitError::validation("No current page to update"))
            }
        })
        .await
    }

    /// Sets the text of one panel on the page under the cursor.
    pub async fn edit_panel_text(&self, row: usize, panel: usize, text: &str) -> Result<()> {
        self.edit_current_page(|session| session.pages.set_panel_text(row, panel, text))
            .await
    }

    async fn edit_current_page(
        &self,
        edit: impl FnOnce(&mut Session) -> Result<()>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        let id = store.current_session_id().to_string();
        let page_index = store.modify(&id, |session| {
            edit(session)?;
            Ok(session.pages.current_index())
        })?;
        self.persist(&store).await?;
        self.events.emit(SessionEvent::PageChanged {
            session_id: id,
            page_index,
        });
        Ok(())
    }

    /// Makes an earlier (or later) version the one shown and referenced.
    pub async fn select_version(&self, page_index: usize, version_index: usize) -> Result<()> {
        let mut store = self.store.lock().await;
        let id = store.current_session_id().to_string();
        store.modify(&id, |session| {
            session.artifacts.select_version(page_index, version_index)
        })?;
        self.persist(&store).await
    }

    pub async fn artifacts(&self) -> Vec<ArtifactEntry> {
        let store = self.store.lock().await;
        store.current().artifacts.entries().cloned().collect()
    }

    pub async fn generate_current_page(&self) -> Result<GenerationOutcome<GeneratedPage>> {
        self.orchestrator.generate_current_page().await
    }

    pub async fn generate_all(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<GenerationOutcome<BatchReport>> {
        self.orchestrator.generate_all(cancel).await
    }

    fn text_context(&self, session: &Session) -> TextRequestContext {
        TextRequestContext {
            style: session.config.style.clone(),
            language: session.config.language.clone(),
            credentials: self.orchestrator.settings().credentials.clone(),
        }
    }

    /// Replaces the prompt with a refined version.
    ///
    /// Best effort: if no optimizer is configured or it fails, the prompt is
    /// left as it was. Returns the prompt now stored.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the prompt is blank, or a storage error if
    /// the refined prompt cannot be persisted.
    pub async fn optimize_prompt(&self) -> Result<String> {
        let (id, prompt, context) = {
            let store = self.store.lock().await;
            let session = store.current();
            (
                session.id.clone(),
                session.prompt_text.clone(),
                self.text_context(session),
            )
        };
        if prompt.trim().is_empty() {
            return Err(PanelkitError::validation("Prompt must not be empty"));
        }
        let Some(optimizer) = &self.prompt_optimizer else {
            return Ok(prompt);
        };

        let refined = match optimizer.optimize(&prompt, &context).await {
            Ok(refined) if !refined.trim().is_empty() => refined,
            Ok(_) => return Ok(prompt),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Prompt optimization failed, keeping original");
                return Ok(prompt);
            }
        };

        let mut store = self.store.lock().await;
        let updated = store.update(
            &id,
            SessionPatch {
                prompt_text: Some(refined.clone()),
                ..Default::default()
            },
        );
        if !updated {
            return Err(PanelkitError::not_found("session", id));
        }
        self.persist(&store).await?;
        Ok(refined)
    }

    /// Renames the current session from its content if it still has a
    /// generated name. Failures are logged and ignored.
    async fn auto_title(&self) {
        let Some(titler) = &self.session_titler else {
            return;
        };
        let (id, prompt, pages, context) = {
            let store = self.store.lock().await;
            let session = store.current();
            if !is_default_session_name(&session.name) {
                return;
            }
            (
                session.id.clone(),
                session.prompt_text.clone(),
                session.pages.pages().to_vec(),
                self.text_context(session),
            )
        };

        let title = match titler.title(&prompt, &pages, &context).await {
            Ok(title) => title,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Session title generation failed");
                return;
            }
        };

        let mut store = self.store.lock().await;
        // The user may have renamed the session while the request ran
        if !store.get(&id).is_some_and(|s| is_default_session_name(&s.name)) {
            return;
        }
        if let Err(e) = store.rename(&id, &title) {
            tracing::warn!(session_id = %id, error = %e, "Ignoring generated session title");
            return;
        }
        match self.persist(&store).await {
            Ok(()) => {
                tracing::info!(session_id = %id, title = %title.trim(), "Applied generated session title");
                self.events.emit(SessionEvent::SessionRenamed {
                    session_id: id,
                    name: title.trim().to_string(),
                });
            }
            Err(e) => tracing::warn!(session_id = %id, error = %e, "Failed to persist session title"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panelkit_core::generation::{PageImageRequest, PageImageResult};
    use panelkit_infrastructure::MemoryStorage;

    struct AlwaysOk;

    #[async_trait]
    impl PageImageGenerator for AlwaysOk {
        async fn generate(&self, _request: PageImageRequest) -> Result<PageImageResult> {
            Ok(PageImageResult::succeeded("img"))
        }
    }

    struct FixedText(Result<String>);

    #[async_trait]
    impl PromptOptimizer for FixedText {
        async fn optimize(&self, _prompt: &str, _context: &TextRequestContext) -> Result<String> {
            self.0.clone()
        }
    }

    #[async_trait]
    impl SessionTitler for FixedText {
        async fn title(
            &self,
            _prompt: &str,
            _pages: &[Page],
            _context: &TextRequestContext,
        ) -> Result<String> {
            self.0.clone()
        }
    }

    // Returns two pages per prompt and records what it was asked for
    #[derive(Default)]
    struct ScriptedPages {
        fail: bool,
        requests: std::sync::Mutex<Vec<ScriptRequest>>,
    }

    #[async_trait]
    impl ScriptGenerator for ScriptedPages {
        async fn generate_script(&self, request: ScriptRequest) -> Result<Vec<Page>> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(PanelkitError::generation_failed(None, "backend unreachable"));
            }
            parse_pages(SCRIPT)
        }
    }

    const SCRIPT: &str = r#"[
        {"title": "One", "rows": [{"height": "150px", "panels": [{"text": "a"}]}]},
        {"title": "Two", "rows": [{"height": "150px", "panels": [{"text": "b"}]}]}
    ]"#;

    async fn studio_with(storage: Arc<MemoryStorage>) -> Studio {
        let store = SessionStore::open(storage, Arc::new(UuidGenerator), SessionConfig::default())
            .await
            .unwrap();
        Studio::new(store, Arc::new(AlwaysOk), GenerationSettings::immediate())
    }

    async fn studio() -> Studio {
        studio_with(Arc::new(MemoryStorage::new())).await
    }

    #[tokio::test]
    async fn test_import_pages_and_navigate() {
        let studio = studio().await;
        assert_eq!(studio.import_pages(SCRIPT).await.unwrap(), 2);

        assert!(studio.move_page(PageMove::Next).await.unwrap());
        assert!(!studio.move_page(PageMove::Next).await.unwrap());
        assert!(studio.move_page(PageMove::To(5)).await.unwrap_err().is_not_found());
        assert_eq!(studio.current_session().await.pages.current_index(), 1);
    }

    #[tokio::test]
    async fn test_generate_pages_from_prompt() {
        let storage = Arc::new(MemoryStorage::new());
        let generator = Arc::new(ScriptedPages::default());
        let studio = studio_with(storage.clone())
            .await
            .with_script_generator(generator.clone())
            .with_session_titler(Arc::new(FixedText(Ok("Flying Cat".into()))));

        studio
            .update_current(SessionPatch {
                prompt_text: Some("  a cat learns to fly ".into()),
                page_count: Some(2),
                rows_per_page: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        // Images drawn for an earlier script
        studio.import_pages(SCRIPT).await.unwrap();
        studio.generate_current_page().await.unwrap();
        assert_eq!(studio.artifacts().await.len(), 1);
        studio.move_page(PageMove::Next).await.unwrap();

        let outcome = studio.generate_pages().await.unwrap();
        assert_eq!(outcome.finished(), Some(2));

        let request = generator.requests.lock().unwrap()[0].clone();
        assert_eq!(request.prompt, "a cat learns to fly");
        assert_eq!((request.page_count, request.rows_per_page), (2, 3));

        let session = studio.current_session().await;
        assert_eq!(session.pages.count(), 2);
        assert_eq!(session.pages.current_index(), 0);
        assert!(session.artifacts.is_empty());
        assert_eq!(session.name, "Flying Cat");

        let reopened = studio_with(storage).await;
        let saved = reopened.current_session().await;
        assert_eq!(saved.pages.count(), 2);
        assert!(saved.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_generate_pages_validates_before_calling_backend() {
        let generator = Arc::new(ScriptedPages::default());
        let studio = studio().await.with_script_generator(generator.clone());
        assert!(studio.generate_pages().await.unwrap_err().is_validation());
        assert!(generator.requests.lock().unwrap().is_empty());

        assert!(studio_with(Arc::new(MemoryStorage::new()))
            .await
            .generate_pages()
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_failed_script_generation_leaves_session_unchanged() {
        let studio = studio().await.with_script_generator(Arc::new(ScriptedPages {
            fail: true,
            ..Default::default()
        }));
        studio.import_pages(SCRIPT).await.unwrap();
        studio
            .update_current(SessionPatch {
                prompt_text: Some("cats".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = studio.generate_pages().await.unwrap_err();
        assert!(err.is_generation_failed());
        assert_eq!(studio.current_session().await.pages.count(), 2);
        assert!(!studio.is_generating());
    }

    #[tokio::test]
    async fn test_generate_pages_is_rejected_while_drawing() {
        let studio = studio()
            .await
            .with_script_generator(Arc::new(ScriptedPages::default()));
        studio
            .update_current(SessionPatch {
                prompt_text: Some("cats".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let held = studio.orchestrator.begin().unwrap();
        assert!(studio.generate_pages().await.unwrap().is_rejected());
        drop(held);
        assert!(!studio.generate_pages().await.unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_script() {
        let studio = studio().await;
        let err = studio.import_pages(r#"[{"title": "x"}]"#).await.unwrap_err();
        assert!(err.is_validation());
        assert!(studio.current_session().await.pages.is_empty());
    }

    #[tokio::test]
    async fn test_edit_panel_text_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let studio = studio_with(storage.clone()).await;
        studio.import_pages(SCRIPT).await.unwrap();
        studio.edit_panel_text(0, 0, "edited").await.unwrap();

        let reopened = studio_with(storage).await;
        let session = reopened.current_session().await;
        assert_eq!(session.pages.current().unwrap().rows[0].panels[0].text, "edited");
    }

    #[tokio::test]
    async fn test_auto_title_renames_default_session_only() {
        let studio = studio()
            .await
            .with_session_titler(Arc::new(FixedText(Ok("Space Cats".into()))));
        studio.import_pages(SCRIPT).await.unwrap();
        assert_eq!(studio.current_session().await.name, "Space Cats");

        // A custom name is left alone
        let id = studio.current_session().await.id;
        studio.rename_session(&id, "Mine").await.unwrap();
        studio.import_pages(SCRIPT).await.unwrap();
        assert_eq!(studio.current_session().await.name, "Mine");
    }

    #[tokio::test]
    async fn test_auto_title_failure_is_ignored() {
        let studio = studio().await.with_session_titler(Arc::new(FixedText(Err(
            PanelkitError::generation_failed(None, "down"),
        ))));
        assert_eq!(studio.import_pages(SCRIPT).await.unwrap(), 2);
        assert_eq!(studio.current_session().await.name, "session 1");
    }

    #[tokio::test]
    async fn test_optimize_prompt_is_best_effort() {
        let studio = studio()
            .await
            .with_prompt_optimizer(Arc::new(FixedText(Err(PanelkitError::generation_failed(
                None, "down",
            )))));
        assert!(studio.optimize_prompt().await.unwrap_err().is_validation());

        studio
            .update_current(SessionPatch {
                prompt_text: Some("cats".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(studio.optimize_prompt().await.unwrap(), "cats");
        assert_eq!(studio.current_session().await.prompt_text, "cats");

        let studio = studio.with_prompt_optimizer(Arc::new(FixedText(Ok("cats in space".into()))));
        assert_eq!(studio.optimize_prompt().await.unwrap(), "cats in space");
        assert_eq!(studio.current_session().await.prompt_text, "cats in space");
    }

    #[tokio::test]
    async fn test_update_current_validates_ranges() {
        let studio = studio().await;
        let err = studio
            .update_current(SessionPatch {
                page_count: Some(11),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let session = studio
            .update_current(SessionPatch {
                rows_per_page: Some(5),
                style: Some("manga".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(session.config.rows_per_page, 5);
        assert_eq!(session.config.style, "manga");
    }

    #[tokio::test]
    async fn test_session_lifecycle_events() {
        let studio = studio().await;
        let mut events = studio.subscribe();

        let created = studio.create_session("", None).await.unwrap();
        assert_eq!(created.name, "session 2");
        studio.switch_session(&created.id).await.unwrap();
        studio.delete_session(&created.id).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if event != SessionEvent::Persisted {
                seen.push(event);
            }
        }
        assert_eq!(
            seen,
            vec![
                SessionEvent::SessionCreated {
                    session_id: created.id.clone()
                },
                SessionEvent::SessionSwitched {
                    session_id: created.id.clone()
                },
                SessionEvent::SessionDeleted {
                    session_id: created.id.clone()
                },
            ]
        );
        assert_eq!(studio.list_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_quota_failure_surfaces_and_keeps_memory() {
        let storage = Arc::new(MemoryStorage::with_quota(64));
        let studio = studio_with(storage).await;
        let err = studio.import_pages(SCRIPT).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        // The pages are still there for the user to retry or trim
        assert_eq!(studio.current_session().await.pages.count(), 2);
    }

    #[tokio::test]
    async fn test_clear_all_sessions() {
        let studio = studio().await;
        studio.create_session("a", None).await.unwrap();
        let fresh = studio.clear_all_sessions().await.unwrap();
        let sessions = studio.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, fresh.id);
    }
}
