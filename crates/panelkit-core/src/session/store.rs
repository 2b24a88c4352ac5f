//! Session store: every session, the current-session pointer, persistence
//! and garbage collection of abandoned empty sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::id::IdGenerator;
use super::model::{Session, SessionConfig, SessionPatch};
use crate::error::{PanelkitError, Result};
use crate::storage::{CURRENT_SESSION_KEY, SESSIONS_KEY, StateStorage};

static DEFAULT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^session \d+$").expect("Valid regex pattern"));

/// Returns true for generated names such as `session 3`.
pub fn is_default_session_name(name: &str) -> bool {
    DEFAULT_NAME_PATTERN.is_match(name.trim())
}

/// Whether a session survives garbage collection.
///
/// Non-empty sessions are always kept; an empty session is kept only if it
/// is `keep_id` (the session the user is looking at).
pub fn is_retained(id: &str, session: &Session, keep_id: Option<&str>) -> bool {
    !session.is_empty() || keep_id == Some(id)
}

/// Owns all sessions and the current-session pointer.
///
/// Invariants:
/// - there is always at least one session
/// - `current_session_id` always names an existing session
///
/// In-memory operations (`create`, `switch`, `update`, ...) never touch
/// storage; callers sequence them with [`persist`](Self::persist).
pub struct SessionStore {
    sessions: BTreeMap<String, Session>,
    current_session_id: String,
    defaults: SessionConfig,
    storage: Arc<dyn StateStorage>,
    id_generator: Arc<dyn IdGenerator>,
}

impl SessionStore {
    /// Loads persisted sessions, creating a default session on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the stored session map
    /// is not valid JSON. Individual unreadable sessions are skipped.
    pub async fn open(
        storage: Arc<dyn StateStorage>,
        id_generator: Arc<dyn IdGenerator>,
        defaults: SessionConfig,
    ) -> Result<Self> {
        let mut store = Self {
            sessions: BTreeMap::new(),
            current_session_id: String::new(),
            defaults,
            storage,
            id_generator,
        };
        store.load().await?;
        Ok(store)
    }

    /// Replaces in-memory state with what is persisted.
    ///
    /// Empty sessions are filtered against the *saved* current id, so stale
    /// empty sessions are not resurrected. If nothing survives, a default
    /// session is created and made current.
    pub async fn load(&mut self) -> Result<()> {
        let saved_current = self.read_saved_current_id().await?;
        let mut sessions = self.read_saved_sessions().await?;

        // The saved current session survives the filter even when empty, so a
        // set that existed before filtering never filters down to nothing
        // unless the saved current id is stale.
        let before = sessions.len();
        sessions.retain(|id, session| is_retained(id, session, saved_current.as_deref()));
        tracing::debug!(
            loaded = before,
            retained = sessions.len(),
            "Filtered empty sessions on load"
        );

        self.sessions = sessions;
        self.current_session_id = String::new();

        if self.sessions.is_empty() {
            let session = self.create("", None);
            self.current_session_id = session.id;
        } else {
            self.current_session_id = match saved_current {
                Some(id) if self.sessions.contains_key(&id) => id,
                _ => self.first_id()?,
            };
        }

        tracing::info!(
            sessions = self.sessions.len(),
            current = %self.current_session_id,
            "Session store loaded"
        );
        Ok(())
    }

    async fn read_saved_current_id(&self) -> Result<Option<String>> {
        let raw = self.storage.get(CURRENT_SESSION_KEY).await?;
        Ok(raw.and_then(|raw| {
            // Older data stored the bare id rather than a JSON string
            let id = serde_json::from_str::<String>(&raw).unwrap_or_else(|_| raw.trim().to_string());
            (!id.is_empty()).then_some(id)
        }))
    }

    async fn read_saved_sessions(&self) -> Result<BTreeMap<String, Session>> {
        let Some(raw) = self.storage.get(SESSIONS_KEY).await? else {
            return Ok(BTreeMap::new());
        };
        let records: BTreeMap<String, Value> = serde_json::from_str(&raw)?;

        let mut sessions = BTreeMap::new();
        for (id, record) in records {
            match serde_json::from_value::<Session>(record) {
                Ok(mut session) => {
                    session.id = id.clone();
                    sessions.insert(id, session);
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Skipping unreadable stored session");
                }
            }
        }
        Ok(sessions)
    }

    /// Writes all retained sessions and the current id to storage.
    ///
    /// Empty sessions other than the current one are left out; the in-memory
    /// map is never modified, whether the write succeeds or not.
    ///
    /// The two keys are written one after the other. If the current id cannot
    /// be written, the previous session map is put back so the stored pointer
    /// still names a session in the stored map.
    ///
    /// # Errors
    ///
    /// Returns `StorageQuotaExceeded` if storage rejects the write for lack of
    /// space, or another storage/serialization error.
    pub async fn persist(&self) -> Result<()> {
        let keep = Some(self.current_session_id.as_str());
        let retained: BTreeMap<&str, &Session> = self
            .sessions
            .iter()
            .filter(|(id, session)| is_retained(id, session, keep))
            .map(|(id, session)| (id.as_str(), session))
            .collect();

        tracing::debug!(
            in_memory = self.sessions.len(),
            persisted = retained.len(),
            "Persisting sessions"
        );

        let payload = serde_json::to_string(&retained)?;
        let current = serde_json::to_string(&self.current_session_id)?;
        let previous = self.storage.get(SESSIONS_KEY).await?;

        self.storage
            .set(SESSIONS_KEY, &payload)
            .await
            .map_err(|e| with_key(e, SESSIONS_KEY))?;

        if let Err(e) = self.storage.set(CURRENT_SESSION_KEY, &current).await {
            let restored = match &previous {
                Some(raw) => self.storage.set(SESSIONS_KEY, raw).await,
                None => self.storage.remove(SESSIONS_KEY).await,
            };
            if let Err(restore_err) = restored {
                tracing::warn!(error = %restore_err, "Failed to restore previous session map");
            }
            return Err(with_key(e, CURRENT_SESSION_KEY));
        }
        Ok(())
    }

    /// Creates a session without switching to it.
    ///
    /// A blank `name` becomes `session N` (N = number of sessions + 1).
    /// Config falls back to the store defaults.
    pub fn create(&mut self, name: &str, config: Option<SessionConfig>) -> Session {
        let id = self.id_generator.generate();
        let name = match name.trim() {
            "" => format!("session {}", self.sessions.len() + 1),
            trimmed => trimmed.to_string(),
        };
        let session = Session::new(
            id.clone(),
            name,
            config.unwrap_or_else(|| self.defaults.clone()),
            Utc::now(),
        );
        tracing::info!(session_id = %id, name = %session.name, "Created session");
        self.sessions.insert(id, session.clone());
        session
    }

    /// Makes `id` the current session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` does not exist.
    pub fn switch(&mut self, id: &str) -> Result<&Session> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| PanelkitError::not_found("session", id))?;
        self.current_session_id = id.to_string();
        tracing::info!(session_id = %id, "Switched session");
        Ok(session)
    }

    /// Merges `patch` into a session and bumps its `updated_at`.
    ///
    /// Returns false if `id` is unknown.
    pub fn update(&mut self, id: &str, patch: SessionPatch) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.apply(patch, Utc::now());
                true
            }
            None => false,
        }
    }

    /// Runs `f` against a session and bumps its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is unknown, or whatever `f` returns.
    pub fn modify<R>(&mut self, id: &str, f: impl FnOnce(&mut Session) -> Result<R>) -> Result<R> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PanelkitError::not_found("session", id))?;
        let result = f(session)?;
        session.updated_at = Utc::now();
        Ok(result)
    }

    /// Renames a session. The new name is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is blank and `NotFound` if `id` is unknown.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(PanelkitError::validation("Session name must not be empty"));
        }
        if !self.update(
            id,
            SessionPatch {
                name: Some(new_name.to_string()),
                ..Default::default()
            },
        ) {
            return Err(PanelkitError::not_found("session", id));
        }
        Ok(())
    }

    /// Deletes a session, switching away from it first if it is current.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is unknown and `LastSession` if it is the
    /// only session.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if !self.sessions.contains_key(id) {
            return Err(PanelkitError::not_found("session", id));
        }
        if self.sessions.len() == 1 {
            return Err(PanelkitError::LastSession { id: id.to_string() });
        }

        if self.current_session_id == id {
            let other = self
                .sessions
                .keys()
                .find(|other| other.as_str() != id)
                .cloned()
                .ok_or_else(|| PanelkitError::internal("no session to switch to"))?;
            self.switch(&other)?;
        }

        self.sessions.remove(id);
        tracing::info!(session_id = %id, "Deleted session");
        Ok(())
    }

    /// Drops every session and starts over with one default session.
    pub fn reset(&mut self) -> &Session {
        self.sessions.clear();
        let session = self.create("", None);
        self.current_session_id = session.id.clone();
        tracing::info!(session_id = %session.id, "Reset all sessions");
        &self.sessions[&self.current_session_id]
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn current(&self) -> &Session {
        &self.sessions[&self.current_session_id]
    }

    pub fn current_session_id(&self) -> &str {
        &self.current_session_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn defaults(&self) -> &SessionConfig {
        &self.defaults
    }

    fn first_id(&self) -> Result<String> {
        self.sessions
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| PanelkitError::internal("session store is empty"))
    }
}

fn with_key(err: PanelkitError, key: &str) -> PanelkitError {
    match err {
        PanelkitError::StorageQuotaExceeded { key: k, message } if k.is_empty() => {
            PanelkitError::quota_exceeded(key, message)
        }
        other => other,
    }
}
