//! Session state service.
//!
//! The orchestrator reads a session once per turn and writes it back once
//! the turn succeeds. Concurrent turns on the same id are not serialized;
//! the last `put` wins.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::session::{SessionId, SessionState};

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored state, creating an idle one when absent or expired.
    async fn get_or_create(&self, id: &SessionId) -> Result<SessionState, SessionStoreError>;
    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>, SessionStoreError>;
    async fn put(&self, id: &SessionId, state: SessionState) -> Result<(), SessionStoreError>;
    /// Returns whether a session was removed.
    async fn delete(&self, id: &SessionId) -> Result<bool, SessionStoreError>;
    /// Drops idle sessions and returns how many were removed.
    async fn evict_expired(&self) -> Result<usize, SessionStoreError>;
    async fn len(&self) -> Result<usize, SessionStoreError>;
}

#[derive(Debug)]
struct SessionEntry {
    state: SessionState,
    last_touched: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_touched) >= ttl
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: &SessionId) -> Result<SessionState, SessionStoreError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(id.clone())
            .or_insert_with(|| SessionEntry { state: SessionState::default(), last_touched: now });
        if entry.is_expired(self.ttl, now) {
            entry.state = SessionState::default();
        }
        entry.last_touched = now;
        Ok(entry.state.clone())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>, SessionStoreError> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.state.clone()))
    }

    async fn put(&self, id: &SessionId, state: SessionState) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), SessionEntry { state, last_touched: Instant::now() });
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(id).is_some())
    }

    async fn evict_expired(&self) -> Result<usize, SessionStoreError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl, now));
        Ok(before - sessions.len())
    }

    async fn len(&self) -> Result<usize, SessionStoreError> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::domain::session::{SessionId, SessionState};

    use super::{InMemorySessionStore, SessionStore};

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn repeated_lookup_of_unseen_id_stays_idle() {
        let store = store();
        let id = SessionId::new("fresh");

        let first = store.get_or_create(&id).await.expect("first lookup");
        let second = store.get_or_create(&id).await.expect("second lookup");

        assert_eq!(first.step, 0);
        assert_eq!(second.step, 0);
        assert_eq!(first, second);
        assert_eq!(store.len().await.expect("len"), 1);
    }

    #[tokio::test]
    async fn different_ids_do_not_share_state() {
        let store = store();
        let alpha = SessionId::new("alpha");
        let beta = SessionId::new("beta");

        let mut state = store.get_or_create(&alpha).await.expect("alpha");
        state.step = 4;
        state.pending_action = Some("create-chatbot".to_string());
        state.collected_data =
            json!({"botname": "helper"}).as_object().cloned().unwrap_or_default();
        store.put(&alpha, state.clone()).await.expect("put alpha");

        let other = store.get_or_create(&beta).await.expect("beta");
        assert_eq!(other, SessionState::default());
        assert_eq!(store.get(&alpha).await.expect("get alpha"), Some(state));
    }

    #[tokio::test]
    async fn last_put_wins() {
        let store = store();
        let id = SessionId::new("race");

        store.put(&id, SessionState { step: 1, ..SessionState::default() }).await.expect("put");
        store.put(&id, SessionState { step: 7, ..SessionState::default() }).await.expect("put");

        assert_eq!(store.get(&id).await.expect("get").map(|state| state.step), Some(7));
    }

    #[tokio::test]
    async fn delete_reports_whether_session_existed() {
        let store = store();
        let id = SessionId::new("gone");
        store.get_or_create(&id).await.expect("create");

        assert!(store.delete(&id).await.expect("delete"));
        assert!(!store.delete(&id).await.expect("second delete"));
        assert_eq!(store.get(&id).await.expect("get"), None);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_after_ttl() {
        let store = InMemorySessionStore::new(Duration::from_millis(20));
        let id = SessionId::new("idle");
        store.put(&id, SessionState { step: 2, ..SessionState::default() }).await.expect("put");

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.get(&id).await.expect("get"), None);
        assert_eq!(store.evict_expired().await.expect("evict"), 1);
        assert_eq!(store.len().await.expect("len"), 0);
    }

    #[tokio::test]
    async fn expired_session_is_recreated_idle() {
        let store = InMemorySessionStore::new(Duration::from_millis(20));
        let id = SessionId::new("stale");
        store.put(&id, SessionState { step: 9, ..SessionState::default() }).await.expect("put");

        tokio::time::sleep(Duration::from_millis(40)).await;

        let state = store.get_or_create(&id).await.expect("recreate");
        assert_eq!(state, SessionState::default());
    }
}
