//! In-memory conversation transcripts keyed by session id.
//!
//! Sessions are created implicitly on first reference and live until they are
//! explicitly deleted or the process stops. There is no eviction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;
use voxrelay_types::{Role, Turn};

/// Owns every session transcript.
///
/// Uses `std::sync::RwLock`: every lock acquisition is a brief HashMap
/// operation that never spans an `.await` point. A poisoned lock is recovered
/// rather than propagated, since no operation leaves a transcript half-written.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh random (v4) session identifier.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Turn>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Turn>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session's transcript, creating an empty session if unseen.
    pub fn get_or_create(&self, session_id: &str) -> Vec<Turn> {
        self.write_lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Appends one turn to the end of the session, creating it if absent.
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        self.write_lock()
            .entry(session_id.to_string())
            .or_default()
            .push(Turn::new(role, content));
    }

    /// Appends a user turn and returns the turns that preceded it.
    ///
    /// Both happen under one lock so a concurrent request on the same session
    /// cannot slip a turn in between the snapshot and the append.
    pub fn record_user_turn(&self, session_id: &str, content: impl Into<String>) -> Vec<Turn> {
        let mut sessions = self.write_lock();
        let turns = sessions.entry(session_id.to_string()).or_default();
        let prior = turns.clone();
        turns.push(Turn::user(content));
        prior
    }

    /// Returns the session's transcript, or an empty one for an unknown id.
    pub fn read(&self, session_id: &str) -> Vec<Turn> {
        self.read_lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Removes the session. Returns whether it existed; deleting an unknown
    /// session is not an error.
    pub fn delete(&self, session_id: &str) -> bool {
        self.write_lock().remove(session_id).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
