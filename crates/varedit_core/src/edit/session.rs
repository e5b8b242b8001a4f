//! One-active-session-per-scope guard.
//!
//! # Invariants
//! - A scope holds at most one live `SessionLease` per registry.
//! - Dropping a lease frees its scope; there is no other release path.

use crate::model::scope::Scope;
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Identifier of one editor session, used for log correlation.
pub type SessionId = Uuid;

/// Registry of scopes that currently have an open editor session.
///
/// Clones share the same underlying set, so every workflow that may edit the
/// same scope must be built from clones of one registry.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<Scope>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `scope` for a new session.
    pub fn try_acquire(&self, scope: &Scope) -> Result<SessionLease, SessionConflict> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(scope.clone()) {
            return Err(SessionConflict(scope.clone()));
        }

        let lease = SessionLease {
            id: Uuid::new_v4(),
            scope: scope.clone(),
            active: Arc::clone(&self.active),
        };
        debug!(
            "event=session_lease_acquired module=session scope_kind={} session_id={}",
            scope.kind_label(),
            lease.id
        );
        Ok(lease)
    }

    pub fn is_active(&self, scope: &Scope) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(scope)
    }

    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive claim on one scope for the lifetime of an editor session.
#[derive(Debug)]
pub struct SessionLease {
    id: SessionId,
    scope: Scope,
    active: Arc<Mutex<HashSet<Scope>>>,
}

impl SessionLease {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.scope);
        debug!(
            "event=session_lease_released module=session scope_kind={} session_id={}",
            self.scope.kind_label(),
            self.id
        );
    }
}

/// Another session already holds the scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConflict(pub Scope);
