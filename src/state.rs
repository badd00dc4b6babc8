use std::sync::Arc;

use crate::auth::{SessionAuthority, SessionConfig};
use crate::repository::{AttendanceRepository, OperatorRepository};
use crate::sync::SyncEngine;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionAuthority,
    pub sync: SyncEngine,
    pub allow_registration: bool,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, session: SessionConfig) -> Self
    where
        S: OperatorRepository + AttendanceRepository + 'static,
    {
        Self {
            sessions: SessionAuthority::new(store.clone(), session),
            sync: SyncEngine::new(store),
            allow_registration: false,
        }
    }

    pub fn with_registration(mut self, allow: bool) -> Self {
        self.allow_registration = allow;
        self
    }
}
