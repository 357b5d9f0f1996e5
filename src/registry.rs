// src/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("task {0} already has a registered cancellation token")]
    AlreadyRegistered(u64),
}

/// Maps live task ids to their cancellation tokens.
///
/// The map itself is guarded by a mutex; reading a token's state afterwards
/// is lock-free, so workers can check for cancellation on every progress
/// tick without contending here.
#[derive(Clone, Default)]
pub struct CancelRegistry {
    tokens: Arc<Mutex<HashMap<u64, CancellationToken>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores a fresh token for `task_id`.
    ///
    /// Double registration means two workers would race on one task, so it
    /// is rejected instead of silently replacing the first token.
    pub fn register(&self, task_id: u64) -> Result<CancellationToken, RegistryError> {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.contains_key(&task_id) {
            return Err(RegistryError::AlreadyRegistered(task_id));
        }
        let token = CancellationToken::new();
        tokens.insert(task_id, token.clone());
        Ok(token)
    }

    /// Sets the token for `task_id`. No-op when the task is unknown or
    /// already finished.
    pub fn signal(&self, task_id: u64) {
        if let Some(token) = self.tokens.lock().unwrap().get(&task_id) {
            token.cancel();
        }
    }

    /// Sets every registered token.
    pub fn signal_all(&self) {
        for token in self.tokens.lock().unwrap().values() {
            token.cancel();
        }
    }

    /// Drops the entry for `task_id`. Called on every worker exit route.
    pub fn release(&self, task_id: u64) {
        self.tokens.lock().unwrap().remove(&task_id);
    }

    pub fn is_registered(&self, task_id: u64) -> bool {
        self.tokens.lock().unwrap().contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().unwrap().is_empty()
    }
}
