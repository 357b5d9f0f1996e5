// src/history.rs

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::models::{DownloadTask, TaskStatus};

/// One finished task as remembered by the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub status: TaskStatus,
    pub finished_at: String,
}

/// In-memory log of terminal outcomes. Lives on the consumer side and is
/// not persisted across runs.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, task: &DownloadTask) {
        self.entries.push(HistoryEntry {
            title: task.title.clone(),
            url: task.url.clone(),
            status: task.status,
            finished_at: Local::now().format("%d/%m %H:%M").to_string(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
