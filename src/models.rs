// src/models.rs

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Maximum characters kept from a provider-resolved title.
pub const TITLE_MAX_CHARS: usize = 60;
/// Maximum characters kept from a failure message.
pub const ERROR_MSG_MAX_CHARS: usize = 120;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// The lifecycle status of a retrieval task.
///
/// Terminal states are sinks: once a task reaches `Done`, `Error` or
/// `Cancelled` it never transitions again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Fetching,
    Downloading,
    Done,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error | TaskStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Pending -> Error` covers the missing-dependency rejection before
    /// metadata resolution; `Fetching -> Done` covers a transfer that
    /// finishes without ever reporting a progress update.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Pending, Error)
                | (Fetching, Downloading)
                | (Fetching, Done)
                | (Fetching, Error)
                | (Fetching, Cancelled)
                | (Downloading, Done)
                | (Downloading, Error)
                | (Downloading, Cancelled)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Fetching => "fetching",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// Caller-supplied knobs for a single retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Key into the format table, e.g. `video_best` or `audio_mp3`.
    pub format_key: String,
    pub output_dir: PathBuf,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            format_key: "video_best".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// One retrieval request plus its mutable runtime state.
///
/// A task is written by exactly one worker and read by the consumer; both
/// sides go through the shared [`TaskHandle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: u64,
    pub url: String,
    pub options: TaskOptions,
    pub status: TaskStatus,
    /// Percent complete, `0.0..=100.0`. Non-decreasing while `Downloading`.
    pub progress: f32,
    pub speed: String,
    pub eta: String,
    pub error_msg: String,
    pub filepath: Option<PathBuf>,
    /// Provider-resolved title; starts as the (truncated) URL until
    /// metadata resolution fills it in.
    pub title: String,
    pub added_at: String,
}

/// Shared, lock-protected view of a task.
pub type TaskHandle = Arc<Mutex<DownloadTask>>;

impl DownloadTask {
    pub fn new(url: impl Into<String>, options: TaskOptions) -> Self {
        let url = url.into();
        let title = truncate_title(&url);
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            url,
            options,
            status: TaskStatus::Pending,
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            error_msg: String::new(),
            filepath: None,
            title,
            added_at: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn shared(self) -> TaskHandle {
        Arc::new(Mutex::new(self))
    }
}

fn truncate_title(text: &str) -> String {
    text.chars().take(TITLE_MAX_CHARS).collect()
}
