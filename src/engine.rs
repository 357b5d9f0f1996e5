// src/engine.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{EngineEvent, EventKind, EventSender};
use crate::formats;
use crate::models::{
    DownloadTask, TaskHandle, TaskOptions, TaskStatus, ERROR_MSG_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::progress::{strip_control, truncate_chars, ProgressAdapter};
use crate::provider::{MediaProvider, ProviderError, TransferOptions, TransferProgress};
use crate::registry::{CancelRegistry, RegistryError};

/// Shown to the user when the retrieval backend is missing. The task is
/// rejected before any resolution or transfer is attempted.
pub const DEPENDENCY_MISSING_MSG: &str =
    "media backend unavailable. Install the provider dependency and retry";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine has been shut down, no new tasks accepted")]
    ShutDown,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Drives retrieval tasks: one spawned worker per enqueued URL, cancellation
/// through the token registry, results reported over the event channel.
///
/// There is intentionally no cap on concurrent workers; scheduling beyond
/// one worker per task is out of scope.
pub struct DownloadEngine {
    provider: Arc<dyn MediaProvider>,
    registry: CancelRegistry,
    events: EventSender,
    active: Arc<AtomicBool>,
    workers: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl DownloadEngine {
    pub fn new(provider: Arc<dyn MediaProvider>, events: EventSender) -> Self {
        Self {
            provider,
            registry: CancelRegistry::new(),
            events,
            active: Arc::new(AtomicBool::new(true)),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a task for `url`, registers its cancellation token, announces
    /// it on the event channel and spawns its worker. Returns immediately.
    pub fn enqueue(
        &self,
        url: impl Into<String>,
        options: TaskOptions,
    ) -> Result<TaskHandle, EngineError> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }

        let task = DownloadTask::new(url, options);
        let task_id = task.id;
        let token = self.registry.register(task_id)?;
        let handle = task.shared();

        info!(task_id, "task enqueued");

        // Announced before the worker exists, so the first event a consumer
        // sees for any task is always `Enqueued`.
        let _ = self.events.send(EngineEvent {
            kind: EventKind::Enqueued,
            task: handle.clone(),
        });

        let worker = Worker {
            task: handle.clone(),
            token,
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            events: self.events.clone(),
            engine_active: self.active.clone(),
        };

        let mut workers = self.workers.lock().unwrap();
        workers.retain(|_, join| !join.is_finished());
        workers.insert(task_id, tokio::spawn(worker.run()));

        Ok(handle)
    }

    /// Requests cancellation of one task. Unknown or already-finished ids
    /// are ignored.
    pub fn cancel(&self, task_id: u64) {
        debug!(task_id, "cancel requested");
        self.registry.signal(task_id);
    }

    /// Requests cancellation of every live task.
    pub fn cancel_all(&self) {
        debug!("cancel-all requested");
        self.registry.signal_all();
    }

    /// Stops accepting new tasks. In-flight workers keep running; they stop
    /// at their own next cancellation checkpoint if also cancelled.
    pub fn shutdown(&self) {
        info!("engine shutting down");
        self.active.store(false, Ordering::SeqCst);
    }

    /// [`shutdown`](Self::shutdown) plus a bounded wait for outstanding
    /// workers. Returns `true` when every worker finished within `limit`.
    pub async fn shutdown_and_wait(&self, limit: Duration) -> bool {
        self.shutdown();
        let handles: Vec<(u64, JoinHandle<()>)> =
            self.workers.lock().unwrap().drain().collect();
        let deadline = Instant::now() + limit;
        for (task_id, join) in handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if timeout(remaining, join).await.is_err() {
                warn!(task_id, "worker still running at shutdown deadline");
                return false;
            }
        }
        true
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn provider_available(&self) -> bool {
        self.provider.is_available().await
    }

    pub fn registry(&self) -> &CancelRegistry {
        &self.registry
    }
}

/// One spawned task lifecycle. Everything the worker reports travels over
/// the event channel; nothing propagates to the engine or other workers.
struct Worker {
    task: TaskHandle,
    token: CancellationToken,
    provider: Arc<dyn MediaProvider>,
    registry: CancelRegistry,
    events: EventSender,
    engine_active: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self) {
        let task_id = self.task.lock().unwrap().id;
        let terminal = self.process().await;
        // Released on every exit route, and before the terminal event so a
        // consumer reacting to it can no longer signal a stale token.
        self.registry.release(task_id);
        if let Some(kind) = terminal {
            let _ = self.events.send(EngineEvent {
                kind,
                task: self.task.clone(),
            });
        }
    }

    async fn process(&self) -> Option<EventKind> {
        if !self.engine_active.load(Ordering::SeqCst) {
            return None;
        }

        if !self.provider.is_available().await {
            let mut task = self.task.lock().unwrap();
            task.status = TaskStatus::Error;
            task.error_msg = DEPENDENCY_MISSING_MSG.to_string();
            warn!(task_id = task.id, "provider unavailable, task rejected");
            return Some(EventKind::Error);
        }

        let (task_id, url, transfer_options) = {
            let mut task = self.task.lock().unwrap();
            task.status = TaskStatus::Fetching;
            let options = TransferOptions {
                output_dir: task.options.output_dir.clone(),
                format: formats::format_options(&task.options.format_key, formats::detect_ffmpeg()),
            };
            (task.id, task.url.clone(), options)
        };
        self.send(EventKind::StatusChange);

        match self.provider.resolve_metadata(&url).await {
            Ok(info) => {
                let mut task = self.task.lock().unwrap();
                let title = strip_control(&info.title);
                if !title.is_empty() {
                    task.title = truncate_chars(&title, TITLE_MAX_CHARS);
                }
                debug!(task_id, title = %task.title, "metadata resolved");
                drop(task);
                self.send(EventKind::InfoFetched);
            }
            Err(err) => return Some(self.classify_failure(err)),
        }

        let adapter = ProgressAdapter::new(
            self.task.clone(),
            self.token.clone(),
            self.events.clone(),
        );
        let mut hook = move |update: TransferProgress| adapter.observe(update);

        match self.provider.transfer(&url, &transfer_options, &mut hook).await {
            Ok(outcome) => {
                // A token set after the last callback still wins.
                if self.token.is_cancelled() {
                    return Some(self.finish_cancelled());
                }
                let mut task = self.task.lock().unwrap();
                task.status = TaskStatus::Done;
                task.progress = 100.0;
                if task.filepath.is_none() {
                    task.filepath = Some(outcome.filepath);
                }
                if let Some(path) = &task.filepath {
                    info!(task_id, path = %path.display(), "task done");
                }
                Some(EventKind::Done)
            }
            Err(err) => Some(self.classify_failure(err)),
        }
    }

    /// A set token always wins over the failure it may have caused.
    fn classify_failure(&self, err: ProviderError) -> EventKind {
        if self.token.is_cancelled() || matches!(err, ProviderError::Aborted) {
            return self.finish_cancelled();
        }
        let mut task = self.task.lock().unwrap();
        task.status = TaskStatus::Error;
        task.error_msg = truncate_chars(&strip_control(&err.to_string()), ERROR_MSG_MAX_CHARS);
        task.speed.clear();
        task.eta.clear();
        warn!(task_id = task.id, error = %task.error_msg, "task failed");
        EventKind::Error
    }

    fn finish_cancelled(&self) -> EventKind {
        let mut task = self.task.lock().unwrap();
        task.status = TaskStatus::Cancelled;
        task.speed.clear();
        task.eta.clear();
        info!(task_id = task.id, "task cancelled");
        EventKind::Cancelled
    }

    fn send(&self, kind: EventKind) {
        let _ = self.events.send(EngineEvent {
            kind,
            task: self.task.clone(),
        });
    }
}
