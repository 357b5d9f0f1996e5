// src/progress.rs

use std::ops::ControlFlow;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::events::{EngineEvent, EventKind, EventSender};
use crate::models::{TaskHandle, TaskStatus};
use crate::provider::{TransferPhase, TransferProgress};

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap());

/// Removes ANSI escape sequences and control characters from
/// provider-supplied text.
pub fn strip_control(text: &str) -> String {
    ANSI_ESCAPE
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Truncates to at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Normalizes raw provider callbacks into task mutations and `Progress`
/// events.
///
/// One adapter is wired per transfer; the provider drives it through the
/// progress hook from whatever thread runs the transfer.
pub struct ProgressAdapter {
    task: TaskHandle,
    token: CancellationToken,
    events: EventSender,
}

impl ProgressAdapter {
    pub fn new(task: TaskHandle, token: CancellationToken, events: EventSender) -> Self {
        Self { task, token, events }
    }

    /// Handles one callback. Checks for cancellation before touching the
    /// task, so a cancelled transfer stops at the next tick without
    /// recording further progress.
    pub fn observe(&self, update: TransferProgress) -> ControlFlow<()> {
        if self.token.is_cancelled() {
            return ControlFlow::Break(());
        }

        match update.phase {
            TransferPhase::Downloading => {
                let mut task = self.task.lock().unwrap();
                task.status = TaskStatus::Downloading;
                let pct = match update.total_bytes {
                    Some(total) if total > 0 => {
                        (update.downloaded_bytes as f32 / total as f32) * 100.0
                    }
                    _ => 0.0,
                };
                // Providers occasionally report backwards (fragment
                // restarts); the displayed figure never regresses.
                if pct > task.progress {
                    task.progress = pct.min(100.0);
                }
                task.speed = strip_control(update.rate.trim());
                task.eta = strip_control(update.eta.trim());
                trace!(task_id = task.id, progress = task.progress, "progress tick");
            }
            TransferPhase::Finished => {
                let mut task = self.task.lock().unwrap();
                task.progress = 100.0;
                task.speed = String::new();
                task.eta = String::new();
                if let Some(path) = update.filename {
                    task.filepath = Some(path);
                }
                trace!(task_id = task.id, "transfer finished");
            }
        }

        let _ = self.events.send(EngineEvent {
            kind: EventKind::Progress,
            task: self.task.clone(),
        });
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::models::{DownloadTask, TaskOptions};
    use std::path::PathBuf;

    fn adapter() -> (ProgressAdapter, TaskHandle, CancellationToken, events::EventReceiver) {
        let task = DownloadTask::new("https://example.com/v", TaskOptions::default()).shared();
        {
            let mut t = task.lock().unwrap();
            t.status = TaskStatus::Fetching;
        }
        let token = CancellationToken::new();
        let (tx, rx) = events::channel();
        (
            ProgressAdapter::new(task.clone(), token.clone(), tx),
            task,
            token,
            rx,
        )
    }

    #[test]
    fn strip_control_removes_ansi_color_codes() {
        assert_eq!(strip_control("\x1b[0;32m1.2MiB/s\x1b[0m"), "1.2MiB/s");
        assert_eq!(strip_control("00:42\x07"), "00:42");
        assert_eq!(strip_control("plain"), "plain");
    }

    #[test]
    fn truncate_chars_respects_codepoint_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[tokio::test]
    async fn downloading_update_moves_status_and_progress() {
        let (adapter, task, _token, mut rx) = adapter();
        let flow = adapter.observe(TransferProgress::downloading(512, Some(1024)));
        assert_eq!(flow, ControlFlow::Continue(()));
        let t = task.lock().unwrap();
        assert_eq!(t.status, TaskStatus::Downloading);
        assert_eq!(t.progress, 50.0);
        drop(t);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Progress);
    }

    #[tokio::test]
    async fn unknown_total_reports_zero_percent() {
        let (adapter, task, _token, _rx) = adapter();
        adapter.observe(TransferProgress::downloading(4096, None));
        assert_eq!(task.lock().unwrap().progress, 0.0);
    }

    #[tokio::test]
    async fn progress_never_regresses() {
        let (adapter, task, _token, _rx) = adapter();
        adapter.observe(TransferProgress::downloading(800, Some(1000)));
        adapter.observe(TransferProgress::downloading(200, Some(1000)));
        assert_eq!(task.lock().unwrap().progress, 80.0);
    }

    #[tokio::test]
    async fn rate_and_eta_are_sanitized_before_storage() {
        let (adapter, task, _token, _rx) = adapter();
        let mut update = TransferProgress::downloading(10, Some(100));
        update.rate = " \x1b[32m3.4MiB/s\x1b[0m ".to_string();
        update.eta = "\x1b[33m00:12\x1b[0m".to_string();
        adapter.observe(update);
        let t = task.lock().unwrap();
        assert_eq!(t.speed, "3.4MiB/s");
        assert_eq!(t.eta, "00:12");
    }

    #[tokio::test]
    async fn finished_update_forces_full_progress_and_path() {
        let (adapter, task, _token, mut rx) = adapter();
        adapter.observe(TransferProgress::downloading(300, Some(1000)));
        adapter.observe(TransferProgress::finished(PathBuf::from("/tmp/out.mp4")));
        let t = task.lock().unwrap();
        assert_eq!(t.progress, 100.0);
        assert_eq!(t.filepath.as_deref(), Some(std::path::Path::new("/tmp/out.mp4")));
        assert!(t.speed.is_empty());
        drop(t);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Progress);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Progress);
    }

    #[tokio::test]
    async fn cancelled_token_breaks_before_any_mutation() {
        let (adapter, task, token, mut rx) = adapter();
        token.cancel();
        let flow = adapter.observe(TransferProgress::downloading(512, Some(1024)));
        assert_eq!(flow, ControlFlow::Break(()));
        let t = task.lock().unwrap();
        assert_eq!(t.status, TaskStatus::Fetching);
        assert_eq!(t.progress, 0.0);
        drop(t);
        assert!(rx.try_recv().is_err());
    }
}
