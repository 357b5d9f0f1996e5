// src/events.rs

use std::time::Duration;

use tokio::sync::mpsc;

use crate::models::TaskHandle;

/// What happened to a task. Consumers treat the kind as a hint and re-read
/// the live task fields, so a stale payload can never be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Enqueued,
    StatusChange,
    InfoFetched,
    Progress,
    Done,
    Error,
    Cancelled,
}

#[derive(Clone)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub task: TaskHandle,
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Drains every event currently queued, invoking `handler` for each.
///
/// Returns `false` once the channel is closed and empty, `true` otherwise.
pub fn drain<F>(receiver: &mut EventReceiver, handler: &mut F) -> bool
where
    F: FnMut(EngineEvent),
{
    loop {
        match receiver.try_recv() {
            Ok(event) => handler(event),
            Err(mpsc::error::TryRecvError::Empty) => return true,
            Err(mpsc::error::TryRecvError::Disconnected) => return false,
        }
    }
}

/// Fixed-cadence consumer loop: every tick, drain everything queued, then
/// sleep until the next tick. Mirrors a UI thread polling its queue.
pub struct EventPump {
    interval: Duration,
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(80);

impl Default for EventPump {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl EventPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Runs until every sender is dropped and the queue is empty.
    pub async fn run<F>(self, mut receiver: EventReceiver, mut handler: F)
    where
        F: FnMut(EngineEvent),
    {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if !drain(&mut receiver, &mut handler) {
                return;
            }
        }
    }
}
