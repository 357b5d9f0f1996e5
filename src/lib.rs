pub mod engine;
pub mod events;
pub mod formats;
pub mod history;
pub mod models;
pub mod progress;
pub mod provider;
pub mod registry;

/// Convenient re-exports of the common surface.
pub mod prelude {
    pub use crate::engine::{DownloadEngine, EngineError, DEPENDENCY_MISSING_MSG};
    pub use crate::events::{
        channel, drain, EngineEvent, EventKind, EventPump, EventReceiver, EventSender,
    };
    pub use crate::history::{HistoryEntry, HistoryLog};
    pub use crate::models::{DownloadTask, TaskHandle, TaskOptions, TaskStatus};
    pub use crate::provider::{
        MediaInfo, MediaProvider, ProgressHook, ProviderError, TransferOptions,
        TransferOutcome, TransferPhase, TransferProgress,
    };
    pub use crate::registry::{CancelRegistry, RegistryError};
}
