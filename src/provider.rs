// src/provider.rs

use std::ops::ControlFlow;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The progress hook asked the transfer to stop. Classified as a
    /// cancellation, never as a failure.
    #[error("transfer aborted by caller")]
    Aborted,
    #[error("metadata resolution failed: {0}")]
    Resolve(String),
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// Which stage of the transfer a progress update describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Downloading,
    Finished,
}

/// A single raw callback from the provider. Text fields are untrusted and
/// may contain terminal escapes.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub phase: TransferPhase,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub rate: String,
    pub eta: String,
    pub filename: Option<PathBuf>,
}

impl TransferProgress {
    pub fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            phase: TransferPhase::Downloading,
            downloaded_bytes,
            total_bytes,
            rate: String::new(),
            eta: String::new(),
            filename: None,
        }
    }

    pub fn finished(filename: PathBuf) -> Self {
        Self {
            phase: TransferPhase::Finished,
            downloaded_bytes: 0,
            total_bytes: None,
            rate: String::new(),
            eta: String::new(),
            filename: Some(filename),
        }
    }
}

/// Resolved metadata for a URL.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub title: String,
}

/// Result of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub filepath: PathBuf,
}

/// Options handed to the provider for one transfer: where to write and an
/// opaque format-selection bag produced by [`crate::formats`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub output_dir: PathBuf,
    pub format: serde_json::Map<String, serde_json::Value>,
}

/// Invoked by the provider on every progress tick. Returning
/// `ControlFlow::Break(())` instructs the provider to stop the transfer
/// and fail it with [`ProviderError::Aborted`].
pub type ProgressHook<'a> = &'a mut (dyn FnMut(TransferProgress) -> ControlFlow<()> + Send);

/// The retrieval backend. Implementations own all network and protocol
/// concerns; the engine only drives this interface.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Whether the backend and its external dependencies are usable.
    async fn is_available(&self) -> bool;

    async fn resolve_metadata(&self, url: &str) -> Result<MediaInfo, ProviderError>;

    /// Runs the transfer, invoking `hook` on each progress tick. Must
    /// return `ProviderError::Aborted` when the hook breaks.
    async fn transfer(
        &self,
        url: &str,
        options: &TransferOptions,
        hook: ProgressHook<'_>,
    ) -> Result<TransferOutcome, ProviderError>;
}
