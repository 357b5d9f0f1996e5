// src/main.rs

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mediadl::prelude::*;

/// Stand-in backend for the demo run: scripted delays, no network.
struct SimulatedProvider;

const TOTAL_BYTES: u64 = 1024 * 1024;
const TICKS: u64 = 16;

#[async_trait]
impl MediaProvider for SimulatedProvider {
    async fn is_available(&self) -> bool {
        true
    }

    async fn resolve_metadata(&self, url: &str) -> Result<MediaInfo, ProviderError> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        let name = url.rsplit('/').next().unwrap_or(url);
        Ok(MediaInfo {
            title: format!("Simulated clip {name}"),
        })
    }

    async fn transfer(
        &self,
        url: &str,
        options: &TransferOptions,
        hook: ProgressHook<'_>,
    ) -> Result<TransferOutcome, ProviderError> {
        let name = url.rsplit('/').next().unwrap_or("output");
        let filepath = options.output_dir.join(format!("{name}.mp4"));
        for tick in 1..=TICKS {
            tokio::time::sleep(Duration::from_millis(25)).await;
            let mut update =
                TransferProgress::downloading(TOTAL_BYTES / TICKS * tick, Some(TOTAL_BYTES));
            update.rate = "2.4MiB/s".to_string();
            update.eta = format!("00:{:02}", TICKS - tick);
            if let ControlFlow::Break(()) = hook(update) {
                return Err(ProviderError::Aborted);
            }
        }
        if let ControlFlow::Break(()) = hook(TransferProgress::finished(filepath.clone())) {
            return Err(ProviderError::Aborted);
        }
        Ok(TransferOutcome { filepath })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("--- mediadl demo: simulated retrievals ---");

    let (tx, rx) = channel();
    let engine = DownloadEngine::new(Arc::new(SimulatedProvider), tx);

    if engine.provider_available().await {
        println!("[INFO] media backend detected");
    } else {
        println!("[WARN] {DEPENDENCY_MISSING_MSG}");
    }

    // Consumer loop: polls the channel at a fixed cadence, prints each
    // event and records terminal outcomes.
    let consumer = tokio::spawn(async move {
        let mut history = HistoryLog::new();
        EventPump::new()
            .run(rx, |event| {
                let task = event.task.lock().unwrap();
                match event.kind {
                    EventKind::Enqueued => {
                        println!("[{}] enqueued   {}", task.id, task.url);
                    }
                    EventKind::StatusChange => {
                        println!("[{}] {}", task.id, task.status.label());
                    }
                    EventKind::InfoFetched => {
                        println!("[{}] title      {}", task.id, task.title);
                    }
                    EventKind::Progress => {
                        println!(
                            "[{}] {:>5.1}%  {:<10} eta {}",
                            task.id, task.progress, task.speed, task.eta
                        );
                    }
                    EventKind::Done => {
                        println!("[{}] done       {:?}", task.id, task.filepath);
                        history.record(&task);
                    }
                    EventKind::Error => {
                        println!("[{}] error      {}", task.id, task.error_msg);
                        history.record(&task);
                    }
                    EventKind::Cancelled => {
                        println!("[{}] cancelled", task.id);
                    }
                }
            })
            .await;
        history
    });

    println!("\n[ACTION] Enqueueing three retrievals...");
    let options = TaskOptions {
        format_key: "video_720".to_string(),
        output_dir: PathBuf::from("downloads"),
    };
    engine.enqueue("https://media.example/clips/alpha", options.clone())?;
    let second = engine.enqueue("https://media.example/clips/beta", options.clone())?;
    engine.enqueue(
        "https://media.example/clips/gamma",
        TaskOptions {
            format_key: "audio_mp3".to_string(),
            ..options
        },
    )?;

    // Cancel the second task while its transfer is in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second_id = second.lock().unwrap().id;
    println!("\n[ACTION] Cancelling task {second_id} mid-flight...");
    engine.cancel(second_id);

    println!("\n--- Shutting down engine ---");
    if engine.shutdown_and_wait(Duration::from_secs(5)).await {
        println!("All workers finished.");
    } else {
        println!("Shutdown deadline hit with workers still running.");
    }

    // Dropping the engine closes the event channel; the consumer drains the
    // tail and returns the history.
    drop(engine);
    let history = consumer.await?;

    println!("\n--- History ---");
    for entry in history.entries() {
        println!(
            "{}  [{}]  {}  ({})",
            entry.finished_at,
            entry.status.label(),
            entry.title,
            entry.url
        );
    }

    println!("\n--- Demo complete ---");
    Ok(())
}
