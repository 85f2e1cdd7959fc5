//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

/// Stops the background progress-logging task and awaits it.
///
/// Enrichment tasks are drained separately by the coordinator; the event sink
/// needs no flush beyond its WAL checkpoint since every append commits before
/// returning.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<tokio::task::JoinHandle<()>>,
) {
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }
}
