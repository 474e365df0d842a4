use crate::cli::WatchArgs;
use crate::commands::RunStatus;
use crate::error::{Result, SorterError};
use crate::models::watch_types::{WatchSummary, WatchTarget};
use crate::services::classifier::model_manager;
use crate::services::watcher::FolderWatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub async fn run(args: WatchArgs) -> RunStatus {
    match watch(args).await {
        Ok(summary) => {
            info!(
                swept = summary.swept,
                swept_moved = summary.swept_moved,
                events = summary.events,
                moved = summary.moved,
                below_threshold = summary.below_threshold,
                failed = summary.failed,
                abandoned = summary.abandoned,
                "Watch finished"
            );
            RunStatus::Success
        }
        Err(e) => {
            error!(error = %e, "Watch failed");
            RunStatus::from_error(&e)
        }
    }
}

async fn watch(args: WatchArgs) -> Result<WatchSummary> {
    let target = WatchTarget::new(args.directory, &args.extensions, args.confidence)?;
    target.validate()?;

    let spec = args.model.into_spec()?;
    let pipeline = tokio::task::spawn_blocking(move || model_manager::load_pipeline(&spec))
        .await
        .map_err(|e| SorterError::Task(format!("Failed to spawn model loading task: {}", e)))??;

    FolderWatcher::new(target, Arc::new(pipeline))
        .with_debounce(Duration::from_millis(args.debounce_ms))
        .run(shutdown_signal())
        .await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
