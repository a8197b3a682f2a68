//! Periodic import scheduler
//!
//! Owns one background task that runs the import pipeline on a fixed
//! interval. Constructed and injected by the host process; start/stop/
//! trigger/status are methods on the instance, and shutdown never
//! leaves a dangling task behind.

use crate::models::{ImportRunResult, RunStatus, SchedulerStatus};
use crate::services::importer::ImportService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minutes between periodic scans
    pub interval_minutes: u64,
    /// When false the periodic task is never spawned; manual triggers
    /// still work
    pub auto_import_enabled: bool,
    /// Delay before the first scan, letting collaborator services
    /// finish their own startup
    pub startup_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            auto_import_enabled: true,
            startup_grace: Duration::from_secs(60),
        }
    }
}

/// Live periodic task handle
struct PeriodicTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Import scheduler: Stopped → Running → (Stopping) → Stopped
pub struct ImportScheduler {
    import: Arc<ImportService>,
    config: SchedulerConfig,
    running: AtomicBool,
    task: Mutex<Option<PeriodicTask>>,
}

impl ImportScheduler {
    pub fn new(import: Arc<ImportService>, config: SchedulerConfig) -> Self {
        info!(
            auto_import = config.auto_import_enabled,
            interval_minutes = config.interval_minutes,
            "Scheduler initialized"
        );
        Self {
            import,
            config,
            running: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Start the scheduler. No-op with a warning if already running.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler is already running");
            return;
        }

        info!("Starting scheduler");
        if self.config.auto_import_enabled {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(periodic_import(
                Arc::clone(&self.import),
                self.config.clone(),
                cancel.clone(),
            ));
            *self.task.lock().await = Some(PeriodicTask { cancel, handle });
        } else {
            info!("Auto import disabled, no periodic task spawned");
        }
    }

    /// Stop the scheduler, cancelling the periodic task and awaiting
    /// its exit. No-op when already stopped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("Stopping scheduler");
        if let Some(task) = self.task.lock().await.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                // Cancellation exits the loop cleanly; a join error
                // here means the task panicked
                error!(error = %e, "Periodic import task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }

    /// Run one import pass out-of-band, regardless of scheduler state.
    pub async fn trigger_import_now(&self) -> ImportRunResult {
        info!("Manual trigger of import scan");
        self.import.scan_and_import().await
    }

    /// Snapshot of the scheduler state. Never touches the object store.
    pub async fn status(&self) -> SchedulerStatus {
        let mut active_tasks = Vec::new();
        if let Some(task) = self.task.lock().await.as_ref() {
            if !task.handle.is_finished() {
                active_tasks.push("import".to_string());
            }
        }

        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            auto_import_enabled: self.config.auto_import_enabled,
            import_interval_minutes: self.config.interval_minutes,
            active_tasks,
        }
    }
}

/// Periodic task body: grace sleep, then run/sleep until cancelled.
///
/// Cancellation is only observed between objects (inside the sleeps
/// and between scans), never mid-object.
async fn periodic_import(
    import: Arc<ImportService>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) {
    info!(
        interval_minutes = config.interval_minutes,
        "Periodic import task started"
    );

    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Periodic import cancelled during startup grace period");
            return;
        }
        _ = tokio::time::sleep(config.startup_grace) => {}
    }

    let interval = Duration::from_secs(config.interval_minutes * 60);
    loop {
        let result = import.scan_and_import().await;
        match &result.status {
            RunStatus::Completed if result.imported > 0 => {
                info!(
                    imported = result.imported,
                    titles = ?result.imported_titles,
                    "Scheduled import completed"
                );
            }
            RunStatus::Completed => {
                debug!("Scheduled import completed, no new manhwa found");
            }
            RunStatus::Skipped { reason } => {
                warn!(%reason, "Scheduled import skipped");
            }
            RunStatus::Error { message } => {
                error!(%message, "Scheduled import failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Periodic import task exiting");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
