//! Hand-off of per-user sync jobs to the external sync engine.
//!
//! Request handlers push jobs through a [`SyncDispatcher`]; a worker task
//! started with [`spawn_worker`] drains the queue and runs every job on its
//! own task. A full queue makes scheduling wait for space rather than fail.
//! Scheduling ends at "accepted": there is no deduplication or cancellation,
//! and failures are only logged.

pub mod engine;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use lucidsync_core::UserId;

pub use engine::{HttpSyncEngine, SyncEngineError};

/// Default number of queued jobs before scheduling waits.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// One user's sync request.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub user_id: UserId,
    /// Decrypted LucidBot token.
    pub token: SecretString,
    pub page_id: String,
}

/// Errors returned when a job cannot be queued.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("sync worker is not running")]
    Closed,
}

/// Something that can run a sync job to completion.
#[async_trait]
pub trait SyncEngine: Send + Sync {
    async fn run(&self, job: SyncJob) -> Result<(), SyncEngineError>;
}

/// Sending half of the sync job queue.
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    tx: mpsc::Sender<SyncJob>,
}

impl SyncDispatcher {
    /// Create a dispatcher and the receiver its worker should drain.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a job, waiting for space when the queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Closed` when the worker has gone away.
    pub async fn schedule(&self, job: SyncJob) -> Result<(), DispatchError> {
        self.tx.send(job).await.map_err(|_| DispatchError::Closed)
    }
}

/// Spawn the worker that drains `rx`, running each job on its own task.
///
/// The worker exits once every [`SyncDispatcher`] has been dropped.
pub fn spawn_worker(
    mut rx: mpsc::Receiver<SyncJob>,
    engine: Arc<dyn SyncEngine>,
) -> JoinHandle<()> {
    info!("Spawning sync worker");
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let user_id = job.user_id;
                info!(%user_id, "Sync job started");
                match engine.run(job).await {
                    Ok(()) => info!(%user_id, "Sync job finished"),
                    Err(e) => error!(%user_id, error = %e, "Sync job failed"),
                }
            });
        }
        info!("Sync queue closed, worker exiting");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use tokio::sync::Mutex;

    use super::*;

    fn job(id: i64) -> SyncJob {
        SyncJob {
            user_id: UserId::new(id),
            token: SecretString::from(format!("tok-{id}")),
            page_id: "pg".to_string(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(UserId, String)>>,
    }

    #[async_trait]
    impl SyncEngine for Recorder {
        async fn run(&self, job: SyncJob) -> Result<(), SyncEngineError> {
            self.seen
                .lock()
                .await
                .push((job.user_id, job.token.expose_secret().to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_schedule_waits_for_space() {
        let (dispatcher, mut rx) = SyncDispatcher::channel(1);
        dispatcher.schedule(job(1)).await.unwrap();

        let pending = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.schedule(job(2)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        assert_eq!(rx.recv().await.unwrap().user_id, UserId::new(1));
        pending.await.unwrap().unwrap();
        assert_eq!(rx.recv().await.unwrap().user_id, UserId::new(2));
    }

    #[tokio::test]
    async fn test_schedule_reports_closed_queue() {
        let (dispatcher, rx) = SyncDispatcher::channel(4);
        drop(rx);
        assert!(matches!(dispatcher.schedule(job(1)).await, Err(DispatchError::Closed)));
    }

    #[tokio::test]
    async fn test_worker_runs_every_job() {
        let recorder = Arc::new(Recorder::default());
        let (dispatcher, rx) = SyncDispatcher::channel(8);
        let worker = spawn_worker(rx, recorder.clone());

        for id in 1..=3 {
            dispatcher.schedule(job(id)).await.unwrap();
        }
        drop(dispatcher);
        worker.await.unwrap();

        // Jobs run on detached tasks; give them a moment.
        for _ in 0..50 {
            if recorder.seen.lock().await.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut seen = recorder.seen.lock().await.clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                (UserId::new(1), "tok-1".to_string()),
                (UserId::new(2), "tok-2".to_string()),
                (UserId::new(3), "tok-3".to_string()),
            ]
        );
    }
}
