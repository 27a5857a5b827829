//! Per-user job lanes with bounded backlog and a global concurrency limit.
//!
//! Every user key gets its own FIFO lane served by one worker task, so jobs
//! for the same user never overlap and run in submission order. Jobs for
//! different users run in parallel, up to the configured limit.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::sync::{Mutex, Semaphore, mpsc};

use crate::error::{RelayError, Result};

/// Jobs waiting per user before submissions are refused.
pub const LANE_CAPACITY: usize = 8;

/// How long an empty lane's worker waits before shutting down.
pub const LANE_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that processes jobs pulled off a lane.
pub trait JobHandler: Send + Sync + 'static {
    type Job: Send + 'static;

    fn handle(&self, key: &str, job: Self::Job) -> impl Future<Output = ()> + Send;
}

type Lanes<J> = Mutex<HashMap<String, mpsc::Sender<J>>>;

pub struct LaneQueue<H: JobHandler> {
    handler: Arc<H>,
    lanes: Arc<Lanes<H::Job>>,
    permits: Arc<Semaphore>,
    idle_timeout: Duration,
}

impl<H: JobHandler> LaneQueue<H> {
    pub fn new(handler: Arc<H>, max_concurrent: usize) -> Self {
        Self::with_idle_timeout(handler, max_concurrent, LANE_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(handler: Arc<H>, max_concurrent: usize, idle: Duration) -> Self {
        Self {
            handler,
            lanes: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            idle_timeout: idle,
        }
    }

    /// Queue `job` on the lane for `key`, starting a worker if none is running.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::QueueFull`] if the lane already holds
    /// [`LANE_CAPACITY`] jobs.
    pub async fn submit(&self, key: &str, job: H::Job) -> Result<()> {
        let mut lanes = self.lanes.lock().await;

        let job = match lanes.get(key) {
            Some(sender) => match sender.try_send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Job lane for {key} is full");
                    return Err(RelayError::QueueFull(key.to_string()));
                }
                // Worker exited without deregistering; start a fresh lane.
                Err(mpsc::error::TrySendError::Closed(job)) => job,
            },
            None => job,
        };

        let (sender, receiver) = mpsc::channel(LANE_CAPACITY);
        // A fresh channel always has room.
        if sender.try_send(job).is_err() {
            return Err(RelayError::QueueFull(key.to_string()));
        }
        lanes.insert(key.to_string(), sender);
        debug!("Started job lane for {key}");

        tokio::spawn(run_lane(
            key.to_string(),
            receiver,
            Arc::clone(&self.handler),
            Arc::clone(&self.lanes),
            Arc::clone(&self.permits),
            self.idle_timeout,
        ));

        Ok(())
    }

    /// Whether the lane for `key` has no room for another job.
    pub async fn is_full(&self, key: &str) -> bool {
        self.lanes
            .lock()
            .await
            .get(key)
            .is_some_and(|sender| sender.capacity() == 0)
    }

    /// Number of lanes with a live worker.
    pub async fn active_lanes(&self) -> usize {
        self.lanes.lock().await.len()
    }
}

async fn run_lane<H: JobHandler>(
    key: String,
    mut receiver: mpsc::Receiver<H::Job>,
    handler: Arc<H>,
    lanes: Arc<Lanes<H::Job>>,
    permits: Arc<Semaphore>,
    idle_timeout: Duration,
) {
    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(job)) => run_job(&key, job, handler.as_ref(), &permits).await,
            Ok(None) => break,
            Err(_) => {
                // Only deregister an empty lane, under the map lock, so a job
                // never lands on a receiver that has stopped being served.
                let mut lanes = lanes.lock().await;
                if receiver.is_empty() {
                    lanes.remove(&key);
                    break;
                }
            }
        }
    }
    debug!("Job lane for {key} shut down");
}

async fn run_job<H: JobHandler>(key: &str, job: H::Job, handler: &H, permits: &Semaphore) {
    // The semaphore is never closed.
    let Ok(_permit) = permits.acquire().await else {
        return;
    };
    handler.handle(key, job).await;
}
