use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::WorkerError;
use crate::worker::dispatch::{JobDispatcher, JobRunner};

type SharedReceiver = Arc<tokio::sync::Mutex<UnboundedReceiver<String>>>;

/// A fixed set of tokio tasks draining a queue of job ids.
pub struct WorkerPool {
    sender: Mutex<Option<UnboundedSender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` workers (at least one) on the current runtime.
    pub fn new(runner: Arc<dyn JobRunner>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<String>();
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&runner),
                ))
            })
            .collect();

        info!("Started {} extraction workers", worker_count);

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shutdown,
        }
    }

    pub fn submit(&self, job_id: &str) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }

        let guard = self.sender.lock().map_err(|_| WorkerError::ChannelClosed)?;
        guard
            .as_ref()
            .ok_or(WorkerError::ChannelClosed)?
            .send(job_id.to_string())
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Stops accepting jobs and waits for queued and in-flight jobs to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);

        // Dropping the sender ends each worker's loop once the queue drains.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Worker {} panicked: {}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl JobDispatcher for WorkerPool {
    fn dispatch(&self, job_id: &str) -> Result<(), WorkerError> {
        self.submit(job_id)
    }
}

async fn run_worker(worker_id: usize, receiver: SharedReceiver, runner: Arc<dyn JobRunner>) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job_id) = next else {
            debug!("Worker {} queue closed", worker_id);
            break;
        };

        debug!("Worker {} processing job {}", worker_id, job_id);
        let outcome = runner.run(&job_id).await;
        debug!("Worker {} finished job {}: {:?}", worker_id, job_id, outcome);
    }

    debug!("Worker {} stopped", worker_id);
}
