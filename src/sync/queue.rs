//! Deferred sync tasks and the background worker
//!
//! Tasks carry only the record type name and primary key. The executor
//! re-reads the record at execution time, so a record deleted between
//! enqueue and execution is a normal terminal state rather than an error.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::SyncResult;
use crate::record::RecordStore;
use crate::registry::CollectionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOp {
    Update,
    Delete,
}

/// One unit of deferred sync work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    pub op: SyncOp,
    pub record_type: String,
    pub primary_key: String,
}

/// Sink for deferred sync tasks
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task: SyncTask, delay: Option<Duration>);
}

/// Executes dequeued tasks against the registry.
pub struct TaskExecutor {
    registry: Arc<CollectionRegistry>,
    store: Arc<dyn RecordStore>,
}

impl TaskExecutor {
    pub fn new(registry: Arc<CollectionRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    pub fn execute(&self, task: &SyncTask) -> SyncResult<()> {
        match task.op {
            SyncOp::Update => {
                match self.store.find(&task.record_type, &task.primary_key) {
                    Some(record) => self.registry.on_update(record.as_ref()),
                    None => {
                        // Deleted since enqueue; the delete event handles
                        // the remote side.
                        debug!(
                            record_type = task.record_type,
                            primary_key = task.primary_key,
                            "record gone before deferred update, skipping"
                        );
                        Ok(())
                    }
                }
            }
            SyncOp::Delete => {
                self.registry.on_delete(&task.record_type, &task.primary_key);
                Ok(())
            }
        }
    }
}

enum WorkerMessage {
    Task(SyncTask, Option<Duration>),
    Shutdown,
}

/// In-process task queue backed by a channel and one worker thread.
///
/// Delays are honored by sleeping in the worker before execution, which
/// also serializes tasks in arrival order. Execution failures are logged;
/// the worker never dies on a bad task.
pub struct WorkerQueue {
    sender: Sender<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerQueue {
    pub fn start(executor: TaskExecutor) -> Self {
        let (sender, receiver) = unbounded();
        let handle = thread::spawn(move || worker_loop(receiver, executor));
        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Stop accepting work and wait for queued tasks to drain.
    pub fn shutdown(mut self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl TaskQueue for WorkerQueue {
    fn enqueue(&self, task: SyncTask, delay: Option<Duration>) {
        if self.sender.send(WorkerMessage::Task(task, delay)).is_err() {
            error!("sync worker is gone, dropping task");
        }
    }
}

impl Drop for WorkerQueue {
    fn drop(&mut self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(receiver: Receiver<WorkerMessage>, executor: TaskExecutor) {
    info!("sync worker started");
    while let Ok(message) = receiver.recv() {
        match message {
            WorkerMessage::Task(task, delay) => {
                if let Some(delay) = delay {
                    thread::sleep(delay);
                }
                if let Err(err) = executor.execute(&task) {
                    error!(
                        record_type = task.record_type,
                        primary_key = task.primary_key,
                        "deferred sync task failed: {err}"
                    );
                }
            }
            WorkerMessage::Shutdown => break,
        }
    }
    info!("sync worker stopped");
}
