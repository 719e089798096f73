//! Change capture and sync dispatch
//!
//! Primary-store mutations reach the search layer through a
//! [`ChangeNotifier`] that fans events out to [`ChangeSubscriber`]s. The
//! stock subscriber is the [`SyncDispatcher`], which either applies changes
//! inline or resolves the routing key eagerly and enqueues a task for a
//! background worker.

pub mod queue;

pub use queue::{SyncOp, SyncTask, TaskExecutor, TaskQueue, WorkerQueue};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::record::Record;
use crate::registry::CollectionRegistry;

/// Membership edit on a many-valued relation of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Add,
    Remove,
    Clear,
}

/// Receives primary-store change events.
pub trait ChangeSubscriber: Send + Sync {
    fn on_save(&self, record: &dyn Record) -> SyncResult<()>;

    fn on_delete(&self, record: &dyn Record) -> SyncResult<()>;

    /// Membership edits re-index the owning record by default, since only
    /// its derived field values change.
    fn on_membership_change(
        &self,
        record: &dyn Record,
        _action: MembershipAction,
    ) -> SyncResult<()> {
        self.on_save(record)
    }
}

/// Fans change events out to every subscriber. A failing subscriber is
/// logged and does not stop delivery to the rest.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Arc<dyn ChangeSubscriber>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ChangeSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn notify_save(&self, record: &dyn Record) {
        for subscriber in &self.subscribers {
            if let Err(err) = subscriber.on_save(record) {
                warn!("save notification failed: {err}");
            }
        }
    }

    pub fn notify_delete(&self, record: &dyn Record) {
        for subscriber in &self.subscribers {
            if let Err(err) = subscriber.on_delete(record) {
                warn!("delete notification failed: {err}");
            }
        }
    }

    pub fn notify_membership_change(&self, record: &dyn Record, action: MembershipAction) {
        for subscriber in &self.subscribers {
            if let Err(err) = subscriber.on_membership_change(record, action) {
                warn!("membership notification failed: {err}");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Inline,
    Deferred,
}

/// Routes change events into the registry, inline or via a task queue.
///
/// In deferred mode the record's type name and primary key are resolved at
/// enqueue time, while the record is still known to exist; the worker later
/// re-reads the record through the store and skips the task if it is gone.
pub struct SyncDispatcher {
    registry: Arc<CollectionRegistry>,
    mode: SyncMode,
    queue: Option<Arc<dyn TaskQueue>>,
    save_delay: Option<Duration>,
}

impl SyncDispatcher {
    pub fn inline(registry: Arc<CollectionRegistry>) -> Self {
        Self {
            registry,
            mode: SyncMode::Inline,
            queue: None,
            save_delay: None,
        }
    }

    pub fn deferred(
        registry: Arc<CollectionRegistry>,
        queue: Arc<dyn TaskQueue>,
        save_delay: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            mode: SyncMode::Deferred,
            queue: Some(queue),
            save_delay,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }
}

impl ChangeSubscriber for SyncDispatcher {
    fn on_save(&self, record: &dyn Record) -> SyncResult<()> {
        match self.mode {
            SyncMode::Inline => self.registry.on_update(record),
            SyncMode::Deferred => {
                let Some(primary_key) = self.registry.resolve_primary_key(record) else {
                    debug!(
                        record_type = record.record_type().as_str(),
                        "save event without resolvable primary key, nothing to sync"
                    );
                    return Ok(());
                };
                if let Some(queue) = &self.queue {
                    queue.enqueue(
                        SyncTask {
                            op: SyncOp::Update,
                            record_type: record.record_type().to_string(),
                            primary_key,
                        },
                        self.save_delay,
                    );
                }
                Ok(())
            }
        }
    }

    fn on_delete(&self, record: &dyn Record) -> SyncResult<()> {
        // The key must be captured now in both modes; once the primary
        // store commits the delete it is no longer recoverable.
        let Some(primary_key) = self.registry.resolve_primary_key(record) else {
            debug!(
                record_type = record.record_type().as_str(),
                "delete event without resolvable primary key, nothing to sync"
            );
            return Ok(());
        };
        let type_name = record.record_type().to_string();

        match self.mode {
            SyncMode::Inline => {
                self.registry.on_delete(&type_name, &primary_key);
                Ok(())
            }
            SyncMode::Deferred => {
                if let Some(queue) = &self.queue {
                    queue.enqueue(
                        SyncTask {
                            op: SyncOp::Delete,
                            record_type: type_name,
                            primary_key,
                        },
                        // Deletes are applied immediately; only saves are
                        // debounced.
                        None,
                    );
                }
                Ok(())
            }
        }
    }
}
