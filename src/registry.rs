//! Collection registry
//!
//! Central lookup from record types to the indexers their changes affect.
//! Registration is idempotent by collection name, and every registration
//! rebuilds the derived routing maps from scratch so direct and fan-out
//! lookups always reflect the full set of registered definitions.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::CollectionIndexer;
use crate::error::SyncResult;
use crate::record::{Record, RecordType};

#[derive(Default)]
pub struct CollectionRegistry {
    indexers: Vec<Arc<CollectionIndexer>>,
    /// Record type -> indexers whose documents are built from that type
    by_record_type: HashMap<RecordType, Vec<usize>>,
    /// Record type -> indexers that derive field values from that type
    fanout: HashMap<RecordType, Vec<usize>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indexer. Re-registering a collection name replaces the
    /// previous entry instead of adding a duplicate.
    pub fn register(&mut self, indexer: CollectionIndexer) {
        let name = indexer.collection_name().to_string();
        if let Some(existing) = self
            .indexers
            .iter()
            .position(|i| i.collection_name() == name)
        {
            debug!(collection = name, "replacing registered collection");
            self.indexers[existing] = Arc::new(indexer);
        } else {
            self.indexers.push(Arc::new(indexer));
        }
        self.rebuild_routes();
    }

    pub fn indexers(&self) -> &[Arc<CollectionIndexer>] {
        &self.indexers
    }

    pub fn get(&self, collection_name: &str) -> Option<&Arc<CollectionIndexer>> {
        self.indexers
            .iter()
            .find(|i| i.collection_name() == collection_name)
    }

    /// Push a changed record into every affected collection.
    ///
    /// Direct collections index the record itself; fan-out collections
    /// re-index the related records of their own type that derive values
    /// from it. The first direct failure propagates; fan-out failures for
    /// individual related records are logged and skipped so one bad derived
    /// record cannot block the rest.
    pub fn on_update(&self, record: &dyn Record) -> SyncResult<()> {
        let record_type = record.record_type();

        if let Some(direct) = self.by_record_type.get(&record_type) {
            for &idx in direct {
                self.indexers[idx].update_document(record)?;
            }
        }

        if let Some(related) = self.fanout.get(&record_type) {
            for &idx in related {
                let indexer = &self.indexers[idx];
                for instance in indexer.definition().related_instances_for(record) {
                    if let Err(err) = indexer.update_document(instance.as_ref()) {
                        warn!(
                            collection = indexer.collection_name(),
                            "related document update failed: {err}"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove the documents for a deleted record, identified by its type
    /// name and pre-resolved primary key.
    pub fn on_delete(&self, type_name: &str, primary_key: &str) {
        for indexer in &self.indexers {
            if indexer.definition().record_type().as_str() == type_name {
                indexer.delete_document(primary_key);
            }
        }
    }

    /// Resolve the primary key a record's documents carry, via the first
    /// indexer its type routes to.
    ///
    /// Related-only types (present in the fan-out map but not indexed
    /// directly) resolve too, so deferred dispatch can enqueue their saves
    /// and preserve the cascade inline dispatch performs.
    pub fn resolve_primary_key(&self, record: &dyn Record) -> Option<String> {
        let record_type = record.record_type();
        let idx = self
            .by_record_type
            .get(&record_type)
            .or_else(|| self.fanout.get(&record_type))
            .and_then(|routed| routed.first())?;
        self.indexers[*idx].resolve_primary_key(record)
    }

    fn rebuild_routes(&mut self) {
        self.by_record_type.clear();
        self.fanout.clear();

        for (idx, indexer) in self.indexers.iter().enumerate() {
            let definition = indexer.definition();
            self.by_record_type
                .entry(definition.record_type())
                .or_default()
                .push(idx);
            for related in definition.related_types() {
                self.fanout.entry(*related).or_default().push(idx);
            }
        }
    }
}
