//! Synonym group management
//!
//! Thin pass-through CRUD scoped to one collection. One-way groups expand a
//! root term into its synonyms; multi-way groups expand every member into
//! the others.

use std::sync::Arc;

use crate::error::SyncResult;
use crate::transport::{SearchTransport, SynonymSet};

pub struct SynonymManager {
    collection: String,
    transport: Arc<dyn SearchTransport>,
}

impl SynonymManager {
    pub fn new(collection: impl Into<String>, transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            collection: collection.into(),
            transport,
        }
    }

    /// Searches for `root` also match any of `synonyms`, but not the
    /// reverse.
    pub fn add_one_way(
        &self,
        root: impl Into<String>,
        name: impl Into<String>,
        synonyms: Vec<String>,
    ) -> SyncResult<()> {
        let set = SynonymSet {
            name: name.into(),
            root: Some(root.into()),
            synonyms,
        };
        self.transport.upsert_synonym(&self.collection, &set)?;
        Ok(())
    }

    /// Every member of `synonyms` matches every other member.
    pub fn add_multi_way(&self, name: impl Into<String>, synonyms: Vec<String>) -> SyncResult<()> {
        let set = SynonymSet {
            name: name.into(),
            root: None,
            synonyms,
        };
        self.transport.upsert_synonym(&self.collection, &set)?;
        Ok(())
    }

    pub fn delete(&self, name: &str) -> SyncResult<()> {
        self.transport.delete_synonym(&self.collection, name)?;
        Ok(())
    }

    pub fn list(&self) -> SyncResult<Vec<SynonymSet>> {
        Ok(self.transport.list_synonyms(&self.collection)?)
    }
}
