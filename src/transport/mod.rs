//! Remote search-engine transport
//!
//! The engine itself is an external collaborator: a remote, eventually
//! consistent document store reached over a CRUD + search interface. This
//! module defines that interface and ships an HTTP implementation. Nothing
//! above this layer knows about URLs or status codes; failure semantics are
//! carried by [`crate::TransportError`], in particular `NotFound`, which the
//! sync layer maps to upsert fallback and idempotent delete.

pub mod http;

pub use http::HttpTransport;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::TransportResult;
use crate::schema::CollectionSchema;

/// Flat JSON parameter map for search requests
pub type JsonMap = serde_json::Map<String, Value>;

/// A synonym group scoped to one collection.
///
/// With a `root`, the group is one-way: searching the root matches the
/// synonyms but not the reverse. Without one, every member matches every
/// other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynonymSet {
    #[serde(rename = "id")]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    pub synonyms: Vec<String>,
}

/// CRUD + search surface of the remote engine.
///
/// Implementations must not retry or reinterpret errors; policy (swallow,
/// fall back, propagate) belongs to the callers.
pub trait SearchTransport: Send + Sync {
    /// Names of all collections currently present remotely
    fn list_collections(&self) -> TransportResult<Vec<String>>;

    fn create_collection(&self, schema: &CollectionSchema) -> TransportResult<()>;

    fn drop_collection(&self, name: &str) -> TransportResult<()>;

    fn create_document(&self, collection: &str, document: &Document) -> TransportResult<()>;

    fn update_document(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> TransportResult<()>;

    fn delete_document(&self, collection: &str, id: &str) -> TransportResult<()>;

    /// Execute one search against a collection.
    ///
    /// `params` is the flat request parameter map; the result is the raw
    /// engine envelope (`found`, `page`, `hits`), normalized by the query
    /// layer.
    fn search(&self, collection: &str, params: &JsonMap) -> TransportResult<Value>;

    fn upsert_synonym(&self, collection: &str, synonym: &SynonymSet) -> TransportResult<()>;

    fn delete_synonym(&self, collection: &str, name: &str) -> TransportResult<()>;

    fn list_synonyms(&self, collection: &str) -> TransportResult<Vec<SynonymSet>>;
}
