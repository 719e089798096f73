//! Keep a search-optimized document store synchronized with a primary
//! relational store.
//!
//! Typed records are translated into schema-described search documents
//! (text, numeric, vector, and image fields) and pushed to a remote engine,
//! either inline with the triggering mutation or through a deferred task
//! queue. The crate also builds lexical, vector, and image-similarity
//! search requests and manages synonym groups.
//!
//! The main pieces:
//! - [`schema`]: field descriptors and collection schemas
//! - [`document`]: document definitions and the collection indexer
//! - [`registry`]: record-type to collection routing, including fan-out
//!   through related records
//! - [`sync`]: change capture, inline and deferred dispatch
//! - [`query`]: search request builders and synonym management
//! - [`transport`]: the remote engine client

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod sync;
pub mod transport;

pub use config::Settings;
pub use document::{CollectionIndexer, Document, DocumentDefinition};
pub use embedding::{EncodeInput, FastEmbedEncoder, VectorEncoder};
pub use error::{SyncError, SyncResult, TransportError, TransportResult};
pub use query::{CollectionSearcher, SearchOutcome, SearchRequest, SynonymManager};
pub use record::{AttributeValue, Record, RecordStore, RecordType};
pub use registry::CollectionRegistry;
pub use schema::{CollectionSchema, FieldDescriptor, FieldKind, FieldSet};
pub use sync::{
    ChangeNotifier, ChangeSubscriber, MembershipAction, SyncDispatcher, SyncMode, SyncTask,
    TaskExecutor, TaskQueue, WorkerQueue,
};
pub use transport::{HttpTransport, SearchTransport, SynonymSet};

/// Crate version, for diagnostics
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
