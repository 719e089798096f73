//! Document definitions and the collection indexer
//!
//! A [`DocumentDefinition`] aggregates the schema and record access for one
//! collection: its field set, source record type, primary-key attribute,
//! related record types, and the record streams the sync layer pulls from.
//! The [`CollectionIndexer`] pairs a definition with a transport (and
//! optionally an encoder) and owns the document-preparation algorithm plus
//! the remote CRUD policies built on top of it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::embedding::{EncodeInput, VectorEncoder};
use crate::error::{SyncError, SyncResult};
use crate::record::{AttributeValue, Record, RecordType};
use crate::schema::{CollectionSchema, FieldDescriptor, FieldKind, FieldSet};
use crate::transport::SearchTransport;

/// A search document: the flat name→value mapping sent to the engine.
///
/// Ephemeral by design; produced fresh per record per preparation call,
/// always carrying an `id` equal to the string form of the record's primary
/// key, and never partially populated (preparation either fully succeeds or
/// the document is discarded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: serde_json::Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The document id, present on every prepared document
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-record-type document configuration.
///
/// Implementations are constructed once at startup and registered into the
/// [`crate::registry::CollectionRegistry`]. A definition that declares
/// `related_types` must implement `related_instances_for` so that changes to
/// those records fan out to the documents derived from them.
pub trait DocumentDefinition: Send + Sync {
    /// Name of the remote collection this definition owns
    fn collection_name(&self) -> &str;

    /// The source record type documents are built from
    fn record_type(&self) -> RecordType;

    /// Ordered field descriptors
    fn fields(&self) -> &FieldSet;

    /// Attribute holding the record's primary key
    fn id_attribute(&self) -> &str {
        "id"
    }

    /// Default sort fields for the collection schema
    fn default_sorting_fields(&self) -> Option<&[String]> {
        None
    }

    /// Record types whose changes should re-index documents of this
    /// definition
    fn related_types(&self) -> &[RecordType] {
        &[]
    }

    /// Resolve the records of this definition's own type that derive field
    /// values from `record`. Required when `related_types` is non-empty.
    fn related_instances_for(&self, _record: &dyn Record) -> Vec<Box<dyn Record>> {
        Vec::new()
    }

    /// The full source-record set, streamed during bulk loading
    fn all_records(&self) -> Vec<Box<dyn Record>>;
}

/// Pairs a document definition with the engine transport and an optional
/// local encoder, and implements preparation and remote synchronization.
pub struct CollectionIndexer {
    definition: Arc<dyn DocumentDefinition>,
    transport: Arc<dyn SearchTransport>,
    encoder: Option<Arc<dyn VectorEncoder>>,
}

impl CollectionIndexer {
    pub fn new(
        definition: Arc<dyn DocumentDefinition>,
        transport: Arc<dyn SearchTransport>,
    ) -> Self {
        Self {
            definition,
            transport,
            encoder: None,
        }
    }

    /// Attach the encoder used for embedding-by-local-model fields
    pub fn with_encoder(mut self, encoder: Arc<dyn VectorEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn definition(&self) -> &Arc<dyn DocumentDefinition> {
        &self.definition
    }

    pub fn collection_name(&self) -> &str {
        self.definition.collection_name()
    }

    /// Engine-accepted collection schema: the union of field schemas plus
    /// name and default sorting metadata.
    pub fn collection_schema(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.definition.collection_name().to_string(),
            default_sorting_fields: self
                .definition
                .default_sorting_fields()
                .map(<[String]>::to_vec),
            fields: self.definition.fields().field_schemas(),
        }
    }

    /// The primary key a document for this record would carry, if resolvable
    pub fn resolve_primary_key(&self, record: &dyn Record) -> Option<String> {
        match record.attribute(self.definition.id_attribute()) {
            Some(AttributeValue::Int(i)) => Some(i.to_string()),
            Some(AttributeValue::Text(s)) if !s.is_empty() => Some(s),
            Some(AttributeValue::Float(f)) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Prepare one document from one record.
    ///
    /// Descriptors are processed in declared order: plain fields first, then
    /// the primary key, then embedding fields. A missing primary key or a
    /// missing required embedding dependency fails the whole document; no
    /// partial documents ever leave this call.
    pub fn prepare(&self, record: &dyn Record) -> SyncResult<Document> {
        let (mut document, inputs) = self.prepare_plain(record)?;
        if inputs.iter().all(Option::is_none) {
            return Ok(document);
        }

        let model_fields = self.model_fields();
        let encoder = self.require_encoder(model_fields[0].0)?;
        for ((name, _), input) in model_fields.iter().zip(&inputs) {
            if let Some(input) = input {
                let vector = encoder.encode(input)?;
                document.insert(*name, Value::from(vector));
            }
        }

        Ok(document)
    }

    /// Prepare documents for a whole batch of records.
    ///
    /// Two passes: the first prepares every plain field across all records
    /// and collects, per embedding-by-local-model field, the ordered
    /// dependency values for the batch, skipping records that fail
    /// preparation. The second invokes each field's batched encoder exactly
    /// once and scatters the produced vectors back by position. This
    /// amortizes encoder cost from one call per record to one call per
    /// embedding field.
    pub fn prepare_batch(&self, records: &[Box<dyn Record>]) -> SyncResult<Vec<Document>> {
        let model_fields = self.model_fields();
        let mut documents: Vec<Document> = Vec::new();
        let mut per_document: Vec<Vec<Option<EncodeInput>>> = Vec::new();

        for record in records {
            match self.prepare_plain(record.as_ref()) {
                Ok((document, inputs)) => {
                    debug_assert_eq!(inputs.len(), model_fields.len());
                    per_document.push(inputs);
                    documents.push(document);
                }
                Err(err) => {
                    debug!(
                        collection = self.collection_name(),
                        "skipping record during batch preparation: {err}"
                    );
                }
            }
        }

        if !model_fields.is_empty() && !documents.is_empty() {
            let encoder = self.require_encoder(model_fields[0].0)?;
            for (field_idx, (name, _)) in model_fields.iter().enumerate() {
                // Optional fields may be absent on some records, so the
                // batch tracks which document each input came from.
                let mut positions = Vec::new();
                let mut batch = Vec::new();
                for (doc_idx, inputs) in per_document.iter().enumerate() {
                    if let Some(input) = &inputs[field_idx] {
                        positions.push(doc_idx);
                        batch.push(input.clone());
                    }
                }
                if batch.is_empty() {
                    continue;
                }
                let vectors = encoder.encode_batch(&batch)?;
                for (doc_idx, vector) in positions.into_iter().zip(vectors) {
                    documents[doc_idx].insert(*name, Value::from(vector));
                }
            }
        }

        Ok(documents)
    }

    /// Prepare the first record of the source set.
    ///
    /// Debugging helper for authoring definitions; fails with the same
    /// errors `prepare` would surface during synchronization.
    pub fn prepare_first_record(&self) -> SyncResult<Option<Document>> {
        match self.definition.all_records().first() {
            Some(record) => self.prepare(record.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    /// Destructive replace: drop the remote collection if it exists, then
    /// create it fresh from the schema. Transport errors are logged and
    /// swallowed; a failed rebuild leaves the index in its prior state.
    pub fn rebuild_collection(&self) {
        if let Err(err) = self.try_rebuild() {
            warn!(
                collection = self.collection_name(),
                "collection rebuild failed, index left in prior state: {err}"
            );
        }
    }

    fn try_rebuild(&self) -> SyncResult<()> {
        let name = self.definition.collection_name();
        let existing = self.transport.list_collections()?;
        if existing.iter().any(|c| c == name) {
            self.transport.drop_collection(name)?;
        }
        self.transport.create_collection(&self.collection_schema())?;
        Ok(())
    }

    /// Stream the full record set into the remote collection.
    ///
    /// Returns the number of documents successfully created. Per-record
    /// preparation and create failures are skipped and logged; the stream
    /// never aborts early.
    pub fn fill_collection(&self, use_batch: bool) -> usize {
        let records = self.definition.all_records();
        let total = records.len();
        let mut indexed = 0usize;

        if use_batch {
            let documents = match self.prepare_batch(&records) {
                Ok(documents) => documents,
                Err(err) => {
                    warn!(
                        collection = self.collection_name(),
                        "batch preparation failed, nothing indexed: {err}"
                    );
                    return 0;
                }
            };
            for document in &documents {
                if self.create_counted(document) {
                    indexed += 1;
                }
            }
        } else {
            for record in &records {
                let document = match self.prepare(record.as_ref()) {
                    Ok(document) => document,
                    Err(err) => {
                        debug!(
                            collection = self.collection_name(),
                            "skipping record: {err}"
                        );
                        continue;
                    }
                };
                if self.create_counted(&document) {
                    indexed += 1;
                }
            }
        }

        info!(
            collection = self.collection_name(),
            indexed, total, "collection fill finished"
        );
        indexed
    }

    fn create_counted(&self, document: &Document) -> bool {
        match self
            .transport
            .create_document(self.definition.collection_name(), document)
        {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    collection = self.collection_name(),
                    id = document.id().unwrap_or("<none>"),
                    "document create failed: {err}"
                );
                false
            }
        }
    }

    /// Rebuild the collection and fill it from the record set
    pub fn init_collection(&self, use_batch: bool) {
        self.rebuild_collection();
        let indexed = self.fill_collection(use_batch);
        info!(
            collection = self.collection_name(),
            indexed, "collection initialized"
        );
    }

    /// Prepare and push one record's document by id.
    ///
    /// A remote not-found falls back to a create (self-healing upsert); any
    /// other transport error propagates to the caller. The asymmetry with
    /// `delete_document` is deliberate.
    pub fn update_document(&self, record: &dyn Record) -> SyncResult<()> {
        let document = self.prepare(record)?;
        let id = document
            .id()
            .ok_or_else(|| SyncError::MissingPrimaryKey {
                record_type: record.record_type().to_string(),
                attribute: self.definition.id_attribute().to_string(),
            })?
            .to_string();

        let name = self.definition.collection_name();
        match self.transport.update_document(name, &id, &document) {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(
                    collection = name,
                    id, "document missing remotely, creating instead"
                );
                self.transport.create_document(name, &document)?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete the document for a primary key.
    ///
    /// Not-found is success (idempotent delete); other transport errors are
    /// logged and swallowed.
    pub fn delete_document(&self, primary_key: &str) {
        let name = self.definition.collection_name();
        match self.transport.delete_document(name, primary_key) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(collection = name, id = primary_key, "document already absent");
            }
            Err(err) => {
                warn!(
                    collection = name,
                    id = primary_key, "document delete failed: {err}"
                );
            }
        }
    }

    /// Pass 1 of preparation: plain fields, primary key, and embedding
    /// dependency validation. Returns the partially assembled document and,
    /// per local-model field in declared order, its encode input (`None`
    /// when an optional field's dependency is absent).
    fn prepare_plain(
        &self,
        record: &dyn Record,
    ) -> SyncResult<(Document, Vec<Option<EncodeInput>>)> {
        let fields = self.definition.fields();
        let mut document = Document::new();

        for (name, descriptor) in fields.iter() {
            if descriptor.kind().is_embedding() {
                continue;
            }
            let raw = record.attribute(descriptor.source_attribute(name));
            if let Some(value) = descriptor.prepare(name, raw)? {
                document.insert(name, value);
            }
        }

        let id = self
            .resolve_primary_key(record)
            .ok_or_else(|| SyncError::MissingPrimaryKey {
                record_type: record.record_type().to_string(),
                attribute: self.definition.id_attribute().to_string(),
            })?;
        document.insert("id", Value::String(id));

        let mut inputs = Vec::new();
        for (name, descriptor) in fields.iter() {
            let Some(source) = descriptor.kind().embedding_source() else {
                continue;
            };

            let is_model = descriptor.kind().is_model_embedding();
            match document.get(source).filter(|v| !v.is_null()) {
                Some(value) => {
                    if is_model {
                        inputs.push(Some(encode_input(fields.get(source), value)));
                    }
                }
                None if descriptor.is_optional() => {
                    if is_model {
                        inputs.push(None);
                    }
                }
                None => {
                    return Err(SyncError::MissingDependency {
                        field: name.to_string(),
                        dependency: source.to_string(),
                    });
                }
            }
        }

        Ok((document, inputs))
    }

    fn model_fields(&self) -> Vec<(&str, &FieldDescriptor)> {
        self.definition
            .fields()
            .iter()
            .filter(|(_, descriptor)| descriptor.kind().is_model_embedding())
            .collect()
    }

    fn require_encoder(&self, field: &str) -> SyncResult<&Arc<dyn VectorEncoder>> {
        self.encoder.as_ref().ok_or_else(|| SyncError::EncoderMissing {
            field: field.to_string(),
        })
    }
}

/// Build the encoder input for one dependency value. Image sources hand
/// over their transportable payload; everything else encodes as text.
fn encode_input(source_descriptor: Option<&FieldDescriptor>, value: &Value) -> EncodeInput {
    let is_image = source_descriptor
        .map(|d| matches!(d.kind(), FieldKind::Image))
        .unwrap_or(false);

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if is_image {
        EncodeInput::Image(text)
    } else {
        EncodeInput::Text(text)
    }
}
