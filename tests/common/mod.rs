//! Shared fixtures: an in-memory transport, a deterministic encoder, and
//! small catalog definitions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};

use docsync::error::{SyncResult, TransportResult};
use docsync::{
    AttributeValue, CollectionSchema, Document, DocumentDefinition, EncodeInput, FieldDescriptor,
    FieldSet, Record, RecordStore, RecordType, SearchTransport, SynonymSet, TransportError,
    VectorEncoder,
};

type JsonParams = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    ListCollections,
    CreateCollection(String),
    DropCollection(String),
    CreateDocument { collection: String, id: String },
    UpdateDocument { collection: String, id: String },
    DeleteDocument { collection: String, id: String },
    Search { collection: String },
    UpsertSynonym { collection: String, name: String },
    DeleteSynonym { collection: String, name: String },
    ListSynonyms { collection: String },
}

/// In-memory engine double. Collections and documents behave like the real
/// engine's CRUD (not-found on missing update/delete targets); search
/// returns a canned envelope.
#[derive(Default)]
pub struct MockTransport {
    pub calls: Mutex<Vec<TransportCall>>,
    pub collections: Mutex<Vec<String>>,
    pub documents: Mutex<HashMap<(String, String), Document>>,
    pub synonyms: Mutex<HashMap<(String, String), SynonymSet>>,
    pub search_response: Mutex<Value>,
    pub last_search_params: Mutex<Option<JsonParams>>,
    /// When set, the next document or collection call consumes it and fails
    pub fail_next: Mutex<Option<TransportError>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            search_response: Mutex::new(json!({"found": 0, "page": 1, "hits": []})),
            ..Self::default()
        }
    }

    pub fn with_search_response(response: Value) -> Self {
        let transport = Self::new();
        *transport.search_response.lock() = response;
        transport
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.documents
            .lock()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.documents
            .lock()
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    pub fn fail_next_with(&self, error: TransportError) {
        *self.fail_next.lock() = Some(error);
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }

    fn take_injected_failure(&self) -> TransportResult<()> {
        match self.fail_next.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl SearchTransport for MockTransport {
    fn list_collections(&self) -> TransportResult<Vec<String>> {
        self.record(TransportCall::ListCollections);
        self.take_injected_failure()?;
        Ok(self.collections.lock().clone())
    }

    fn create_collection(&self, schema: &CollectionSchema) -> TransportResult<()> {
        self.record(TransportCall::CreateCollection(schema.name.clone()));
        self.take_injected_failure()?;
        self.collections.lock().push(schema.name.clone());
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> TransportResult<()> {
        self.record(TransportCall::DropCollection(name.to_string()));
        self.take_injected_failure()?;
        let mut collections = self.collections.lock();
        match collections.iter().position(|c| c == name) {
            Some(idx) => {
                collections.remove(idx);
                self.documents.lock().retain(|(c, _), _| c != name);
                Ok(())
            }
            None => Err(TransportError::NotFound(format!(
                "collection '{name}' does not exist"
            ))),
        }
    }

    fn create_document(&self, collection: &str, document: &Document) -> TransportResult<()> {
        let id = document.id().unwrap_or_default().to_string();
        self.record(TransportCall::CreateDocument {
            collection: collection.to_string(),
            id: id.clone(),
        });
        self.take_injected_failure()?;
        self.documents
            .lock()
            .insert((collection.to_string(), id), document.clone());
        Ok(())
    }

    fn update_document(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> TransportResult<()> {
        self.record(TransportCall::UpdateDocument {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.take_injected_failure()?;
        let key = (collection.to_string(), id.to_string());
        let mut documents = self.documents.lock();
        if !documents.contains_key(&key) {
            return Err(TransportError::NotFound(format!(
                "document '{id}' not found in '{collection}'"
            )));
        }
        documents.insert(key, document.clone());
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> TransportResult<()> {
        self.record(TransportCall::DeleteDocument {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.take_injected_failure()?;
        let key = (collection.to_string(), id.to_string());
        match self.documents.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(TransportError::NotFound(format!(
                "document '{id}' not found in '{collection}'"
            ))),
        }
    }

    fn search(&self, collection: &str, params: &JsonParams) -> TransportResult<Value> {
        self.record(TransportCall::Search {
            collection: collection.to_string(),
        });
        *self.last_search_params.lock() = Some(params.clone());
        Ok(self.search_response.lock().clone())
    }

    fn upsert_synonym(&self, collection: &str, synonym: &SynonymSet) -> TransportResult<()> {
        self.record(TransportCall::UpsertSynonym {
            collection: collection.to_string(),
            name: synonym.name.clone(),
        });
        self.synonyms.lock().insert(
            (collection.to_string(), synonym.name.clone()),
            synonym.clone(),
        );
        Ok(())
    }

    fn delete_synonym(&self, collection: &str, name: &str) -> TransportResult<()> {
        self.record(TransportCall::DeleteSynonym {
            collection: collection.to_string(),
            name: name.to_string(),
        });
        let key = (collection.to_string(), name.to_string());
        match self.synonyms.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(TransportError::NotFound(format!(
                "synonym '{name}' not found in '{collection}'"
            ))),
        }
    }

    fn list_synonyms(&self, collection: &str) -> TransportResult<Vec<SynonymSet>> {
        self.record(TransportCall::ListSynonyms {
            collection: collection.to_string(),
        });
        Ok(self
            .synonyms
            .lock()
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, set)| set.clone())
            .collect())
    }
}

/// Deterministic encoder: vector `[position; 4]` within each batch, so
/// tests can assert positional scatter. Counts invocations.
#[derive(Default)]
pub struct StubEncoder {
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
}

impl StubEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorEncoder for StubEncoder {
    fn encode(&self, input: &EncodeInput) -> SyncResult<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        let len = match input {
            EncodeInput::Text(s) | EncodeInput::Image(s) => s.len(),
        };
        Ok(vec![len as f32; 4])
    }

    fn encode_batch(&self, inputs: &[EncodeInput]) -> SyncResult<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..inputs.len()).map(|i| vec![i as f32; 4]).collect())
    }

    fn dimensions(&self) -> usize {
        4
    }
}

pub const PRODUCT: RecordType = RecordType::new("product");
pub const ARTICLE: RecordType = RecordType::new("article");

#[derive(Debug, Clone)]
pub struct TestRecord {
    record_type: RecordType,
    attributes: HashMap<String, AttributeValue>,
}

impl TestRecord {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

impl Record for TestRecord {
    fn record_type(&self) -> RecordType {
        self.record_type
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.get(name).cloned()
    }
}

fn primary_key_of(record: &TestRecord) -> Option<String> {
    match record.attribute("id") {
        Some(AttributeValue::Int(i)) => Some(i.to_string()),
        Some(AttributeValue::Text(s)) => Some(s),
        _ => None,
    }
}

/// Primary-store double keyed by type name and id
#[derive(Default)]
pub struct TestStore {
    records: Mutex<Vec<TestRecord>>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: TestRecord) {
        self.records.lock().push(record);
    }

    pub fn remove(&self, record_type: &str, primary_key: &str) {
        self.records.lock().retain(|r| {
            r.record_type().as_str() != record_type
                || primary_key_of(r).as_deref() != Some(primary_key)
        });
    }
}

impl RecordStore for TestStore {
    fn find(&self, record_type: &str, primary_key: &str) -> Option<Box<dyn Record>> {
        self.records
            .lock()
            .iter()
            .find(|r| {
                r.record_type().as_str() == record_type
                    && primary_key_of(r).as_deref() == Some(primary_key)
            })
            .map(|r| Box::new(r.clone()) as Box<dyn Record>)
    }
}

/// Product catalog with a plain title/price pair, an image, and an
/// engine-computed embedding derived from the image.
pub struct ProductDefinition {
    fields: FieldSet,
    records: Mutex<Vec<TestRecord>>,
}

impl ProductDefinition {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<TestRecord>) -> Self {
        let fields = FieldSet::builder()
            .field("title", FieldDescriptor::string())
            .field("price", FieldDescriptor::int32())
            .field("photo", FieldDescriptor::image())
            .field(
                "photo_vector",
                FieldDescriptor::remote_embedding("photo", "ts/clip-vit-b-p32"),
            )
            .build()
            .unwrap_or_else(|err| panic!("product field set: {err}"));
        Self {
            fields,
            records: Mutex::new(records),
        }
    }
}

impl DocumentDefinition for ProductDefinition {
    fn collection_name(&self) -> &str {
        "products"
    }

    fn record_type(&self) -> RecordType {
        PRODUCT
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }

    fn all_records(&self) -> Vec<Box<dyn Record>> {
        self.records
            .lock()
            .iter()
            .map(|r| Box::new(r.clone()) as Box<dyn Record>)
            .collect()
    }
}

/// Text catalog whose embedding is computed locally by the injected
/// encoder; exercises batch encoding.
pub struct ArticleDefinition {
    fields: FieldSet,
    records: Mutex<Vec<TestRecord>>,
}

impl ArticleDefinition {
    pub fn new(records: Vec<TestRecord>) -> Self {
        let fields = FieldSet::builder()
            .field("body", FieldDescriptor::string())
            .field(
                "body_vector",
                FieldDescriptor::model_embedding("body", "AllMiniLML6V2").num_dims(4),
            )
            .build()
            .unwrap_or_else(|err| panic!("article field set: {err}"));
        Self {
            fields,
            records: Mutex::new(records),
        }
    }
}

impl DocumentDefinition for ArticleDefinition {
    fn collection_name(&self) -> &str {
        "articles"
    }

    fn record_type(&self) -> RecordType {
        ARTICLE
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }

    fn all_records(&self) -> Vec<Box<dyn Record>> {
        self.records
            .lock()
            .iter()
            .map(|r| Box::new(r.clone()) as Box<dyn Record>)
            .collect()
    }
}

/// A tiny valid PNG: one red pixel.
pub fn sample_png() -> Vec<u8> {
    use image::{ImageFormat, Rgb, RgbImage};
    let mut buffer = std::io::Cursor::new(Vec::new());
    let mut img = RgbImage::new(1, 1);
    img.put_pixel(0, 0, Rgb([255, 0, 0]));
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn sample_product(id: i64, title: &str, price: i32, photo: Option<Vec<u8>>) -> TestRecord {
    let mut record = TestRecord::new(PRODUCT)
        .with("id", id)
        .with("title", title)
        .with("price", price);
    if let Some(photo) = photo {
        record = record.with("photo", photo);
    }
    record
}
