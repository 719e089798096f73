//! Document preparation: field coercion order, the primary-key rule,
//! embedding dependencies, and batch encoding.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{
    ArticleDefinition, MockTransport, ProductDefinition, StubEncoder, TestRecord, ARTICLE,
    PRODUCT, sample_png, sample_product,
};
use docsync::{CollectionIndexer, DocumentDefinition, SyncError};

fn product_indexer(
    records: Vec<TestRecord>,
) -> (CollectionIndexer, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let indexer = CollectionIndexer::new(
        Arc::new(ProductDefinition::with_records(records)),
        transport.clone(),
    );
    (indexer, transport)
}

#[test]
fn prepared_document_carries_string_primary_key() {
    let (indexer, _) = product_indexer(Vec::new());
    let record = sample_product(42, "boot", 1200, Some(sample_png()));

    let document = indexer.prepare(&record).unwrap();

    assert_eq!(document.id(), Some("42"));
    assert_eq!(document.get("title"), Some(&json!("boot")));
    assert_eq!(document.get("price"), Some(&json!(1200)));
    // Image payload lands as transportable text
    assert!(document.get("photo").unwrap().is_string());
    // Engine-computed embedding is never set client-side
    assert!(!document.contains("photo_vector"));
}

#[test]
fn missing_primary_key_fails_preparation() {
    let (indexer, transport) = product_indexer(Vec::new());
    let record = TestRecord::new(PRODUCT)
        .with("title", "boot")
        .with("price", 1200)
        .with("photo", sample_png());

    let err = indexer.prepare(&record).unwrap_err();
    assert!(matches!(err, SyncError::MissingPrimaryKey { .. }));
    assert!(transport.calls().is_empty());
}

#[test]
fn missing_embedding_dependency_fails_preparation() {
    let (indexer, transport) = product_indexer(Vec::new());
    let record = sample_product(7, "boot", 1200, None);

    let err = indexer.prepare(&record).unwrap_err();
    assert!(matches!(
        err,
        SyncError::MissingDependency { ref field, ref dependency }
            if field == "photo_vector" && dependency == "photo"
    ));
    assert!(transport.calls().is_empty());
}

#[test]
fn fill_skips_invalid_records_and_counts_the_rest() {
    let records = vec![
        sample_product(1, "boot", 100, Some(sample_png())),
        sample_product(2, "sneaker", 200, None),
        sample_product(3, "loafer", 300, Some(sample_png())),
    ];
    let (indexer, transport) = product_indexer(records);

    let indexed = indexer.fill_collection(false);

    assert_eq!(indexed, 2);
    assert_eq!(transport.document_count("products"), 2);
    assert!(transport.document("products", "1").is_some());
    assert!(transport.document("products", "2").is_none());
    assert!(transport.document("products", "3").is_some());
}

#[test]
fn batch_fill_matches_sequential_fill() {
    let records = vec![
        sample_product(1, "boot", 100, Some(sample_png())),
        sample_product(2, "sneaker", 200, None),
        sample_product(3, "loafer", 300, Some(sample_png())),
    ];
    let (indexer, transport) = product_indexer(records);

    let indexed = indexer.fill_collection(true);

    assert_eq!(indexed, 2);
    assert_eq!(transport.document_count("products"), 2);
}

#[test]
fn batch_preparation_encodes_each_field_once() {
    let records: Vec<TestRecord> = (1..=5)
        .map(|i| {
            TestRecord::new(ARTICLE)
                .with("id", i)
                .with("body", format!("article number {i}"))
        })
        .collect();
    let definition = Arc::new(ArticleDefinition::new(records));
    let transport = Arc::new(MockTransport::new());
    let encoder = Arc::new(StubEncoder::new());
    let indexer =
        CollectionIndexer::new(definition.clone(), transport).with_encoder(encoder.clone());

    let documents = indexer.prepare_batch(&definition.all_records()).unwrap();

    assert_eq!(documents.len(), 5);
    assert_eq!(
        encoder
            .batch_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        encoder
            .single_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    // Positional scatter: the stub yields [i; 4] for the i-th batch entry
    for (i, document) in documents.iter().enumerate() {
        assert_eq!(
            document.get("body_vector"),
            Some(&json!(vec![i as f32; 4])),
            "vector for document {i}"
        );
    }
}

#[test]
fn batch_skips_bad_records_but_keeps_positions_aligned() {
    let records = vec![
        TestRecord::new(ARTICLE).with("id", 1).with("body", "first"),
        // no id: dropped during the plain pass
        TestRecord::new(ARTICLE).with("body", "orphan"),
        TestRecord::new(ARTICLE).with("id", 3).with("body", "third"),
    ];
    let definition = Arc::new(ArticleDefinition::new(records));
    let transport = Arc::new(MockTransport::new());
    let encoder = Arc::new(StubEncoder::new());
    let indexer =
        CollectionIndexer::new(definition.clone(), transport).with_encoder(encoder.clone());

    let documents = indexer.prepare_batch(&definition.all_records()).unwrap();

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].id(), Some("1"));
    assert_eq!(documents[1].id(), Some("3"));
    assert_eq!(documents[0].get("body_vector"), Some(&json!(vec![0.0f32; 4])));
    assert_eq!(documents[1].get("body_vector"), Some(&json!(vec![1.0f32; 4])));
}

#[test]
fn model_embedding_without_encoder_is_an_error() {
    let records = vec![TestRecord::new(ARTICLE).with("id", 1).with("body", "text")];
    let definition = Arc::new(ArticleDefinition::new(records));
    let indexer = CollectionIndexer::new(definition.clone(), Arc::new(MockTransport::new()));

    let err = indexer
        .prepare(definition.all_records()[0].as_ref())
        .unwrap_err();
    assert!(matches!(err, SyncError::EncoderMissing { .. }));
}

#[test]
fn prepare_first_record_walks_the_source_set() {
    let (indexer, _) = product_indexer(vec![sample_product(9, "boot", 50, Some(sample_png()))]);
    let document = indexer.prepare_first_record().unwrap().unwrap();
    assert_eq!(document.id(), Some("9"));

    let (empty_indexer, _) = product_indexer(Vec::new());
    assert!(empty_indexer.prepare_first_record().unwrap().is_none());
}

#[test]
fn collection_schema_covers_every_field() {
    let (indexer, _) = product_indexer(Vec::new());
    let schema = indexer.collection_schema();

    assert_eq!(schema.name, "products");
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["title", "price", "photo", "photo_vector"]);

    let vector = &schema.fields[3];
    assert_eq!(vector.field_type, "float[]");
    let embed = vector.embed.as_ref().unwrap();
    assert_eq!(embed.from, vec!["photo".to_string()]);
    assert_eq!(embed.model_config.model_name, "ts/clip-vit-b-p32");
}
