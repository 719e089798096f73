//! Blocking HTTP implementation of the engine transport.
//!
//! Speaks the Typesense-shaped REST surface: `/collections`,
//! `/collections/{name}/documents/{id}`, `/multi_search`, and
//! `/collections/{name}/synonyms/{id}`. All calls are synchronous; inline
//! dispatch runs them on the thread that performed the primary-store
//! mutation, which is exactly the latency/failure visibility the sync
//! layer's contract documents.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::{Value, json};

use super::{JsonMap, SearchTransport, SynonymSet};
use crate::config::ServerConfig;
use crate::document::Document;
use crate::error::{TransportError, TransportResult};
use crate::schema::CollectionSchema;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.connection_timeout_secs))
            .build()
            .map_err(|source| TransportError::Network {
                operation: "client construction".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn check(&self, operation: &str, result: reqwest::Result<Response>) -> TransportResult<Response> {
        let response = result.map_err(|source| TransportError::Network {
            operation: operation.to_string(),
            source,
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(TransportError::NotFound(operation.to_string()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Engine {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    fn parse(&self, operation: &str, response: Response) -> TransportResult<Value> {
        response
            .json()
            .map_err(|e| TransportError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }
}

impl SearchTransport for HttpTransport {
    fn list_collections(&self) -> TransportResult<Vec<String>> {
        let operation = "list collections";
        let response = self.check(
            operation,
            self.client
                .get(self.url("/collections"))
                .header(API_KEY_HEADER, &self.api_key)
                .send(),
        )?;
        let body = self.parse(operation, response)?;

        let names = body
            .as_array()
            .ok_or_else(|| TransportError::InvalidResponse {
                operation: operation.to_string(),
                reason: "expected a JSON array of collections".to_string(),
            })?
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Ok(names)
    }

    fn create_collection(&self, schema: &CollectionSchema) -> TransportResult<()> {
        let operation = "create collection";
        self.check(
            operation,
            self.client
                .post(self.url("/collections"))
                .header(API_KEY_HEADER, &self.api_key)
                .json(schema)
                .send(),
        )?;
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> TransportResult<()> {
        let operation = "drop collection";
        self.check(
            operation,
            self.client
                .delete(self.url(&format!("/collections/{name}")))
                .header(API_KEY_HEADER, &self.api_key)
                .send(),
        )?;
        Ok(())
    }

    fn create_document(&self, collection: &str, document: &Document) -> TransportResult<()> {
        let operation = "create document";
        self.check(
            operation,
            self.client
                .post(self.url(&format!("/collections/{collection}/documents")))
                .header(API_KEY_HEADER, &self.api_key)
                .json(document)
                .send(),
        )?;
        Ok(())
    }

    fn update_document(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> TransportResult<()> {
        let operation = "update document";
        self.check(
            operation,
            self.client
                .patch(self.url(&format!("/collections/{collection}/documents/{id}")))
                .header(API_KEY_HEADER, &self.api_key)
                .json(document)
                .send(),
        )?;
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> TransportResult<()> {
        let operation = "delete document";
        self.check(
            operation,
            self.client
                .delete(self.url(&format!("/collections/{collection}/documents/{id}")))
                .header(API_KEY_HEADER, &self.api_key)
                .send(),
        )?;
        Ok(())
    }

    fn search(&self, collection: &str, params: &JsonMap) -> TransportResult<Value> {
        let operation = "search";

        let mut search = params.clone();
        search.insert("collection".to_string(), Value::from(collection));
        let body = json!({ "searches": [Value::Object(search)] });

        let response = self.check(
            operation,
            self.client
                .post(self.url("/multi_search"))
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body)
                .send(),
        )?;
        let envelope = self.parse(operation, response)?;

        // multi_search wraps per-search envelopes; we issue exactly one
        let result = envelope
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse {
                operation: operation.to_string(),
                reason: "multi_search response carried no results".to_string(),
            })?;

        // Per-search errors arrive inside the envelope, not as HTTP status
        if let Some(code) = result.get("code").and_then(Value::as_u64) {
            let message = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown engine error")
                .to_string();
            if code == 404 {
                return Err(TransportError::NotFound(message));
            }
            return Err(TransportError::Engine {
                operation: operation.to_string(),
                status: code as u16,
                body: message,
            });
        }

        Ok(result)
    }

    fn upsert_synonym(&self, collection: &str, synonym: &SynonymSet) -> TransportResult<()> {
        let operation = "upsert synonym";
        let mut body = serde_json::to_value(synonym).unwrap_or_else(|_| json!({}));
        if let Some(map) = body.as_object_mut() {
            // The name rides in the URL, not the body
            map.remove("id");
        }

        self.check(
            operation,
            self.client
                .put(self.url(&format!(
                    "/collections/{collection}/synonyms/{}",
                    synonym.name
                )))
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body)
                .send(),
        )?;
        Ok(())
    }

    fn delete_synonym(&self, collection: &str, name: &str) -> TransportResult<()> {
        let operation = "delete synonym";
        self.check(
            operation,
            self.client
                .delete(self.url(&format!("/collections/{collection}/synonyms/{name}")))
                .header(API_KEY_HEADER, &self.api_key)
                .send(),
        )?;
        Ok(())
    }

    fn list_synonyms(&self, collection: &str) -> TransportResult<Vec<SynonymSet>> {
        let operation = "list synonyms";
        let response = self.check(
            operation,
            self.client
                .get(self.url(&format!("/collections/{collection}/synonyms")))
                .header(API_KEY_HEADER, &self.api_key)
                .send(),
        )?;
        let body = self.parse(operation, response)?;

        let sets = body
            .get("synonyms")
            .and_then(Value::as_array)
            .ok_or_else(|| TransportError::InvalidResponse {
                operation: operation.to_string(),
                reason: "expected a 'synonyms' array".to_string(),
            })?
            .iter()
            .filter_map(|s| serde_json::from_value(s.clone()).ok())
            .collect();

        Ok(sets)
    }
}
