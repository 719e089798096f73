//! Search request construction and result normalization
//!
//! [`SearchRequest`] is a builder over the engine's multi-search parameters.
//! Every fuzziness control is optional and omitted from the wire call when
//! unset, leaving the engine's documented defaults in force rather than
//! pinning them client-side. [`CollectionSearcher`] scopes requests to one
//! definition's collection and flattens the engine envelope into a
//! [`SearchOutcome`].

pub mod synonyms;

pub use synonyms::SynonymManager;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use crate::document::DocumentDefinition;
use crate::error::SyncResult;
use crate::schema::{FieldKind, encode_image_payload};
use crate::transport::{JsonMap, SearchTransport};

/// One search request against a collection. Unset parameters are not sent.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    q: String,
    query_by: Vec<String>,
    sort_by: Option<String>,
    per_page: Option<u32>,
    page: Option<u32>,
    filter_by: Option<String>,
    text_match_type: Option<String>,
    num_typos: Option<u8>,
    min_len_1typo: Option<u32>,
    min_len_2typo: Option<u32>,
    typo_tokens_threshold: Option<u32>,
    drop_tokens_threshold: Option<u32>,
    drop_tokens_mode: Option<String>,
    enable_typos_for_numerical_tokens: Option<bool>,
    enable_typos_for_alpha_numerical_tokens: Option<bool>,
    synonym_num_typos: Option<u32>,
    exclude_fields: Vec<String>,
    vector_query: Option<String>,
    include_scores: bool,
}

impl SearchRequest {
    pub fn new(q: impl Into<String>, query_by: Vec<String>) -> Self {
        Self {
            q: q.into(),
            query_by,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn filter_by(mut self, filter_by: impl Into<String>) -> Self {
        self.filter_by = Some(filter_by.into());
        self
    }

    pub fn text_match_type(mut self, text_match_type: impl Into<String>) -> Self {
        self.text_match_type = Some(text_match_type.into());
        self
    }

    pub fn num_typos(mut self, num_typos: u8) -> Self {
        self.num_typos = Some(num_typos);
        self
    }

    pub fn min_len_1typo(mut self, len: u32) -> Self {
        self.min_len_1typo = Some(len);
        self
    }

    pub fn min_len_2typo(mut self, len: u32) -> Self {
        self.min_len_2typo = Some(len);
        self
    }

    pub fn typo_tokens_threshold(mut self, threshold: u32) -> Self {
        self.typo_tokens_threshold = Some(threshold);
        self
    }

    pub fn drop_tokens_threshold(mut self, threshold: u32) -> Self {
        self.drop_tokens_threshold = Some(threshold);
        self
    }

    pub fn drop_tokens_mode(mut self, mode: impl Into<String>) -> Self {
        self.drop_tokens_mode = Some(mode.into());
        self
    }

    pub fn enable_typos_for_numerical_tokens(mut self, enable: bool) -> Self {
        self.enable_typos_for_numerical_tokens = Some(enable);
        self
    }

    pub fn enable_typos_for_alpha_numerical_tokens(mut self, enable: bool) -> Self {
        self.enable_typos_for_alpha_numerical_tokens = Some(enable);
        self
    }

    pub fn synonym_num_typos(mut self, num_typos: u32) -> Self {
        self.synonym_num_typos = Some(num_typos);
        self
    }

    pub fn exclude_field(mut self, field: impl Into<String>) -> Self {
        self.exclude_fields.push(field.into());
        self
    }

    /// Request `score` and `vector_distance` on each hit when the engine
    /// supplies them
    pub fn include_scores(mut self) -> Self {
        self.include_scores = true;
        self
    }

    /// Wire parameters for the engine's multi-search body
    pub fn to_params(&self) -> JsonMap {
        let mut params = JsonMap::new();
        params.insert("q".into(), json!(self.q));
        params.insert("query_by".into(), json!(self.query_by.join(",")));

        if let Some(v) = &self.sort_by {
            params.insert("sort_by".into(), json!(v));
        }
        if let Some(v) = self.per_page {
            params.insert("per_page".into(), json!(v));
        }
        if let Some(v) = self.page {
            params.insert("page".into(), json!(v));
        }
        if let Some(v) = &self.filter_by {
            params.insert("filter_by".into(), json!(v));
        }
        if let Some(v) = &self.text_match_type {
            params.insert("text_match_type".into(), json!(v));
        }
        if let Some(v) = self.num_typos {
            params.insert("num_typos".into(), json!(v));
        }
        if let Some(v) = self.min_len_1typo {
            params.insert("min_len_1typo".into(), json!(v));
        }
        if let Some(v) = self.min_len_2typo {
            params.insert("min_len_2typo".into(), json!(v));
        }
        if let Some(v) = self.typo_tokens_threshold {
            params.insert("typo_tokens_threshold".into(), json!(v));
        }
        if let Some(v) = self.drop_tokens_threshold {
            params.insert("drop_tokens_threshold".into(), json!(v));
        }
        if let Some(v) = &self.drop_tokens_mode {
            params.insert("drop_tokens_mode".into(), json!(v));
        }
        if let Some(v) = self.enable_typos_for_numerical_tokens {
            params.insert("enable_typos_for_numerical_tokens".into(), json!(v));
        }
        if let Some(v) = self.enable_typos_for_alpha_numerical_tokens {
            params.insert("enable_typos_for_alpha_numerical_tokens".into(), json!(v));
        }
        if let Some(v) = self.synonym_num_typos {
            params.insert("synonym_num_typos".into(), json!(v));
        }
        if !self.exclude_fields.is_empty() {
            params.insert("exclude_fields".into(), json!(self.exclude_fields.join(",")));
        }
        if let Some(v) = &self.vector_query {
            params.insert("vector_query".into(), json!(v));
        }

        params
    }
}

/// Normalized search result envelope
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub count: u64,
    pub num_page: u64,
    pub search_results: Vec<Value>,
}

impl SearchOutcome {
    fn empty() -> Self {
        Self {
            count: 0,
            num_page: 1,
            search_results: Vec::new(),
        }
    }
}

/// Runs lexical, vector, and image-similarity searches against one
/// definition's collection.
pub struct CollectionSearcher {
    definition: Arc<dyn DocumentDefinition>,
    transport: Arc<dyn SearchTransport>,
}

impl CollectionSearcher {
    pub fn new(
        definition: Arc<dyn DocumentDefinition>,
        transport: Arc<dyn SearchTransport>,
    ) -> Self {
        Self {
            definition,
            transport,
        }
    }

    /// Lexical search
    pub fn search(&self, request: &SearchRequest) -> SyncResult<SearchOutcome> {
        let raw = self
            .transport
            .search(self.definition.collection_name(), &request.to_params())?;
        Ok(normalize(&raw, request.include_scores))
    }

    /// Semantic search: the vector field joins the queried fields and is
    /// always stripped from the returned payload.
    pub fn vector_search(
        &self,
        vector_field: &str,
        mut request: SearchRequest,
    ) -> SyncResult<SearchOutcome> {
        request.query_by.push(vector_field.to_string());
        request.exclude_fields.push(vector_field.to_string());
        self.search(&request)
    }

    /// Find documents whose image embedding is nearest to a query image.
    ///
    /// `vector_field` must be declared as an embedding derived from an
    /// image field; anything else yields an empty outcome without touching
    /// the engine. An undecodable query image degrades the same way.
    pub fn image_search(
        &self,
        vector_field: &str,
        image: &[u8],
        mut request: SearchRequest,
    ) -> SyncResult<SearchOutcome> {
        if !self.derives_from_image(vector_field) {
            warn!(
                collection = self.definition.collection_name(),
                field = vector_field,
                "image search on a field not derived from an image, returning nothing"
            );
            return Ok(SearchOutcome::empty());
        }

        let Some(payload) = encode_image_payload(image) else {
            warn!(
                collection = self.definition.collection_name(),
                "query image could not be decoded, returning nothing"
            );
            return Ok(SearchOutcome::empty());
        };

        request.q = "*".to_string();
        request.vector_query = Some(format!("{vector_field}:([], image:{payload})"));
        request.exclude_fields.push(vector_field.to_string());
        self.search(&request)
    }

    fn derives_from_image(&self, vector_field: &str) -> bool {
        let fields = self.definition.fields();
        fields
            .get(vector_field)
            .and_then(|descriptor| descriptor.kind().embedding_source())
            .and_then(|source| fields.get(source))
            .map(|source| matches!(source.kind(), FieldKind::Image))
            .unwrap_or(false)
    }
}

/// Flatten the engine envelope into counts plus hit documents, injecting
/// score fields only when requested and actually present in the response.
fn normalize(raw: &Value, include_scores: bool) -> SearchOutcome {
    let count = raw.get("found").and_then(Value::as_u64).unwrap_or(0);
    let num_page = raw.get("page").and_then(Value::as_u64).unwrap_or(1);

    let mut search_results = Vec::new();
    if let Some(hits) = raw.get("hits").and_then(Value::as_array) {
        for hit in hits {
            let Some(document) = hit.get("document") else {
                continue;
            };
            let mut document = document.clone();
            if include_scores {
                if let Some(map) = document.as_object_mut() {
                    if let Some(score) = hit.get("text_match") {
                        map.insert("score".into(), score.clone());
                    }
                    if let Some(distance) = hit.get("vector_distance") {
                        map.insert("vector_distance".into(), distance.clone());
                    }
                }
            }
            search_results.push(document);
        }
    }

    SearchOutcome {
        count,
        num_page,
        search_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_parameters_stay_off_the_wire() {
        let params =
            SearchRequest::new("shoe", vec!["title".to_string(), "brand".to_string()]).to_params();

        assert_eq!(params.get("q"), Some(&json!("shoe")));
        assert_eq!(params.get("query_by"), Some(&json!("title,brand")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn set_parameters_serialize_with_joined_lists() {
        let params = SearchRequest::new("shoe", vec!["title".to_string()])
            .per_page(10)
            .page(3)
            .num_typos(1)
            .drop_tokens_mode("left_to_right")
            .exclude_field("photo")
            .exclude_field("photo_vector")
            .to_params();

        assert_eq!(params.get("per_page"), Some(&json!(10)));
        assert_eq!(params.get("page"), Some(&json!(3)));
        assert_eq!(params.get("num_typos"), Some(&json!(1)));
        assert_eq!(params.get("drop_tokens_mode"), Some(&json!("left_to_right")));
        assert_eq!(
            params.get("exclude_fields"),
            Some(&json!("photo,photo_vector"))
        );
    }

    #[test]
    fn normalize_flattens_hits() {
        let raw = json!({
            "found": 2,
            "page": 1,
            "hits": [
                {"document": {"id": "1", "title": "boot"}, "text_match": 578730},
                {"document": {"id": "2", "title": "sneaker"}},
            ],
        });

        let outcome = normalize(&raw, false);
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.num_page, 1);
        assert_eq!(
            outcome.search_results,
            vec![
                json!({"id": "1", "title": "boot"}),
                json!({"id": "2", "title": "sneaker"}),
            ]
        );
    }

    #[test]
    fn normalize_injects_scores_only_when_present() {
        let raw = json!({
            "found": 2,
            "hits": [
                {"document": {"id": "1"}, "text_match": 42, "vector_distance": 0.12},
                {"document": {"id": "2"}},
            ],
        });

        let outcome = normalize(&raw, true);
        assert_eq!(
            outcome.search_results[0],
            json!({"id": "1", "score": 42, "vector_distance": 0.12})
        );
        assert_eq!(outcome.search_results[1], json!({"id": "2"}));
    }

    #[test]
    fn normalize_handles_empty_envelope() {
        let outcome = normalize(&json!({"found": 0, "hits": []}), false);
        assert_eq!(outcome.count, 0);
        assert!(outcome.search_results.is_empty());
    }
}
