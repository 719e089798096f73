//! Field descriptor kinds, engine schema emission, and value coercion

use serde_json::Value;
use tracing::debug;

use super::{EmbedSchema, FieldSchema, ModelConfig, encode_image_payload};
use crate::error::{SyncError, SyncResult};
use crate::record::AttributeValue;

/// The declared type of a field.
///
/// Immutable after construction; everything a kind needs (embedding source,
/// model identity, credentials) is captured in the variant itself.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Int32,
    Int64,
    Float,
    Bool,
    String,
    FloatArray,
    /// Binary image source, re-encoded into a transportable payload
    Image,
    /// Vector computed by the remote engine from another field's value
    RemoteEmbedding {
        from: String,
        model: String,
        api_key: Option<String>,
        url: Option<String>,
        num_dims: Option<usize>,
    },
    /// Vector computed locally via an injected encoder
    ModelEmbedding {
        from: String,
        model: String,
        num_dims: Option<usize>,
    },
}

impl FieldKind {
    /// The engine-side type string for this kind
    pub fn engine_type(&self) -> &'static str {
        match self {
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::FloatArray => "float[]",
            FieldKind::Image => "image",
            FieldKind::RemoteEmbedding { .. } | FieldKind::ModelEmbedding { .. } => "float[]",
        }
    }

    /// The field this kind derives its value from, for embedding kinds
    pub fn embedding_source(&self) -> Option<&str> {
        match self {
            FieldKind::RemoteEmbedding { from, .. } | FieldKind::ModelEmbedding { from, .. } => {
                Some(from)
            }
            _ => None,
        }
    }

    /// True for both embedding variants
    pub fn is_embedding(&self) -> bool {
        self.embedding_source().is_some()
    }

    /// True only for the locally computed variant
    pub fn is_model_embedding(&self) -> bool {
        matches!(self, FieldKind::ModelEmbedding { .. })
    }
}

/// Typed schema unit: engine metadata plus value coercion rules for one field.
///
/// Descriptors are configuration: constructed once at startup, named when
/// registered into a [`super::FieldSet`], and immutable afterwards.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    kind: FieldKind,
    /// Attribute to read on the source record; defaults to the field name
    source: Option<String>,
    sort: bool,
    index: bool,
    optional: bool,
    store: bool,
    locale: String,
    stem: bool,
    token_separators: Vec<String>,
}

impl FieldDescriptor {
    fn new(kind: FieldKind) -> Self {
        // Image fields are neither indexed nor stored unless asked for,
        // matching how the engine treats raw image payloads.
        let is_image = matches!(kind, FieldKind::Image);
        Self {
            kind,
            source: None,
            sort: false,
            index: !is_image,
            optional: false,
            store: !is_image,
            locale: "en".to_string(),
            stem: false,
            token_separators: Vec::new(),
        }
    }

    pub fn int32() -> Self {
        Self::new(FieldKind::Int32)
    }

    pub fn int64() -> Self {
        Self::new(FieldKind::Int64)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Bool)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn float_array() -> Self {
        Self::new(FieldKind::FloatArray)
    }

    pub fn image() -> Self {
        Self::new(FieldKind::Image)
    }

    /// Embedding computed remotely by the engine from `from`'s value
    pub fn remote_embedding(from: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(FieldKind::RemoteEmbedding {
            from: from.into(),
            model: model.into(),
            api_key: None,
            url: None,
            num_dims: None,
        })
    }

    /// Embedding computed locally by an injected encoder from `from`'s value
    pub fn model_embedding(from: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(FieldKind::ModelEmbedding {
            from: from.into(),
            model: model.into(),
            num_dims: None,
        })
    }

    /// Read this attribute on the source record instead of the field name
    pub fn source(mut self, attribute: impl Into<String>) -> Self {
        self.source = Some(attribute.into());
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn stem(mut self, stem: bool) -> Self {
        self.stem = stem;
        self
    }

    pub fn token_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Credentials for a remote embedding model served outside the engine.
    ///
    /// Only emitted into the schema when both parts are present.
    pub fn credentials(mut self, api_key: impl Into<String>, url: impl Into<String>) -> Self {
        if let FieldKind::RemoteEmbedding {
            api_key: key_slot,
            url: url_slot,
            ..
        } = &mut self.kind
        {
            *key_slot = Some(api_key.into());
            *url_slot = Some(url.into());
        }
        self
    }

    /// Declared vector dimensionality for embedding kinds
    pub fn num_dims(mut self, dims: usize) -> Self {
        match &mut self.kind {
            FieldKind::RemoteEmbedding { num_dims, .. }
            | FieldKind::ModelEmbedding { num_dims, .. } => *num_dims = Some(dims),
            _ => {}
        }
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The record attribute this field reads, defaulting to the field name
    pub fn source_attribute<'a>(&'a self, name: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(name)
    }

    /// Engine schema for this field under the given name
    pub fn schema(&self, name: &str) -> FieldSchema {
        match &self.kind {
            FieldKind::RemoteEmbedding {
                from,
                model,
                api_key,
                url,
                num_dims,
            } => {
                // Credentials only travel together; a key without a URL
                // (or vice versa) is dropped.
                let (api_key, url) = match (api_key, url) {
                    (Some(key), Some(url)) => (Some(key.clone()), Some(url.clone())),
                    _ => (None, None),
                };
                FieldSchema {
                    name: name.to_string(),
                    field_type: self.kind.engine_type().to_string(),
                    embed: Some(EmbedSchema {
                        from: vec![from.clone()],
                        model_config: ModelConfig {
                            model_name: model.clone(),
                            api_key,
                            url,
                        },
                    }),
                    num_dims: *num_dims,
                    ..FieldSchema::default()
                }
            }
            FieldKind::ModelEmbedding { num_dims, .. } => FieldSchema {
                name: name.to_string(),
                field_type: self.kind.engine_type().to_string(),
                index: Some(self.index),
                optional: Some(self.optional),
                store: Some(self.store),
                num_dims: *num_dims,
                ..FieldSchema::default()
            },
            FieldKind::Image => FieldSchema {
                name: name.to_string(),
                field_type: self.kind.engine_type().to_string(),
                store: Some(self.store),
                index: Some(self.index),
                optional: Some(self.optional),
                ..FieldSchema::default()
            },
            _ => FieldSchema {
                name: name.to_string(),
                field_type: self.kind.engine_type().to_string(),
                locale: Some(self.locale.clone()),
                sort: Some(self.sort),
                stem: Some(self.stem),
                store: Some(self.store),
                index: Some(self.index),
                optional: Some(self.optional),
                token_separators: matches!(self.kind, FieldKind::String)
                    .then(|| self.token_separators.clone()),
                ..FieldSchema::default()
            },
        }
    }

    /// Coerce a raw attribute value into this field's document value.
    ///
    /// Returns `Ok(None)` when the field legitimately has no value (optional
    /// and absent, or an image that failed to decode). Embedding kinds carry
    /// no local coercion and always yield `Ok(None)` here; their values are
    /// produced during document preparation.
    pub fn prepare(&self, name: &str, raw: Option<AttributeValue>) -> SyncResult<Option<Value>> {
        if self.kind.is_embedding() {
            return Ok(None);
        }

        if matches!(self.kind, FieldKind::Image) {
            return Ok(self.prepare_image(name, raw));
        }

        let raw = match raw {
            None | Some(AttributeValue::Null) => {
                if self.optional {
                    return Ok(None);
                }
                return Err(SyncError::MissingValue {
                    field: name.to_string(),
                });
            }
            Some(value) => value,
        };

        let invalid = |expected: &'static str, got: &AttributeValue| SyncError::InvalidValue {
            field: name.to_string(),
            expected,
            got: format!("{got:?}"),
        };

        let value = match (&self.kind, &raw) {
            (FieldKind::Int32 | FieldKind::Int64, AttributeValue::Int(i)) => Value::from(*i),
            (FieldKind::Int32 | FieldKind::Int64, AttributeValue::Float(f)) => {
                Value::from(*f as i64)
            }
            (FieldKind::Int32 | FieldKind::Int64, AttributeValue::Bool(b)) => {
                Value::from(*b as i64)
            }
            (FieldKind::Int32 | FieldKind::Int64, AttributeValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid("integer", &raw))?,

            (FieldKind::Float, AttributeValue::Float(f)) => {
                finite(*f).ok_or_else(|| invalid("float", &raw))?
            }
            (FieldKind::Float, AttributeValue::Int(i)) => Value::from(*i as f64),
            (FieldKind::Float, AttributeValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(finite)
                .ok_or_else(|| invalid("float", &raw))?,

            (FieldKind::Bool, AttributeValue::Bool(b)) => Value::from(*b),
            (FieldKind::Bool, AttributeValue::Int(i)) => Value::from(*i != 0),
            (FieldKind::Bool, AttributeValue::Text(s)) if s.eq_ignore_ascii_case("true") => {
                Value::from(true)
            }
            (FieldKind::Bool, AttributeValue::Text(s)) if s.eq_ignore_ascii_case("false") => {
                Value::from(false)
            }

            (FieldKind::String, AttributeValue::Text(s)) => Value::from(s.clone()),
            (FieldKind::String, AttributeValue::Int(i)) => Value::from(i.to_string()),
            (FieldKind::String, AttributeValue::Float(f)) => Value::from(f.to_string()),
            (FieldKind::String, AttributeValue::Bool(b)) => Value::from(b.to_string()),

            (FieldKind::FloatArray, AttributeValue::FloatArray(values)) => {
                let mut out = Vec::with_capacity(values.len());
                for v in values {
                    out.push(finite(*v).ok_or_else(|| invalid("float array", &raw))?);
                }
                Value::Array(out)
            }

            _ => return Err(invalid(self.kind.engine_type(), &raw)),
        };

        Ok(Some(value))
    }

    /// Image preparation never fails the document: decode or re-encode
    /// problems degrade to an absent value.
    fn prepare_image(&self, name: &str, raw: Option<AttributeValue>) -> Option<Value> {
        match raw {
            Some(AttributeValue::Bytes(bytes)) => {
                encode_image_payload(&bytes).map(Value::String)
            }
            Some(AttributeValue::Null) | None => None,
            Some(other) => {
                debug!("field '{name}': discarding non-binary image value {other:?}");
                None
            }
        }
    }
}

fn finite(f: f64) -> Option<Value> {
    serde_json::Number::from_f64(f).map(Value::Number)
}
