//! Field descriptors and engine-side collection schemas
//!
//! A [`FieldDescriptor`] is the typed schema unit of the system: it declares
//! how one document field appears in the remote engine's collection schema
//! and how raw record attributes are coerced into document values. Ordered
//! sets of named descriptors are collected into a [`FieldSet`], which is the
//! explicit, reflection-free schema declaration a document definition owns.

pub mod field;
mod image;

pub use field::{FieldDescriptor, FieldKind};
pub(crate) use image::encode_image_payload;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Collection schema as accepted by the remote engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSchema {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sorting_fields: Option<Vec<String>>,

    pub fields: Vec<FieldSchema>,
}

/// Declarative metadata for one field in a collection schema.
///
/// All attributes except `name` and `type` are optional so that each field
/// kind emits exactly the attributes the engine expects for it, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_separators: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedSchema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_dims: Option<usize>,
}

/// Instruction for the engine to compute a field's vector from another field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedSchema {
    pub from: Vec<String>,
    pub model_config: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub model_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One named descriptor inside a [`FieldSet`]
#[derive(Debug, Clone)]
pub struct NamedField {
    pub name: String,
    pub descriptor: FieldDescriptor,
}

/// Ordered, name-unique set of field descriptors.
///
/// Names are assigned here, at registration time, not on the descriptors
/// themselves; a descriptor is reusable schema configuration until it joins
/// a set. Iteration preserves declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<NamedField>,
}

impl FieldSet {
    pub fn builder() -> FieldSetBuilder {
        FieldSetBuilder::default()
    }

    /// Look up a descriptor by field name
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.descriptor)
    }

    /// Iterate descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|f| (f.name.as_str(), &f.descriptor))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Engine schemas for every field, in declaration order
    pub fn field_schemas(&self) -> Vec<FieldSchema> {
        self.fields
            .iter()
            .map(|f| f.descriptor.schema(&f.name))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct FieldSetBuilder {
    fields: Vec<NamedField>,
}

impl FieldSetBuilder {
    /// Add a named descriptor. Declaration order is preserved.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push(NamedField {
            name: name.into(),
            descriptor,
        });
        self
    }

    /// Validate and build the set.
    ///
    /// Fails on duplicate field names and on embedding descriptors whose
    /// source field is not declared in the same set.
    pub fn build(self) -> SyncResult<FieldSet> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SyncError::InvalidSchema {
                    reason: format!("duplicate field name '{}'", field.name),
                });
            }

            if let Some(source) = field.descriptor.kind().embedding_source() {
                let resolves = self
                    .fields
                    .iter()
                    .any(|f| f.name == source && f.name != field.name);
                if !resolves {
                    return Err(SyncError::InvalidSchema {
                        reason: format!(
                            "embedding field '{}' references undeclared field '{source}'",
                            field.name
                        ),
                    });
                }
            }
        }

        Ok(FieldSet {
            fields: self.fields,
        })
    }
}
