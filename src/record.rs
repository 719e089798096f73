//! Source-record abstractions for the primary store
//!
//! The primary relational store is an external collaborator. This module
//! defines the minimal surface the synchronization layer needs from it:
//! a typed identifier for record types, read access to named attributes,
//! and a lookup used by deferred tasks to re-resolve live records.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type-safe record-type identifier
///
/// Uses &'static str for zero-cost comparisons and storage.
/// The string must be a compile-time constant (record-type key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordType(&'static str);

impl RecordType {
    /// Create a new RecordType from a static string
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    /// Get the string identifier
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RecordType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // Record-type identifiers are created once at startup and live for
        // the entire process, so leaking to get 'static is acceptable here.
        Ok(RecordType(Box::leak(s.into_boxed_str())))
    }
}

/// A raw attribute value read from a source record.
///
/// This is the input side of field preparation: descriptors coerce these
/// into the JSON values that make up a search document.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    FloatArray(Vec<f64>),
    /// Raw binary content, e.g. an image file body.
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Returns the text content if this is a Text variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for the Null variant.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        AttributeValue::FloatArray(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        AttributeValue::Bytes(v)
    }
}

/// A record from the primary store, source of truth for one document.
///
/// Implementations resolve attributes by name. Where the underlying store
/// exposes computed accessors, the implementation invokes them and returns
/// the result; the synchronization layer never reflects over live objects.
pub trait Record: Send + Sync {
    /// The record-type this record belongs to
    fn record_type(&self) -> RecordType;

    /// Resolve a named attribute, or None if the record has no such attribute
    fn attribute(&self, name: &str) -> Option<AttributeValue>;
}

/// Lookup of live records by primary key.
///
/// Deferred tasks carry only `(record type, primary key)` and use this to
/// re-fetch the record at execution time; captured record state is never
/// trusted across the queue boundary.
pub trait RecordStore: Send + Sync {
    /// Find a live record, or None if it no longer exists
    fn find(&self, record_type: &str, primary_key: &str) -> Option<Box<dyn Record>>;
}
