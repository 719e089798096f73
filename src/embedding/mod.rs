//! Locally computed embedding vectors
//!
//! Embedding-by-local-model fields need an injected encoder to turn a
//! prepared dependency value into a vector. The trait has a single-record
//! path and a batched path; document preparation uses the batched path to
//! amortize encoder invocation cost from one call per record down to one
//! call per embedding field per batch.

pub mod model;

pub use model::FastEmbedEncoder;

use crate::error::SyncResult;

/// A prepared dependency value handed to an encoder
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeInput {
    /// Prepared text value
    Text(String),
    /// Prepared image payload (base64 JPEG)
    Image(String),
}

impl EncodeInput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EncodeInput::Text(s) => Some(s),
            EncodeInput::Image(_) => None,
        }
    }
}

/// Turns prepared field values into embedding vectors.
///
/// Implementations must be thread-safe; the fastembed-backed encoder wraps
/// its model in a mutex for interior mutability.
pub trait VectorEncoder: Send + Sync {
    /// Encode one value into one vector
    fn encode(&self, input: &EncodeInput) -> SyncResult<Vec<f32>>;

    /// Encode a whole group of values in one model invocation.
    ///
    /// The returned vectors are parallel to `inputs`: position i encodes
    /// inputs[i]. The default implementation falls back to per-value
    /// encoding; real encoders should override it with a true batch call.
    fn encode_batch(&self, inputs: &[EncodeInput]) -> SyncResult<Vec<Vec<f32>>> {
        inputs.iter().map(|input| self.encode(input)).collect()
    }

    /// Vector dimensionality this encoder produces
    fn dimensions(&self) -> usize;
}
