//! fastembed-backed text encoder

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::path::Path;
use tracing::info;

use super::{EncodeInput, VectorEncoder};
use crate::error::{SyncError, SyncResult};

/// Local text-embedding encoder built on fastembed.
///
/// The model is wrapped in a Mutex for interior mutability; encoding takes
/// `&mut` on the underlying model.
pub struct FastEmbedEncoder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for FastEmbedEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedEncoder")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .field("model", &"<TextEmbedding>")
            .finish()
    }
}

impl FastEmbedEncoder {
    /// Load (or download on first use) the named model.
    ///
    /// Model names follow fastembed's identifiers, e.g. "AllMiniLML6V2".
    pub fn new(model_name: &str, cache_dir: &Path) -> SyncResult<Self> {
        let model_id = parse_model(model_name)?;

        let has_cached_model = cache_dir.exists()
            && cache_dir
                .read_dir()
                .is_ok_and(|mut entries| entries.any(|_| true));
        if !has_cached_model {
            info!("downloading embedding model '{model_name}' (first time only)");
        }

        let mut model = TextEmbedding::try_new(
            InitOptions::new(model_id)
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(!has_cached_model),
        )
        .map_err(|e| SyncError::ConfigError {
            reason: format!("failed to initialize embedding model '{model_name}': {e}"),
        })?;

        // Probe dimensionality with a throwaway embedding
        let probe = model
            .embed(vec!["probe"], None)
            .map_err(|e| SyncError::ConfigError {
                reason: format!("embedding model '{model_name}' failed its probe: {e}"),
            })?;
        let dimensions = probe.into_iter().next().map(|v| v.len()).unwrap_or(0);

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn texts<'a>(&self, inputs: &'a [EncodeInput]) -> SyncResult<Vec<&'a str>> {
        inputs
            .iter()
            .map(|input| {
                input.as_text().ok_or_else(|| SyncError::EncodeFailed {
                    context: self.model_name.clone(),
                    reason: "text encoder received an image payload; image embeddings need a multimodal encoder".to_string(),
                })
            })
            .collect()
    }
}

impl VectorEncoder for FastEmbedEncoder {
    fn encode(&self, input: &EncodeInput) -> SyncResult<Vec<f32>> {
        let mut vectors = self.encode_batch(std::slice::from_ref(input))?;
        vectors.pop().ok_or_else(|| SyncError::EncodeFailed {
            context: self.model_name.clone(),
            reason: "model returned no vector".to_string(),
        })
    }

    fn encode_batch(&self, inputs: &[EncodeInput]) -> SyncResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let texts = self.texts(inputs)?;

        let vectors = self
            .model
            .lock()
            .embed(texts, None)
            .map_err(|e| SyncError::EncodeFailed {
                context: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        if vectors.len() != inputs.len() {
            return Err(SyncError::EncodeFailed {
                context: self.model_name.clone(),
                reason: format!(
                    "model returned {} vectors for {} inputs",
                    vectors.len(),
                    inputs.len()
                ),
            });
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn parse_model(name: &str) -> SyncResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML6V2Q" => Ok(EmbeddingModel::AllMiniLML6V2Q),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(SyncError::ConfigError {
            reason: format!(
                "unknown embedding model '{other}'. Supported: AllMiniLML6V2, AllMiniLML6V2Q, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15"
            ),
        }),
    }
}
