use super::{normalize, Embedder};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use ndarray::{Array, Axis, Ix2, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

const DEFAULT_DIMENSION: usize = 384;
const MAX_LENGTH: usize = 512;
const MAX_BATCH: usize = 32;

/// Sentence embedder backed by an ONNX model and a HuggingFace tokenizer.
///
/// The taxonomy tables are 79 short names embedded once per process, so this
/// runs CPU-only with conservative thread settings. The session lives behind
/// a `Mutex` and inference is dispatched through `spawn_blocking`.
pub struct OrtEmbedder {
    inner: Arc<OrtInner>,
    dimension: usize,
}

struct OrtInner {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

impl OrtEmbedder {
    /// Load model assets from `TRIZ_MODEL_DIR` (default `./models`):
    /// `model.onnx` plus `tokenizer.json`.
    pub fn from_env() -> Result<Self> {
        let dimension = env::var("TRIZ_EMBEDDING_DIMENSION")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_DIMENSION);
        Self::load(&model_dir(), dimension)
    }

    pub fn load(model_dir: &Path, dimension: usize) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(EngineError::EmbeddingUnavailable(format!(
                "Model files are missing. Expected ONNX at {} and tokenizer at {}. Set TRIZ_MODEL_DIR, or run with TRIZ_EMBEDDING_MODE=stub.",
                model_path.display(),
                tokenizer_path.display(),
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EngineError::EmbeddingUnavailable(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_LENGTH,
                ..TruncationParams::default()
            }))
            .map_err(|e| {
                EngineError::EmbeddingUnavailable(format!("Tokenizer truncation failed: {e}"))
            })?;

        let session = Session::builder()
            .map_err(|e| EngineError::EmbeddingUnavailable(format!("{e}")))?
            .with_intra_threads(default_intra_threads())
            .map_err(|e| {
                EngineError::EmbeddingUnavailable(format!("Failed to set ORT intra threads: {e}"))
            })?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| {
                EngineError::EmbeddingUnavailable(format!(
                    "Failed to register CPU execution provider: {e}"
                ))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                EngineError::EmbeddingUnavailable(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(&model_path)
            .map_err(|e| {
                EngineError::EmbeddingUnavailable(format!("Failed to load ONNX model: {e}"))
            })?;

        log::info!(
            "Loaded ONNX embedding model from {} (dim {dimension}, max_length {MAX_LENGTH})",
            model_dir.display()
        );

        Ok(Self {
            inner: Arc::new(OrtInner {
                session: Mutex::new(session),
                tokenizer,
                max_length: MAX_LENGTH,
                max_batch: MAX_BATCH,
                dimension,
            }),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OrtEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let inner = self.inner.clone();
        let owned = texts.to_vec();
        spawn_blocking(move || inner.embed_batch_blocking(&owned))
            .await
            .map_err(|e| EngineError::Embedding(format!("Join error: {e}")))?
    }
}

impl OrtInner {
    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| EngineError::Embedding(format!("Tokenization failed: {e}")))?;

            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len();
            if seq_len > self.max_length {
                return Err(EngineError::Embedding(format!(
                    "Tokenized length {} exceeds max_length {}",
                    seq_len, self.max_length
                )));
            }
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(EngineError::Embedding(
                    "Inconsistent sequence lengths after padding".to_string(),
                ));
            }

            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let ids_array = Array::from_shape_vec((batch.len(), seq_len), ids)
                .map_err(|e| EngineError::Embedding(format!("IDs shape error: {e}")))?;
            let mask_array = Array::from_shape_vec((batch.len(), seq_len), masks)
                .map_err(|e| EngineError::Embedding(format!("Mask shape error: {e}")))?;
            let type_array = Array::from_shape_vec((batch.len(), seq_len), type_ids)
                .map_err(|e| EngineError::Embedding(format!("Types shape error: {e}")))?;

            let mut available: HashMap<String, DynTensor> = HashMap::new();
            available.insert(
                "input_ids".to_string(),
                Tensor::from_array(ids_array.into_dyn())
                    .map_err(|e| EngineError::Embedding(format!("{e}")))?
                    .upcast(),
            );
            available.insert(
                "attention_mask".to_string(),
                Tensor::from_array(mask_array.into_dyn())
                    .map_err(|e| EngineError::Embedding(format!("{e}")))?
                    .upcast(),
            );
            available.insert(
                "token_type_ids".to_string(),
                Tensor::from_array(type_array.into_dyn())
                    .map_err(|e| EngineError::Embedding(format!("{e}")))?
                    .upcast(),
            );

            let array = {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| EngineError::Embedding("Failed to lock ONNX session".into()))?;

                // Feed only the inputs this model declares; BERT-family models
                // differ on whether token_type_ids exists.
                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    if let Some(value) = available.get(&input.name) {
                        feed.insert(input.name.clone(), value.clone());
                    }
                }

                let outputs = session
                    .run(SessionInputs::from(feed))
                    .map_err(|e| EngineError::Embedding(format!("ONNX forward failed: {e}")))?;

                if outputs.len() == 0 {
                    return Err(EngineError::Embedding(
                        "ONNX returned no outputs".to_string(),
                    ));
                }

                outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        EngineError::Embedding(format!("Failed to decode ONNX output: {e}"))
                    })?
                    .to_owned()
            };

            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }

        Ok(results)
    }
}

fn model_dir() -> PathBuf {
    env::var("TRIZ_MODEL_DIR").map_or_else(|_| PathBuf::from("models"), PathBuf::from)
}

fn default_intra_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    // The whole workload is a handful of short strings; stay polite.
    if cpus <= 4 {
        1
    } else {
        2
    }
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        2 => {
            let embeddings = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| EngineError::Embedding(format!("Bad output shape: {e}")))?;
            out.reserve(embeddings.len_of(Axis(0)));
            for row in embeddings.outer_iter() {
                let mut emb = row.to_owned().to_vec();
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| EngineError::Embedding(format!("Bad output shape: {e}")))?;
            out.reserve(hidden.len_of(Axis(0)));
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let attn = mask_rows
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| vec![1; sample.len_of(Axis(0))]);
                let mut emb = mean_pool(sample.view(), &attn);
                ensure_dimension(&emb, expected_dimension)?;
                normalize(&mut emb);
                out.push(emb);
            }
        }
        _ => {
            return Err(EngineError::Embedding(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(EngineError::Embedding(format!(
            "Invalid embedding dimension: expected {expected}, got {}",
            vec.len()
        )));
    }
    Ok(())
}

fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    if sample.is_empty() {
        return vec![];
    }

    let hidden = sample.len_of(Axis(1));
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token_idx, token) in sample.outer_iter().enumerate() {
        if *mask.get(token_idx).unwrap_or(&0) == 0 {
            continue;
        }
        count += 1.0;
        for (dim, value) in token.iter().enumerate() {
            sum[dim] += value;
        }
    }

    if count == 0.0 {
        return sum;
    }

    for value in &mut sum {
        *value /= count;
    }

    sum
}

fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut masks = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let encoding_ids = encoding.get_ids();
        let encoding_masks = encoding.get_attention_mask();
        let encoding_types = encoding.get_type_ids();

        for idx in 0..seq_len {
            ids.push(i64::from(*encoding_ids.get(idx).unwrap_or(&0)));
            masks.push(i64::from(*encoding_masks.get(idx).unwrap_or(&0)));
            type_ids.push(i64::from(*encoding_types.get(idx).unwrap_or(&0)));
        }

        mask_rows.push(
            encoding_masks
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v))
                .collect(),
        );
    }

    (ids, masks, type_ids, mask_rows)
}
