//! Llama-family checkpoints (SQLCoder, CodeLlama) run with candle.
//!
//! The model directory must contain `config.json`, `tokenizer.json` and either
//! `model.safetensors` or a sharded `model.safetensors.index.json`.

use super::{BeamSearch, Decoder, TextGenerator};
use crate::errors::GatewayError;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig, LlamaEosToks};
use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub struct CandleGenerator {
    model: Llama,
    config: Config,
    tokenizer: Tokenizer,
    device: Device,
    dtype: DType,
    num_beams: usize,
    eos_token_ids: Vec<u32>,
}

impl fmt::Debug for CandleGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandleGenerator")
            .field("device", &self.device)
            .field("dtype", &self.dtype)
            .field("num_beams", &self.num_beams)
            .field("eos_token_ids", &self.eos_token_ids)
            .finish_non_exhaustive()
    }
}

fn load_err(e: impl fmt::Display) -> GatewayError {
    GatewayError::ModelLoad(e.to_string())
}

fn inference_err(e: impl fmt::Display) -> GatewayError {
    GatewayError::Inference(e.to_string())
}

impl CandleGenerator {
    /// Loads the checkpoint at `model_dir`, on the first CUDA device when one is available.
    pub fn load(model_dir: &str, num_beams: usize) -> Result<Self, GatewayError> {
        let start = Instant::now();
        let model_dir = Path::new(model_dir);

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(load_err)?;
        let llama_config: LlamaConfig = {
            let bytes = std::fs::read(model_dir.join("config.json")).map_err(load_err)?;
            serde_json::from_slice(&bytes).map_err(load_err)?
        };
        let config = llama_config.into_config(false);

        let device = Device::cuda_if_available(0).map_err(load_err)?;
        let dtype = if device.is_cuda() {
            DType::F16
        } else {
            DType::F32
        };

        let filenames = safetensors_files(model_dir)?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&filenames, dtype, &device).map_err(load_err)?
        };
        let model = Llama::load(vb, &config).map_err(load_err)?;

        let eos_token_ids = match &config.eos_token_id {
            Some(LlamaEosToks::Single(id)) => vec![*id],
            Some(LlamaEosToks::Multiple(ids)) => ids.clone(),
            None => tokenizer.token_to_id("</s>").into_iter().collect(),
        };

        info!(
            "Loaded model from '{}' on {:?} in {:?}.",
            model_dir.display(),
            device,
            start.elapsed()
        );

        Ok(Self {
            model,
            config,
            tokenizer,
            device,
            dtype,
            num_beams,
            eos_token_ids,
        })
    }
}

fn safetensors_files(model_dir: &Path) -> Result<Vec<PathBuf>, GatewayError> {
    let index = model_dir.join("model.safetensors.index.json");
    if !index.exists() {
        return Ok(vec![model_dir.join("model.safetensors")]);
    }

    let bytes = std::fs::read(&index).map_err(load_err)?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).map_err(load_err)?;
    let weight_map = json
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| load_err(format!("no weight map in {}", index.display())))?;

    let files: BTreeSet<&str> = weight_map.values().filter_map(|v| v.as_str()).collect();
    Ok(files.into_iter().map(|f| model_dir.join(f)).collect())
}

/// Decoding position plus the KV cache of one sequence.
#[derive(Clone)]
pub struct LlamaState {
    cache: Cache,
    position: usize,
}

struct LlamaDecoder<'a> {
    generator: &'a CandleGenerator,
}

impl LlamaDecoder<'_> {
    fn forward(&self, tokens: &[u32], state: &mut LlamaState) -> Result<Vec<f32>, GatewayError> {
        let input = Tensor::new(tokens, &self.generator.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_err)?;
        let logits = self
            .generator
            .model
            .forward(&input, state.position, &mut state.cache)
            .and_then(|l| l.squeeze(0))
            .and_then(|l| l.to_dtype(DType::F32))
            .and_then(|l| l.to_vec1::<f32>())
            .map_err(inference_err)?;
        state.position += tokens.len();
        Ok(logits)
    }
}

impl Decoder for LlamaDecoder<'_> {
    type State = LlamaState;

    fn prefill(&self, prompt: &[u32]) -> Result<(Self::State, Vec<f32>), GatewayError> {
        let cache = Cache::new(
            true,
            self.generator.dtype,
            &self.generator.config,
            &self.generator.device,
        )
        .map_err(inference_err)?;
        let mut state = LlamaState { cache, position: 0 };
        let logits = self.forward(prompt, &mut state)?;
        Ok((state, logits))
    }

    fn decode(&self, state: &mut Self::State, token: u32) -> Result<Vec<f32>, GatewayError> {
        self.forward(&[token], state)
    }
}

impl TextGenerator for CandleGenerator {
    fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String, GatewayError> {
        let start = Instant::now();
        let encoding = self.tokenizer.encode(prompt, true).map_err(inference_err)?;
        let prompt_tokens = encoding.get_ids();
        if prompt_tokens.is_empty() {
            return Err(GatewayError::Inference("prompt encoded to no tokens".into()));
        }

        let search = BeamSearch::new(self.num_beams, max_new_tokens, self.eos_token_ids.clone());
        let generated = search.run(&LlamaDecoder { generator: self }, prompt_tokens)?;
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(inference_err)?;

        debug!(
            prompt_tokens = prompt_tokens.len(),
            generated_tokens = generated.len(),
            elapsed = ?start.elapsed(),
            "Generation finished"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_from_empty_dir_is_a_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CandleGenerator::load(dir.path().to_str().unwrap(), 5);
        assert!(matches!(result, Err(GatewayError::ModelLoad(_))));
    }

    #[test]
    fn test_single_file_checkpoint_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let files = safetensors_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("model.safetensors")]);
    }

    #[test]
    fn test_sharded_index_resolves_each_shard_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = json!({
            "metadata": {"total_size": 1024},
            "weight_map": {
                "lm_head.weight": "model-00002-of-00002.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00002.safetensors",
                "model.layers.0.mlp.up_proj.weight": "model-00001-of-00002.safetensors",
                "model.norm.weight": "model-00002-of-00002.safetensors",
            }
        });
        std::fs::write(
            dir.path().join("model.safetensors.index.json"),
            index.to_string(),
        )
        .unwrap();

        let files = safetensors_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("model-00001-of-00002.safetensors"),
                dir.path().join("model-00002-of-00002.safetensors"),
            ]
        );
    }

    #[test]
    fn test_index_without_weight_map_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("model.safetensors.index.json"),
            r#"{"metadata": {}}"#,
        )
        .unwrap();

        let err = safetensors_files(dir.path()).unwrap_err();
        assert!(matches!(err, GatewayError::ModelLoad(_)));
        assert!(err.to_string().contains("no weight map"));
    }
}
