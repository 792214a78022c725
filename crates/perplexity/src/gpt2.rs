//! GPT-2 causal transformer on candle.
//!
//! Weights follow the Hugging Face `gpt2` checkpoint layout (`wte`, `wpe`,
//! `h.{i}.attn.c_attn`, ..., `ln_f`), with or without a `transformer.` prefix.
//! The original checkpoint stores projections as `Conv1D` (in x out); they are
//! transposed once at load time into regular linear layers.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{embedding, layer_norm, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::error::ModelError;
use crate::loader;
use crate::model::LanguageModel;

/// Hyper-parameters read from `config.json`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Gpt2Config {
    /// vocabulary size
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    /// maximum context length
    #[serde(default = "default_n_positions")]
    pub n_positions: usize,
    /// hidden size
    #[serde(default = "default_n_embd")]
    pub n_embd: usize,
    /// number of transformer blocks
    #[serde(default = "default_n_layer")]
    pub n_layer: usize,
    /// attention heads per block
    #[serde(default = "default_n_head")]
    pub n_head: usize,
    /// layer norm epsilon
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
}

fn default_vocab_size() -> usize {
    50257
}
fn default_n_positions() -> usize {
    1024
}
fn default_n_embd() -> usize {
    768
}
fn default_n_layer() -> usize {
    12
}
fn default_n_head() -> usize {
    12
}
fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

impl Default for Gpt2Config {
    /// The 124M-parameter `gpt2` checkpoint.
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            n_positions: default_n_positions(),
            n_embd: default_n_embd(),
            n_layer: default_n_layer(),
            n_head: default_n_head(),
            layer_norm_epsilon: default_layer_norm_epsilon(),
        }
    }
}

impl Gpt2Config {
    /// Parse `config.json`.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let bytes = loader::load_bytes(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Conv1D checkpoint tensor (in x out) loaded as a linear layer (out x in).
fn conv1d(n_in: usize, n_out: usize, vb: VarBuilder) -> candle_core::Result<Linear> {
    let weight = vb.get((n_in, n_out), "weight")?.t()?.contiguous()?;
    let bias = vb.get(n_out, "bias")?;
    Ok(Linear::new(weight, Some(bias)))
}

fn causal_mask(t: usize, device: &Device) -> candle_core::Result<Tensor> {
    let mask: Vec<u8> = (0..t).flat_map(|i| (0..t).map(move |j| u8::from(j > i))).collect();
    Tensor::from_slice(&mask, (t, t), device)
}

fn masked_fill(on_false: &Tensor, mask: &Tensor, on_true: f32) -> candle_core::Result<Tensor> {
    let shape = mask.shape();
    let on_true = Tensor::new(on_true, on_false.device())?.broadcast_as(shape.dims())?;
    mask.where_cond(&on_true, on_false)
}

struct Attention {
    c_attn: Linear,
    c_proj: Linear,
    n_head: usize,
    head_dim: usize,
}

impl Attention {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            c_attn: conv1d(cfg.n_embd, 3 * cfg.n_embd, vb.pp("c_attn"))?,
            c_proj: conv1d(cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
            n_head: cfg.n_head,
            head_dim: cfg.n_embd / cfg.n_head,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let (b, t, c) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;
        let heads = |x: Tensor| -> candle_core::Result<Tensor> {
            x.reshape((b, t, self.n_head, self.head_dim))?.transpose(1, 2)?.contiguous()
        };
        let q = heads(qkv.narrow(D::Minus1, 0, c)?)?;
        let k = heads(qkv.narrow(D::Minus1, c, c)?)?;
        let v = heads(qkv.narrow(D::Minus1, 2 * c, c)?)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let att = (q.matmul(&k.t()?.contiguous()?)? * scale)?;
        let mask = mask.broadcast_as(att.shape())?;
        let att = masked_fill(&att, &mask, f32::NEG_INFINITY)?;
        let att = candle_nn::ops::softmax_last_dim(&att)?;
        let ys = att.matmul(&v)?.transpose(1, 2)?.contiguous()?.reshape((b, t, c))?;
        self.c_proj.forward(&ys)
    }
}

struct Mlp {
    c_fc: Linear,
    c_proj: Linear,
}

impl Mlp {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            c_fc: conv1d(cfg.n_embd, 4 * cfg.n_embd, vb.pp("c_fc"))?,
            c_proj: conv1d(4 * cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(cfg: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            ln_1: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_1"))?,
            attn: Attention::load(cfg, vb.pp("attn"))?,
            ln_2: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_2"))?,
            mlp: Mlp::load(cfg, vb.pp("mlp"))?,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

/// GPT-2 language model with the LM head tied to the token embedding.
pub struct Gpt2 {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    lm_head: Linear,
    config: Gpt2Config,
    device: Device,
}

impl Gpt2 {
    /// Build the model from a variable store.
    pub fn load(vb: VarBuilder, config: Gpt2Config) -> Result<Self, ModelError> {
        let vb = if vb.contains_tensor("transformer.wte.weight") { vb.pp("transformer") } else { vb };
        let device = vb.device().clone();
        let wte = embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?;
        let wpe = embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?;
        let blocks = (0..config.n_layer)
            .map(|i| Block::load(&config, vb.pp(format!("h.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let ln_f = layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?;
        let lm_head = Linear::new(wte.embeddings().clone(), None);
        Ok(Self { wte, wpe, blocks, ln_f, lm_head, config, device })
    }

    /// Load `config.json` and `model.safetensors` into CPU memory.
    pub fn from_files(config: &Path, weights: &Path) -> Result<Self, ModelError> {
        let config = Gpt2Config::from_file(config)?;
        let device = Device::Cpu;
        let data = loader::load_bytes(weights)?;
        let vb = VarBuilder::from_buffered_safetensors(data, DType::F32, &device)?;
        Self::load(vb, config)
    }

    /// Hyper-parameters of the loaded model.
    pub fn config(&self) -> &Gpt2Config {
        &self.config
    }

    /// Logits tensor of shape (batch, seq, vocab) for `input_ids` (batch, seq).
    pub fn forward(&self, input_ids: &Tensor) -> Result<Tensor, ModelError> {
        let (_b, t) = input_ids.dims2()?;
        if t > self.config.n_positions {
            return Err(ModelError::Inference(format!(
                "{t} tokens exceed the context of {}",
                self.config.n_positions
            )));
        }
        let positions = Tensor::arange(0u32, t as u32, &self.device)?;
        let mut xs = self.wte.forward(input_ids)?.broadcast_add(&self.wpe.forward(&positions)?)?;
        let mask = causal_mask(t, &self.device)?;
        for block in &self.blocks {
            xs = block.forward(&xs, &mask)?;
        }
        let xs = self.ln_f.forward(&xs)?;
        Ok(self.lm_head.forward(&xs)?)
    }
}

impl LanguageModel for Gpt2 {
    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn max_context(&self) -> usize {
        self.config.n_positions
    }

    fn logits(&self, tokens: &[u32]) -> Result<Vec<Vec<f32>>, ModelError> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let logits = self.forward(&input)?.squeeze(0)?.to_dtype(DType::F32)?;
        debug!(tokens = tokens.len(), dims = ?logits.dims(), "gpt2 forward pass");
        Ok(logits.to_vec2::<f32>()?)
    }
}
