// Transformer — Blocks, the encoder stack, and the token-level model
//
// TransformerBlock (post-norm, as in the original Transformer):
//
//   ┌────────────────────────────┐
//   │ Input: x [seq, d_model]    │
//   └─────────────┬──────────────┘
//                 │
//        ┌────────┴────────┐
//        │ MHA(x, x, x, m) │  ← Multi-Head Self-Attention
//        └────────┬────────┘
//                 │ + x       ← Residual connection
//          LayerNorm 1
//                 │
//        ┌────────┴────────┐
//        │      FFN        │  ← Position-wise feed-forward
//        └────────┬────────┘
//                 │ + n1      ← Residual connection
//          LayerNorm 2
//                 │
//   ┌─────────────┴──────────────┐
//   │ Output [seq, d_model]      │
//   └────────────────────────────┘
//
// TransformerEncoder adds the positional encoding once and then runs
// num_layers blocks, passing the same mask to each.
//
// Transformer wraps the encoder with an optional token embedding in front and
// an optional projection to vocabulary logits behind. Both exist exactly when
// vocab_size is configured.
//
// GENERATION:
//
// generate() decodes autoregressively: run the full model over the current
// sequence with a causal mask, softmax the last position's logits, sample the
// next token by cumulative-probability inversion, append, repeat until the
// sequence holds max_length tokens. Every step re-runs the whole sequence;
// there is no key/value cache. generate_greedy() takes the argmax instead of
// sampling.

use rand::Rng;
use synapse_core::{Error, Matrix, Result};

use crate::activation::softmax;
use crate::attention::{create_causal_mask, MultiHeadAttention};
use crate::config::TransformerConfig;
use crate::embedding::{token_ids, Embedding};
use crate::feedforward::FeedForward;
use crate::init;
use crate::layernorm::LayerNorm;
use crate::linear::Linear;
use crate::metrics::argmax;
use crate::module::{prefixed, Module};
use crate::positional::PositionalEncoding;

// TransformerBlock

/// One post-norm encoder layer: attention and feed-forward sublayers, each
/// wrapped in a residual connection followed by layer normalization.
#[derive(Debug, Clone)]
pub struct TransformerBlock {
    attention: MultiHeadAttention,
    feed_forward: FeedForward,
    norm1: LayerNorm,
    norm2: LayerNorm,
}

impl TransformerBlock {
    pub fn new<R: Rng + ?Sized>(
        d_model: usize,
        num_heads: usize,
        d_ff: usize,
        eps: f64,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(TransformerBlock {
            attention: MultiHeadAttention::new(d_model, num_heads, rng)?,
            feed_forward: FeedForward::new(d_model, d_ff, rng),
            norm1: LayerNorm::new(d_model, eps),
            norm2: LayerNorm::new(d_model, eps),
        })
    }

    /// Assemble a block from existing sublayers.
    pub fn from_parts(
        attention: MultiHeadAttention,
        feed_forward: FeedForward,
        norm1: LayerNorm,
        norm2: LayerNorm,
    ) -> Self {
        TransformerBlock {
            attention,
            feed_forward,
            norm1,
            norm2,
        }
    }

    pub fn attention(&self) -> &MultiHeadAttention {
        &self.attention
    }

    pub fn feed_forward(&self) -> &FeedForward {
        &self.feed_forward
    }

    /// Self-attention with an optional [seq x seq] mask.
    pub fn forward_masked(&self, x: &Matrix, mask: Option<&Matrix>) -> Result<Matrix> {
        let attended = self.attention.attend(x, x, x, mask)?;
        let n1 = self.norm1.forward(&x.add(&attended)?)?;
        let ff = self.feed_forward.forward(&n1)?;
        self.norm2.forward(&n1.add(&ff)?)
    }
}

impl Module for TransformerBlock {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        self.forward_masked(x, None)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        let mut p = self.attention.parameters();
        p.extend(self.feed_forward.parameters());
        p.extend(self.norm1.parameters());
        p.extend(self.norm2.parameters());
        p
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        let mut p = prefixed("attention", self.attention.named_parameters());
        p.extend(prefixed("feed_forward", self.feed_forward.named_parameters()));
        p.extend(prefixed("norm1", self.norm1.named_parameters()));
        p.extend(prefixed("norm2", self.norm2.named_parameters()));
        p
    }
}

// TransformerEncoder

/// Positional encoding followed by a stack of [`TransformerBlock`]s.
#[derive(Debug, Clone)]
pub struct TransformerEncoder {
    positional: PositionalEncoding,
    blocks: Vec<TransformerBlock>,
}

impl TransformerEncoder {
    pub fn new<R: Rng + ?Sized>(config: &TransformerConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let blocks = (0..config.num_layers)
            .map(|_| {
                TransformerBlock::new(
                    config.d_model,
                    config.num_heads,
                    config.d_ff(),
                    config.eps,
                    &mut *rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TransformerEncoder {
            positional: PositionalEncoding::new(config.max_len, config.d_model),
            blocks,
        })
    }

    /// Assemble an encoder from existing blocks.
    pub fn from_blocks(positional: PositionalEncoding, blocks: Vec<TransformerBlock>) -> Self {
        TransformerEncoder { positional, blocks }
    }

    pub fn blocks(&self) -> &[TransformerBlock] {
        &self.blocks
    }

    pub fn max_len(&self) -> usize {
        self.positional.max_len()
    }

    /// Encode a [seq x d_model] input, applying `mask` at every layer.
    pub fn forward_masked(&self, x: &Matrix, mask: Option<&Matrix>) -> Result<Matrix> {
        let mut h = self.positional.forward(x)?;
        for block in &self.blocks {
            h = block.forward_masked(&h, mask)?;
        }
        Ok(h)
    }
}

impl Module for TransformerEncoder {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        self.forward_masked(x, None)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        self.blocks.iter().flat_map(|b| b.parameters()).collect()
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(i, b)| prefixed(&format!("blocks.{i}"), b.named_parameters()))
            .collect()
    }
}

// Transformer

/// Token embedding → encoder → vocabulary projection.
///
/// # Example
/// ```
/// use synapse_nn::{Transformer, TransformerConfig};
///
/// let config = TransformerConfig::new(8, 2, 1).with_vocab_size(12).with_seed(3);
/// let model = Transformer::new(config)?;
/// let tokens = model.generate_greedy(&[1, 2], 5)?;
/// assert_eq!(tokens.len(), 5);
/// # Ok::<(), synapse_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Transformer {
    config: TransformerConfig,
    embedding: Option<Embedding>,
    encoder: TransformerEncoder,
    output: Option<Linear>,
}

impl Transformer {
    pub fn new(config: TransformerConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = init::rng_from_seed(config.seed);
        let embedding = config
            .vocab_size
            .map(|v| Embedding::new(v, config.d_model, &mut rng));
        let encoder = TransformerEncoder::new(&config, &mut rng)?;
        let output = config
            .vocab_size
            .map(|v| Linear::new(config.d_model, v, &mut rng));

        let model = Transformer {
            config,
            embedding,
            encoder,
            output,
        };
        tracing::debug!(
            d_model = model.config.d_model,
            num_heads = model.config.num_heads,
            num_layers = model.config.num_layers,
            vocab_size = ?model.config.vocab_size,
            parameters = model.num_parameters(),
            "created transformer"
        );
        Ok(model)
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    pub fn encoder(&self) -> &TransformerEncoder {
        &self.encoder
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    /// Run the model.
    ///
    /// With a vocabulary configured, a single-column input is read as token
    /// ids and embedded first, and the result is projected to [seq x vocab]
    /// logits. Otherwise `x` must be [seq x d_model] and the encoder output is
    /// returned as is.
    pub fn forward(&self, x: &Matrix, mask: Option<&Matrix>) -> Result<Matrix> {
        match &self.embedding {
            Some(embedding) if x.cols() == 1 => {
                let embedded = embedding.lookup(&token_ids(x)?)?;
                self.encode_and_project(&embedded, mask)
            }
            _ => self.encode_and_project(x, mask),
        }
    }

    /// Embed `tokens`, encode, and project to logits.
    pub fn forward_tokens(&self, tokens: &[usize], mask: Option<&Matrix>) -> Result<Matrix> {
        let embedding = self.require_vocab()?;
        let x = embedding.lookup(tokens)?;
        self.encode_and_project(&x, mask)
    }

    /// Encoder, then the vocabulary projection when one is configured.
    /// `x` is already [seq x d_model].
    fn encode_and_project(&self, x: &Matrix, mask: Option<&Matrix>) -> Result<Matrix> {
        let encoded = self.encoder.forward_masked(x, mask)?;
        match &self.output {
            Some(projection) => projection.forward(&encoded),
            None => Ok(encoded),
        }
    }

    fn require_vocab(&self) -> Result<&Embedding> {
        self.embedding
            .as_ref()
            .ok_or_else(|| Error::config("token input requires vocab_size to be configured"))
    }

    fn check_generation(&self, prompt: &[usize], max_length: usize) -> Result<()> {
        let embedding = self.require_vocab()?;
        if prompt.is_empty() {
            return Err(Error::msg("generation needs a non-empty prompt"));
        }
        if let Some(&bad) = prompt.iter().find(|&&t| t >= embedding.vocab_size()) {
            return Err(Error::msg(format!(
                "prompt token {bad} outside vocabulary of {}",
                embedding.vocab_size()
            )));
        }
        if max_length > self.encoder.max_len() {
            return Err(Error::SequenceTooLong {
                len: max_length,
                max: self.encoder.max_len(),
            });
        }
        Ok(())
    }

    /// Probabilities over the vocabulary for the token after `tokens`.
    pub fn next_token_probabilities(&self, tokens: &[usize]) -> Result<Vec<f64>> {
        if tokens.is_empty() {
            return Err(Error::msg("cannot predict a next token for an empty sequence"));
        }
        let mask = create_causal_mask(tokens.len());
        let logits = self.forward_tokens(tokens, Some(&mask))?;
        let last = logits.row(tokens.len() - 1)?;
        Ok(softmax(last.data()))
    }

    fn decode<F>(&self, prompt: &[usize], max_length: usize, mut pick: F) -> Result<Vec<usize>>
    where
        F: FnMut(&[f64]) -> usize,
    {
        self.check_generation(prompt, max_length)?;
        let mut tokens = prompt.to_vec();
        while tokens.len() < max_length {
            let probs = self.next_token_probabilities(&tokens)?;
            let next = pick(&probs);
            tracing::trace!(step = tokens.len(), token = next, "generated token");
            tokens.push(next);
        }
        tracing::debug!(
            prompt_len = prompt.len(),
            generated = tokens.len().saturating_sub(prompt.len()),
            "generation finished"
        );
        Ok(tokens)
    }

    /// Sample a continuation of `prompt` until the sequence holds
    /// `max_length` tokens. A prompt already that long is returned unchanged.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        prompt: &[usize],
        max_length: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        self.decode(prompt, max_length, |probs| sample_categorical(probs, &mut *rng))
    }

    /// Like [`Transformer::generate`], always taking the most likely token.
    pub fn generate_greedy(&self, prompt: &[usize], max_length: usize) -> Result<Vec<usize>> {
        self.decode(prompt, max_length, |probs| argmax(probs).unwrap_or(0))
    }
}

/// Draw an index from a categorical distribution by cumulative inversion.
pub fn sample_categorical<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Rounding left the total just under r: take the last token with mass.
    probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
}

impl Module for Transformer {
    /// Unmasked forward pass; see [`Transformer::forward`].
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        Transformer::forward(self, x, None)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        let mut p = Vec::new();
        if let Some(e) = &self.embedding {
            p.extend(e.parameters());
        }
        p.extend(self.encoder.parameters());
        if let Some(o) = &self.output {
            p.extend(o.parameters());
        }
        p
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        let mut p = Vec::new();
        if let Some(e) = &self.embedding {
            p.extend(prefixed("embedding", e.named_parameters()));
        }
        p.extend(prefixed("encoder", self.encoder.named_parameters()));
        if let Some(o) = &self.output {
            p.extend(prefixed("output", o.named_parameters()));
        }
        p
    }
}
