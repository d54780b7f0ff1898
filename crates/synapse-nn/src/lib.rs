//! # synapse-nn
//!
//! Learning models on top of the synapse matrix engine.
//!
//! 1. **Activations**: sigmoid, relu, tanh, gelu, softmax and name-based dispatch
//! 2. **Network**: a three-layer perceptron trained online by backpropagation,
//!    with JSON persistence and digit-dataset helpers
//! 3. **Transformer stack**: positional encoding, multi-head attention,
//!    layer norm, feed-forward, blocks, encoder and a token-level model with
//!    autoregressive generation
//! 4. **Module trait**: the interface shared by every transformer component
//!
//! Everything is single-threaded and synchronous. Matrix products and
//! element-wise arithmetic go through the process-wide accelerator installed
//! in `synapse_core::accel`, with host fallback.

pub mod activation;
pub mod attention;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod feedforward;
pub mod init;
pub mod layernorm;
pub mod linear;
pub mod loss;
pub mod metrics;
pub mod module;
pub mod network;
pub mod persistence;
pub mod positional;
pub mod transformer;

pub use activation::{Activation, ResolvedActivation};
pub use attention::{create_causal_mask, scaled_dot_product_attention, MultiHeadAttention};
pub use config::TransformerConfig;
pub use dataset::DigitRecord;
pub use embedding::Embedding;
pub use feedforward::FeedForward;
pub use layernorm::LayerNorm;
pub use linear::Linear;
pub use metrics::{argmax, one_hot, ConfusionMatrix};
pub use module::Module;
pub use network::{Example, Network, NetworkConfig};
pub use persistence::{LayerRecord, SavedNetwork};
pub use positional::PositionalEncoding;
pub use transformer::{Transformer, TransformerBlock, TransformerEncoder};
