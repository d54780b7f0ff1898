//! # Synapse
//!
//! Small learning models built from first principles in Rust.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use synapse::prelude::*;
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `synapse-core` | Matrix, Shape, Error, the Accelerator capability |
//! | `synapse-cuda` | CUDA accelerator (device path behind the `cuda` feature) |
//! | `synapse-nn` | Activations, feed-forward Network, transformer stack |
//!
//! ## Modules
//!
//! - [`accel`]: accelerator handle and [`init_accelerator`]
//! - [`checkpoint`]: save/load trained networks to disk

/// Re-export core types.
pub use synapse_core::{
    Accelerator, AcceleratorState, ElementwiseOp, Error, HostOnly, Matrix, Operand, Result, Shape,
};

pub use synapse_cuda::CudaAccelerator;

/// Re-export neural network modules.
pub mod nn {
    pub use synapse_nn::*;
}

/// Accelerator selection: the process-wide compute device.
pub mod accel;

/// Checkpoint: save and load trained networks.
pub mod checkpoint;

pub use accel::init_accelerator;

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::checkpoint::TrainingCheckpoint;
    pub use crate::nn::activation::{gelu, relu, sigmoid, softmax, softmax_rows};
    pub use crate::nn::{
        argmax, create_causal_mask, one_hot, Activation, DigitRecord, Example, FeedForward,
        LayerNorm, Linear, Module, MultiHeadAttention, Network, NetworkConfig,
        PositionalEncoding, SavedNetwork, Transformer, TransformerBlock, TransformerConfig,
        TransformerEncoder,
    };
    pub use crate::{init_accelerator, Accelerator, Error, HostOnly, Matrix, Result, Shape};
}
