//! # synapse-core
//!
//! Dense matrix engine and accelerator capability for synapse.
//!
//! This crate provides:
//! - [`Matrix`]: row-major 2-D array of f64 with value semantics
//! - [`Shape`]: (rows, cols) pair used in errors and checks
//! - [`accel`]: the optional compute device behind `dot`/`add`/`sub`/`mul`
//! - [`Error`] / [`Result`]: the error type shared by every synapse crate

pub mod accel;
pub mod error;
pub mod matrix;
pub mod shape;

pub use accel::{Accelerator, AcceleratorState, ElementwiseOp, HostOnly, Operand};
pub use error::{Error, Result};
pub use matrix::Matrix;
pub use shape::Shape;
