// Accelerator selection
//
// init_accelerator() installs a CudaAccelerator for GPU 0 as the process-wide
// accelerator. It does not touch the device: the CUDA probe runs on the first
// matrix operation that reaches it. If the probe fails (no usable GPU, or a
// build without the `cuda` feature) a single warning is logged and every
// operation runs on the host from then on.
//
// Call it once at startup, before any matrix arithmetic. Later calls, or calls
// after the first matrix operation already fixed the host default, leave the
// existing accelerator in place.

use std::sync::Arc;

use synapse_core::accel::{self, Accelerator};
use synapse_cuda::CudaAccelerator;

pub use synapse_core::accel::{global, host_elementwise, host_matmul, install};

/// Install the CUDA accelerator (GPU 0) process-wide and return the active
/// accelerator.
pub fn init_accelerator() -> &'static dyn Accelerator {
    init_accelerator_on(0)
}

/// Like [`init_accelerator`], for a specific GPU ordinal.
pub fn init_accelerator_on(ordinal: usize) -> &'static dyn Accelerator {
    let candidate: Arc<dyn Accelerator> = Arc::new(CudaAccelerator::new(ordinal));
    match accel::install(candidate) {
        Ok(()) => tracing::info!(ordinal, "installed CUDA accelerator"),
        Err(rejected) => tracing::debug!(
            rejected = %rejected.name(),
            active = %accel::global().name(),
            "accelerator already installed"
        ),
    }
    accel::global()
}
