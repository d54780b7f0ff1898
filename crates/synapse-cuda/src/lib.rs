// CUDA Accelerator — GPU offload of matmul and element-wise arithmetic
//
// CudaAccelerator implements synapse_core::Accelerator on an NVIDIA GPU via
// cudarc. Kernels are compiled at runtime with NVRTC (see kernels.rs).
//
// LIFECYCLE:
//
//   The accelerator is created cheaply and does nothing until it is first
//   asked to compute. At that point it probes: acquire the device, compile
//   the two programs, load them. The outcome is stored in a OnceLock, so the
//   probe runs at most once per accelerator:
//
//     ok     → Ready: every call uploads, launches, downloads
//     failed → ProbeFailed: logged once at warn, every call returns None
//
//   After Ready, a failed launch or copy is logged at debug and the call
//   returns None. The matrix engine then computes the result on the host.
//
// PRECISION:
//
//   Device arithmetic is f32. Inputs are narrowed on upload and widened on
//   download, so results agree with the host to roughly 1e-4 relative.
//
// BUILD:
//
//   The device path only exists with the `cuda` feature. Without it the probe
//   always fails with "built without CUDA support".
//
// USAGE:
//   let accel = Arc::new(CudaAccelerator::new(0));
//   synapse_core::accel::install(accel).ok();

#[cfg(feature = "cuda")]
mod kernels;

use std::fmt;
use std::sync::OnceLock;

use synapse_core::accel::{Accelerator, AcceleratorState, ElementwiseOp, Operand};
use synapse_core::error::{Error, Result};

#[cfg(feature = "cuda")]
use device::DeviceState;

/// Placeholder device state when the device path is compiled out.
#[cfg(not(feature = "cuda"))]
#[derive(Debug)]
struct DeviceState;

#[cfg(not(feature = "cuda"))]
impl DeviceState {
    fn open(_ordinal: usize) -> Result<Self> {
        Err(Error::msg("built without CUDA support"))
    }

    fn matmul(&self, _a: &[f64], _m: usize, _k: usize, _b: &[f64], _n: usize) -> Result<Vec<f64>> {
        Err(Error::msg("built without CUDA support"))
    }

    fn elementwise(&self, _op: ElementwiseOp, _a: &[f64], _rhs: Operand<'_>) -> Result<Vec<f64>> {
        Err(Error::msg("built without CUDA support"))
    }
}

/// Element count as the kernels index it (u32). Larger buffers are refused so
/// the caller computes them on the host.
#[cfg_attr(not(feature = "cuda"), allow(dead_code))]
fn device_len(dims: &[usize]) -> Result<u32> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::msg(format!("{dims:?} exceeds the 32-bit device index range")))
}

/// A lazily probed CUDA accelerator bound to one GPU ordinal.
pub struct CudaAccelerator {
    ordinal: usize,
    probe: OnceLock<Option<DeviceState>>,
}

impl fmt::Debug for CudaAccelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaAccelerator")
            .field("ordinal", &self.ordinal)
            .field("state", &self.state())
            .finish()
    }
}

impl CudaAccelerator {
    /// Create an accelerator for GPU `ordinal`. Does not touch the device.
    pub fn new(ordinal: usize) -> Self {
        CudaAccelerator {
            ordinal,
            probe: OnceLock::new(),
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Run the probe now (if it has not run yet) and return the resulting state.
    pub fn probe(&self) -> AcceleratorState {
        match self.device() {
            Some(_) => AcceleratorState::Ready,
            None => AcceleratorState::ProbeFailed,
        }
    }

    fn device(&self) -> Option<&DeviceState> {
        self.probe
            .get_or_init(|| match DeviceState::open(self.ordinal) {
                Ok(state) => {
                    tracing::info!(ordinal = self.ordinal, "CUDA accelerator ready");
                    Some(state)
                }
                Err(e) => {
                    tracing::warn!(
                        ordinal = self.ordinal,
                        error = %e,
                        "CUDA accelerator unavailable, falling back to host compute"
                    );
                    None
                }
            })
            .as_ref()
    }
}

impl Default for CudaAccelerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Accelerator for CudaAccelerator {
    fn name(&self) -> String {
        format!("cuda:{}", self.ordinal)
    }

    fn state(&self) -> AcceleratorState {
        match self.probe.get() {
            None => AcceleratorState::Uninitialized,
            Some(Some(_)) => AcceleratorState::Ready,
            Some(None) => AcceleratorState::ProbeFailed,
        }
    }

    fn is_available(&self) -> bool {
        self.probe() == AcceleratorState::Ready
    }

    fn matmul(&self, a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Option<Vec<f64>> {
        let dev = self.device()?;
        match dev.matmul(a, m, k, b, n) {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::debug!(m, k, n, error = %e, "accelerated matmul failed");
                None
            }
        }
    }

    fn elementwise(&self, op: ElementwiseOp, a: &[f64], rhs: Operand<'_>) -> Option<Vec<f64>> {
        let dev = self.device()?;
        match dev.elementwise(op, a, rhs) {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::debug!(op = op.name(), len = a.len(), error = %e, "accelerated elementwise failed");
                None
            }
        }
    }
}

#[cfg(feature = "cuda")]
mod device {
    use std::sync::Arc;

    use cudarc::driver::{CudaFunction, LaunchAsync, LaunchConfig};
    use cudarc::nvrtc::{compile_ptx_with_opts, CompileOptions};

    use super::{device_len, kernels};
    use synapse_core::accel::{ElementwiseOp, Operand};
    use synapse_core::error::{Error, Result};

    /// Standard launch config: 256 threads per block, enough blocks to cover n.
    fn launch_cfg(n: u32) -> LaunchConfig {
        const BLOCK: u32 = 256;
        let grid = n.div_ceil(BLOCK);
        LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (grid.max(1), 1, 1),
            shared_mem_bytes: 0,
        }
    }

    fn narrow(data: &[f64]) -> Vec<f32> {
        data.iter().map(|&v| v as f32).collect()
    }

    fn widen(data: Vec<f32>) -> Vec<f64> {
        data.into_iter().map(f64::from).collect()
    }

    /// The acquired device with both programs loaded.
    #[derive(Debug)]
    pub(crate) struct DeviceState {
        dev: Arc<cudarc::driver::CudaDevice>,
    }

    impl DeviceState {
        pub(crate) fn open(ordinal: usize) -> Result<Self> {
            let dev = cudarc::driver::CudaDevice::new(ordinal)
                .map_err(|e| Error::msg(format!("CUDA device creation failed: {e}")))?;

            // Target the device's native architecture to avoid PTX version
            // mismatches between toolkit and driver.
            let major = dev
                .attribute(cudarc::driver::sys::CUdevice_attribute_enum::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)
                .map_err(|e| Error::msg(format!("compute capability query failed: {e}")))?;
            let minor = dev
                .attribute(cudarc::driver::sys::CUdevice_attribute_enum::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)
                .map_err(|e| Error::msg(format!("compute capability query failed: {e}")))?;
            let arch: &'static str = Box::leak(format!("sm_{major}{minor}").into_boxed_str());
            let opts = CompileOptions {
                arch: Some(arch),
                ..Default::default()
            };

            let ptx = compile_ptx_with_opts(kernels::KERNEL_SOURCE, opts)
                .map_err(|e| Error::msg(format!("NVRTC compilation failed: {e}")))?;
            dev.load_ptx(ptx, kernels::MODULE_NAME, kernels::KERNEL_NAMES)
                .map_err(|e| Error::msg(format!("PTX load failed: {e}")))?;

            Ok(DeviceState { dev })
        }

        fn get_func(&self, name: &str) -> Result<CudaFunction> {
            self.dev
                .get_func(kernels::MODULE_NAME, name)
                .ok_or_else(|| Error::msg(format!("CUDA kernel '{name}' not found")))
        }

        pub(crate) fn matmul(
            &self,
            a: &[f64],
            m: usize,
            k: usize,
            b: &[f64],
            n: usize,
        ) -> Result<Vec<f64>> {
            let out_len = device_len(&[m, n])?;
            device_len(&[m, k])?;
            device_len(&[k, n])?;
            if out_len == 0 || k == 0 {
                return Ok(vec![0.0; m * n]);
            }
            let a_dev = self.dev.htod_sync_copy(&narrow(a)).map_err(cuda_err)?;
            let b_dev = self.dev.htod_sync_copy(&narrow(b)).map_err(cuda_err)?;
            let mut c_dev = self.dev.alloc_zeros::<f32>(m * n).map_err(cuda_err)?;

            let func = self.get_func("matmul_f32")?;
            unsafe {
                func.launch(
                    launch_cfg(out_len),
                    (&a_dev, &b_dev, &mut c_dev, m as u32, k as u32, n as u32),
                )
            }
            .map_err(cuda_err)?;

            let out = self.dev.dtoh_sync_copy(&c_dev).map_err(cuda_err)?;
            Ok(widen(out))
        }

        pub(crate) fn elementwise(
            &self,
            op: ElementwiseOp,
            a: &[f64],
            rhs: Operand<'_>,
        ) -> Result<Vec<f64>> {
            let len = a.len();
            let n = device_len(&[len])?;
            if n == 0 {
                return Ok(Vec::new());
            }
            let a_dev = self.dev.htod_sync_copy(&narrow(a)).map_err(cuda_err)?;
            let (b_dev, scalar, use_scalar) = match rhs {
                Operand::Matrix(b) => {
                    if b.len() != len {
                        return Err(Error::msg(format!(
                            "elementwise operand length {} does not match {len}",
                            b.len()
                        )));
                    }
                    let b_dev = self.dev.htod_sync_copy(&narrow(b)).map_err(cuda_err)?;
                    (b_dev, 0.0f32, 0u32)
                }
                // The kernel ignores `b` in scalar mode; it only needs a valid pointer.
                Operand::Scalar(s) => (
                    self.dev.alloc_zeros::<f32>(1).map_err(cuda_err)?,
                    s as f32,
                    1u32,
                ),
            };
            let mut out_dev = self.dev.alloc_zeros::<f32>(len).map_err(cuda_err)?;

            let func = self.get_func("elementwise_f32")?;
            unsafe {
                func.launch(
                    launch_cfg(n),
                    (
                        &a_dev,
                        &b_dev,
                        &mut out_dev,
                        scalar,
                        use_scalar,
                        op.selector(),
                        n,
                    ),
                )
            }
            .map_err(cuda_err)?;

            let out = self.dev.dtoh_sync_copy(&out_dev).map_err(cuda_err)?;
            Ok(widen(out))
        }
    }

    fn cuda_err<E: std::fmt::Display>(e: E) -> Error {
        Error::msg(format!("CUDA error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_len_limits() {
        assert_eq!(device_len(&[3, 4]).unwrap(), 12);
        assert_eq!(device_len(&[0, 7]).unwrap(), 0);
        assert!(device_len(&[1 << 16, (1 << 16) + 1]).is_err());
        assert!(device_len(&[usize::MAX, 2]).is_err());
    }

    #[test]
    fn test_starts_uninitialized() {
        let accel = CudaAccelerator::new(0);
        assert_eq!(accel.state(), AcceleratorState::Uninitialized);
        assert_eq!(accel.name(), "cuda:0");
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_probe_fails_without_feature() {
        let accel = CudaAccelerator::new(0);
        assert_eq!(accel.probe(), AcceleratorState::ProbeFailed);
        assert!(!accel.is_available());
        assert!(accel.matmul(&[1.0], 1, 1, &[2.0], 1).is_none());
        assert!(accel
            .elementwise(ElementwiseOp::Mul, &[1.0], Operand::Scalar(3.0))
            .is_none());
        // Latched: stays failed.
        assert_eq!(accel.state(), AcceleratorState::ProbeFailed);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_stub_reports_reason() {
        let err = DeviceState::open(0).unwrap_err();
        assert_eq!(err.to_string(), "built without CUDA support");
    }
}
