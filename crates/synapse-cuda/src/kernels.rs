// CUDA Kernel Source Code — Compiled to PTX at runtime via NVRTC
//
// The two device programs behind CudaAccelerator. They are compiled once, the
// first time the accelerator is probed, and cached in the device.
//
// - `matmul_f32`: one thread per output element, triple loop over the inner
//   dimension. Row-major A[m x k] · B[k x n] → C[m x n].
// - `elementwise_f32`: one thread per element. `op` selects add (0), sub (1)
//   or mul (2). When `use_scalar` is non-zero the right-hand operand is the
//   scalar `s` and `b` is ignored.
//
// All device arithmetic is single precision; the host side converts from and
// back to f64.

pub const KERNEL_SOURCE: &str = r#"
extern "C" __global__ void matmul_f32(
    const float* a, const float* b, float* c,
    unsigned int m, unsigned int k, unsigned int n
) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx >= m * n) return;
    unsigned int row = idx / n;
    unsigned int col = idx % n;
    float acc = 0.0f;
    for (unsigned int l = 0; l < k; l++) {
        acc += a[row * k + l] * b[l * n + col];
    }
    c[idx] = acc;
}

extern "C" __global__ void elementwise_f32(
    const float* a, const float* b, float* out,
    float s, unsigned int use_scalar, unsigned int op, unsigned int len
) {
    unsigned int idx = blockIdx.x * blockDim.x + threadIdx.x;
    if (idx >= len) return;
    float x = a[idx];
    float y = use_scalar ? s : b[idx];
    float r;
    switch (op) {
        case 0: r = x + y; break;
        case 1: r = x - y; break;
        default: r = x * y; break;
    }
    out[idx] = r;
}
"#;

pub const KERNEL_NAMES: &[&str] = &["matmul_f32", "elementwise_f32"];

pub const MODULE_NAME: &str = "synapse_kernels";
