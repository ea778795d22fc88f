// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Every model component is generic over burn's `Backend`. The
// concrete choice lives here and nowhere else:
//
//   default         → NdArray (CPU)
//   --features wgpu → Wgpu (GPU via WebGPU)
//
// Training wraps the compute backend in `Autodiff`; evaluation
// runs on the plain compute backend (dropout off, no tape).

use burn::prelude::*;

#[cfg(not(feature = "wgpu"))]
pub type ComputeBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type ComputeBackend = burn::backend::Wgpu;

pub type TrainingBackend = burn::backend::Autodiff<ComputeBackend>;

/// Device and seed handed explicitly to everything that allocates
/// tensors, instead of relying on an ambient default device.
#[derive(Debug, Clone)]
pub struct ExecutionContext<B: Backend> {
    pub device: B::Device,
    pub seed:   u64,
}

impl<B: Backend> ExecutionContext<B> {
    pub fn new(device: B::Device, seed: u64) -> Self {
        Self { device, seed }
    }

    /// Seed the backend RNG used for parameter init and dropout.
    pub fn seeded(self) -> Self {
        B::seed(self.seed);
        tracing::debug!("Backend seeded with {}", self.seed);
        self
    }
}

/// Context on the default device of the configured compute backend.
pub fn default_context<B: Backend>(seed: u64) -> ExecutionContext<B> {
    ExecutionContext::new(B::Device::default(), seed).seeded()
}
