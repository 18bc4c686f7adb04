use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::build_options::BuildOptions;
use crate::error::{KernelError, KernelResult};
use crate::profiling;

use super::ComputeDevice;

/// A device plus an in-memory cache of the kernels compiled on it.
///
/// Kernels are keyed by a fingerprint of their name and build options, so
/// configuring several instances with identical shapes compiles once.
pub struct CompileContext<D: ComputeDevice> {
    device: D,
    compiled: Mutex<HashMap<u64, D::Kernel>>,
    compile_gates: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl<D: ComputeDevice> CompileContext<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            compiled: Mutex::new(HashMap::new()),
            compile_gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns a fresh handle to `name` compiled with `options`, compiling on first use.
    ///
    /// Concurrent callers asking for the same fingerprint wait on a per-fingerprint
    /// gate, so each distinct kernel is compiled once.
    pub fn create_kernel(&self, name: &str, options: &BuildOptions) -> KernelResult<D::Kernel> {
        let fingerprint = options.fingerprint(name);
        if let Some(found) = self.cached(name, fingerprint)? {
            return Ok(found);
        }
        profiling::cache_event("widthcat.kernel_miss_mem");

        let gate = {
            let mut gates = self
                .compile_gates
                .lock()
                .map_err(|_| KernelError::device("kernel compile gate table mutex poisoned"))?;
            Arc::clone(
                gates
                    .entry(fingerprint)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _gate_lock = gate
            .lock()
            .map_err(|_| KernelError::device("kernel compile gate poisoned"))?;

        if let Some(found) = self.cached(name, fingerprint)? {
            return Ok(found);
        }

        let kernel = self.device.create_kernel(name, options)?;
        tracing::debug!(
            kernel = name,
            fingerprint,
            device = self.device.name(),
            "compiled kernel"
        );
        self.lock()?.insert(fingerprint, kernel.clone());
        Ok(kernel)
    }

    /// Number of distinct kernels compiled so far.
    pub fn cached_kernels(&self) -> usize {
        self.compiled.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    fn cached(&self, name: &str, fingerprint: u64) -> KernelResult<Option<D::Kernel>> {
        let found = self.lock()?.get(&fingerprint).cloned();
        if found.is_some() {
            profiling::cache_event("widthcat.kernel_hit_mem");
            tracing::trace!(kernel = name, fingerprint, "compile cache hit");
        }
        Ok(found)
    }

    fn lock(&self) -> KernelResult<std::sync::MutexGuard<'_, HashMap<u64, D::Kernel>>> {
        self.compiled
            .lock()
            .map_err(|_| KernelError::device("kernel compile cache mutex poisoned"))
    }
}
