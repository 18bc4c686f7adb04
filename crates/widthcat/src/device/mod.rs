//! Abstract accelerator interface.
//!
//! Kernels are compiled by name from a set of build options, bound argument by
//! argument, and launched over an N-dimensional range on an ordered queue. A
//! backend implements [`ComputeDevice`], [`KernelHandle`] and [`CommandQueue`].

mod compile;
mod launch;

use serde::{Deserialize, Serialize};

use crate::build_options::BuildOptions;
use crate::env;
use crate::error::KernelResult;
use crate::window::{Window, DIM_W, DIM_X, DIM_Y, DIM_Z};

pub use compile::CompileContext;
pub use launch::{add_4d_tensor_argument, enqueue, num_arguments_per_4d_tensor};

/// Three-dimensional launch range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct NdRange {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl NdRange {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Global size for `window`: `(end - start) / step` along x, y and z.
    ///
    /// The w extent is folded into z, where kernels split it again by `DEPTH`.
    /// It is 1 for windows collapsed at z.
    pub fn global_for(window: &Window) -> Self {
        let extent = |axis: usize| {
            let dim = window.dimension(axis);
            ((dim.end() - dim.start()).max(0) / dim.step()) as usize
        };
        Self::new(
            extent(DIM_X),
            extent(DIM_Y),
            extent(DIM_Z) * extent(DIM_W),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Returns `true` if every axis of `self` is non-zero and divides `global`.
    pub fn divides(&self, global: &NdRange) -> bool {
        !self.is_empty()
            && global.x % self.x == 0
            && global.y % self.y == 0
            && global.z % self.z == 0
    }
}

impl From<[usize; 3]> for NdRange {
    fn from([x, y, z]: [usize; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<NdRange> for [usize; 3] {
    fn from(range: NdRange) -> Self {
        [range.x, range.y, range.z]
    }
}

/// A value bound to one kernel argument slot.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelArg<B> {
    Buffer(B),
    U32(u32),
}

/// A compiled kernel whose arguments can be bound by index.
pub trait KernelHandle {
    type Buffer: Clone;

    fn name(&self) -> &str;

    fn set_arg(&mut self, index: usize, arg: KernelArg<Self::Buffer>) -> KernelResult<()>;
}

/// Capabilities of the precision tier a device runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCaps {
    pub fp16: bool,
}

impl DeviceCaps {
    /// Capabilities from `WIDTHCAT_FP16`.
    pub fn from_env() -> Self {
        Self {
            fp16: env::fp16_enabled(),
        }
    }
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self { fp16: true }
    }
}

pub trait ComputeDevice {
    type Buffer: Clone;
    type Kernel: KernelHandle<Buffer = Self::Buffer> + Clone;

    /// Identifier used to key per-device state such as tuning results.
    fn name(&self) -> &str;

    fn caps(&self) -> DeviceCaps;

    /// Compiles the kernel `name` specialised by `options`.
    fn create_kernel(&self, name: &str, options: &BuildOptions) -> KernelResult<Self::Kernel>;
}

/// Ordered, asynchronous submission of kernel launches.
pub trait CommandQueue {
    type Kernel: KernelHandle;

    /// Submits `kernel` with its currently bound arguments. Must not block on execution.
    fn enqueue(
        &mut self,
        kernel: &Self::Kernel,
        global: NdRange,
        local: Option<NdRange>,
    ) -> KernelResult<()>;
}
