//! Planning and dispatch for width concatenation of two tensors on an
//! accelerator.
//!
//! The crate derives the iteration window and padding for a two-input width
//! concatenation, packs the compile-time options and runtime scalars of the
//! device routine, and drives a queued backend slice by slice. Devices plug in
//! through the traits in [`device`].

mod env;

pub mod access;
pub mod build_options;
pub mod device;
pub mod error;
pub mod helpers;
pub mod kernels;
pub mod profiling;
pub mod tensor;
pub mod tuning;
pub mod window;

pub use build_options::BuildOptions;
pub use device::{
    CommandQueue, CompileContext, ComputeDevice, DeviceCaps, KernelArg, KernelHandle, NdRange,
};
pub use error::{ErrorKind, KernelError, KernelResult};
pub use kernels::concatenate_width_x2::ConcatenateWidthX2Kernel;
pub use kernels::{Kernel, KernelStateTag};
pub use tensor::{
    DType, DeviceTensor, PaddingSize, QuantizationInfo, TensorInfo, TensorPack, TensorRole,
    TensorShape,
};
pub use tuning::LwsTuner;
pub use window::{Dimension, Steps, Window};
