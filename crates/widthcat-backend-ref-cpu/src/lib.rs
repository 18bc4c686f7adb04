//! Host-memory reference device for `widthcat`.
//!
//! Implements the device traits on plain byte buffers and emulates the
//! `concatenate_width_x2` routine work item by work item, so configure and run
//! can be exercised end to end without an accelerator.

pub mod buffer;
pub mod concat;
pub mod device;
pub mod queue;

pub use buffer::{Element, HostBuffer};
pub use concat::{ConcatProgram, StorageKind};
pub use device::{HostDevice, HostKernel};
pub use queue::{HostQueue, Launch};

/// Host tensor: descriptor plus its backing allocation.
pub type HostTensor = widthcat::tensor::DeviceTensor<HostBuffer>;
