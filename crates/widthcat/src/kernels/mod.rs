//! Kernel variants and the dispatch table keyed by operation name.

pub mod concatenate_width_x2;

use crate::device::{CommandQueue, CompileContext, ComputeDevice, DeviceCaps, KernelHandle};
use crate::error::{KernelError, KernelResult};
use crate::tensor::{TensorInfo, TensorPack};
use crate::window::Window;

use concatenate_width_x2::ConcatenateWidthX2Kernel;

/// Lifecycle of a kernel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelStateTag {
    Unconfigured,
    Configured,
}

type ValidateFn = fn(&[&TensorInfo], &TensorInfo, &DeviceCaps) -> KernelResult<()>;

/// One entry of the dispatch table.
pub struct OpDescriptor {
    pub name: &'static str,
    pub num_inputs: usize,
    validate: ValidateFn,
}

static OPS: &[OpDescriptor] = &[OpDescriptor {
    name: concatenate_width_x2::KERNEL_NAME,
    num_inputs: 2,
    validate: validate_concatenate_width_x2,
}];

fn validate_concatenate_width_x2(
    inputs: &[&TensorInfo],
    output: &TensorInfo,
    caps: &DeviceCaps,
) -> KernelResult<()> {
    match inputs {
        [input1, input2] => concatenate_width_x2::validate(input1, input2, output, caps),
        _ => Err(missing_inputs(concatenate_width_x2::KERNEL_NAME, 2, inputs.len())),
    }
}

fn missing_inputs(op: &str, expected: usize, got: usize) -> KernelError {
    KernelError::invalid_argument(format!(
        "{op} expects {expected} source descriptors, got {got}"
    ))
}

pub fn lookup(op: &str) -> KernelResult<&'static OpDescriptor> {
    OPS.iter()
        .find(|entry| entry.name == op)
        .ok_or_else(|| KernelError::invalid_argument(format!("unknown operation '{op}'")))
}

pub fn list_ops() -> Vec<&'static str> {
    OPS.iter().map(|entry| entry.name).collect()
}

/// Checks whether `op` accepts these descriptors. Never mutates anything.
pub fn validate(
    op: &str,
    inputs: &[&TensorInfo],
    output: &TensorInfo,
    caps: &DeviceCaps,
) -> KernelResult<()> {
    let entry = lookup(op)?;
    if inputs.len() != entry.num_inputs {
        return Err(missing_inputs(op, entry.num_inputs, inputs.len()));
    }
    (entry.validate)(inputs, output, caps)
}

/// A kernel instance of any registered operation.
pub enum Kernel<K> {
    ConcatenateWidthX2(ConcatenateWidthX2Kernel<K>),
}

impl<K: KernelHandle> Kernel<K> {
    /// Creates an unconfigured instance of `op`.
    pub fn create(op: &str) -> KernelResult<Self> {
        let entry = lookup(op)?;
        match entry.name {
            concatenate_width_x2::KERNEL_NAME => {
                Ok(Kernel::ConcatenateWidthX2(ConcatenateWidthX2Kernel::new()))
            }
            other => Err(KernelError::invalid_argument(format!(
                "operation '{other}' has no kernel"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kernel::ConcatenateWidthX2(_) => concatenate_width_x2::KERNEL_NAME,
        }
    }

    pub fn state(&self) -> KernelStateTag {
        match self {
            Kernel::ConcatenateWidthX2(kernel) => kernel.state(),
        }
    }

    pub fn window(&self) -> Option<&Window> {
        match self {
            Kernel::ConcatenateWidthX2(kernel) => kernel.window(),
        }
    }

    pub fn configure<D>(
        &mut self,
        context: &CompileContext<D>,
        inputs: &mut [&mut TensorInfo],
        output: &mut TensorInfo,
    ) -> KernelResult<()>
    where
        D: ComputeDevice<Kernel = K, Buffer = K::Buffer>,
    {
        let count = inputs.len();
        match self {
            Kernel::ConcatenateWidthX2(kernel) => match inputs {
                [input1, input2] => kernel.configure(context, input1, input2, output),
                _ => Err(missing_inputs(concatenate_width_x2::KERNEL_NAME, 2, count)),
            },
        }
    }

    pub fn run_op<Q>(
        &mut self,
        tensors: &TensorPack<'_, K::Buffer>,
        window: &Window,
        queue: &mut Q,
    ) -> KernelResult<()>
    where
        Q: CommandQueue<Kernel = K>,
    {
        match self {
            Kernel::ConcatenateWidthX2(kernel) => kernel.run_op(tensors, window, queue),
        }
    }
}
