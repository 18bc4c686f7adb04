use std::sync::Arc;

use widthcat::build_options::BuildOptions;
use widthcat::device::{ComputeDevice, DeviceCaps, KernelArg, KernelHandle};
use widthcat::error::{KernelError, KernelResult};
use widthcat::kernels::concatenate_width_x2::KERNEL_NAME;

use crate::buffer::HostBuffer;
use crate::concat::ConcatProgram;

/// Argument slots of `concatenate_width_x2`: three 4D tensors and two scalars.
const MAX_KERNEL_ARGS: usize = 32;

/// Reference device executing kernels on the host.
#[derive(Debug, Clone)]
pub struct HostDevice {
    name: String,
    caps: DeviceCaps,
}

impl HostDevice {
    /// Device at the precision tier selected by `WIDTHCAT_FP16`.
    pub fn new() -> Self {
        Self::with_caps(DeviceCaps::from_env())
    }

    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self {
            name: "host-ref".to_string(),
            caps,
        }
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for HostDevice {
    type Buffer = HostBuffer;
    type Kernel = HostKernel;

    fn name(&self) -> &str {
        &self.name
    }

    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn create_kernel(&self, name: &str, options: &BuildOptions) -> KernelResult<HostKernel> {
        if name != KERNEL_NAME {
            return Err(KernelError::device(format!(
                "host device has no kernel named '{name}'"
            )));
        }
        let program = ConcatProgram::from_options(options)?;
        tracing::debug!(kernel = name, ?program, "built host kernel");
        Ok(HostKernel {
            name: name.to_string(),
            program: Arc::new(program),
            args: Vec::new(),
        })
    }
}

/// Compiled host kernel plus its currently bound arguments.
#[derive(Debug, Clone)]
pub struct HostKernel {
    name: String,
    program: Arc<ConcatProgram>,
    args: Vec<Option<KernelArg<HostBuffer>>>,
}

impl HostKernel {
    pub fn program(&self) -> &ConcatProgram {
        &self.program
    }

    pub fn arg(&self, index: usize) -> Option<&KernelArg<HostBuffer>> {
        self.args.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn args(&self) -> &[Option<KernelArg<HostBuffer>>] {
        &self.args
    }
}

impl KernelHandle for HostKernel {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_arg(&mut self, index: usize, arg: KernelArg<HostBuffer>) -> KernelResult<()> {
        if index >= MAX_KERNEL_ARGS {
            return Err(KernelError::device(format!(
                "argument index {index} out of range for {}",
                self.name
            )));
        }
        if self.args.len() <= index {
            self.args.resize(index + 1, None);
        }
        self.args[index] = Some(arg);
        Ok(())
    }
}
