use crate::build_options::BuildOptions;
use crate::device::{num_arguments_per_4d_tensor, KernelArg, KernelHandle};
use crate::error::{KernelError, KernelResult};
use crate::tensor::TensorInfo;

use super::plan::{input1_right_padding, input2_left_padding, NUM_ELEMS_PROCESSED_PER_ITERATION};
use super::quantization::resolve_requantization;
use super::KERNEL_NAME;

/// Padding compensations passed after the three tensor arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarPaddings {
    pub input1_right_padding: u32,
    pub input2_left_padding: u32,
}

impl ScalarPaddings {
    pub fn for_input1(input1: &TensorInfo) -> KernelResult<Self> {
        let width = input1.dimension(0);
        let to_u32 = |value: usize| {
            u32::try_from(value)
                .map_err(|_| KernelError::invalid_argument(format!("padding {value} exceeds u32")))
        };
        Ok(Self {
            input1_right_padding: to_u32(input1_right_padding(width))?,
            input2_left_padding: to_u32(input2_left_padding(width))?,
        })
    }

    /// First slot after input1, input2 and output.
    pub const fn first_slot() -> usize {
        3 * num_arguments_per_4d_tensor()
    }

    pub fn bind<K: KernelHandle>(&self, kernel: &mut K) -> KernelResult<()> {
        let idx = Self::first_slot();
        kernel.set_arg(idx, KernelArg::U32(self.input1_right_padding))?;
        kernel.set_arg(idx + 1, KernelArg::U32(self.input2_left_padding))
    }
}

/// Compile-time defines specialising the kernel for these descriptors.
pub fn build_options(
    input1: &TensorInfo,
    input2: &TensorInfo,
    output: &TensorInfo,
) -> KernelResult<BuildOptions> {
    let data_type = input1.dtype().device_type_name().ok_or_else(|| {
        KernelError::invalid_argument(format!(
            "no device type for {}",
            input1.dtype().name()
        ))
    })?;

    let mut options = BuildOptions::new();
    options.define("DATA_TYPE", data_type);
    options.define("VEC_SIZE", NUM_ELEMS_PROCESSED_PER_ITERATION);
    options.define("DEPTH", input1.dimension(2));
    options.define("INPUT1_WIDTH", input1.dimension(0));
    options.define("ELEMENT_SIZE", input1.element_size());

    if let Some(params) = resolve_requantization(input1, input2, output) {
        options.define("OFFSET_IN1", params.input1.offset);
        options.define_float("SCALE_IN1", params.input1.scale);
        options.define("OFFSET_IN2", params.input2.offset);
        options.define_float("SCALE_IN2", params.input2.scale);
        options.define("OFFSET_OUT", params.output.offset);
        options.define_float("SCALE_OUT", params.output.scale);
    }
    Ok(options)
}

/// Key under which tuned launch geometry is stored for this type and input shapes.
pub fn config_id(input1: &TensorInfo, input2: &TensorInfo) -> String {
    format!(
        "{KERNEL_NAME}_{}_{}_{}_{}_{}",
        input1.dtype().name().to_lowercase(),
        input1.dimension(0),
        input1.dimension(1),
        input2.dimension(0),
        input2.dimension(1)
    )
}
