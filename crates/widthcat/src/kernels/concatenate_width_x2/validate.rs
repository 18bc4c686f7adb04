use crate::device::DeviceCaps;
use crate::error::{invalid_if, KernelResult};
use crate::tensor::{DType, TensorInfo, MAX_DIMS};

/// Shape and type checks that must hold before any geometry is derived.
pub fn validate_arguments(
    input1: &TensorInfo,
    input2: &TensorInfo,
    output: &TensorInfo,
    caps: &DeviceCaps,
) -> KernelResult<()> {
    invalid_if(
        input1.dtype() == DType::F16 && !caps.fp16,
        "F16 is not supported by this device",
    )?;
    invalid_if(
        input1.dtype() == DType::Unknown,
        "input1 has an unknown data type",
    )?;
    invalid_if(
        input1.dtype() != input2.dtype() || input1.dtype() != output.dtype(),
        format!(
            "mismatching data types: input1 {}, input2 {}, output {}",
            input1.dtype().name(),
            input2.dtype().name(),
            output.dtype().name()
        ),
    )?;
    invalid_if(
        input1.dimension(0) + input2.dimension(0) > output.dimension(0),
        format!(
            "input widths {} + {} exceed the output width {}",
            input1.dimension(0),
            input2.dimension(0),
            output.dimension(0)
        ),
    )?;
    for axis in 1..MAX_DIMS {
        invalid_if(
            input1.dimension(axis) != output.dimension(axis),
            format!(
                "input1 dimension {axis} is {} but the output has {}",
                input1.dimension(axis),
                output.dimension(axis)
            ),
        )?;
        invalid_if(
            input2.dimension(axis) != output.dimension(axis),
            format!(
                "input2 dimension {axis} is {} but the output has {}",
                input2.dimension(axis),
                output.dimension(axis)
            ),
        )?;
    }
    invalid_if(
        input1.num_dimensions() > 4,
        format!(
            "input1 has {} dimensions, at most 4 are supported",
            input1.num_dimensions()
        ),
    )
}
