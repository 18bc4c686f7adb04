use crate::tensor::{tensors_have_different_quantization_info, QuantizationInfo, TensorInfo};

/// Affine parameters of both inputs and the output, emitted when values must be rescaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequantizationParams {
    pub input1: QuantizationInfo,
    pub input2: QuantizationInfo,
    pub output: QuantizationInfo,
}

/// Returns the rescale parameters when the type is affine-quantized and the
/// three tensors do not share one quantization. Otherwise the kernel copies bytes.
pub fn resolve_requantization(
    input1: &TensorInfo,
    input2: &TensorInfo,
    output: &TensorInfo,
) -> Option<RequantizationParams> {
    if !input1.dtype().is_quantized_asymmetric() {
        return None;
    }
    if !tensors_have_different_quantization_info(output, &[input1, input2]) {
        return None;
    }
    Some(RequantizationParams {
        input1: input1.uniform_quantization(),
        input2: input2.uniform_quantization(),
        output: output.uniform_quantization(),
    })
}
