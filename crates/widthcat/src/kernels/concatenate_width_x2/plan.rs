//! Iteration window and padding plan over the output.

use crate::access::{update_window_and_padding, AccessPattern};
use crate::error::{KernelError, KernelResult};
use crate::helpers::{ceil_to_multiple, floor_mod, floor_to_multiple};
use crate::tensor::TensorInfo;
use crate::window::{Steps, Window, DIM_Z};

/// Elements each work item handles along the width axis.
pub const NUM_ELEMS_PROCESSED_PER_ITERATION: usize = 8;

const VEC: usize = NUM_ELEMS_PROCESSED_PER_ITERATION;

/// Elements past input1's last column up to the next chunk boundary.
pub fn input1_right_padding(input1_width: usize) -> usize {
    ceil_to_multiple(input1_width, VEC) - input1_width
}

/// Elements by which input2's data starts inside an output chunk.
pub fn input2_left_padding(input1_width: usize) -> usize {
    input1_width % VEC
}

/// Slack after input2 so its padded extent ends on an output chunk boundary.
///
/// The dividend is negative whenever the output width is not a multiple of
/// the chunk width; the residual is taken with floor modulo and lies in
/// `[0, VEC)`.
pub fn input2_right_padding(
    output_width: usize,
    input1_width: usize,
    input2_width: usize,
) -> usize {
    let dividend = floor_to_multiple(output_width, VEC) as i64
        - input1_width as i64
        - input2_width as i64;
    floor_mod(dividend, VEC as i64) as usize
}

/// Plans the window over `output` and merges each tensor's access pattern.
///
/// Resizable descriptors have their padding grown in place. Fails with
/// `Runtime` when a committed descriptor's padding is too small for the plan,
/// or when the output is so much wider than both inputs that the last chunks
/// would read past input2's padding. Dimensions from z upwards are collapsed
/// when the window covers them fully and kept as they are otherwise.
pub fn validate_and_configure_window(
    input1: &mut TensorInfo,
    input2: &mut TensorInfo,
    output: &mut TensorInfo,
) -> KernelResult<Window> {
    let mut window = Window::max_over(output.valid_region(), &Steps::new(&[VEC]));

    let input1_width = input1.dimension(0);
    let input2_width = input2.dimension(0);
    let output_width = output.dimension(0);
    let input2_end = input2_width + input2_right_padding(output_width, input1_width, input2_width);

    // The last chunk reads input2 up to this column.
    let input2_reach = ceil_to_multiple(output_width, VEC) as i64 - input1_width as i64;
    if input2_reach > input2_end as i64 {
        return Err(KernelError::runtime(format!(
            "output width {output_width} reads input2 up to column {input2_reach}, \
             past its padded extent of {input2_end}"
        )));
    }

    let input1_access = AccessPattern::fixed(
        0,
        0,
        ceil_to_multiple(input1_width, VEC) as i64,
        input1.dimension(1) as i64,
    );
    let input2_access = AccessPattern::fixed(
        -(input2_left_padding(input1_width) as i64),
        0,
        input2_end as i64,
        input2.dimension(1) as i64,
    );
    let output_access = AccessPattern::horizontal(0, VEC as i64);

    let window_changed = update_window_and_padding(
        &mut window,
        &mut [
            (input1, input1_access),
            (input2, input2_access),
            (output, output_access),
        ],
    );

    if window_changed {
        return Err(KernelError::runtime("Insufficient Padding!"));
    }
    let (collapsed, _) = window.collapse_if_possible(&window, DIM_Z);
    Ok(collapsed)
}
