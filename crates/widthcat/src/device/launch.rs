//! Argument binding and launch helpers shared by every kernel.

use crate::error::{KernelError, KernelResult};
use crate::tensor::DeviceTensor;
use crate::window::Window;

use super::{CommandQueue, KernelArg, KernelHandle, NdRange};

const TENSOR_4D_DIMS: usize = 4;

/// Slots one 4D tensor occupies: the buffer, a `(stride, stride * step)` pair
/// per dimension and the byte offset of the slice's first element.
pub const fn num_arguments_per_4d_tensor() -> usize {
    2 + 2 * TENSOR_4D_DIMS
}

fn to_u32(value: i64, what: &str) -> KernelResult<u32> {
    u32::try_from(value)
        .map_err(|_| KernelError::runtime(format!("{what} {value} does not fit a u32 argument")))
}

/// Binds `tensor` for `window` starting at slot `*idx` and advances `*idx` past it.
pub fn add_4d_tensor_argument<K: KernelHandle>(
    idx: &mut usize,
    kernel: &mut K,
    tensor: &DeviceTensor<K::Buffer>,
    window: &Window,
) -> KernelResult<()> {
    let strides = tensor.info.strides_in_bytes();

    kernel.set_arg(*idx, KernelArg::Buffer(tensor.buffer.clone()))?;
    *idx += 1;

    let mut offset = tensor.info.offset_first_element_in_bytes() as i64;
    for (axis, stride) in strides.iter().take(TENSOR_4D_DIMS).enumerate() {
        let dim = window.dimension(axis);
        let stride = *stride as i64;
        kernel.set_arg(*idx, KernelArg::U32(to_u32(stride, "stride")?))?;
        kernel.set_arg(
            *idx + 1,
            KernelArg::U32(to_u32(stride * dim.step(), "step stride")?),
        )?;
        *idx += 2;
        offset += dim.start() * stride;
    }

    kernel.set_arg(*idx, KernelArg::U32(to_u32(offset, "first element offset")?))?;
    *idx += 1;
    Ok(())
}

/// Launches `kernel` over `window` on `queue`.
///
/// Empty windows are skipped. The local size hint is dropped unless it evenly
/// divides the global size.
pub fn enqueue<Q: CommandQueue>(
    queue: &mut Q,
    kernel: &Q::Kernel,
    window: &Window,
    lws_hint: Option<NdRange>,
) -> KernelResult<()> {
    let global = NdRange::global_for(window);
    if global.is_empty() {
        tracing::trace!(kernel = kernel.name(), "skipping empty launch");
        return Ok(());
    }
    let local = lws_hint.filter(|lws| lws.divides(&global));
    tracing::trace!(kernel = kernel.name(), ?global, ?local, "enqueue");
    queue.enqueue(kernel, global, local)
}
