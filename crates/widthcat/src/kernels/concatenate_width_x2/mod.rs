//! Concatenation of two tensors along the width axis.
//!
//! The output window is walked in chunks of
//! [`NUM_ELEMS_PROCESSED_PER_ITERATION`] elements. Each work item loads a full
//! chunk from both inputs and picks, lane by lane, the element that belongs at
//! that output column. Input1 is therefore read up to its next chunk boundary
//! and input2 is read starting `input1_width % 8` elements before its first
//! column, which is why both inputs need horizontal padding.

mod arguments;
mod plan;
mod quantization;
mod validate;

use crate::build_options::BuildOptions;
use crate::device::{
    add_4d_tensor_argument, enqueue, CommandQueue, CompileContext, ComputeDevice, DeviceCaps,
    KernelHandle, NdRange,
};
use crate::error::{KernelError, KernelResult};
use crate::tensor::{DeviceTensor, TensorInfo, TensorPack, TensorRole, ValidRegion};
use crate::tuning::LwsTuner;
use crate::window::{validate_subwindow, Window};

use super::KernelStateTag;

pub use arguments::{build_options, config_id, ScalarPaddings};
pub use plan::{
    input1_right_padding, input2_left_padding, input2_right_padding,
    validate_and_configure_window, NUM_ELEMS_PROCESSED_PER_ITERATION,
};
pub use quantization::{resolve_requantization, RequantizationParams};
pub use validate::validate_arguments;

/// Name of the device routine compiled for this kernel.
pub const KERNEL_NAME: &str = "concatenate_width_x2";

/// Checks whether `configure` would accept these descriptors on a device with
/// `caps`. Never mutates anything.
///
/// Pass the capabilities of the device `configure` will compile on, i.e.
/// `context.device().caps()`. The output may be wider than `input1` plus
/// `input2` only up to the end of the chunk that follows input2's last column;
/// wider outputs fail with `Runtime` because input2's padding cannot cover
/// the reads.
pub fn validate(
    input1: &TensorInfo,
    input2: &TensorInfo,
    output: &TensorInfo,
    caps: &DeviceCaps,
) -> KernelResult<()> {
    validate_arguments(input1, input2, output, caps)?;
    validate_and_configure_window(&mut input1.clone(), &mut input2.clone(), &mut output.clone())
        .map(|_| ())
}

struct Configured<K> {
    kernel: K,
    window: Window,
    build_options: BuildOptions,
    config_id: String,
    lws_hint: Option<NdRange>,
}

pub struct ConcatenateWidthX2Kernel<K> {
    configured: Option<Configured<K>>,
}

impl<K: KernelHandle> ConcatenateWidthX2Kernel<K> {
    pub fn new() -> Self {
        Self { configured: None }
    }

    /// Plans, compiles and binds the kernel for these descriptors.
    ///
    /// On success the planned padding and the output's valid region are written
    /// back to the descriptors. On failure neither the descriptors nor the
    /// kernel state change.
    pub fn configure<D>(
        &mut self,
        context: &CompileContext<D>,
        input1: &mut TensorInfo,
        input2: &mut TensorInfo,
        output: &mut TensorInfo,
    ) -> KernelResult<()>
    where
        D: ComputeDevice<Kernel = K, Buffer = K::Buffer>,
    {
        validate_arguments(input1, input2, output, &context.device().caps())?;

        let options = build_options(input1, input2, output)?;
        let config_id = config_id(input1, input2);

        let mut planned1 = input1.clone();
        let mut planned2 = input2.clone();
        let mut planned_out = output.clone();
        let window = validate_and_configure_window(&mut planned1, &mut planned2, &mut planned_out)?;

        let mut kernel = context.create_kernel(KERNEL_NAME, &options)?;
        ScalarPaddings::for_input1(input1)?.bind(&mut kernel)?;

        planned_out.set_valid_region(ValidRegion::full(*planned_out.shape()));
        *input1 = planned1;
        *input2 = planned2;
        *output = planned_out;

        tracing::debug!(
            config_id = %config_id,
            window = ?window,
            options = ?options.options(),
            "configured concatenate_width_x2"
        );
        self.configured = Some(Configured {
            kernel,
            window,
            build_options: options,
            config_id,
            lws_hint: None,
        });
        Ok(())
    }

    pub fn state(&self) -> KernelStateTag {
        match self.configured {
            Some(_) => KernelStateTag::Configured,
            None => KernelStateTag::Unconfigured,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// Window planned by `configure`; callers run over it or sub-windows of it.
    pub fn window(&self) -> Option<&Window> {
        self.configured.as_ref().map(|c| &c.window)
    }

    pub fn config_id(&self) -> Option<&str> {
        self.configured.as_ref().map(|c| c.config_id.as_str())
    }

    pub fn build_options(&self) -> Option<&BuildOptions> {
        self.configured.as_ref().map(|c| &c.build_options)
    }

    pub fn lws_hint(&self) -> Option<NdRange> {
        self.configured.as_ref().and_then(|c| c.lws_hint)
    }

    pub fn set_lws_hint(&mut self, lws: Option<NdRange>) -> KernelResult<()> {
        self.configured_mut()?.lws_hint = lws;
        Ok(())
    }

    /// Applies the local size stored for this configuration, if any.
    pub fn tune(&mut self, tuner: &LwsTuner) -> KernelResult<bool> {
        let configured = self.configured_mut()?;
        match tuner.lookup(&configured.config_id) {
            Some(lws) => {
                configured.lws_hint = Some(lws);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Enqueues one launch per 4D slice of `window`.
    pub fn run_op<Q>(
        &mut self,
        tensors: &TensorPack<'_, K::Buffer>,
        window: &Window,
        queue: &mut Q,
    ) -> KernelResult<()>
    where
        Q: CommandQueue<Kernel = K>,
    {
        let configured = self.configured_mut()?;
        validate_subwindow(&configured.window, window)?;

        let src0 = bound_tensor(tensors, TensorRole::SrcVec(0))?;
        let src1 = bound_tensor(tensors, TensorRole::SrcVec(1))?;
        let dst = bound_tensor(tensors, TensorRole::Dst)?;

        let mut slice = window.first_slice_window_4d();
        let mut launches = 0usize;
        loop {
            let mut idx = 0;
            add_4d_tensor_argument(&mut idx, &mut configured.kernel, src0, &slice)?;
            add_4d_tensor_argument(&mut idx, &mut configured.kernel, src1, &slice)?;
            add_4d_tensor_argument(&mut idx, &mut configured.kernel, dst, &slice)?;
            enqueue(queue, &configured.kernel, &slice, configured.lws_hint)?;
            launches += 1;
            if !window.slide_window_slice_4d(&mut slice) {
                break;
            }
        }
        tracing::trace!(config_id = %configured.config_id, launches, "run_op");
        Ok(())
    }

    fn configured_mut(&mut self) -> KernelResult<&mut Configured<K>> {
        self.configured.as_mut().ok_or_else(|| {
            KernelError::precondition(format!("{KERNEL_NAME} kernel is not configured"))
        })
    }
}

impl<K: KernelHandle> Default for ConcatenateWidthX2Kernel<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn bound_tensor<'a, B>(
    tensors: &TensorPack<'a, B>,
    role: TensorRole,
) -> KernelResult<&'a DeviceTensor<B>> {
    tensors
        .get(role)
        .ok_or_else(|| KernelError::precondition(format!("no tensor bound for {role:?}")))
}
