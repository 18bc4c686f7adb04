#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use widthcat::device::{CommandQueue, ComputeDevice, DeviceCaps, KernelArg, KernelHandle, NdRange};
use widthcat::{BuildOptions, DType, DeviceTensor, KernelResult, TensorInfo, TensorShape};

/// Buffers are identified by an id so bound arguments can be asserted on.
pub type BufferId = u32;

#[derive(Debug, Clone)]
pub struct RecordingKernel {
    pub name: String,
    pub options: BuildOptions,
    pub args: BTreeMap<usize, KernelArg<BufferId>>,
}

impl RecordingKernel {
    pub fn u32_arg(&self, index: usize) -> Option<u32> {
        match self.args.get(&index) {
            Some(KernelArg::U32(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn buffer_arg(&self, index: usize) -> Option<BufferId> {
        match self.args.get(&index) {
            Some(KernelArg::Buffer(id)) => Some(*id),
            _ => None,
        }
    }
}

impl KernelHandle for RecordingKernel {
    type Buffer = BufferId;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_arg(&mut self, index: usize, arg: KernelArg<BufferId>) -> KernelResult<()> {
        self.args.insert(index, arg);
        Ok(())
    }
}

/// Test-only device that compiles nothing and counts compilations.
#[derive(Default)]
pub struct RecordingDevice {
    pub caps: DeviceCaps,
    compilations: AtomicUsize,
    compile_delay: Option<Duration>,
}

impl RecordingDevice {
    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self {
            caps,
            ..Self::default()
        }
    }

    /// Makes every compilation take at least `delay`, widening races between callers.
    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = Some(delay);
        self
    }

    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }
}

impl ComputeDevice for RecordingDevice {
    type Buffer = BufferId;
    type Kernel = RecordingKernel;

    fn name(&self) -> &str {
        "recording"
    }

    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn create_kernel(&self, name: &str, options: &BuildOptions) -> KernelResult<RecordingKernel> {
        self.compilations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.compile_delay {
            std::thread::sleep(delay);
        }
        Ok(RecordingKernel {
            name: name.to_string(),
            options: options.clone(),
            args: BTreeMap::new(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub kernel: RecordingKernel,
    pub global: NdRange,
    pub local: Option<NdRange>,
}

#[derive(Default)]
pub struct RecordingQueue {
    pub launches: Vec<RecordedLaunch>,
}

impl CommandQueue for RecordingQueue {
    type Kernel = RecordingKernel;

    fn enqueue(
        &mut self,
        kernel: &RecordingKernel,
        global: NdRange,
        local: Option<NdRange>,
    ) -> KernelResult<()> {
        self.launches.push(RecordedLaunch {
            kernel: kernel.clone(),
            global,
            local,
        });
        Ok(())
    }
}

pub fn info(dims: &[usize], dtype: DType) -> TensorInfo {
    TensorInfo::new(TensorShape::new(dims).expect("valid shape"), dtype)
}

pub fn f32_info(dims: &[usize]) -> TensorInfo {
    info(dims, DType::F32)
}

pub fn tensors(
    input1: &TensorInfo,
    input2: &TensorInfo,
    output: &TensorInfo,
) -> [DeviceTensor<BufferId>; 3] {
    [
        DeviceTensor::new(input1.clone(), 1),
        DeviceTensor::new(input2.clone(), 2),
        DeviceTensor::new(output.clone(), 3),
    ]
}
