use proptest::prelude::*;
use widthcat::tensor::{ValidRegion, MAX_DIMS};
use widthcat::window::{DIM_Y, DIM_Z};
use widthcat::{
    CompileContext, ConcatenateWidthX2Kernel, DType, DeviceTensor, ErrorKind, Kernel,
    KernelStateTag, LwsTuner, NdRange, QuantizationInfo, TensorInfo, TensorPack, TensorRole,
    TensorShape, Window,
};
use widthcat_backend_ref_cpu::{Element, HostBuffer, HostDevice, HostKernel, HostQueue, HostTensor};

fn info(dims: &[usize], dtype: DType) -> TensorInfo {
    TensorInfo::new(TensorShape::new(dims).expect("shape"), dtype)
}

/// Row-wise concatenation of two logical tensors stored x-fastest.
fn expected_concat<T: Copy>(
    input1: &[T],
    width1: usize,
    input2: &[T],
    width2: usize,
    output_width: usize,
    rows: usize,
) -> Vec<Option<T>> {
    let mut expected = Vec::with_capacity(output_width * rows);
    for row in 0..rows {
        for x in 0..output_width {
            expected.push(if x < width1 {
                Some(input1[row * width1 + x])
            } else if x < width1 + width2 {
                Some(input2[row * width2 + x - width1])
            } else {
                None
            });
        }
    }
    expected
}

fn rows_of(info: &TensorInfo) -> usize {
    (1..MAX_DIMS).map(|axis| info.dimension(axis)).product()
}

struct Setup {
    kernel: ConcatenateWidthX2Kernel<HostKernel>,
    tensors: [HostTensor; 3],
}

impl Setup {
    fn configure(input1: TensorInfo, input2: TensorInfo, output: TensorInfo) -> Self {
        let context = CompileContext::new(HostDevice::new());
        let (mut input1, mut input2, mut output) = (input1, input2, output);
        let mut kernel = ConcatenateWidthX2Kernel::new();
        kernel
            .configure(&context, &mut input1, &mut input2, &mut output)
            .expect("configure");
        let tensors = [input1, input2, output].map(|info| {
            let buffer = HostBuffer::allocate(&info);
            DeviceTensor::new(info, buffer)
        });
        Self { kernel, tensors }
    }

    fn upload<T: Element>(&self, input1: &[T], input2: &[T]) {
        self.tensors[0]
            .buffer
            .upload(&self.tensors[0].info, input1)
            .expect("upload input1");
        self.tensors[1]
            .buffer
            .upload(&self.tensors[1].info, input2)
            .expect("upload input2");
    }

    fn run(&mut self, window: &Window) -> widthcat::KernelResult<usize> {
        let pack = TensorPack::new()
            .with(TensorRole::SrcVec(0), &self.tensors[0])
            .with(TensorRole::SrcVec(1), &self.tensors[1])
            .with(TensorRole::Dst, &self.tensors[2]);
        let mut queue = HostQueue::new();
        self.kernel.run_op(&pack, window, &mut queue)?;
        assert!(queue.completed().is_empty(), "enqueue must not execute");
        queue.finish()
    }

    fn full_window(&self) -> Window {
        *self.kernel.window().expect("configured window")
    }

    fn output<T: Element>(&self) -> Vec<T> {
        self.tensors[2]
            .buffer
            .download(&self.tensors[2].info)
            .expect("download output")
    }

    fn output_write_counts(&self) -> Vec<u32> {
        self.tensors[2]
            .buffer
            .element_write_counts(&self.tensors[2].info)
            .expect("write counts")
    }
}

fn assert_concatenated<T>(actual: &[T], expected: &[Option<T>])
where
    T: Copy + PartialEq + std::fmt::Debug,
{
    assert_eq!(actual.len(), expected.len());
    for (index, (got, want)) in actual.iter().zip(expected).enumerate() {
        if let Some(want) = want {
            assert_eq!(got, want, "element {index}");
        }
    }
}

#[test]
fn concatenates_misaligned_f32_rows() {
    let input1: Vec<f32> = (0..80).map(|v| 1000.0 + v as f32).collect();
    let input2: Vec<f32> = (0..40).map(|v| 2000.0 + v as f32).collect();
    let mut setup = Setup::configure(
        info(&[20, 4], DType::F32),
        info(&[10, 4], DType::F32),
        info(&[30, 4], DType::F32),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    assert_eq!(setup.run(&window).expect("run"), 1);

    let expected = expected_concat(&input1, 20, &input2, 10, 30, 4);
    assert_concatenated(&setup.output::<f32>(), &expected);
    assert!(setup.output_write_counts().iter().all(|count| *count == 1));
}

#[test]
fn concatenates_four_dimensional_tensors() {
    let input1: Vec<i32> = (0..13 * 12).collect();
    let input2: Vec<i32> = (0..7 * 12).map(|v| -1 - v).collect();
    let mut setup = Setup::configure(
        info(&[13, 3, 2, 2], DType::Si32),
        info(&[7, 3, 2, 2], DType::Si32),
        info(&[20, 3, 2, 2], DType::Si32),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    setup.run(&window).expect("run");

    let expected = expected_concat(&input1, 13, &input2, 7, 20, 12);
    assert_concatenated(&setup.output::<i32>(), &expected);
    assert!(setup.output_write_counts().iter().all(|count| *count == 1));
}

#[test]
fn wider_output_keeps_the_concatenated_prefix() {
    let input1: Vec<u8> = (0..15).collect();
    let input2: Vec<u8> = (100..118).collect();
    let mut setup = Setup::configure(
        info(&[5, 3], DType::Ui8),
        info(&[6, 3], DType::Ui8),
        info(&[16, 3], DType::Ui8),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    setup.run(&window).expect("run");

    let expected = expected_concat(&input1, 5, &input2, 6, 16, 3);
    assert_concatenated(&setup.output::<u8>(), &expected);
    assert!(setup.output_write_counts().iter().all(|count| *count == 1));
}

#[test]
fn requantizes_inputs_with_different_scales() {
    let q_out = QuantizationInfo::new(0.125, 0);
    let input1: Vec<u8> = (0..8).collect();
    let input2: Vec<u8> = (0..8).map(|v| v * 20).collect();
    let mut setup = Setup::configure(
        info(&[8, 1], DType::QAsymm8).with_quantization(q_out),
        info(&[8, 1], DType::QAsymm8).with_quantization(QuantizationInfo::new(0.25, 0)),
        info(&[16, 1], DType::QAsymm8).with_quantization(q_out),
    );
    assert!(setup
        .kernel
        .build_options()
        .expect("configured")
        .contains("SCALE_IN2"));
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    setup.run(&window).expect("run");

    let mut expected: Vec<u8> = input1.clone();
    expected.extend(input2.iter().map(|v| (u32::from(*v) * 2).min(255) as u8));
    assert_eq!(setup.output::<u8>(), expected);
}

#[test]
fn requantizes_signed_values_with_offsets() {
    let input1: Vec<i8> = vec![-128, -10, 0, 10, 127, 3];
    let input2: Vec<i8> = vec![-100, -1, 0, 1, 100, 50];
    let mut setup = Setup::configure(
        info(&[3, 2], DType::QAsymm8Signed).with_quantization(QuantizationInfo::new(1.0, 10)),
        info(&[3, 2], DType::QAsymm8Signed).with_quantization(QuantizationInfo::new(0.5, -4)),
        info(&[6, 2], DType::QAsymm8Signed).with_quantization(QuantizationInfo::new(1.0, 0)),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    setup.run(&window).expect("run");

    let rescale = |q: i8, scale: f32, offset: f32| -> i8 {
        ((f32::from(q) - offset) * scale / 1.0)
            .round_ties_even()
            .clamp(-128.0, 127.0) as i8
    };
    let mut expected = Vec::new();
    for row in 0..2 {
        for x in 0..3 {
            expected.push(rescale(input1[row * 3 + x], 1.0, 10.0));
        }
        for x in 0..3 {
            expected.push(rescale(input2[row * 3 + x], 0.5, -4.0));
        }
    }
    assert_eq!(setup.output::<i8>(), expected);
}

#[test]
fn requantization_rounds_ties_to_even() {
    let q_out = QuantizationInfo::new(0.5, 0);
    let input1: Vec<u8> = vec![9; 8];
    let input2: Vec<u8> = (0..8).collect();
    let mut setup = Setup::configure(
        info(&[8, 1], DType::QAsymm8).with_quantization(q_out),
        info(&[8, 1], DType::QAsymm8).with_quantization(QuantizationInfo::new(0.25, 0)),
        info(&[16, 1], DType::QAsymm8).with_quantization(q_out),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    setup.run(&window).expect("run");

    let output = setup.output::<u8>();
    assert_eq!(&output[..8], &input1[..]);
    assert_eq!(&output[8..], &[0, 0, 1, 2, 2, 2, 3, 4]);
}

#[test]
fn offset_batches_are_written_when_the_window_stays_uncollapsed() {
    let mut output = info(&[8, 2, 2, 3], DType::F32);
    output.set_valid_region(ValidRegion {
        anchor: [0, 0, 0, 1, 0, 0],
        shape: TensorShape::new(&[8, 2, 2, 2]).expect("shape"),
    });
    let input1: Vec<f32> = (0..5 * 12).map(|v| v as f32).collect();
    let input2: Vec<f32> = (0..3 * 12).map(|v| -1.0 - v as f32).collect();
    let mut setup = Setup::configure(
        info(&[5, 2, 2, 3], DType::F32),
        info(&[3, 2, 2, 3], DType::F32),
        output,
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    assert_eq!(window.dimension(3).start(), 1);
    setup.run(&window).expect("run");

    let rows_per_batch = 4;
    let expected = expected_concat(&input1, 5, &input2, 3, 8, 12);
    let actual = setup.output::<f32>();
    let counts = setup.output_write_counts();
    for (index, want) in expected.iter().enumerate() {
        let batch = index / 8 / rows_per_batch;
        if batch == 0 {
            assert_eq!(counts[index], 0, "element {index} is outside the window");
        } else {
            assert_eq!(counts[index], 1, "element {index}");
            assert_eq!(Some(actual[index]), *want, "element {index}");
        }
    }
}

#[test]
fn outputs_reaching_past_input2_padding_are_rejected() {
    let context = CompileContext::new(HostDevice::new());
    let mut kernel = ConcatenateWidthX2Kernel::<HostKernel>::new();
    let err = kernel
        .configure(
            &context,
            &mut info(&[20, 2], DType::F32),
            &mut info(&[10, 2], DType::F32),
            &mut info(&[48, 2], DType::F32),
        )
        .expect_err("input2 cannot be padded for a 48 wide output");
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(kernel.state(), KernelStateTag::Unconfigured);
}

#[test]
fn split_runs_write_every_element_once() {
    let input1: Vec<f32> = (0..13 * 12).map(|v| v as f32).collect();
    let input2: Vec<f32> = (0..7 * 12).map(|v| -(v as f32)).collect();
    let mut setup = Setup::configure(
        info(&[13, 3, 2, 2], DType::F32),
        info(&[7, 3, 2, 2], DType::F32),
        info(&[20, 3, 2, 2], DType::F32),
    );
    setup.upload(&input1, &input2);

    let window = setup.full_window();
    for id in 0..3 {
        let rows = window.split_window(DIM_Y, id, 3);
        for depth in 0..2 {
            setup.run(&rows.split_window(DIM_Z, depth, 2)).expect("run part");
        }
    }

    let expected = expected_concat(&input1, 13, &input2, 7, 20, 12);
    assert_concatenated(&setup.output::<f32>(), &expected);
    assert!(setup.output_write_counts().iter().all(|count| *count == 1));
}

#[test]
fn buffers_allocated_before_configure_are_too_small() {
    let context = CompileContext::new(HostDevice::new());
    let unpadded = info(&[20, 4], DType::F32);
    let stale = HostBuffer::allocate(&unpadded);

    let mut input1 = unpadded.clone();
    let mut input2 = info(&[10, 4], DType::F32);
    let mut output = info(&[30, 4], DType::F32);
    let mut kernel = ConcatenateWidthX2Kernel::new();
    kernel
        .configure(&context, &mut input1, &mut input2, &mut output)
        .expect("configure");

    let src0 = DeviceTensor::new(input1, stale);
    let src1 = DeviceTensor::new(input2.clone(), HostBuffer::allocate(&input2));
    let dst = DeviceTensor::new(output.clone(), HostBuffer::allocate(&output));
    let pack = TensorPack::new()
        .with(TensorRole::SrcVec(0), &src0)
        .with(TensorRole::SrcVec(1), &src1)
        .with(TensorRole::Dst, &dst);
    let mut queue = HostQueue::new();
    let window = *kernel.window().expect("window");
    kernel.run_op(&pack, &window, &mut queue).expect("enqueue");

    let err = queue.finish().expect_err("out of bounds read");
    assert_eq!(err.kind(), ErrorKind::Device);
}

#[test]
fn host_device_rejects_unknown_kernels_and_partial_requantization() {
    use widthcat::device::ComputeDevice;

    let device = HostDevice::new();
    let mut options = widthcat::BuildOptions::new();
    options.define("DATA_TYPE", "uchar");
    options.define("VEC_SIZE", 8);
    options.define("DEPTH", 1);
    options.define("INPUT1_WIDTH", 8);
    options.define("ELEMENT_SIZE", 1);
    assert!(device.create_kernel("concatenate_width_x2", &options).is_ok());
    assert!(device.create_kernel("concatenate_height_x2", &options).is_err());

    let mut wrong_size = options.clone();
    wrong_size.define("ELEMENT_SIZE", 4);
    assert!(device.create_kernel("concatenate_width_x2", &wrong_size).is_err());

    options.define_float("SCALE_IN1", 0.5);
    let err = device
        .create_kernel("concatenate_width_x2", &options)
        .expect_err("five constants missing");
    assert_eq!(err.kind(), ErrorKind::Device);
}

#[test]
fn dispatch_and_tuning_drive_the_host_device() {
    let context = CompileContext::new(HostDevice::new());
    let mut input1 = info(&[16, 4], DType::F32);
    let mut input2 = info(&[8, 4], DType::F32);
    let mut output = info(&[24, 4], DType::F32);

    let mut kernel = Kernel::<HostKernel>::create("concatenate_width_x2").expect("registered");
    kernel
        .configure(&context, &mut [&mut input1, &mut input2], &mut output)
        .expect("configure");
    assert_eq!(kernel.state(), KernelStateTag::Configured);

    let tuner = LwsTuner::in_memory();
    tuner
        .record("concatenate_width_x2_f32_16_4_8_4", NdRange::new(3, 2, 1))
        .expect("record");
    let Kernel::ConcatenateWidthX2(inner) = &mut kernel;
    assert!(inner.tune(&tuner).expect("configured"));

    let tensors = [input1, input2, output].map(|info| {
        let buffer = HostBuffer::allocate(&info);
        DeviceTensor::new(info, buffer)
    });
    let input1_values: Vec<f32> = (0..64).map(|v| v as f32).collect();
    let input2_values: Vec<f32> = (0..32).map(|v| 0.5 * v as f32).collect();
    tensors[0]
        .buffer
        .upload(&tensors[0].info, &input1_values)
        .expect("upload");
    tensors[1]
        .buffer
        .upload(&tensors[1].info, &input2_values)
        .expect("upload");

    let pack = TensorPack::new()
        .with(TensorRole::SrcVec(0), &tensors[0])
        .with(TensorRole::SrcVec(1), &tensors[1])
        .with(TensorRole::Dst, &tensors[2]);
    let window = *kernel.window().expect("window");
    let mut queue = HostQueue::new();
    kernel.run_op(&pack, &window, &mut queue).expect("run");
    assert_eq!(queue.pending()[0].local, Some(NdRange::new(3, 2, 1)));
    queue.finish().expect("finish");

    let output: Vec<f32> = tensors[2]
        .buffer
        .download(&tensors[2].info)
        .expect("download");
    let expected = expected_concat(&input1_values, 16, &input2_values, 8, 24, 4);
    assert_concatenated(&output, &expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_output_element_is_written_once(
        width1 in 1usize..30,
        width2 in 1usize..30,
        round_up in any::<bool>(),
        height in 1usize..4,
        depth in 1usize..3,
        batch in 1usize..3,
    ) {
        // Input2's right padding only reaches the chunk after its last column,
        // so a wider output may at most round up to that boundary.
        let output_width = if round_up {
            (width1 + width2).div_ceil(8) * 8
        } else {
            width1 + width2
        };
        let rows = height * depth * batch;
        let input1: Vec<u16> = (0..width1 * rows).map(|v| v as u16).collect();
        let input2: Vec<u16> = (0..width2 * rows).map(|v| 30_000 + v as u16).collect();
        let mut setup = Setup::configure(
            info(&[width1, height, depth, batch], DType::Ui16),
            info(&[width2, height, depth, batch], DType::Ui16),
            info(&[output_width, height, depth, batch], DType::Ui16),
        );
        prop_assert_eq!(rows_of(&setup.tensors[2].info), rows);
        setup.upload(&input1, &input2);

        let window = setup.full_window();
        setup.run(&window).expect("run");

        let expected = expected_concat(&input1, width1, &input2, width2, output_width, rows);
        let actual = setup.output::<u16>();
        for (got, want) in actual.iter().zip(&expected) {
            if let Some(want) = want {
                prop_assert_eq!(got, want);
            }
        }
        prop_assert!(setup.output_write_counts().iter().all(|count| *count == 1));
    }
}
