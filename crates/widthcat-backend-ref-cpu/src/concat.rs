//! Host emulation of the `concatenate_width_x2` device routine.
//!
//! Every work item reproduces the accelerator's vector loads, optional
//! requantization, lane select and vector store, so out-of-bounds accesses
//! that padding should have covered surface as `Device` errors.

use widthcat::build_options::BuildOptions;
use widthcat::device::{num_arguments_per_4d_tensor, KernelArg, NdRange};
use widthcat::error::{KernelError, KernelResult};

use crate::buffer::HostBuffer;

/// Storage type named by the `DATA_TYPE` define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F16,
    F32,
}

impl StorageKind {
    fn from_device_name(name: &str) -> Option<Self> {
        Some(match name {
            "uchar" => StorageKind::U8,
            "char" => StorageKind::I8,
            "ushort" => StorageKind::U16,
            "short" => StorageKind::I16,
            "uint" => StorageKind::U32,
            "int" => StorageKind::I32,
            "half" => StorageKind::F16,
            "float" => StorageKind::F32,
            _ => return None,
        })
    }

    pub fn size(self) -> usize {
        match self {
            StorageKind::U8 | StorageKind::I8 => 1,
            StorageKind::U16 | StorageKind::I16 | StorageKind::F16 => 2,
            StorageKind::U32 | StorageKind::I32 | StorageKind::F32 => 4,
        }
    }

    fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            StorageKind::U8 => Some((0, i64::from(u8::MAX))),
            StorageKind::I8 => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
            StorageKind::U16 => Some((0, i64::from(u16::MAX))),
            StorageKind::I16 => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            _ => None,
        }
    }

    fn load(self, bytes: &[u8]) -> i64 {
        match self {
            StorageKind::U8 => i64::from(bytes[0]),
            StorageKind::I8 => i64::from(bytes[0] as i8),
            StorageKind::U16 => i64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            StorageKind::I16 => i64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            _ => 0,
        }
    }

    fn store(self, value: i64, out: &mut [u8]) {
        match self {
            StorageKind::U8 | StorageKind::I8 => out[0] = value as u8,
            StorageKind::U16 | StorageKind::I16 => {
                out.copy_from_slice(&(value as u16).to_le_bytes())
            }
            _ => {}
        }
    }
}

/// `(offset, scale)` of one tensor in the requantization path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    pub offset: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Requantization {
    pub input1: AffineParams,
    pub input2: AffineParams,
    pub output: AffineParams,
}

/// `(q - offset_in) * scale_in / scale_out + offset_out`, rounded half to even and
/// saturated to `range`, in the order the device routine evaluates it.
fn requantize(value: i64, input: AffineParams, output: AffineParams, range: (i64, i64)) -> i64 {
    let rescaled = (value as f32 - input.offset) * input.scale / output.scale + output.offset;
    (rescaled.round_ties_even() as i64).clamp(range.0, range.1)
}

/// The routine specialised by its build options.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatProgram {
    pub storage: StorageKind,
    pub vec_size: usize,
    pub depth: usize,
    pub input1_width: usize,
    pub element_size: usize,
    pub requantization: Option<Requantization>,
}

const REQUANT_KEYS: [&str; 6] = [
    "OFFSET_IN1",
    "SCALE_IN1",
    "OFFSET_IN2",
    "SCALE_IN2",
    "OFFSET_OUT",
    "SCALE_OUT",
];

impl ConcatProgram {
    pub fn from_options(options: &BuildOptions) -> KernelResult<Self> {
        let data_type = required(options, "DATA_TYPE")?;
        let storage = StorageKind::from_device_name(data_type)
            .ok_or_else(|| KernelError::device(format!("unsupported DATA_TYPE '{data_type}'")))?;
        let program = Self {
            storage,
            vec_size: parse_usize(options, "VEC_SIZE")?,
            depth: parse_usize(options, "DEPTH")?,
            input1_width: parse_usize(options, "INPUT1_WIDTH")?,
            element_size: parse_usize(options, "ELEMENT_SIZE")?,
            requantization: parse_requantization(options)?,
        };
        if program.vec_size == 0 || program.depth == 0 {
            return Err(KernelError::device("VEC_SIZE and DEPTH must be non-zero"));
        }
        if program.element_size != storage.size() {
            return Err(KernelError::device(format!(
                "ELEMENT_SIZE {} does not match DATA_TYPE '{data_type}'",
                program.element_size
            )));
        }
        if program.requantization.is_some() && storage.integer_range().is_none() {
            return Err(KernelError::device(format!(
                "requantization is not available for DATA_TYPE '{data_type}'"
            )));
        }
        Ok(program)
    }

    /// Runs every work item of `global` against the bound `args`.
    pub fn execute(
        &self,
        args: &[Option<KernelArg<HostBuffer>>],
        global: NdRange,
    ) -> KernelResult<()> {
        let per_tensor = num_arguments_per_4d_tensor();
        let src1 = TensorArg::from_args(args, 0)?;
        let src2 = TensorArg::from_args(args, per_tensor)?;
        let dst = TensorArg::from_args(args, 2 * per_tensor)?;
        let pad_right = i64::from(scalar(args, 3 * per_tensor)?);
        let pad_left = i64::from(scalar(args, 3 * per_tensor + 1)?);

        let vec = self.vec_size as i64;
        let width1 = self.input1_width as i64;
        let depth = self.depth as i64;
        let esize = self.element_size;
        let mut values = vec![0u8; self.vec_size * esize];

        for gz in 0..global.z as i64 {
            let (z, w) = (gz % depth, gz / depth);
            for y in 0..global.y as i64 {
                for gx in 0..global.x as i64 {
                    let x = gx * vec;
                    let x1 = x.min(width1 + pad_right - vec);
                    let x2 = (x - width1).max(-pad_left);

                    let chunk = values.len();
                    let src1_values = src1.buffer.read(src1.address(x1, y, z, w), chunk)?;
                    let src2_values = src2.buffer.read(src2.address(x2, y, z, w), chunk)?;

                    for lane in 0..self.vec_size {
                        let from_input1 = x + (lane as i64) < width1;
                        let bytes = lane * esize..(lane + 1) * esize;
                        let (source, params) = if from_input1 {
                            let params = self.requantization.map(|r| r.input1);
                            (&src1_values[bytes.clone()], params)
                        } else {
                            let params = self.requantization.map(|r| r.input2);
                            (&src2_values[bytes.clone()], params)
                        };
                        match (params, self.requantization, self.storage.integer_range()) {
                            (Some(params), Some(requant), Some(range)) => {
                                let value = requantize(
                                    self.storage.load(source),
                                    params,
                                    requant.output,
                                    range,
                                );
                                self.storage.store(value, &mut values[bytes]);
                            }
                            _ => values[bytes].copy_from_slice(source),
                        }
                    }

                    dst.buffer.write(dst.address(x, y, z, w), &values)?;
                }
            }
        }
        Ok(())
    }
}

/// One tensor's bound arguments: buffer, per-axis byte strides and first-element offset.
struct TensorArg<'a> {
    buffer: &'a HostBuffer,
    strides: [i64; 4],
    offset: i64,
}

impl<'a> TensorArg<'a> {
    fn from_args(args: &'a [Option<KernelArg<HostBuffer>>], first: usize) -> KernelResult<Self> {
        let buffer = match args.get(first) {
            Some(Some(KernelArg::Buffer(buffer))) => buffer,
            _ => {
                return Err(KernelError::device(format!(
                    "argument {first} is not a bound buffer"
                )))
            }
        };
        let mut strides = [0i64; 4];
        for (axis, stride) in strides.iter_mut().enumerate() {
            *stride = i64::from(scalar(args, first + 1 + 2 * axis)?);
        }
        let offset = i64::from(scalar(args, first + 9)?);
        Ok(Self {
            buffer,
            strides,
            offset,
        })
    }

    fn address(&self, x: i64, y: i64, z: i64, w: i64) -> i64 {
        self.offset
            + x * self.strides[0]
            + y * self.strides[1]
            + z * self.strides[2]
            + w * self.strides[3]
    }
}

fn scalar(args: &[Option<KernelArg<HostBuffer>>], index: usize) -> KernelResult<u32> {
    match args.get(index) {
        Some(Some(KernelArg::U32(value))) => Ok(*value),
        _ => Err(KernelError::device(format!(
            "argument {index} is not a bound u32 scalar"
        ))),
    }
}

fn required<'a>(options: &'a BuildOptions, key: &str) -> KernelResult<&'a str> {
    options
        .get(key)
        .ok_or_else(|| KernelError::device(format!("missing build option {key}")))
}

fn parse_usize(options: &BuildOptions, key: &str) -> KernelResult<usize> {
    let value = required(options, key)?;
    value
        .parse()
        .map_err(|_| KernelError::device(format!("build option {key}={value} is not an integer")))
}

fn parse_float(options: &BuildOptions, key: &str) -> KernelResult<f32> {
    let value = required(options, key)?;
    value
        .trim_end_matches('f')
        .parse()
        .map_err(|_| KernelError::device(format!("build option {key}={value} is not a number")))
}

fn parse_requantization(options: &BuildOptions) -> KernelResult<Option<Requantization>> {
    let present = REQUANT_KEYS.iter().filter(|key| options.contains(key)).count();
    if present == 0 {
        return Ok(None);
    }
    if present != REQUANT_KEYS.len() {
        return Err(KernelError::device(format!(
            "requantization needs all of {}",
            REQUANT_KEYS.join(", ")
        )));
    }
    let params = |offset: &str, scale: &str| -> KernelResult<AffineParams> {
        Ok(AffineParams {
            offset: parse_float(options, offset)?,
            scale: parse_float(options, scale)?,
        })
    };
    Ok(Some(Requantization {
        input1: params("OFFSET_IN1", "SCALE_IN1")?,
        input2: params("OFFSET_IN2", "SCALE_IN2")?,
        output: params("OFFSET_OUT", "SCALE_OUT")?,
    }))
}
