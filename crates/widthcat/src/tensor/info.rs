use serde::{Deserialize, Serialize};

use super::dtype::DType;
use super::shape::{TensorShape, MAX_DIMS};

/// Uniform affine quantization: `real = scale * (stored - offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantizationInfo {
    pub scale: f32,
    pub offset: i32,
}

impl QuantizationInfo {
    pub fn new(scale: f32, offset: i32) -> Self {
        Self { scale, offset }
    }
}

/// Padding around the two innermost dimensions, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PaddingSize {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl PaddingSize {
    pub fn new(top: usize, right: usize, bottom: usize, left: usize) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Only left/right padding.
    pub fn horizontal(left: usize, right: usize) -> Self {
        Self::new(0, right, 0, left)
    }

    /// Component-wise maximum of `self` and `other`.
    pub fn max(self, other: PaddingSize) -> PaddingSize {
        PaddingSize {
            top: self.top.max(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
            left: self.left.max(other.left),
        }
    }
}

/// Sub-region of a tensor holding meaningful data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRegion {
    pub anchor: [usize; MAX_DIMS],
    pub shape: TensorShape,
}

impl ValidRegion {
    pub fn full(shape: TensorShape) -> Self {
        Self {
            anchor: [0; MAX_DIMS],
            shape,
        }
    }
}

/// Metadata for one tensor: shape, element type, quantization and memory layout.
///
/// Descriptors are plain values. Planning that must not leave side effects
/// works on clones; committing a configuration writes the results back.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    shape: TensorShape,
    dtype: DType,
    quantization: Option<QuantizationInfo>,
    padding: PaddingSize,
    resizable: bool,
    valid_region: ValidRegion,
}

impl TensorInfo {
    /// Creates a resizable, unpadded descriptor whose valid region is the full shape.
    pub fn new(shape: TensorShape, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            quantization: None,
            padding: PaddingSize::default(),
            resizable: true,
            valid_region: ValidRegion::full(shape),
        }
    }

    pub fn with_quantization(mut self, quantization: QuantizationInfo) -> Self {
        self.quantization = Some(quantization);
        self
    }

    pub fn with_padding(mut self, padding: PaddingSize) -> Self {
        self.padding = padding;
        self
    }

    /// Marks the backing allocation as committed (`false`) or still growable (`true`).
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    pub fn dimension(&self, axis: usize) -> usize {
        self.shape.dim(axis)
    }

    pub fn num_dimensions(&self) -> usize {
        self.shape.num_dimensions()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn quantization(&self) -> Option<QuantizationInfo> {
        self.quantization
    }

    /// Uniform quantization, zeroed when the descriptor carries none.
    pub fn uniform_quantization(&self) -> QuantizationInfo {
        self.quantization.unwrap_or_default()
    }

    pub fn padding(&self) -> PaddingSize {
        self.padding
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn valid_region(&self) -> &ValidRegion {
        &self.valid_region
    }

    pub fn set_valid_region(&mut self, region: ValidRegion) {
        self.valid_region = region;
    }

    /// Element size in bytes, 0 for [`DType::Unknown`].
    pub fn element_size(&self) -> usize {
        self.dtype.size_in_bytes().unwrap_or(0)
    }

    /// Grows padding to cover `padding`. Returns `true` if anything changed.
    ///
    /// Committed (non-resizable) descriptors are never modified.
    pub fn extend_padding(&mut self, padding: PaddingSize) -> bool {
        if !self.resizable {
            return false;
        }
        let grown = self.padding.max(padding);
        let changed = grown != self.padding;
        self.padding = grown;
        changed
    }

    /// Byte strides of every stored dimension, accounting for padding.
    pub fn strides_in_bytes(&self) -> [usize; MAX_DIMS] {
        let mut strides = [0usize; MAX_DIMS];
        strides[0] = self.element_size();
        strides[1] = strides[0] * (self.padding.left + self.shape.dim(0) + self.padding.right);
        strides[2] = strides[1] * (self.padding.top + self.shape.dim(1) + self.padding.bottom);
        for axis in 3..MAX_DIMS {
            strides[axis] = strides[axis - 1] * self.shape.dim(axis - 1);
        }
        strides
    }

    /// Byte offset of element `(0, 0, ..)` from the start of the allocation.
    pub fn offset_first_element_in_bytes(&self) -> usize {
        let strides = self.strides_in_bytes();
        self.padding.top * strides[1] + self.padding.left * strides[0]
    }

    /// Bytes needed to back this descriptor, padding included.
    pub fn total_size(&self) -> usize {
        let strides = self.strides_in_bytes();
        strides[MAX_DIMS - 1] * self.shape.dim(MAX_DIMS - 1)
    }

    /// Byte offset of the element at `coords` (missing coordinates are 0).
    pub fn offset_of(&self, coords: &[usize]) -> usize {
        let strides = self.strides_in_bytes();
        coords
            .iter()
            .zip(strides.iter())
            .fold(self.offset_first_element_in_bytes(), |acc, (coord, stride)| {
                acc + coord * stride
            })
    }
}

/// Returns `true` if any input's quantization differs from the output's.
pub fn tensors_have_different_quantization_info(
    output: &TensorInfo,
    inputs: &[&TensorInfo],
) -> bool {
    inputs
        .iter()
        .any(|input| input.quantization() != output.quantization())
}
