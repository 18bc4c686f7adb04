//! Tensor descriptors consumed by kernel planning.
//!
//! Descriptors carry metadata only. Buffers live with the device that owns
//! them and are paired with a descriptor through [`DeviceTensor`].

mod dtype;
mod info;
mod shape;

pub use dtype::DType;
pub use info::{
    tensors_have_different_quantization_info, PaddingSize, QuantizationInfo, TensorInfo,
    ValidRegion,
};
pub use shape::{TensorShape, MAX_DIMS};

/// A device buffer together with the descriptor that lays it out.
#[derive(Debug, Clone)]
pub struct DeviceTensor<B> {
    pub info: TensorInfo,
    pub buffer: B,
}

impl<B> DeviceTensor<B> {
    pub fn new(info: TensorInfo, buffer: B) -> Self {
        Self { info, buffer }
    }
}

/// Role a tensor plays in a kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorRole {
    /// The n-th entry of a source vector.
    SrcVec(usize),
    Dst,
}

/// Tensors handed to a kernel run, looked up by role.
pub struct TensorPack<'a, B> {
    entries: Vec<(TensorRole, &'a DeviceTensor<B>)>,
}

impl<'a, B> TensorPack<'a, B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds or replaces the tensor bound to `role`.
    pub fn add(&mut self, role: TensorRole, tensor: &'a DeviceTensor<B>) {
        self.entries.retain(|(existing, _)| *existing != role);
        self.entries.push((role, tensor));
    }

    pub fn with(mut self, role: TensorRole, tensor: &'a DeviceTensor<B>) -> Self {
        self.add(role, tensor);
        self
    }

    pub fn get(&self, role: TensorRole) -> Option<&'a DeviceTensor<B>> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == role)
            .map(|(_, tensor)| *tensor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<B> Default for TensorPack<'_, B> {
    fn default() -> Self {
        Self::new()
    }
}
