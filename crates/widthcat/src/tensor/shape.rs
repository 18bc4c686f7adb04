use std::fmt;

use crate::error::{KernelError, KernelResult};

/// Maximum number of dimensions a descriptor can store.
pub const MAX_DIMS: usize = 6;

/// Logical tensor extents, innermost (width) first.
///
/// Dimensions past `num_dimensions` read as 1. Trailing unit dimensions do not
/// count towards `num_dimensions`, so `[8, 4, 1]` is a 2-dimensional shape.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape {
    dims: [usize; MAX_DIMS],
    num_dimensions: usize,
}

impl TensorShape {
    pub fn new(dims: &[usize]) -> KernelResult<Self> {
        if dims.len() > MAX_DIMS {
            return Err(KernelError::invalid_argument(format!(
                "shape rank {} exceeds the supported maximum of {MAX_DIMS}",
                dims.len()
            )));
        }
        let mut stored = [1usize; MAX_DIMS];
        stored[..dims.len()].copy_from_slice(dims);
        let mut shape = Self {
            dims: stored,
            num_dimensions: dims.len(),
        };
        shape.apply_dimension_correction();
        Ok(shape)
    }

    /// Extent of `axis`; axes past the stored rank are 1.
    pub fn dim(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.num_dimensions]
    }

    fn apply_dimension_correction(&mut self) {
        while self.num_dimensions > 1 && self.dims[self.num_dimensions - 1] == 1 {
            self.num_dimensions -= 1;
        }
    }
}

impl fmt::Debug for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims())
    }
}
