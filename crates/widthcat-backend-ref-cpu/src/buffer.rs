use std::sync::{Arc, Mutex, MutexGuard};

use widthcat::error::{KernelError, KernelResult};
use widthcat::tensor::{TensorInfo, MAX_DIMS};

/// Plain values that can live in a [`HostBuffer`] as little-endian bytes.
pub trait Element: Copy + PartialEq + std::fmt::Debug {
    const SIZE: usize;

    fn write_le(self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, f32);

struct Storage {
    bytes: Vec<u8>,
    writes: Vec<u32>,
}

/// Shared byte storage standing in for a device allocation.
///
/// Clones alias the same storage. Kernel stores bump a per-byte write counter;
/// host-side initialisation through [`HostBuffer::upload`] does not.
#[derive(Clone)]
pub struct HostBuffer {
    storage: Arc<Mutex<Storage>>,
}

impl HostBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            storage: Arc::new(Mutex::new(Storage {
                bytes: vec![0; len],
                writes: vec![0; len],
            })),
        }
    }

    /// Allocation large enough for `info`, padding included.
    pub fn allocate(info: &TensorInfo) -> Self {
        Self::zeroed(info.total_size())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|storage| storage.bytes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `len` bytes starting at `offset`.
    pub fn read(&self, offset: i64, len: usize) -> KernelResult<Vec<u8>> {
        let storage = self.lock()?;
        let range = checked_range(offset, len, storage.bytes.len(), "read")?;
        Ok(storage.bytes[range].to_vec())
    }

    /// Stores `data` at `offset` as a kernel would, counting each byte written.
    pub fn write(&self, offset: i64, data: &[u8]) -> KernelResult<()> {
        let mut storage = self.lock()?;
        let range = checked_range(offset, data.len(), storage.bytes.len(), "write")?;
        storage.bytes[range.clone()].copy_from_slice(data);
        for count in &mut storage.writes[range] {
            *count += 1;
        }
        Ok(())
    }

    /// Host-side copy of `values` into the logical region of `info`, in
    /// x-fastest order. Padding is left untouched.
    pub fn upload<T: Element>(&self, info: &TensorInfo, values: &[T]) -> KernelResult<()> {
        check_element::<T>(info)?;
        let offsets = logical_offsets(info);
        if offsets.len() != values.len() {
            return Err(KernelError::invalid_argument(format!(
                "expected {} values, got {}",
                offsets.len(),
                values.len()
            )));
        }
        let mut storage = self.lock()?;
        for (offset, value) in offsets.into_iter().zip(values) {
            let end = offset + T::SIZE;
            if end > storage.bytes.len() {
                let capacity = storage.bytes.len();
                return Err(out_of_bounds("upload", offset as i64, T::SIZE, capacity));
            }
            value.write_le(&mut storage.bytes[offset..end]);
        }
        Ok(())
    }

    /// Logical region of `info` in x-fastest order.
    pub fn download<T: Element>(&self, info: &TensorInfo) -> KernelResult<Vec<T>> {
        check_element::<T>(info)?;
        let storage = self.lock()?;
        logical_offsets(info)
            .into_iter()
            .map(|offset| {
                let end = offset + T::SIZE;
                storage
                    .bytes
                    .get(offset..end)
                    .map(T::read_le)
                    .ok_or_else(|| {
                        out_of_bounds("download", offset as i64, T::SIZE, storage.bytes.len())
                    })
            })
            .collect()
    }

    /// Number of kernel stores that touched each logical element of `info`.
    ///
    /// An element counts as written `n` times only if all of its bytes were.
    pub fn element_write_counts(&self, info: &TensorInfo) -> KernelResult<Vec<u32>> {
        let size = info.element_size();
        let storage = self.lock()?;
        logical_offsets(info)
            .into_iter()
            .map(|offset| {
                storage
                    .writes
                    .get(offset..offset + size)
                    .and_then(|counts| counts.iter().min().copied())
                    .ok_or_else(|| {
                        out_of_bounds("count", offset as i64, size, storage.writes.len())
                    })
            })
            .collect()
    }

    fn lock(&self) -> KernelResult<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| KernelError::device("host buffer mutex poisoned"))
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer").field("len", &self.len()).finish()
    }
}

fn check_element<T: Element>(info: &TensorInfo) -> KernelResult<()> {
    if info.element_size() != T::SIZE {
        return Err(KernelError::invalid_argument(format!(
            "element of {} bytes does not match {} ({} bytes)",
            T::SIZE,
            info.dtype().name(),
            info.element_size()
        )));
    }
    Ok(())
}

fn checked_range(
    offset: i64,
    len: usize,
    capacity: usize,
    what: &str,
) -> KernelResult<std::ops::Range<usize>> {
    let start = usize::try_from(offset).map_err(|_| out_of_bounds(what, offset, len, capacity))?;
    let end = start + len;
    if end > capacity {
        return Err(out_of_bounds(what, offset, len, capacity));
    }
    Ok(start..end)
}

fn out_of_bounds(what: &str, offset: i64, len: usize, capacity: usize) -> KernelError {
    KernelError::device(format!(
        "{what} of {len} bytes at offset {offset} is outside a buffer of {capacity} bytes"
    ))
}

/// Byte offsets of every logical element of `info`, x fastest.
pub fn logical_offsets(info: &TensorInfo) -> Vec<usize> {
    let shape: Vec<usize> = (0..MAX_DIMS).map(|axis| info.dimension(axis)).collect();
    let total: usize = shape.iter().product();
    let mut offsets = Vec::with_capacity(total);
    let mut coords = [0usize; MAX_DIMS];
    for _ in 0..total {
        offsets.push(info.offset_of(&coords));
        for axis in 0..MAX_DIMS {
            coords[axis] += 1;
            if coords[axis] < shape[axis] {
                break;
            }
            coords[axis] = 0;
        }
    }
    offsets
}
