//! Access patterns: which part of a tensor a window reads or writes.
//!
//! Merging patterns into a window either grows the padding of descriptors whose
//! allocation is still resizable, or shrinks the window to stay inside the
//! padding a committed descriptor already declares.

use crate::helpers::{adjust_down, adjust_up};
use crate::tensor::{PaddingSize, TensorInfo, MAX_DIMS};
use crate::window::{Dimension, Window, DIM_X, DIM_Y};

/// Region touched by a kernel, relative to a tensor's first element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    /// Fixed rectangle `[start_x, end_x) x [start_y, end_y)`, independent of the window.
    Static {
        start_x: i64,
        start_y: i64,
        end_x: i64,
        end_y: i64,
    },
    /// `width` elements along x per window step, starting at `x`. Rows follow the window.
    Horizontal { x: i64, width: i64 },
}

/// Bounding box, in elements, of the accesses one pattern performs over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
}

impl AccessPattern {
    pub fn fixed(start_x: i64, start_y: i64, end_x: i64, end_y: i64) -> Self {
        AccessPattern::Static {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn horizontal(x: i64, width: i64) -> Self {
        AccessPattern::Horizontal { x, width }
    }

    fn extent(&self, window: &Window) -> Extent {
        match *self {
            AccessPattern::Static {
                start_x,
                start_y,
                end_x,
                end_y,
            } => Extent {
                min_x: start_x,
                max_x: end_x,
                min_y: start_y,
                max_y: end_y,
            },
            AccessPattern::Horizontal { x, width } => {
                let wx = window.x();
                let wy = window.y();
                Extent {
                    min_x: wx.start() + x,
                    max_x: wx.end() - wx.step() + x + width,
                    min_y: wy.start(),
                    max_y: wy.end() - wy.step() + 1,
                }
            }
        }
    }

    /// Padding `info` needs so that every access over `window` stays inside the allocation.
    pub fn required_padding(&self, window: &Window, info: &TensorInfo) -> PaddingSize {
        let extent = self.extent(window);
        let width = info.dimension(0) as i64;
        let height = info.dimension(1) as i64;
        PaddingSize::new(
            (-extent.min_y).max(0) as usize,
            (extent.max_x - width).max(0) as usize,
            (extent.max_y - height).max(0) as usize,
            (-extent.min_x).max(0) as usize,
        )
    }

    /// Shrinks `window` so accesses stay within `info`'s declared padding.
    ///
    /// Only committed descriptors constrain the window. Returns `true` if the
    /// window changed.
    pub fn update_window_if_needed(&self, window: &mut Window, info: &TensorInfo) -> bool {
        if info.is_resizable() {
            return false;
        }
        let extent = self.extent(window);
        let padding = info.padding();
        let min_x = -(padding.left as i64);
        let max_x = info.dimension(0) as i64 + padding.right as i64;
        let min_y = -(padding.top as i64);
        let max_y = info.dimension(1) as i64 + padding.bottom as i64;

        match self {
            // A fixed region cannot be trimmed by moving the window, so any
            // shortfall empties it.
            AccessPattern::Static { .. } => {
                let fits = extent.min_x >= min_x
                    && extent.max_x <= max_x
                    && extent.min_y >= min_y
                    && extent.max_y <= max_y;
                if !fits {
                    for axis in 0..MAX_DIMS {
                        window.set(axis, Dimension::new(0, 0, 1));
                    }
                }
                !fits
            }
            AccessPattern::Horizontal { .. } => {
                let changed_x =
                    shrink_dimension(window, DIM_X, min_x - extent.min_x, extent.max_x - max_x);
                let changed_y =
                    shrink_dimension(window, DIM_Y, min_y - extent.min_y, extent.max_y - max_y);
                changed_x || changed_y
            }
        }
    }

    /// Grows `info`'s padding to cover the accesses over `window`.
    ///
    /// Committed descriptors are left untouched. Returns `true` if the padding changed.
    pub fn update_padding_if_needed(&self, window: &Window, info: &mut TensorInfo) -> bool {
        if !info.is_resizable() {
            return false;
        }
        let required = self.required_padding(window, info);
        info.extend_padding(required)
    }
}

/// Moves the front of `axis` up by at least `below` and its back down by at
/// least `above`, staying on the step grid.
fn shrink_dimension(window: &mut Window, axis: usize, below: i64, above: i64) -> bool {
    let dim = *window.dimension(axis);
    let mut start = dim.start();
    let mut end = dim.end();
    if below > 0 {
        start = adjust_up(start, start + below, dim.step());
    }
    if above > 0 {
        end = adjust_down(end, end - above, dim.step());
    }
    if start == dim.start() && end == dim.end() {
        return false;
    }
    window.set(axis, Dimension::new(start, end.max(start), dim.step()));
    true
}

/// Merges every `(descriptor, pattern)` pair into `window`.
///
/// First each committed descriptor may shrink the window, then each resizable
/// descriptor grows its padding to cover the final window. Returns `true` if
/// the window had to shrink.
pub fn update_window_and_padding(
    window: &mut Window,
    accesses: &mut [(&mut TensorInfo, AccessPattern)],
) -> bool {
    let mut window_changed = false;
    for (info, pattern) in accesses.iter() {
        window_changed |= pattern.update_window_if_needed(window, info);
    }
    for (info, pattern) in accesses.iter_mut() {
        pattern.update_padding_if_needed(window, info);
    }
    window_changed
}
