//! Iteration windows over tensor coordinates.
//!
//! A [`Window`] holds one `[start, end)` range and a step per dimension. Kernels
//! are configured with a maximal window over their output and executed over
//! sub-windows of it, one 4D slice at a time.

use crate::error::{KernelError, KernelResult};
use crate::helpers::ceil_to_multiple;
use crate::tensor::{ValidRegion, MAX_DIMS};

pub const DIM_X: usize = 0;
pub const DIM_Y: usize = 1;
pub const DIM_Z: usize = 2;
pub const DIM_W: usize = 3;

/// Number of dimensions a slice covers when a kernel binds 4D tensor arguments.
pub const SLICE_DIMS_4D: usize = 4;

/// Range and step along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    start: i64,
    end: i64,
    step: i64,
}

impl Dimension {
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        debug_assert!(step > 0, "window step must be positive");
        Self { start, end, step }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn set_end(&mut self, end: i64) {
        self.end = end;
    }

    /// Number of steps needed to cover `[start, end)`.
    pub fn num_iterations(&self) -> i64 {
        if self.end <= self.start {
            return 0;
        }
        (self.end - self.start + self.step - 1) / self.step
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

/// Per-dimension steps used to build a maximal window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps([usize; MAX_DIMS]);

impl Steps {
    /// Steps for the leading dimensions; the rest step by 1.
    pub fn new(leading: &[usize]) -> Self {
        let mut steps = [1usize; MAX_DIMS];
        for (slot, step) in steps.iter_mut().zip(leading) {
            *slot = (*step).max(1);
        }
        Self(steps)
    }

    pub fn get(&self, axis: usize) -> usize {
        self.0[axis]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Window {
    dims: [Dimension; MAX_DIMS],
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(&self, axis: usize) -> &Dimension {
        &self.dims[axis]
    }

    pub fn set(&mut self, axis: usize, dimension: Dimension) {
        self.dims[axis] = dimension;
    }

    pub fn x(&self) -> &Dimension {
        &self.dims[DIM_X]
    }

    pub fn y(&self) -> &Dimension {
        &self.dims[DIM_Y]
    }

    pub fn z(&self) -> &Dimension {
        &self.dims[DIM_Z]
    }

    pub fn dims(&self) -> &[Dimension; MAX_DIMS] {
        &self.dims
    }

    pub fn num_iterations(&self, axis: usize) -> i64 {
        self.dims[axis].num_iterations()
    }

    pub fn num_iterations_total(&self) -> i64 {
        self.dims.iter().map(Dimension::num_iterations).product()
    }

    /// Largest window covering `region`, with the x and y extents rounded up to their steps.
    pub fn max_over(region: &ValidRegion, steps: &Steps) -> Self {
        let mut window = Window::new();
        for axis in 0..MAX_DIMS {
            let anchor = region.anchor[axis] as i64;
            let extent = region.shape.dim(axis);
            let step = steps.get(axis);
            let end = if axis <= DIM_Y {
                ceil_to_multiple(extent, step)
            } else {
                extent.max(1)
            };
            window.set(
                axis,
                Dimension::new(anchor, anchor + end as i64, step as i64),
            );
        }
        window
    }

    /// Merges dimensions `first..MAX_DIMS` into `first` when they cover the full window.
    ///
    /// Returns the collapsed window and whether collapsing happened.
    pub fn collapse_if_possible(&self, full: &Window, first: usize) -> (Window, bool) {
        let mut collapsible = true;
        let mut collapsed_end = self.dims[first].end;
        for axis in first + 1..MAX_DIMS {
            let dim = &self.dims[axis];
            collapsible = dim.start == 0
                && full.dims[axis].start == 0
                && dim.step <= 1
                && full.dims[axis].end == dim.end;
            if !collapsible {
                break;
            }
            collapsed_end *= dim.end;
        }
        if !collapsible {
            return (*self, false);
        }

        let mut collapsed = *self;
        collapsed.dims[first].set_end(collapsed_end);
        for axis in first + 1..MAX_DIMS {
            collapsed.dims[axis] = Dimension::default();
        }
        (collapsed, true)
    }

    /// First slice keeping the 4 innermost dimensions and one step of each outer one.
    pub fn first_slice_window_4d(&self) -> Window {
        let mut slice = *self;
        for axis in SLICE_DIMS_4D..MAX_DIMS {
            let start = self.dims[axis].start;
            slice.dims[axis] = Dimension::new(start, start + 1, 1);
        }
        slice
    }

    /// Advances `slice` to the next 4D slice. Returns `false` once past the last one.
    pub fn slide_window_slice_4d(&self, slice: &mut Window) -> bool {
        for axis in SLICE_DIMS_4D..MAX_DIMS {
            let next = slice.dims[axis].start + 1;
            if next < self.dims[axis].end {
                slice.dims[axis] = Dimension::new(next, next + 1, 1);
                for lower in SLICE_DIMS_4D..axis {
                    let start = self.dims[lower].start;
                    slice.dims[lower] = Dimension::new(start, start + 1, 1);
                }
                return true;
            }
        }
        false
    }

    /// Part `id` of `total` step-aligned chunks along `axis`.
    pub fn split_window(&self, axis: usize, id: usize, total: usize) -> Window {
        debug_assert!(total > 0 && id < total);
        let dim = self.dims[axis];
        let iterations = dim.num_iterations();
        let total = total as i64;
        let id = id as i64;
        let remainder = iterations % total;
        let mut work = iterations / total;
        let mut first_iteration = work * id;
        if id < remainder {
            work += 1;
            first_iteration += id;
        } else {
            first_iteration += remainder;
        }
        let start = dim.start + first_iteration * dim.step;
        let end = dim.end.min(start + work * dim.step);

        let mut out = *self;
        out.dims[axis] = Dimension::new(start, end.max(start), dim.step);
        out
    }

    /// Returns `true` if `self` lies inside `full` on its step grid.
    pub fn is_subwindow_of(&self, full: &Window) -> bool {
        self.dims.iter().zip(full.dims.iter()).all(|(sub, full)| {
            sub.start >= full.start
                && sub.end <= full.end
                && sub.step == full.step
                && (sub.start - full.start) % sub.step == 0
        })
    }
}

/// Fails with a precondition violation unless `sub` is a valid sub-window of `full`.
pub fn validate_subwindow(full: &Window, sub: &Window) -> KernelResult<()> {
    if !sub.is_subwindow_of(full) {
        return Err(KernelError::precondition(format!(
            "execution window {sub:?} is not a sub-window of the configured window {full:?}"
        )));
    }
    Ok(())
}
