//! N-dimensional shape algebra.
//!
//! Every array is logically right-padded with size-1 axes up to [`MAX_DIM`]
//! so that the chunk-grid walks in [`crate::array`] and [`crate::slice`] can
//! always iterate a fixed eight axes, regardless of the array's real
//! dimensionality.
//!
//! See <https://github.com/Blosc/caterva> for the C implementation this
//! algebra is adapted from.

use std::ops::{Index, Range};

/// Maximum supported dimensionality.
pub const MAX_DIM: usize = 8;

/// A shape, chunk shape, or index right-aligned to [`MAX_DIM`] axes.
///
/// Axes `0..MAX_DIM-ndim` hold the implicit size-1 padding; axes
/// `MAX_DIM-ndim..MAX_DIM` hold the real per-axis values, in the same order
/// as the user-visible shape (axis 0 is still the slowest-varying axis).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Dims8([i64; MAX_DIM]);

impl Default for Dims8 {
    fn default() -> Self {
        Self([1; MAX_DIM])
    }
}

impl Dims8 {
    /// Right-align `values` (of length `ndim <= MAX_DIM`) into a fresh
    /// [`Dims8`], padding the leading `MAX_DIM - ndim` axes with `1`.
    ///
    /// # Panics
    /// Panics if `values.len() > MAX_DIM`.
    #[must_use]
    pub fn right_align(values: &[i64]) -> Self {
        assert!(values.len() <= MAX_DIM, "dimensionality exceeds MAX_DIM");
        let mut out = [1i64; MAX_DIM];
        let offset = MAX_DIM - values.len();
        out[offset..].copy_from_slice(values);
        Self(out)
    }

    /// Build a [`Dims8`] directly from a full eight-element array.
    #[must_use]
    pub const fn from_array(values: [i64; MAX_DIM]) -> Self {
        Self(values)
    }

    /// The underlying eight-element array.
    #[must_use]
    pub const fn as_array(&self) -> &[i64; MAX_DIM] {
        &self.0
    }

    /// Return the last `ndim` axes as a `Vec`, i.e. undo [`Self::right_align`].
    #[must_use]
    pub fn trim(&self, ndim: usize) -> Vec<i64> {
        self.0[MAX_DIM - ndim..].to_vec()
    }

    /// Product of all eight axes.
    #[must_use]
    pub fn product(&self) -> i64 {
        self.0.iter().product()
    }

    /// Per-axis minimum.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        let mut out = [0i64; MAX_DIM];
        for i in 0..MAX_DIM {
            out[i] = self.0[i].min(other.0[i]);
        }
        Self(out)
    }
}

impl Index<usize> for Dims8 {
    type Output = i64;
    fn index(&self, index: usize) -> &i64 {
        &self.0[index]
    }
}

/// Compute the extended shape: `shape` rounded up per-axis to the nearest
/// multiple of `chunk_shape`.
#[must_use]
pub fn ext_shape_of(shape: &Dims8, chunk_shape: &Dims8) -> Dims8 {
    let mut out = [0i64; MAX_DIM];
    for i in 0..MAX_DIM {
        let s = shape[i];
        let p = chunk_shape[i];
        let rem = s % p;
        out[i] = if rem == 0 { s } else { s + p - rem };
    }
    Dims8(out)
}

/// Compute the chunk grid shape: `grid[i] = ext_shape[i] / chunk_shape[i]`.
#[must_use]
pub fn chunk_grid(ext_shape: &Dims8, chunk_shape: &Dims8) -> Dims8 {
    let mut out = [0i64; MAX_DIM];
    for i in 0..MAX_DIM {
        out[i] = ext_shape[i] / chunk_shape[i];
    }
    Dims8(out)
}

/// Decompose a linear chunk index into grid coordinates, axis 0
/// most-significant (mixed-radix, row-major).
///
/// Adapted from `zarrs`'s `unravel_index`.
#[must_use]
pub fn linear_to_grid(mut index: i64, grid: &Dims8) -> Dims8 {
    let mut out = [0i64; MAX_DIM];
    for i in (0..MAX_DIM).rev() {
        let dim = grid[i];
        out[i] = index % dim;
        index /= dim;
    }
    Dims8(out)
}

/// Inverse of [`linear_to_grid`]: ravel grid coordinates into a linear
/// chunk index. Adapted from `zarrs`'s `ravel_indices`.
#[must_use]
pub fn grid_to_linear(coords: &Dims8, grid: &Dims8) -> i64 {
    let mut index = 0i64;
    let mut count = 1i64;
    for i in (0..MAX_DIM).rev() {
        index += coords[i] * count;
        count *= grid[i];
    }
    index
}

/// Row-major element strides for a shape: `stride[MAX_DIM-1] = 1`,
/// `stride[i] = stride[i+1] * dims[i+1]`.
#[must_use]
pub fn elem_strides(dims: &Dims8) -> Dims8 {
    let mut out = [1i64; MAX_DIM];
    for i in (0..MAX_DIM - 1).rev() {
        out[i] = out[i + 1] * dims[i + 1];
    }
    Dims8(out)
}

/// Dot product of an index and a stride vector: the flat offset of `idx`
/// within a buffer shaped per `strides`.
#[must_use]
pub fn flat_offset(idx: &[i64; MAX_DIM], strides: &Dims8) -> i64 {
    (0..MAX_DIM).map(|i| idx[i] * strides[i]).sum()
}

/// Visit every point of the Cartesian product of `ranges[0..MAX_DIM-1]`
/// (axes `0..MAX_DIM-1`), calling `f` once per combination with the full
/// eight-element index. Axis `MAX_DIM-1` (the innermost axis) is left at
/// `ranges[MAX_DIM-1].start`; callers that want a contiguous span on that
/// axis read `ranges[MAX_DIM-1]` themselves and copy it as one run.
///
/// This is the dimension-generic replacement for the fixed 7-level nested
/// loop described by the padded import/export and slice algorithms: the
/// byte-level output is identical to an unrolled 7-deep loop, but expressed
/// as a single recursive walk.
///
/// If any of the outer seven ranges is empty, `f` is never called.
pub fn visit_lines<F: FnMut(&[i64; MAX_DIM])>(ranges: &[Range<i64>; MAX_DIM], mut f: F) {
    let mut idx = [0i64; MAX_DIM];
    idx[MAX_DIM - 1] = ranges[MAX_DIM - 1].start;
    visit_axis(0, ranges, &mut idx, &mut f);
}

/// Visit every point of the full eight-axis Cartesian product of `ranges`,
/// calling `f` once per combination. Unlike [`visit_lines`], the innermost
/// axis is iterated too rather than left for the caller to treat as a
/// contiguous span; used where a loop genuinely varies across all eight
/// axes, such as the outer touched-chunk walk in the slice engine.
///
/// If any range is empty, `f` is never called.
pub fn visit_points<F: FnMut(&[i64; MAX_DIM])>(ranges: &[Range<i64>; MAX_DIM], mut f: F) {
    let mut idx = [0i64; MAX_DIM];
    visit_point_axis(0, ranges, &mut idx, &mut f);
}

fn visit_point_axis<F: FnMut(&[i64; MAX_DIM])>(
    axis: usize,
    ranges: &[Range<i64>; MAX_DIM],
    idx: &mut [i64; MAX_DIM],
    f: &mut F,
) {
    if axis == MAX_DIM {
        f(idx);
        return;
    }
    for v in ranges[axis].clone() {
        idx[axis] = v;
        visit_point_axis(axis + 1, ranges, idx, f);
    }
}

fn visit_axis<F: FnMut(&[i64; MAX_DIM])>(
    axis: usize,
    ranges: &[Range<i64>; MAX_DIM],
    idx: &mut [i64; MAX_DIM],
    f: &mut F,
) {
    if axis == MAX_DIM - 1 {
        f(idx);
        return;
    }
    for v in ranges[axis].clone() {
        idx[axis] = v;
        visit_axis(axis + 1, ranges, idx, f);
    }
}
