//! The slice engine.
//!
//! [`get_slice_buffer`] copies an axis-aligned, half-open rectangle out of a
//! chunked [`SuperChunk`](crate::storage::SuperChunk) into a caller-supplied
//! contiguous row-major output buffer, touching only the chunks that
//! intersect the requested rectangle and, within each, copying only the
//! intersecting span. [`crate::array::Array::get_slice`] builds the
//! array-to-array flavor of slicing on top of this primitive.

use std::ops::Range;

use crate::dims::{elem_strides, flat_offset, grid_to_linear, visit_lines, visit_points, Dims8, MAX_DIM};
use crate::error::CatervaError;
use crate::storage::SuperChunk;

/// Copy the half-open rectangle `[start, stop)` (right-aligned to
/// [`MAX_DIM`]) out of `super_chunk` into `dest`, a row-major buffer shaped
/// `d_pshape`.
///
/// `grid` is the chunk grid (`ext_shape[i] / chunk_shape[i]` per axis) used
/// to translate grid coordinates to linear chunk indices.
///
/// # Errors
/// Propagates any [`StorageError`] raised while decompressing a touched
/// chunk.
#[allow(clippy::too_many_arguments)]
pub fn get_slice_buffer<S: SuperChunk>(
    super_chunk: &S,
    chunk_shape: &Dims8,
    grid: &Dims8,
    itemsize: usize,
    start: &Dims8,
    stop: &Dims8,
    dest: &mut [u8],
    d_pshape: &Dims8,
) -> Result<(), CatervaError> {
    for i in 0..MAX_DIM {
        if stop[i] <= start[i] {
            return Ok(());
        }
    }

    let chunk_nitems = chunk_shape.product();
    let chunk_nbytes = chunk_nitems as usize * itemsize;
    let chunk_strides = elem_strides(chunk_shape);
    let dest_strides = elem_strides(d_pshape);

    let mut i_start = [0i64; MAX_DIM];
    let mut i_stop = [0i64; MAX_DIM];
    for i in 0..MAX_DIM {
        i_start[i] = start[i] / chunk_shape[i];
        i_stop[i] = (stop[i] - 1) / chunk_shape[i];
    }
    let outer_ranges: [Range<i64>; MAX_DIM] = std::array::from_fn(|i| i_start[i]..i_stop[i] + 1);

    let mut staging = vec![0u8; chunk_nbytes];
    let mut result: Result<(), CatervaError> = Ok(());
    visit_points(&outer_ranges, |coord| {
        if result.is_err() {
            return;
        }
        let chunk_index = grid_to_linear(&Dims8::from_array(*coord), grid);
        if let Err(e) = super_chunk.decompress_chunk(chunk_index, &mut staging) {
            result = Err(e.into());
            return;
        }

        let mut c_start = [0i64; MAX_DIM];
        let mut c_stop = [0i64; MAX_DIM];
        for i in 0..MAX_DIM {
            c_start[i] = if coord[i] == i_start[i] {
                start[i] % chunk_shape[i]
            } else {
                0
            };
            c_stop[i] = if coord[i] == i_stop[i] {
                let m = stop[i] % chunk_shape[i];
                if m == 0 {
                    chunk_shape[i]
                } else {
                    m
                }
            } else {
                chunk_shape[i]
            };
        }

        let inner_ranges: [Range<i64>; MAX_DIM] =
            std::array::from_fn(|i| c_start[i]..c_stop[i]);
        let span_bytes = (c_stop[MAX_DIM - 1] - c_start[MAX_DIM - 1]) as usize * itemsize;
        let origin: [i64; MAX_DIM] = std::array::from_fn(|i| coord[i] * chunk_shape[i]);

        visit_lines(&inner_ranges, |idx| {
            let src_off = flat_offset(idx, &chunk_strides) as usize * itemsize;
            let dest_idx: [i64; MAX_DIM] =
                std::array::from_fn(|i| origin[i] + idx[i] - start[i]);
            let dest_off = flat_offset(&dest_idx, &dest_strides) as usize * itemsize;
            dest[dest_off..dest_off + span_bytes]
                .copy_from_slice(&staging[src_off..src_off + span_bytes]);
        });
    });
    result
}
