//! The padded import/export pipeline.
//!
//! [`import_buffer`] and [`export_buffer`] move data between a row-major
//! contiguous user buffer and a chunked [`SuperChunk`](crate::storage::SuperChunk),
//! zero-padding tail chunks that extend past the logical `shape` into
//! `ext_shape`. Both walk the chunk grid with [`visit_lines`], the
//! dimension-generic stand-in for the fixed 7-level nested loop described
//! in `SPEC_FULL.md` §4.E/§4.F: this produces byte-identical output to an
//! unrolled loop while staying dimension-generic.

use std::ops::Range;

use crate::dims::{chunk_grid, elem_strides, flat_offset, linear_to_grid, visit_lines, Dims8, MAX_DIM};
use crate::error::CatervaError;
use crate::storage::SuperChunk;

/// Copy `src` (a row-major buffer of `shape.product() * itemsize` bytes)
/// into `super_chunk`, one chunk at a time in grid order, zero-padding
/// tail chunks.
///
/// # Errors
/// Propagates any [`crate::error::StorageError`] raised while appending a
/// chunk.
pub fn import_buffer<S: SuperChunk>(
    super_chunk: &mut S,
    shape: &Dims8,
    chunk_shape: &Dims8,
    ext_shape: &Dims8,
    itemsize: usize,
    src: &[u8],
) -> Result<(), CatervaError> {
    let grid = chunk_grid(ext_shape, chunk_shape);
    let grid_count = grid.product();
    let chunk_nitems = chunk_shape.product();
    let chunk_nbytes = chunk_nitems as usize * itemsize;
    let shape_strides = elem_strides(shape);
    let chunk_strides = elem_strides(chunk_shape);

    let mut staging = vec![0u8; chunk_nbytes];
    for c in 0..grid_count {
        let grid_coord = linear_to_grid(c, &grid);
        let mut origin = [0i64; MAX_DIM];
        let mut clip = [0i64; MAX_DIM];
        let mut in_padding = false;
        for i in 0..MAX_DIM {
            origin[i] = grid_coord[i] * chunk_shape[i];
            clip[i] = (shape[i] - origin[i]).min(chunk_shape[i]);
            if clip[i] <= 0 {
                in_padding = true;
            }
        }

        staging.fill(0);
        if !in_padding {
            let ranges: [Range<i64>; MAX_DIM] = std::array::from_fn(|i| 0..clip[i]);
            let span_bytes = clip[MAX_DIM - 1] as usize * itemsize;
            visit_lines(&ranges, |idx| {
                let mut src_idx = *idx;
                for i in 0..MAX_DIM {
                    src_idx[i] += origin[i];
                }
                let src_off = flat_offset(&src_idx, &shape_strides) as usize * itemsize;
                let dst_off = flat_offset(idx, &chunk_strides) as usize * itemsize;
                staging[dst_off..dst_off + span_bytes]
                    .copy_from_slice(&src[src_off..src_off + span_bytes]);
            });
        }

        super_chunk.append_chunk(&staging)?;
    }
    Ok(())
}

/// The inverse of [`import_buffer`]: decompress every chunk and copy the
/// clipped, non-padding portion back into `dest`, a row-major buffer of
/// `shape.product() * itemsize` bytes.
///
/// # Errors
/// Propagates any [`crate::error::StorageError`] raised while decompressing
/// a chunk.
pub fn export_buffer<S: SuperChunk>(
    super_chunk: &S,
    shape: &Dims8,
    chunk_shape: &Dims8,
    ext_shape: &Dims8,
    itemsize: usize,
    dest: &mut [u8],
) -> Result<(), CatervaError> {
    let grid = chunk_grid(ext_shape, chunk_shape);
    let grid_count = grid.product();
    let chunk_nitems = chunk_shape.product();
    let chunk_nbytes = chunk_nitems as usize * itemsize;
    let shape_strides = elem_strides(shape);
    let chunk_strides = elem_strides(chunk_shape);

    let mut staging = vec![0u8; chunk_nbytes];
    for c in 0..grid_count {
        let grid_coord = linear_to_grid(c, &grid);
        let mut origin = [0i64; MAX_DIM];
        let mut clip = [0i64; MAX_DIM];
        let mut in_padding = false;
        for i in 0..MAX_DIM {
            origin[i] = grid_coord[i] * chunk_shape[i];
            clip[i] = (shape[i] - origin[i]).min(chunk_shape[i]);
            if clip[i] <= 0 {
                in_padding = true;
            }
        }
        if in_padding {
            continue;
        }

        super_chunk.decompress_chunk(c, &mut staging)?;

        let ranges: [Range<i64>; MAX_DIM] = std::array::from_fn(|i| 0..clip[i]);
        let span_bytes = clip[MAX_DIM - 1] as usize * itemsize;
        visit_lines(&ranges, |idx| {
            let mut dest_idx = *idx;
            for i in 0..MAX_DIM {
                dest_idx[i] += origin[i];
            }
            let dest_off = flat_offset(&dest_idx, &shape_strides) as usize * itemsize;
            let src_off = flat_offset(idx, &chunk_strides) as usize * itemsize;
            dest[dest_off..dest_off + span_bytes]
                .copy_from_slice(&staging[src_off..src_off + span_bytes]);
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemSuperChunk;

    #[test]
    fn import_export_round_trips_non_multiple_shape() {
        // shape 5x5, chunk 2x2 -> ext_shape 6x6, grid 3x3, tail chunks padded.
        let shape = Dims8::right_align(&[5, 5]);
        let chunk_shape = Dims8::right_align(&[2, 2]);
        let ext_shape = crate::dims::ext_shape_of(&shape, &chunk_shape);
        let itemsize = 4;

        let nitems = shape.product() as usize;
        let src: Vec<u8> = (0..nitems as i32).flat_map(i32::to_ne_bytes).collect();

        let mut sc = MemSuperChunk::new();
        import_buffer(&mut sc, &shape, &chunk_shape, &ext_shape, itemsize, &src).unwrap();
        assert_eq!(sc.chunk_count(), 9);

        let mut dest = vec![0u8; src.len()];
        export_buffer(&sc, &shape, &chunk_shape, &ext_shape, itemsize, &mut dest).unwrap();
        assert_eq!(dest, src);
    }

    #[test]
    fn import_export_round_trips_exact_multiple_shape() {
        let shape = Dims8::right_align(&[4, 6]);
        let chunk_shape = Dims8::right_align(&[2, 3]);
        let ext_shape = crate::dims::ext_shape_of(&shape, &chunk_shape);
        let itemsize = 1;

        let nitems = shape.product() as usize;
        let src: Vec<u8> = (0..nitems as u8).collect();

        let mut sc = MemSuperChunk::new();
        import_buffer(&mut sc, &shape, &chunk_shape, &ext_shape, itemsize, &src).unwrap();
        assert_eq!(sc.chunk_count(), 4);

        let mut dest = vec![0u8; src.len()];
        export_buffer(&sc, &shape, &chunk_shape, &ext_shape, itemsize, &mut dest).unwrap();
        assert_eq!(dest, src);
    }
}
