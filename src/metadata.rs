//! The shape-metadata codec.
//!
//! When a [`Blosc`](crate::storage::Blosc) array is backed by a persisted
//! frame, the grid geometry (`ndim`, `shape`, `chunk_shape`) must survive a
//! round trip through the frame's `"caterva"` named slot. This module
//! encodes and decodes that small, fixed record.
//!
//! The record is NOT a general-purpose serialization format — it is a
//! closed, self-describing byte layout with MessagePack-derived tag bytes,
//! and the only valid reader is this same codec. See the module-level
//! design note on host byte order below.

use crate::dims::MAX_DIM;
use crate::error::MetadataError;

/// Fixed 3-element sequence header (`0x90 + 3`).
pub const TAG_ARRAY3: u8 = 0x93;
/// Fixed `ndim`-element sequence header base; add `ndim` to get the tag.
pub const TAG_ARRAY_BASE: u8 = 0x90;
/// Unsigned 64-bit element tag, used for `shape` entries.
pub const TAG_UINT64: u8 = 0xCF;
/// Signed 32-bit element tag, used for `chunk_shape` entries.
pub const TAG_INT32: u8 = 0xD2;

/// The named slot this codec's record is stored under in a persisted frame.
pub const SLOT_NAME: &str = "caterva";

/// The decoded contents of a shape-metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMetadata {
    /// Real dimensionality, in `[1, MAX_DIM]`.
    pub ndim: u8,
    /// Logical shape, length `ndim`.
    pub shape: Vec<i64>,
    /// Chunk shape, length `ndim`.
    pub chunk_shape: Vec<i64>,
}

/// Encode `(ndim, shape, chunk_shape)` into the on-disk record.
///
/// # Errors
/// Returns [`MetadataError::InvalidNdim`] if `ndim` is outside `[1,
/// MAX_DIM]`, or [`MetadataError::ChunkShapeTooWide`] if any
/// `chunk_shape[i]` does not fit in a signed 32-bit integer — the record's
/// `chunk_shape` entries are 32-bit, unlike the 64-bit in-memory
/// representation.
///
/// # Host byte order
/// Shape and chunk-shape entries are written in host byte order (not a
/// portable fixed endianness). This preserves bit-compatibility with
/// frames produced by the original C implementation, which has the same
/// wart; see `SPEC_FULL.md` §4.B for the rationale. A record written on a
/// big-endian host is not byte-compatible with one read on a little-endian
/// host.
pub fn encode(ndim: u8, shape: &[i64], chunk_shape: &[i64]) -> Result<Vec<u8>, MetadataError> {
    if ndim == 0 || usize::from(ndim) > MAX_DIM {
        return Err(MetadataError::InvalidNdim(ndim));
    }
    assert_eq!(shape.len(), usize::from(ndim));
    assert_eq!(chunk_shape.len(), usize::from(ndim));
    for (axis, &value) in chunk_shape.iter().enumerate() {
        if value < i64::from(i32::MIN) || value > i64::from(i32::MAX) {
            return Err(MetadataError::ChunkShapeTooWide { axis, value });
        }
    }

    let mut out = Vec::with_capacity(4 + 14 * usize::from(ndim));
    out.push(TAG_ARRAY3);
    out.push(ndim);

    out.push(TAG_ARRAY_BASE + ndim);
    for &s in shape {
        out.push(TAG_UINT64);
        out.extend_from_slice(&s.to_ne_bytes());
    }

    out.push(TAG_ARRAY_BASE + ndim);
    for &p in chunk_shape {
        out.push(TAG_INT32);
        let p32 = p as i32;
        out.extend_from_slice(&p32.to_ne_bytes());
    }

    Ok(out)
}

/// Decode a record previously produced by [`encode`].
///
/// # Errors
/// Returns [`MetadataError::Truncated`] if `bytes` ends before a complete
/// record is read, [`MetadataError::InvalidNdim`] if the declared `ndim` is
/// outside `[1, MAX_DIM]`, or [`MetadataError::BadTag`] if any tag byte
/// does not match its expected value.
pub fn decode(bytes: &[u8]) -> Result<ShapeMetadata, MetadataError> {
    let mut pos = 0usize;
    let mut next = |n: usize, pos: &mut usize| -> Result<&[u8], MetadataError> {
        let end = *pos + n;
        if end > bytes.len() {
            return Err(MetadataError::Truncated {
                expected: end,
                actual: bytes.len(),
            });
        }
        let slice = &bytes[*pos..end];
        *pos = end;
        Ok(slice)
    };

    let tag = next(1, &mut pos)?[0];
    expect_tag(tag, TAG_ARRAY3, 0)?;

    let ndim = next(1, &mut pos)?[0];
    if ndim == 0 || usize::from(ndim) > MAX_DIM {
        return Err(MetadataError::InvalidNdim(ndim));
    }
    let ndim_usize = usize::from(ndim);

    let tag = next(1, &mut pos)?[0];
    expect_tag(tag, TAG_ARRAY_BASE + ndim, pos - 1)?;
    let mut shape = Vec::with_capacity(ndim_usize);
    for _ in 0..ndim_usize {
        let tag = next(1, &mut pos)?[0];
        expect_tag(tag, TAG_UINT64, pos - 1)?;
        let bytes8 = next(8, &mut pos)?;
        shape.push(i64::from_ne_bytes(bytes8.try_into().unwrap()));
    }

    let tag = next(1, &mut pos)?[0];
    expect_tag(tag, TAG_ARRAY_BASE + ndim, pos - 1)?;
    let mut chunk_shape = Vec::with_capacity(ndim_usize);
    for _ in 0..ndim_usize {
        let tag = next(1, &mut pos)?[0];
        expect_tag(tag, TAG_INT32, pos - 1)?;
        let bytes4 = next(4, &mut pos)?;
        let p32 = i32::from_ne_bytes(bytes4.try_into().unwrap());
        chunk_shape.push(i64::from(p32));
    }

    Ok(ShapeMetadata {
        ndim,
        shape,
        chunk_shape,
    })
}

fn expect_tag(found: u8, expected: u8, offset: usize) -> Result<(), MetadataError> {
    if found == expected {
        Ok(())
    } else {
        Err(MetadataError::BadTag {
            offset,
            found,
            expected,
        })
    }
}

/// The byte length of a record encoding `ndim` axes.
#[must_use]
pub const fn encoded_len(ndim: u8) -> usize {
    4 + 14 * ndim as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_shape_and_chunk_shape() {
        let shape = vec![10, 20, 30];
        let chunk_shape = vec![3, 4, 5];
        let bytes = encode(3, &shape, &chunk_shape).unwrap();
        assert_eq!(bytes.len(), encoded_len(3));
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.ndim, 3);
        assert_eq!(decoded.shape, shape);
        assert_eq!(decoded.chunk_shape, chunk_shape);
    }

    #[test]
    fn round_trips_max_dim() {
        let shape = vec![2; MAX_DIM];
        let chunk_shape = vec![1; MAX_DIM];
        let bytes = encode(MAX_DIM as u8, &shape, &chunk_shape).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.shape, shape);
        assert_eq!(decoded.chunk_shape, chunk_shape);
    }

    #[test]
    fn rejects_ndim_zero_and_too_large() {
        assert!(matches!(
            encode(0, &[], &[]),
            Err(MetadataError::InvalidNdim(0))
        ));
        assert!(matches!(
            encode(9, &[1; 9], &[1; 9]),
            Err(MetadataError::InvalidNdim(9))
        ));
    }

    #[test]
    fn rejects_chunk_shape_overflowing_i32() {
        let err = encode(1, &[1], &[i64::from(i32::MAX) + 1]).unwrap_err();
        assert!(matches!(err, MetadataError::ChunkShapeTooWide { axis: 0, .. }));
    }

    #[test]
    fn decode_rejects_bad_tag() {
        let mut bytes = encode(2, &[4, 4], &[2, 2]).unwrap();
        bytes[0] = 0xAA;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::BadTag {
                offset: 0,
                expected: TAG_ARRAY3,
                ..
            }
        ));
    }

    #[test]
    fn decode_rejects_truncated_record() {
        let bytes = encode(2, &[4, 4], &[2, 2]).unwrap();
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, MetadataError::Truncated { .. }));
    }
}
