//! The storage back-end interface.
//!
//! An array's chunk data lives behind one of two closed back-ends: a
//! compressed [`SuperChunk`] (optionally backed by an on-disk [`Frame`]), or
//! a single contiguous [`PlainBuffer`]. The two are never unified behind a
//! common trait beyond what [`SuperChunk`] itself models, mirroring how the
//! C source keeps `caterva_blosc.c` and `caterva_plainbuffer.c` as distinct
//! translation units.
//!
//! [`SuperChunk`] is a trait so the real Blosc2 bindings can be swapped in
//! behind it; this crate ships [`MemSuperChunk`], an in-memory reference
//! implementation sufficient to exercise every array operation without a
//! native dependency, the same role `zarrs`'s `store::MemoryStore` plays
//! for a real object store.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::StorageError;

/// Upper bound on the number of named slots a [`Frame`] may carry.
pub const MAX_NAMED_SLOTS: usize = 16;

/// A compressed chunk store: append-only, indexed by linear chunk index.
///
/// Implementors own their own compression scheme; this crate never inspects
/// compressed bytes except through [`SuperChunk::decompress_chunk`].
pub trait SuperChunk {
    /// Append `bytes` (one chunk's worth of uncompressed, row-major
    /// element data) as the next chunk. Returns the new chunk's linear
    /// index.
    ///
    /// # Errors
    /// Returns [`StorageError::AppendFailed`] if the collaborator rejects
    /// the chunk.
    fn append_chunk(&mut self, bytes: &[u8]) -> Result<i64, StorageError>;

    /// Decompress chunk `chunk_index` into `out_buf`, which must be at
    /// least `chunk_nbytes` long.
    ///
    /// # Errors
    /// Returns [`StorageError::DecompressFailed`] if `chunk_index` is out
    /// of range or the collaborator fails to decompress it.
    fn decompress_chunk(&self, chunk_index: i64, out_buf: &mut [u8]) -> Result<(), StorageError>;

    /// Number of chunks appended so far.
    fn chunk_count(&self) -> i64;

    /// The attached [`Frame`], if this super-chunk is backed by one.
    fn frame(&self) -> Option<&dyn Frame>;

    /// Mutable access to the attached [`Frame`], if any.
    fn frame_mut(&mut self) -> Option<&mut dyn Frame>;
}

/// A [`SuperChunk`] that can be constructed empty, so generic array code can
/// build one without knowing its concrete type.
pub trait NewSuperChunk: SuperChunk + Sized {
    /// Construct an empty instance, optionally with an attached frame.
    fn empty(with_frame: bool) -> Self;
}

impl NewSuperChunk for MemSuperChunk {
    fn empty(with_frame: bool) -> Self {
        if with_frame {
            Self::with_frame()
        } else {
            Self::new()
        }
    }
}

/// An on-disk (or in-memory stand-in) frame carrying named metadata slots
/// alongside the compressed chunk stream.
pub trait Frame {
    /// Add a new named slot. Fails if the slot already exists or the
    /// frame's slot budget ([`MAX_NAMED_SLOTS`]) is exhausted.
    ///
    /// # Errors
    /// Returns [`StorageError::FrameSlot`] on either condition.
    fn add_named_slot(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Replace the contents of an existing named slot.
    ///
    /// # Errors
    /// Returns [`StorageError::FrameSlot`] if no such slot exists.
    fn update_named_slot(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Read a named slot's contents.
    ///
    /// # Errors
    /// Returns [`StorageError::FrameSlot`] if no such slot exists.
    fn get_named_slot(&self, name: &str) -> Result<&[u8], StorageError>;
}

/// An in-memory [`Frame`] implementation, optionally mirrored to a file on
/// [`MemSuperChunk::persist`].
#[derive(Debug, Default)]
pub struct MemFrame {
    slots: HashMap<String, Vec<u8>>,
}

impl Frame for MemFrame {
    fn add_named_slot(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        if self.slots.contains_key(name) {
            return Err(StorageError::FrameSlot {
                name: name.to_string(),
                reason: "slot already exists".to_string(),
            });
        }
        if self.slots.len() >= MAX_NAMED_SLOTS {
            return Err(StorageError::FrameSlot {
                name: name.to_string(),
                reason: "named-slot budget exhausted".to_string(),
            });
        }
        self.slots.insert(name.to_string(), bytes);
        Ok(())
    }

    fn update_named_slot(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        match self.slots.get_mut(name) {
            Some(slot) => {
                *slot = bytes;
                Ok(())
            }
            None => Err(StorageError::FrameSlot {
                name: name.to_string(),
                reason: "no such slot".to_string(),
            }),
        }
    }

    fn get_named_slot(&self, name: &str) -> Result<&[u8], StorageError> {
        self.slots
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| StorageError::FrameSlot {
                name: name.to_string(),
                reason: "no such slot".to_string(),
            })
    }
}

/// Reference [`SuperChunk`] implementation: chunks are stored uncompressed
/// (compression is out of scope; see `SPEC_FULL.md` §1) in a `Vec<Vec<u8>>`,
/// optionally paired with a [`MemFrame`].
///
/// [`Self::persist`]/[`Self::load`] round-trip the whole thing through a
/// single flat file, standing in for a real Blosc2 frame file.
#[derive(Debug, Default)]
pub struct MemSuperChunk {
    chunks: Vec<Vec<u8>>,
    frame: Option<MemFrame>,
}

impl MemSuperChunk {
    /// Create a super-chunk with no attached frame (purely in-memory).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a super-chunk with an attached, initially empty [`MemFrame`].
    #[must_use]
    pub fn with_frame() -> Self {
        Self {
            chunks: Vec::new(),
            frame: Some(MemFrame::default()),
        }
    }

    /// Serialize this super-chunk (chunk stream plus frame slots, if any)
    /// to `path`.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] on any filesystem failure.
    pub fn persist(&self, path: &Path) -> Result<(), StorageError> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.chunks.len() as u64).to_ne_bytes());
        for chunk in &self.chunks {
            out.extend_from_slice(&(chunk.len() as u64).to_ne_bytes());
            out.extend_from_slice(chunk);
        }
        let slots: Vec<_> = self
            .frame
            .as_ref()
            .map_or_else(Vec::new, |f| f.slots.iter().collect());
        out.extend_from_slice(&(slots.len() as u64).to_ne_bytes());
        for (name, bytes) in slots {
            out.extend_from_slice(&(name.len() as u64).to_ne_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&(bytes.len() as u64).to_ne_bytes());
            out.extend_from_slice(bytes);
        }
        fs::write(path, out).map_err(StorageError::Io)
    }

    /// Load a super-chunk previously written by [`Self::persist`].
    ///
    /// # Errors
    /// Returns [`StorageError::LoadFailed`] if the file is truncated or
    /// malformed, or [`StorageError::Io`] on a filesystem failure.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let data = fs::read(path).map_err(StorageError::Io)?;
        let mut pos = 0usize;
        let fail = |reason: &str| StorageError::LoadFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };
        let read_u64 = |data: &[u8], pos: &mut usize| -> Result<u64, StorageError> {
            let end = *pos + 8;
            if end > data.len() {
                return Err(fail("truncated length field"));
            }
            let v = u64::from_ne_bytes(data[*pos..end].try_into().unwrap());
            *pos = end;
            Ok(v)
        };

        let chunk_count = read_u64(&data, &mut pos)?;
        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            let len = read_u64(&data, &mut pos)? as usize;
            let end = pos + len;
            if end > data.len() {
                return Err(fail("truncated chunk body"));
            }
            chunks.push(data[pos..end].to_vec());
            pos = end;
        }

        let slot_count = read_u64(&data, &mut pos)?;
        let mut frame = MemFrame::default();
        for _ in 0..slot_count {
            let name_len = read_u64(&data, &mut pos)? as usize;
            let end = pos + name_len;
            if end > data.len() {
                return Err(fail("truncated slot name"));
            }
            let name = String::from_utf8(data[pos..end].to_vec())
                .map_err(|_| fail("slot name is not valid utf-8"))?;
            pos = end;
            let body_len = read_u64(&data, &mut pos)? as usize;
            let end = pos + body_len;
            if end > data.len() {
                return Err(fail("truncated slot body"));
            }
            frame.slots.insert(name, data[pos..end].to_vec());
            pos = end;
        }

        Ok(Self {
            chunks,
            frame: Some(frame),
        })
    }
}

impl SuperChunk for MemSuperChunk {
    fn append_chunk(&mut self, bytes: &[u8]) -> Result<i64, StorageError> {
        self.chunks.push(bytes.to_vec());
        Ok(self.chunks.len() as i64 - 1)
    }

    fn decompress_chunk(&self, chunk_index: i64, out_buf: &mut [u8]) -> Result<(), StorageError> {
        let chunk = usize::try_from(chunk_index)
            .ok()
            .and_then(|i| self.chunks.get(i))
            .ok_or(StorageError::DecompressFailed {
                index: chunk_index,
                reason: "chunk index out of range".to_string(),
            })?;
        if chunk.len() != out_buf.len() {
            return Err(StorageError::DecompressFailed {
                index: chunk_index,
                reason: format!(
                    "chunk is {} bytes, output buffer is {}",
                    chunk.len(),
                    out_buf.len()
                ),
            });
        }
        out_buf.copy_from_slice(chunk);
        Ok(())
    }

    fn chunk_count(&self) -> i64 {
        self.chunks.len() as i64
    }

    fn frame(&self) -> Option<&dyn Frame> {
        self.frame.as_ref().map(|f| f as &dyn Frame)
    }

    fn frame_mut(&mut self) -> Option<&mut dyn Frame> {
        self.frame.as_mut().map(|f| f as &mut dyn Frame)
    }
}

/// A single owned, contiguous, row-major byte buffer, sized `nitems *
/// itemsize`. No chunking math beyond multi-index <-> flat offset is
/// needed to address it.
#[derive(Debug, Default, Clone)]
pub struct PlainBuffer {
    bytes: Vec<u8>,
}

impl PlainBuffer {
    /// Allocate a zeroed buffer of `nbytes` bytes.
    #[must_use]
    pub fn new(nbytes: usize) -> Self {
        Self {
            bytes: vec![0u8; nbytes],
        }
    }

    /// Immutable view of the whole buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable view of the whole buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Buffer length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A [`PlainBuffer`] has exactly one "chunk": the whole buffer. Modeling it
/// this way lets the import/export/slice machinery, all written generically
/// over [`SuperChunk`], serve both back-ends without a second code path.
/// `set_slice_buffer` remains PlainBuffer-only and bypasses this impl,
/// writing into the buffer directly.
impl SuperChunk for PlainBuffer {
    fn append_chunk(&mut self, bytes: &[u8]) -> Result<i64, StorageError> {
        if bytes.len() != self.bytes.len() {
            return Err(StorageError::AppendFailed(format!(
                "plain buffer expects exactly {} bytes, got {}",
                self.bytes.len(),
                bytes.len()
            )));
        }
        self.bytes.copy_from_slice(bytes);
        Ok(0)
    }

    fn decompress_chunk(&self, chunk_index: i64, out_buf: &mut [u8]) -> Result<(), StorageError> {
        if chunk_index != 0 {
            return Err(StorageError::DecompressFailed {
                index: chunk_index,
                reason: "a plain buffer has exactly one chunk".to_string(),
            });
        }
        if out_buf.len() != self.bytes.len() {
            return Err(StorageError::DecompressFailed {
                index: chunk_index,
                reason: format!(
                    "buffer is {} bytes, output buffer is {}",
                    self.bytes.len(),
                    out_buf.len()
                ),
            });
        }
        out_buf.copy_from_slice(&self.bytes);
        Ok(())
    }

    fn chunk_count(&self) -> i64 {
        1
    }

    fn frame(&self) -> Option<&dyn Frame> {
        None
    }

    fn frame_mut(&mut self) -> Option<&mut dyn Frame> {
        None
    }
}

/// Parameters selecting and configuring a storage back-end at creation
/// time, mirroring the two closed variants the C source dispatches on.
///
/// Neither variant carries a file path: a [`SuperChunk`] is always built
/// in memory by [`NewSuperChunk::empty`], and moving it to/from disk is a
/// separate, explicit step ([`MemSuperChunk::persist`]/[`MemSuperChunk::load`],
/// surfaced on `Array` as `save`/`load`) rather than something a creation
/// parameter associates implicitly.
#[derive(Debug, Clone, Copy)]
pub enum StorageParams {
    /// A compressed super-chunk. `frame = true` attaches an (in-memory)
    /// frame with a named-slot carrier for the shape-metadata record.
    Blosc {
        /// Whether a frame (named-slot carrier) is attached at all.
        frame: bool,
    },
    /// A single contiguous buffer.
    PlainBuffer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_super_chunk_append_and_decompress_round_trip() {
        let mut sc = MemSuperChunk::new();
        let idx = sc.append_chunk(&[1, 2, 3, 4]).unwrap();
        assert_eq!(idx, 0);
        let mut out = [0u8; 4];
        sc.decompress_chunk(idx, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn frame_rejects_duplicate_and_missing_slots() {
        let mut frame = MemFrame::default();
        frame.add_named_slot("caterva", vec![1]).unwrap();
        assert!(frame.add_named_slot("caterva", vec![2]).is_err());
        assert!(frame.update_named_slot("missing", vec![3]).is_err());
        assert_eq!(frame.get_named_slot("caterva").unwrap(), &[1]);
    }

    #[test]
    fn frame_enforces_named_slot_budget() {
        let mut frame = MemFrame::default();
        for i in 0..MAX_NAMED_SLOTS {
            frame.add_named_slot(&format!("slot{i}"), vec![]).unwrap();
        }
        assert!(frame.add_named_slot("overflow", vec![]).is_err());
    }

    #[test]
    fn super_chunk_persists_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");

        let mut sc = MemSuperChunk::with_frame();
        sc.append_chunk(&[9, 9]).unwrap();
        sc.frame_mut()
            .unwrap()
            .add_named_slot("caterva", vec![1, 2, 3])
            .unwrap();
        sc.persist(&path).unwrap();

        let loaded = MemSuperChunk::load(&path).unwrap();
        assert_eq!(loaded.chunk_count(), 1);
        let mut out = [0u8; 2];
        loaded.decompress_chunk(0, &mut out).unwrap();
        assert_eq!(out, [9, 9]);
        assert_eq!(
            loaded.frame().unwrap().get_named_slot("caterva").unwrap(),
            &[1, 2, 3]
        );
    }

    #[test]
    fn plain_buffer_allocates_zeroed() {
        let buf = PlainBuffer::new(16);
        assert_eq!(buf.len(), 16);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn plain_buffer_as_super_chunk_has_one_chunk() {
        let mut buf = PlainBuffer::new(4);
        buf.append_chunk(&[1, 2, 3, 4]).unwrap();
        assert_eq!(buf.chunk_count(), 1);
        let mut out = [0u8; 4];
        buf.decompress_chunk(0, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(buf.decompress_chunk(1, &mut out).is_err());
    }
}
