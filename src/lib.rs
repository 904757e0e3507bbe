//! Caterva: chunked N-dimensional dense array storage, slicing, and
//! persistence.
//!
//! An [`array::Array`] is a grid of fixed-size chunks (or, for small
//! arrays, a single plain buffer) addressed by up to [`dims::MAX_DIM`]
//! axes. Chunk bytes live behind a pluggable [`storage::SuperChunk`]
//! collaborator — this crate ships an in-memory reference implementation,
//! [`storage::MemSuperChunk`], sufficient to exercise every operation
//! without a native compression dependency.
//!
//! ```
//! use caterva::array::Array;
//! use caterva::context::CatervaContext;
//! use caterva::storage::{MemSuperChunk, StorageParams};
//!
//! let mut arr = Array::<MemSuperChunk>::new_empty(
//!     CatervaContext::default(),
//!     StorageParams::Blosc { frame: false },
//!     &[4, 4],
//!     &[2, 2],
//!     4,
//! )
//! .unwrap();
//!
//! let data: Vec<u8> = (0..16i32).flat_map(i32::to_ne_bytes).collect();
//! arr.from_buffer(&data).unwrap();
//!
//! let mut out = vec![0u8; data.len()];
//! arr.to_buffer(&mut out).unwrap();
//! assert_eq!(out, data);
//! ```

pub mod array;
pub mod config;
pub mod context;
pub mod dims;
pub mod error;
pub mod metadata;
pub mod slice;
pub mod storage;

pub use array::Array;
pub use context::CatervaContext;
pub use error::{CatervaError, Result};
