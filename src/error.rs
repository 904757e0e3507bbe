//! Crate-wide error taxonomy.

use thiserror::Error;

/// A dims-algebra validation error: a shape, chunk shape, or range argument
/// failed one of the invariants in `src/dims.rs`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DimsError {
    /// `ndim` was outside `[1, MAX_DIM]`.
    #[error("ndim must be in [1, {max}], got {ndim}")]
    NdimOutOfRange {
        /// The dimensionality that was rejected.
        ndim: usize,
        /// `MAX_DIM`.
        max: usize,
    },
    /// Two dims-shaped arguments that should share a length disagreed.
    #[error("{name} must have length ndim() = {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the offending argument.
        name: &'static str,
        /// The expected length (`ndim`).
        expected: usize,
        /// The length actually supplied.
        actual: usize,
    },
    /// A `shape`/`chunk_shape` entry was not `>= 1`.
    #[error("{name}[{axis}] must be >= 1, got {value}")]
    NonPositiveExtent {
        /// Name of the offending argument.
        name: &'static str,
        /// The offending axis.
        axis: usize,
        /// The rejected value.
        value: i64,
    },
    /// A half-open `[start, stop)` range had `stop < start` on some axis.
    #[error("stop must be >= start on every axis")]
    InvalidRange,
}

/// A shape-metadata codec error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A tag byte did not match the expected value at the given offset.
    #[error("bad metadata tag 0x{found:02x} at offset {offset}, expected 0x{expected:02x}")]
    BadTag {
        /// Byte offset of the mismatch.
        offset: usize,
        /// The tag byte actually read.
        found: u8,
        /// The tag byte the codec expected.
        expected: u8,
    },
    /// The record was shorter than its header declared.
    #[error("metadata record truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length implied by the header.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },
    /// `ndim` was outside `[1, MAX_DIM]`.
    #[error("invalid ndim {0} in metadata record")]
    InvalidNdim(u8),
    /// A `chunk_shape[i]` value does not fit in a signed 32-bit integer.
    #[error("chunk_shape[{axis}] = {value} does not fit in i32")]
    ChunkShapeTooWide {
        /// The offending axis.
        axis: usize,
        /// The out-of-range value.
        value: i64,
    },
}

/// A storage back-end error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The super-chunk failed to append a chunk.
    #[error("failed to append chunk: {0}")]
    AppendFailed(String),
    /// The super-chunk failed to decompress a chunk.
    #[error("failed to decompress chunk {index}: {reason}")]
    DecompressFailed {
        /// The chunk's linear index.
        index: i64,
        /// The collaborator-reported reason.
        reason: String,
    },
    /// A frame named-slot operation failed.
    #[error("frame slot {name:?} error: {reason}")]
    FrameSlot {
        /// The slot name.
        name: String,
        /// The collaborator-reported reason.
        reason: String,
    },
    /// Loading a persisted frame from disk failed.
    #[error("failed to load frame from {path}: {reason}")]
    LoadFailed {
        /// The file path that was opened.
        path: String,
        /// The collaborator-reported reason.
        reason: String,
    },
    /// An underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while constructing an [`crate::array::Array`]
/// (`Array::new_empty`), mirroring `zarrs`'s `ArrayCreateError`.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// `shape`/`chunk_shape` failed a dims-algebra invariant.
    #[error(transparent)]
    InvalidShape(#[from] DimsError),
    /// Building the initial storage back-end failed (e.g. the frame's
    /// named-slot budget was exhausted while writing the shape-metadata
    /// slot).
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Encoding the initial shape-metadata record failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Errors raised by operations on an already-constructed
/// [`crate::array::Array`], mirroring `zarrs`'s `ArrayError`.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A `start`/`stop`/`shape`/`d_pshape` argument failed a dims-algebra
    /// invariant.
    #[error(transparent)]
    InvalidShape(#[from] DimsError),
    /// `from_buffer`/`fill` was called on an array that was already filled.
    #[error("array has already been filled")]
    AlreadyFilled,
    /// `set_slice_buffer` was called on a non-`PlainBuffer` array.
    #[error("set_slice_buffer is only defined for plain-buffer arrays")]
    NotAPlainBuffer,
    /// `save` was called on a non-`Blosc` array.
    #[error("save is only defined for Blosc-backed arrays")]
    NotBloscBacked,
    /// An operation that requires a frame was invoked on a frame-less array.
    #[error("operation requires a frame, but none is attached")]
    NoFrame,
    /// `fill`'s `itemsize` was not one of `{1, 2, 4, 8}`.
    #[error("fill only supports itemsize in {{1,2,4,8}}, got {0}")]
    UnsupportedItemSize(usize),
    /// `fill`'s value buffer length did not equal `itemsize`.
    #[error("fill value is {actual} bytes, expected itemsize {expected}")]
    FillValueLength {
        /// The array's `itemsize`.
        expected: usize,
        /// The length of the value buffer actually supplied.
        actual: usize,
    },
    /// The storage back-end reported a failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A shape-metadata record failed to encode or decode.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// The top-level error type returned by every public operation.
#[derive(Debug, Error)]
pub enum CatervaError {
    /// An argument was out of range or internally inconsistent, outside the
    /// narrower [`ArrayCreateError`]/[`ArrayError`] contexts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The array was not in a state the requested operation permits, outside
    /// the narrower [`ArrayCreateError`]/[`ArrayError`] contexts.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// `Array::new_empty` failed.
    #[error(transparent)]
    Create(#[from] ArrayCreateError),
    /// An operation on an existing array failed.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// The storage back-end reported a failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The shape-metadata record failed to decode.
    #[error(transparent)]
    Decode(#[from] MetadataError),
}

impl From<&str> for CatervaError {
    fn from(message: &str) -> Self {
        Self::InvalidArgument(message.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CatervaError>;
