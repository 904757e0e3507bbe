//! The caterva context: compression/decompression parameters forwarded
//! opaquely to the super-chunk collaborator, bundled the way
//! `caterva_ctx_t` bundles them in the original C API.

/// Opaque compression parameters, forwarded as-is to the super-chunk
/// collaborator. This crate does not interpret them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionParams {
    /// Compression level, collaborator-defined range.
    pub level: u8,
    /// Whether the collaborator should use multiple threads internally.
    pub use_threads: bool,
}

/// Opaque decompression parameters, forwarded as-is to the super-chunk
/// collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompressionParams {
    /// Whether the collaborator should use multiple threads internally.
    pub use_threads: bool,
}

/// A context shared by every array created through it.
///
/// In the C source this is a heap-allocated struct holding an allocator, a
/// deallocator, and compression/decompression parameters, with the caller
/// responsible for keeping it alive longer than any array built from it.
/// In Rust there is no allocator-swap knob to carry (allocation always
/// goes through the global allocator), so `CatervaContext` only carries the
/// compression/decompression parameters; "outlives the array" becomes a
/// type-level guarantee via ordinary ownership/cloning rather than a
/// caller discipline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatervaContext {
    /// Compression parameters used when an array is created or filled.
    pub cparams: CompressionParams,
    /// Decompression parameters used when a chunk is decompressed.
    pub dparams: DecompressionParams,
}

impl CatervaContext {
    /// Create a new context with the given compression/decompression
    /// parameters.
    #[must_use]
    pub const fn new(cparams: CompressionParams, dparams: DecompressionParams) -> Self {
        Self { cparams, dparams }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_has_zeroed_params() {
        let ctx = CatervaContext::default();
        assert_eq!(ctx.cparams.level, 0);
        assert!(!ctx.cparams.use_threads);
    }
}
