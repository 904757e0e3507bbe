//! Caterva global configuration options.
//!
//! Adapted from `zarrs`'s `config` module: a process-wide [`Config`]
//! reachable through [`global_config`]/[`global_config_mut`], holding
//! tunables that are a property of this Rust implementation rather than of
//! the on-disk format or the parent specification.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the caterva crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with
/// [`global_config_mut`].
///
/// ## Reuse Fill Chunk
/// > default: `true`
///
/// [`crate::array::Array::fill`] composes one broadcast chunk and appends it
/// `grid_count` times. If `true`, the same chunk buffer is reused across
/// every append (the super-chunk collaborator is given the same bytes each
/// time); if `false`, a fresh buffer is cloned per append. There is no
/// equivalent knob in the C source, which always recomputes the buffer.
#[derive(Debug)]
pub struct Config {
    reuse_fill_chunk: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reuse_fill_chunk: true,
        }
    }
}

impl Config {
    /// Get the [reuse fill chunk](#reuse-fill-chunk) configuration.
    #[must_use]
    pub const fn reuse_fill_chunk(&self) -> bool {
        self.reuse_fill_chunk
    }

    /// Set the [reuse fill chunk](#reuse-fill-chunk) configuration.
    pub fn set_reuse_fill_chunk(&mut self, reuse_fill_chunk: bool) {
        self.reuse_fill_chunk = reuse_fill_chunk;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global caterva configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global caterva configuration.
///
/// # Panics
/// Panics if the underlying lock has been poisoned.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reuse_fill_chunk() {
        assert!(global_config().reuse_fill_chunk());
        global_config_mut().set_reuse_fill_chunk(false);
        assert!(!global_config().reuse_fill_chunk());
        global_config_mut().set_reuse_fill_chunk(true);
    }
}
