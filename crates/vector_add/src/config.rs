//! Launch configuration.

use vector_add_kernels::DEFAULT_BLOCK_SIZE;

use crate::error::PreconditionError;
use crate::grid::GridSize;

/// Physical threads cooperating on one block unless configured otherwise: four warps.
pub const DEFAULT_THREADS_PER_BLOCK: u32 = 128;

/// Tunables of a vector addition launch.
///
/// ```
/// use vector_add::LaunchConfig;
///
/// let config = LaunchConfig::new().block_size(1024).threads_per_block(256);
/// assert_eq!(config.block_size, 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// How many elements one block instance covers. Every block gets the lane range
    /// `[0, block_size)`, so this must be a non-zero power of two.
    /// `2048` by default.
    pub block_size: u32,
    /// How many device threads share the lanes of one block. `None` asks the runtime for an
    /// occupancy-based suggestion; the emulated runtime ignores it.
    /// `Some(128)` by default.
    pub threads_per_block: Option<u32>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            threads_per_block: Some(DEFAULT_THREADS_PER_BLOCK),
        }
    }
}

impl LaunchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of elements per block.
    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set a fixed number of device threads per block.
    pub fn threads_per_block(mut self, threads: u32) -> Self {
        self.threads_per_block = Some(threads);
        self
    }

    /// Let the runtime pick the number of threads per block.
    pub fn suggested_threads(mut self) -> Self {
        self.threads_per_block = None;
        self
    }

    /// Checks the tunables themselves, independent of any buffer.
    pub fn check(&self) -> Result<(), PreconditionError> {
        if !self.block_size.is_power_of_two() {
            return Err(PreconditionError::InvalidBlockSize(self.block_size));
        }
        if self.threads_per_block == Some(0) {
            return Err(PreconditionError::InvalidThreadCount(0));
        }
        Ok(())
    }

    /// The grid covering `n_elements`, `ceil(n_elements / block_size)` blocks along x.
    pub fn grid_for(&self, n_elements: usize) -> Result<GridSize, PreconditionError> {
        self.check()?;
        GridSize::covering(n_elements, self.block_size).ok_or(PreconditionError::GridTooLarge {
            n_elements,
            block_size: self.block_size,
        })
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LaunchConfig::default();
        assert_eq!(config.block_size, 2048);
        assert_eq!(config.threads_per_block, Some(128));
        assert_eq!(config.grid_for(512 * 2048), Ok(GridSize::x(512)));
    }

    #[test]
    fn test_block_size_must_be_power_of_two() {
        assert_eq!(
            LaunchConfig::new().block_size(0).check(),
            Err(PreconditionError::InvalidBlockSize(0))
        );
        assert_eq!(
            LaunchConfig::new().block_size(1000).grid_for(10),
            Err(PreconditionError::InvalidBlockSize(1000))
        );
        assert!(LaunchConfig::new().block_size(1).check().is_ok());
    }

    #[test]
    fn test_thread_count() {
        assert_eq!(
            LaunchConfig::new().threads_per_block(0).check(),
            Err(PreconditionError::InvalidThreadCount(0))
        );
        let config = LaunchConfig::new().threads_per_block(64).suggested_threads();
        assert_eq!(config.threads_per_block, None);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_grid_too_large() {
        let err = LaunchConfig::new().block_size(1).grid_for(usize::MAX);
        assert_eq!(
            err,
            Err(PreconditionError::GridTooLarge {
                n_elements: usize::MAX,
                block_size: 1,
            })
        );
    }
}
