//! Runtimes that own device memory and execute launch grids.
//!
//! A runtime is the opaque collaborator of the launcher: given a validated launch it runs the
//! vector addition kernel once per block of the grid, handing each instance its block index.
//! [`CpuRuntime`] emulates an accelerator on a thread pool; `CudaRuntime` (behind the `cuda`
//! feature) drives a real GPU through the CUDA driver API.

mod cpu;
#[cfg(feature = "cuda")]
mod cuda;

pub use cpu::{CpuBuffer, CpuRuntime};
#[cfg(feature = "cuda")]
pub use cuda::{CudaBuffer, CudaRuntime};

use crate::buffer::{BufferLayout, DeviceId, Element};
use crate::error::ExecutionResult;
use crate::launch::ValidatedLaunch;

/// An execution substrate for the vector addition kernel.
pub trait Runtime {
    /// Device memory holding `T`s.
    type Buffer<T: Element>: BufferLayout;

    /// The accelerator buffers allocated by this runtime live on.
    fn device(&self) -> DeviceId;

    /// Allocates a buffer and copies `host` into it.
    fn alloc_from<T: Element>(&self, host: &[T]) -> ExecutionResult<Self::Buffer<T>>;

    /// Allocates a buffer of `len` zeroes.
    fn alloc_zeroed<T: Element>(&self, len: usize) -> ExecutionResult<Self::Buffer<T>>;

    /// Copies a whole buffer back into `dst`, which must have the same length.
    fn copy_to_host<T: Element>(&self, buffer: &Self::Buffer<T>, dst: &mut [T])
        -> ExecutionResult<()>;

    /// Copies a whole buffer back into a new vector.
    fn to_vec<T: Element>(&self, buffer: &Self::Buffer<T>) -> ExecutionResult<Vec<T>> {
        let mut host = vec![T::default(); buffer.len()];
        self.copy_to_host(buffer, &mut host)?;
        Ok(host)
    }

    /// Enqueues one kernel launch over `launch.grid()`.
    ///
    /// An empty grid is not an error and runs nothing.
    fn dispatch<T: Element>(&self, launch: ValidatedLaunch<'_, Self::Buffer<T>>)
        -> ExecutionResult<()>;

    /// Blocks until every dispatch issued so far has finished.
    fn synchronize(&self) -> ExecutionResult<()>;
}
