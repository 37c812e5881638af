//! Element-wise vector addition as a block-parallel, mask-guarded kernel.
//!
//! The launcher splits `n` elements into `ceil(n / block_size)` blocks and dispatches one grid.
//! Every block instance computes its own lane indices and masks the ones past the end, so no
//! block reads or writes outside the buffers. The kernel itself lives in the
//! `vector_add_kernels` crate and runs either on the emulated [`CpuRuntime`] or, with the
//! `cuda` feature, on a GPU through `CudaRuntime`.
//!
//! A launch is two steps that can also be used separately:
//!
//! - [`validate`] checks placement, length and contiguity of the buffers and computes the grid.
//!   It never touches a device.
//! - [`dispatch`] issues exactly one kernel launch for a validated launch.
//!
//! ```
//! use vector_add::{launch, verify, CpuRuntime, Runtime};
//!
//! let runtime = CpuRuntime::new();
//! let xs: Vec<f32> = (0..5000).map(|i| i as f32).collect();
//! let x = runtime.alloc_from(&xs).unwrap();
//! let y = runtime.alloc_from(&xs).unwrap();
//! let mut out = runtime.alloc_zeroed::<f32>(xs.len()).unwrap();
//!
//! launch(&runtime, &x, &y, &mut out).unwrap();
//! runtime.synchronize().unwrap();
//!
//! let out = runtime.to_vec(&out).unwrap();
//! assert_eq!(out, verify::reference_add(&xs, &xs));
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod grid;
pub mod launch;
pub mod runtime;
pub mod verify;

pub use buffer::{BufferLayout, DeviceId, Element, Placement};
pub use config::{LaunchConfig, DEFAULT_THREADS_PER_BLOCK};
pub use error::{
    ExecutionError, ExecutionResult, LaunchError, LaunchResult, Operand, PreconditionError,
};
pub use grid::GridSize;
pub use launch::{dispatch, launch, launch_with, validate, ValidatedLaunch};
pub use runtime::{CpuBuffer, CpuRuntime, Runtime};
#[cfg(feature = "cuda")]
pub use runtime::{CudaBuffer, CudaRuntime};
pub use vector_add_kernels::DEFAULT_BLOCK_SIZE;
