//! Types for error handling.
//!
//! A launch fails in one of two ways. A [`PreconditionError`] means the arguments were rejected
//! on the host before any device work was issued. An [`ExecutionError`] comes from the runtime
//! itself (allocation, copies, the kernel launch). Neither is retried. [`LaunchError`] joins the
//! two so callers of [`launch`](crate::launch) can use `?` on both.

use std::error::Error;
use std::fmt;

use crate::buffer::{DeviceId, Placement};

/// Names one of the three kernel arguments in error messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operand {
    X,
    Y,
    Out,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operand::X => "x",
            Operand::Y => "y",
            Operand::Out => "out",
        })
    }
}

/// An argument invariant that failed on the host. No device work has been issued.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PreconditionError {
    /// The buffer does not live in accelerator memory.
    NotOnAccelerator {
        operand: Operand,
        placement: Placement,
    },
    /// The buffer lives on a different accelerator than `x`.
    DeviceMismatch {
        operand: Operand,
        expected: DeviceId,
        found: DeviceId,
    },
    /// The buffer length differs from `x`.
    LengthMismatch {
        operand: Operand,
        expected: usize,
        found: usize,
    },
    /// Consecutive logical elements are not adjacent in memory.
    NonContiguous { operand: Operand, stride: usize },
    /// Block size is zero or not a power of two.
    InvalidBlockSize(u32),
    /// Threads per block is zero.
    InvalidThreadCount(u32),
    /// The number of blocks does not fit the grid's x axis.
    GridTooLarge { n_elements: usize, block_size: u32 },
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::NotOnAccelerator { operand, placement } => {
                write!(f, "`{operand}` must reside on the accelerator, found {placement}")
            }
            PreconditionError::DeviceMismatch {
                operand,
                expected,
                found,
            } => write!(f, "`{operand}` is on {found} but `x` is on {expected}"),
            PreconditionError::LengthMismatch {
                operand,
                expected,
                found,
            } => write!(f, "`{operand}` has {found} elements but `x` has {expected}"),
            PreconditionError::NonContiguous { operand, stride } => {
                write!(f, "`{operand}` is not contiguous (stride {stride})")
            }
            PreconditionError::InvalidBlockSize(size) => {
                write!(f, "block size {size} is not a non-zero power of two")
            }
            PreconditionError::InvalidThreadCount(threads) => {
                write!(f, "threads per block must be non-zero, got {threads}")
            }
            PreconditionError::GridTooLarge {
                n_elements,
                block_size,
            } => write!(
                f,
                "{n_elements} elements need more than the maximum grid size with blocks of {block_size}"
            ),
        }
    }
}

impl Error for PreconditionError {}

/// A failure reported by the runtime while allocating, copying or executing.
#[derive(Debug)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Host and device buffers of different lengths were used in a copy.
    CopySizeMismatch { host: usize, device: usize },
    /// Device memory for `elements` values could not be allocated.
    OutOfMemory { elements: usize },
    #[cfg(feature = "cuda")]
    Cuda(cust::error::CudaError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::CopySizeMismatch { host, device } => write!(
                f,
                "copy between a host slice of {host} elements and a device buffer of {device}"
            ),
            ExecutionError::OutOfMemory { elements } => {
                write!(f, "out of device memory allocating {elements} elements")
            }
            #[cfg(feature = "cuda")]
            ExecutionError::Cuda(err) => write!(f, "CUDA error: {err}"),
        }
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            #[cfg(feature = "cuda")]
            ExecutionError::Cuda(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "cuda")]
impl From<cust::error::CudaError> for ExecutionError {
    fn from(err: cust::error::CudaError) -> Self {
        ExecutionError::Cuda(err)
    }
}

/// Any failure of [`launch`](crate::launch).
#[derive(Debug)]
pub enum LaunchError {
    Precondition(PreconditionError),
    Execution(ExecutionError),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Precondition(err) => write!(f, "precondition violated: {err}"),
            LaunchError::Execution(err) => write!(f, "execution failed: {err}"),
        }
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LaunchError::Precondition(err) => Some(err),
            LaunchError::Execution(err) => Some(err),
        }
    }
}

impl From<PreconditionError> for LaunchError {
    fn from(err: PreconditionError) -> Self {
        LaunchError::Precondition(err)
    }
}

impl From<ExecutionError> for LaunchError {
    fn from(err: ExecutionError) -> Self {
        LaunchError::Execution(err)
    }
}

/// Result type for runtime operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Result type for [`launch`](crate::launch).
pub type LaunchResult<T> = Result<T, LaunchError>;
