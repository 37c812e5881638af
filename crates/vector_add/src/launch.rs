//! Host side of a launch: validate the arguments, then dispatch exactly one grid.
//!
//! The two steps are separate so each can be used and tested on its own. [`validate`] only
//! reads buffer metadata and never talks to a device. [`dispatch`] hands a validated launch to
//! a [`Runtime`] without checking anything again. [`launch`] chains the two.

use tracing::{debug, trace, warn};

use crate::buffer::{BufferLayout, DeviceId, Element};
use crate::config::LaunchConfig;
use crate::error::{ExecutionResult, LaunchResult, Operand, PreconditionError};
use crate::grid::GridSize;
use crate::runtime::Runtime;

/// Arguments that passed [`validate`], along with the grid computed for them.
///
/// Only [`validate`] can build one, so holding a `ValidatedLaunch` means every buffer is on the
/// same accelerator, contiguous, and `n_elements` long.
#[derive(Debug)]
pub struct ValidatedLaunch<'a, B> {
    x: &'a B,
    y: &'a B,
    out: &'a mut B,
    device: DeviceId,
    n_elements: usize,
    grid: GridSize,
    block_size: u32,
    threads_per_block: Option<u32>,
}

impl<'a, B> ValidatedLaunch<'a, B> {
    /// The accelerator all three buffers live on.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn threads_per_block(&self) -> Option<u32> {
        self.threads_per_block
    }

    /// The kernel arguments, `(x, y, out)`.
    pub fn into_buffers(self) -> (&'a B, &'a B, &'a mut B) {
        (self.x, self.y, self.out)
    }
}

fn accelerator_of<B: BufferLayout>(
    operand: Operand,
    buffer: &B,
) -> Result<DeviceId, PreconditionError> {
    let placement = buffer.placement();
    placement
        .device()
        .ok_or(PreconditionError::NotOnAccelerator { operand, placement })
}

fn check_operand<B: BufferLayout>(
    operand: Operand,
    buffer: &B,
    device: DeviceId,
    n_elements: usize,
) -> Result<(), PreconditionError> {
    let found = accelerator_of(operand, buffer)?;
    if found != device {
        return Err(PreconditionError::DeviceMismatch {
            operand,
            expected: device,
            found,
        });
    }
    if buffer.len() != n_elements {
        return Err(PreconditionError::LengthMismatch {
            operand,
            expected: n_elements,
            found: buffer.len(),
        });
    }
    if !buffer.is_contiguous() {
        return Err(PreconditionError::NonContiguous {
            operand,
            stride: buffer.stride(),
        });
    }
    Ok(())
}

/// Checks every launch invariant and computes the grid. Touches no device.
///
/// `x` fixes the device and the element count; `y` and `out` must match it and all three
/// must be contiguous.
pub fn validate<'a, B: BufferLayout>(
    config: &LaunchConfig,
    x: &'a B,
    y: &'a B,
    out: &'a mut B,
) -> Result<ValidatedLaunch<'a, B>, PreconditionError> {
    config.check()?;

    let device = accelerator_of(Operand::X, x)?;
    let n_elements = x.len();
    if !x.is_contiguous() {
        return Err(PreconditionError::NonContiguous {
            operand: Operand::X,
            stride: x.stride(),
        });
    }
    check_operand(Operand::Y, y, device, n_elements)?;
    check_operand(Operand::Out, &*out, device, n_elements)?;

    let grid = config.grid_for(n_elements)?;
    debug!(
        %device,
        n_elements,
        blocks = grid.x,
        block_size = config.block_size,
        "validated vector_add launch"
    );

    Ok(ValidatedLaunch {
        x,
        y,
        out,
        device,
        n_elements,
        grid,
        block_size: config.block_size,
        threads_per_block: config.threads_per_block,
    })
}

/// Issues one kernel dispatch for an already validated launch.
///
/// The device may still be executing when this returns; call [`Runtime::synchronize`] before
/// reading `out` back through anything other than the runtime's own ordered copies.
pub fn dispatch<R: Runtime, T: Element>(
    runtime: &R,
    launch: ValidatedLaunch<'_, R::Buffer<T>>,
) -> ExecutionResult<()> {
    trace!(kernel = T::KERNEL_NAME, blocks = launch.grid.x, "dispatching");
    runtime.dispatch::<T>(launch)
}

/// Computes `out[i] = x[i] + y[i]` with a custom [`LaunchConfig`] and returns `out`.
pub fn launch_with<'o, R: Runtime, T: Element>(
    runtime: &R,
    config: &LaunchConfig,
    x: &R::Buffer<T>,
    y: &R::Buffer<T>,
    out: &'o mut R::Buffer<T>,
) -> LaunchResult<&'o mut R::Buffer<T>> {
    let validated = match validate(config, x, y, &mut *out) {
        Ok(validated) => validated,
        Err(err) => {
            warn!("rejected vector_add launch: {err}");
            return Err(err.into());
        }
    };
    dispatch::<R, T>(runtime, validated)?;
    Ok(out)
}

/// Computes `out[i] = x[i] + y[i]` with the default [`LaunchConfig`] and returns `out`.
///
/// ```
/// use vector_add::{launch, CpuRuntime, Runtime};
///
/// let runtime = CpuRuntime::new();
/// let x = runtime.alloc_from(&[1.0f32, 2.0, 3.0]).unwrap();
/// let y = runtime.alloc_from(&[10.0f32, 20.0, 30.0]).unwrap();
/// let mut out = runtime.alloc_zeroed::<f32>(3).unwrap();
///
/// launch(&runtime, &x, &y, &mut out).unwrap();
/// runtime.synchronize().unwrap();
/// assert_eq!(runtime.to_vec(&out).unwrap(), [11.0, 22.0, 33.0]);
/// ```
pub fn launch<'o, R: Runtime, T: Element>(
    runtime: &R,
    x: &R::Buffer<T>,
    y: &R::Buffer<T>,
    out: &'o mut R::Buffer<T>,
) -> LaunchResult<&'o mut R::Buffer<T>> {
    launch_with::<R, T>(runtime, &LaunchConfig::default(), x, y, out)
}
