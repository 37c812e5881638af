use cust::context::Context;
use cust::device::Device;
use cust::function::BlockSize;
use cust::launch;
use cust::prelude::*;
use tracing::{debug, trace};

use crate::buffer::{BufferLayout, DeviceId, Element, Placement};
use crate::error::{ExecutionError, ExecutionResult};
use crate::launch::ValidatedLaunch;
use crate::runtime::Runtime;

static PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/vector_add_kernels.ptx"));

/// A buffer in the memory of a CUDA device.
pub struct CudaBuffer<T: Element> {
    inner: DeviceBuffer<T>,
    device: DeviceId,
}

impl<T: Element> CudaBuffer<T> {
    pub fn as_device_buffer(&self) -> &DeviceBuffer<T> {
        &self.inner
    }
}

impl<T: Element> BufferLayout for CudaBuffer<T> {
    fn placement(&self) -> Placement {
        Placement::Accelerator(self.device)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Runs the kernels on a CUDA device through the driver API.
///
/// Launches are queued on a single non-blocking stream and return before the kernel finishes.
/// Copies back to the host are ordered after earlier launches, but call
/// [`synchronize`](Runtime::synchronize) before inspecting results any other way.
pub struct CudaRuntime {
    // dropped before the context
    stream: Stream,
    module: Module,
    device: DeviceId,
    _context: Context,
}

impl CudaRuntime {
    /// Initializes CUDA on the first device.
    pub fn new() -> ExecutionResult<Self> {
        Self::with_device(0)
    }

    /// Initializes CUDA on the device with the given ordinal and loads the kernels.
    pub fn with_device(ordinal: u32) -> ExecutionResult<Self> {
        cust::init(cust::CudaFlags::empty())?;
        let device = Device::get_device(ordinal)?;
        let context = Context::new(device)?;
        debug!(name = %device.name()?, ordinal, "initialized CUDA device");

        let module = Module::from_ptx(PTX, &[])?;
        let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;

        Ok(Self {
            stream,
            module,
            device: DeviceId(ordinal),
            _context: context,
        })
    }
}

impl Runtime for CudaRuntime {
    type Buffer<T: Element> = CudaBuffer<T>;

    fn device(&self) -> DeviceId {
        self.device
    }

    fn alloc_from<T: Element>(&self, host: &[T]) -> ExecutionResult<CudaBuffer<T>> {
        Ok(CudaBuffer {
            inner: DeviceBuffer::from_slice(host)?,
            device: self.device,
        })
    }

    fn alloc_zeroed<T: Element>(&self, len: usize) -> ExecutionResult<CudaBuffer<T>> {
        self.alloc_from(&vec![T::default(); len])
    }

    fn copy_to_host<T: Element>(
        &self,
        buffer: &CudaBuffer<T>,
        dst: &mut [T],
    ) -> ExecutionResult<()> {
        if dst.len() != buffer.len() {
            return Err(ExecutionError::CopySizeMismatch {
                host: dst.len(),
                device: buffer.len(),
            });
        }
        buffer.inner.copy_to(dst)?;
        Ok(())
    }

    fn dispatch<T: Element>(
        &self,
        launch: ValidatedLaunch<'_, CudaBuffer<T>>,
    ) -> ExecutionResult<()> {
        let grid = launch.grid();
        if grid.is_empty() {
            // CUDA rejects zero-sized grids
            trace!("empty grid, nothing to launch");
            return Ok(());
        }

        let n_elements = launch.n_elements();
        let block_size = launch.block_size();
        let kernel = self.module.get_function(T::KERNEL_NAME)?;
        let threads = match launch.threads_per_block() {
            Some(threads) => threads,
            None => kernel.suggested_launch_configuration(0, BlockSize::x(0))?.1,
        };
        let (x, y, out) = launch.into_buffers();

        let stream = &self.stream;
        trace!(blocks = grid.x, threads, "cuda dispatch");
        unsafe {
            launch!(
                kernel<<<grid, threads, 0, stream>>>(
                    x.inner.as_device_ptr(),
                    y.inner.as_device_ptr(),
                    out.inner.as_device_ptr(),
                    n_elements,
                    block_size
                )
            )?;
        }
        Ok(())
    }

    fn synchronize(&self) -> ExecutionResult<()> {
        self.stream.synchronize()?;
        Ok(())
    }
}
