use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::trace;
use vector_add_kernels::add_lanes;

use crate::buffer::{BufferLayout, DeviceId, Element, Placement};
use crate::error::{ExecutionError, ExecutionResult};
use crate::launch::ValidatedLaunch;
use crate::runtime::Runtime;

/// Memory of the emulated accelerator.
///
/// Logical element `i` is stored at `data[i * stride]`. Buffers made by [`CpuRuntime`] are
/// contiguous and placed on its device; [`CpuBuffer::host`] and [`CpuRuntime::alloc_strided`]
/// exist to build arguments a launch has to reject.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuBuffer<T> {
    data: Vec<T>,
    len: usize,
    stride: usize,
    placement: Placement,
}

impl<T: Element> CpuBuffer<T> {
    /// A contiguous buffer in host memory.
    pub fn host(data: Vec<T>) -> Self {
        Self {
            len: data.len(),
            data,
            stride: 1,
            placement: Placement::Host,
        }
    }

    /// The logical elements, in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter().step_by(self.stride).take(self.len)
    }
}

impl<T> BufferLayout for CpuBuffer<T> {
    fn placement(&self) -> Placement {
        self.placement
    }

    fn len(&self) -> usize {
        self.len
    }

    fn stride(&self) -> usize {
        self.stride
    }
}

/// A raw device address shared by every block instance of a grid.
#[derive(Clone, Copy)]
struct DevicePtr<T>(*mut T);

// block instances write disjoint index ranges
unsafe impl<T: Send> Send for DevicePtr<T> {}
unsafe impl<T: Sync> Sync for DevicePtr<T> {}

impl<T> DevicePtr<T> {
    fn get(self) -> *mut T {
        self.0
    }
}

fn allocate<T: Element>(elements: usize) -> ExecutionResult<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(elements)
        .map_err(|_| ExecutionError::OutOfMemory { elements })?;
    Ok(data)
}

/// Emulates an accelerator on the CPU.
///
/// Every block instance of a grid runs the same lane routine as the GPU kernel, with a single
/// host thread walking the block's lanes in order. Blocks are spread over the global rayon
/// pool unless the runtime is made [`sequential`](CpuRuntime::sequential). Dispatch finishes
/// before it returns, so [`synchronize`](Runtime::synchronize) has nothing to wait for.
#[derive(Debug)]
pub struct CpuRuntime {
    device: DeviceId,
    parallel: bool,
    launches: AtomicUsize,
    blocks_executed: AtomicU64,
}

impl Default for CpuRuntime {
    fn default() -> Self {
        Self::with_device(DeviceId(0))
    }
}

impl CpuRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose buffers report `device` as their placement.
    pub fn with_device(device: DeviceId) -> Self {
        Self {
            device,
            parallel: true,
            launches: AtomicUsize::new(0),
            blocks_executed: AtomicU64::new(0),
        }
    }

    /// Run block instances one after another on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// How many kernel dispatches reached this runtime.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// How many block instances ran across all dispatches.
    pub fn blocks_executed(&self) -> u64 {
        self.blocks_executed.load(Ordering::SeqCst)
    }

    /// Allocates a buffer on this device whose logical elements are `host`, spaced `stride`
    /// elements apart.
    pub fn alloc_strided<T: Element>(
        &self,
        host: &[T],
        stride: usize,
    ) -> ExecutionResult<CpuBuffer<T>> {
        let stride = stride.max(1);
        let storage = host.len().saturating_sub(1) * stride + usize::from(!host.is_empty());
        let mut data = allocate(storage)?;
        data.resize(storage, T::default());
        for (i, &value) in host.iter().enumerate() {
            data[i * stride] = value;
        }
        Ok(CpuBuffer {
            data,
            len: host.len(),
            stride,
            placement: Placement::Accelerator(self.device),
        })
    }
}

impl Runtime for CpuRuntime {
    type Buffer<T: Element> = CpuBuffer<T>;

    fn device(&self) -> DeviceId {
        self.device
    }

    fn alloc_from<T: Element>(&self, host: &[T]) -> ExecutionResult<CpuBuffer<T>> {
        let mut data = allocate(host.len())?;
        data.extend_from_slice(host);
        Ok(CpuBuffer {
            len: data.len(),
            data,
            stride: 1,
            placement: Placement::Accelerator(self.device),
        })
    }

    fn alloc_zeroed<T: Element>(&self, len: usize) -> ExecutionResult<CpuBuffer<T>> {
        let mut data = allocate(len)?;
        data.resize(len, T::default());
        Ok(CpuBuffer {
            data,
            len,
            stride: 1,
            placement: Placement::Accelerator(self.device),
        })
    }

    fn copy_to_host<T: Element>(
        &self,
        buffer: &CpuBuffer<T>,
        dst: &mut [T],
    ) -> ExecutionResult<()> {
        if dst.len() != buffer.len {
            return Err(ExecutionError::CopySizeMismatch {
                host: dst.len(),
                device: buffer.len,
            });
        }
        for (dst, src) in dst.iter_mut().zip(buffer.iter()) {
            *dst = *src;
        }
        Ok(())
    }

    fn dispatch<T: Element>(
        &self,
        launch: ValidatedLaunch<'_, CpuBuffer<T>>,
    ) -> ExecutionResult<()> {
        let grid = launch.grid();
        let n_elements = launch.n_elements();
        let block_size = launch.block_size();
        let (x, y, out) = launch.into_buffers();

        self.launches.fetch_add(1, Ordering::SeqCst);
        trace!(blocks = grid.x, parallel = self.parallel, "cpu dispatch");

        let x = DevicePtr(x.data.as_ptr() as *mut T);
        let y = DevicePtr(y.data.as_ptr() as *mut T);
        let out = DevicePtr(out.data.as_mut_ptr());

        let run_block = |pid: u32| unsafe {
            add_lanes(
                x.get() as *const T,
                y.get() as *const T,
                out.get(),
                n_elements,
                pid,
                block_size,
                0,
                1,
            )
        };

        if self.parallel {
            (0..grid.x).into_par_iter().for_each(run_block);
        } else {
            (0..grid.x).for_each(run_block);
        }

        self.blocks_executed.fetch_add(grid.x as u64, Ordering::SeqCst);
        Ok(())
    }

    fn synchronize(&self) -> ExecutionResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test_cpu_runtime {
    use super::*;

    #[test]
    fn test_alloc_and_copy_back() {
        let runtime = CpuRuntime::new();
        let buf = runtime.alloc_from(&[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(buf.placement(), Placement::Accelerator(DeviceId(0)));
        assert_eq!(runtime.to_vec(&buf).unwrap(), [1.0, 2.0, 3.0]);

        let zeroed = runtime.alloc_zeroed::<f64>(4).unwrap();
        assert_eq!(runtime.to_vec(&zeroed).unwrap(), [0.0; 4]);
    }

    #[test]
    fn test_copy_size_mismatch() {
        let runtime = CpuRuntime::new();
        let buf = runtime.alloc_zeroed::<f32>(4).unwrap();
        let mut dst = [0.0f32; 3];
        assert!(matches!(
            runtime.copy_to_host(&buf, &mut dst),
            Err(ExecutionError::CopySizeMismatch { host: 3, device: 4 })
        ));
    }

    #[test]
    fn test_strided_buffer_layout() {
        let runtime = CpuRuntime::with_device(DeviceId(2));
        let buf = runtime.alloc_strided(&[1.0f32, 2.0, 3.0], 2).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.stride(), 2);
        assert!(!buf.is_contiguous());
        assert_eq!(buf.placement(), Placement::Accelerator(DeviceId(2)));
        assert_eq!(runtime.to_vec(&buf).unwrap(), [1.0, 2.0, 3.0]);

        let empty = runtime.alloc_strided::<f32>(&[], 3).unwrap();
        assert!(empty.is_empty());
        assert!(empty.is_contiguous());
    }

    #[test]
    fn test_host_buffer() {
        let buf = CpuBuffer::host(vec![1.0f32, 2.0]);
        assert_eq!(buf.placement(), Placement::Host);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), [1.0, 2.0]);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let n = 5 * 2048 + 3;
        let xs: Vec<f32> = (0..n).map(|i| (i % 97) as f32 * 0.25).collect();
        let ys: Vec<f32> = (0..n).map(|i| (i % 13) as f32 - 6.0).collect();

        let mut results = Vec::new();
        for runtime in [CpuRuntime::new(), CpuRuntime::new().sequential()] {
            let x = runtime.alloc_from(&xs).unwrap();
            let y = runtime.alloc_from(&ys).unwrap();
            let mut out = runtime.alloc_zeroed::<f32>(n).unwrap();
            crate::launch(&runtime, &x, &y, &mut out).unwrap();
            assert_eq!(runtime.launch_count(), 1);
            assert_eq!(runtime.blocks_executed(), 6);
            results.push(runtime.to_vec(&out).unwrap());
        }
        assert_eq!(results[0], results[1]);
    }
}
