//! Device code for element-wise vector addition.
//!
//! The problem domain is cut into blocks of `block_size` elements. Block `pid` owns the indices
//! `[pid * block_size, (pid + 1) * block_size)` and each lane of the block handles one offset
//! inside that range. Lanes whose absolute index lands at or past `n_elements` are masked off
//! and touch no memory, so the last block of a launch may be only partially active.
//!
//! The lane routine is plain Rust and is shared by the GPU entry points below and by the
//! emulated runtime in the `vector_add` host crate.

#![cfg_attr(
    target_os = "cuda",
    no_std,
    feature(register_attr),
    register_attr(nvvm_internal)
)]

#[cfg(target_os = "cuda")]
use cuda_std::prelude::*;

use core::ops::Add;

/// How many elements one block covers unless the launcher is configured otherwise.
///
/// This is larger than the 1024 threads a CUDA block may hold; the threads of a block stride
/// over its lanes, see [`add_lanes`].
pub const DEFAULT_BLOCK_SIZE: u32 = 2048;

/// Absolute index of lane 0 of block `pid`.
#[inline(always)]
pub fn block_start(pid: u32, block_size: u32) -> usize {
    pid as usize * block_size as usize
}

/// The per-lane mask: `true` when `block_start + offset` addresses a real element.
#[inline(always)]
pub fn lane_active(block_start: usize, offset: usize, n_elements: usize) -> bool {
    block_start + offset < n_elements
}

/// Number of lanes of block `pid` that pass the mask.
#[inline(always)]
pub fn active_lanes(pid: u32, block_size: u32, n_elements: usize) -> usize {
    n_elements
        .saturating_sub(block_start(pid, block_size))
        .min(block_size as usize)
}

/// Runs lanes `first_lane, first_lane + lane_stride, ...` of block `pid`, writing
/// `out[i] = x[i] + y[i]` for every lane whose index `i` passes the mask.
///
/// On the GPU every thread of the block calls this with its thread index and the block
/// dimension. The host emulation calls it once per block with `first_lane = 0` and
/// `lane_stride = 1`.
///
/// # Safety
///
/// `x`, `y` and `out` must be valid for `n_elements` elements, `lane_stride` must be non-zero,
/// and no other execution context may write the indices this block owns.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn add_lanes<T>(
    x: *const T,
    y: *const T,
    out: *mut T,
    n_elements: usize,
    pid: u32,
    block_size: u32,
    first_lane: u32,
    lane_stride: u32,
) where
    T: Copy + Add<Output = T>,
{
    let start = block_start(pid, block_size);
    let mut offset = first_lane as usize;
    while offset < block_size as usize {
        if lane_active(start, offset, n_elements) {
            let idx = start + offset;
            unsafe {
                *out.add(idx) = *x.add(idx) + *y.add(idx);
            }
        }
        offset += lane_stride as usize;
    }
}

#[cfg(target_os = "cuda")]
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn vector_add_f32(
    x: *const f32,
    y: *const f32,
    out: *mut f32,
    n_elements: usize,
    block_size: u32,
) {
    unsafe {
        add_lanes(
            x,
            y,
            out,
            n_elements,
            thread::block_idx_x(),
            block_size,
            thread::thread_idx_x(),
            thread::block_dim_x(),
        )
    }
}

#[cfg(target_os = "cuda")]
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn vector_add_f64(
    x: *const f64,
    y: *const f64,
    out: *mut f64,
    n_elements: usize,
    block_size: u32,
) {
    unsafe {
        add_lanes(
            x,
            y,
            out,
            n_elements,
            thread::block_idx_x(),
            block_size,
            thread::thread_idx_x(),
            thread::block_dim_x(),
        )
    }
}

#[cfg(all(test, not(target_os = "cuda")))]
mod test_lanes {
    use super::*;

    const SENTINEL: f32 = -7.5;

    fn run_grid(x: &[f32], y: &[f32], out: &mut [f32], n: usize, block_size: u32, threads: u32) {
        let blocks = n.div_ceil(block_size as usize) as u32;
        for pid in 0..blocks {
            for thread in 0..threads {
                unsafe {
                    add_lanes(
                        x.as_ptr(),
                        y.as_ptr(),
                        out.as_mut_ptr(),
                        n,
                        pid,
                        block_size,
                        thread,
                        threads,
                    );
                }
            }
        }
    }

    #[test]
    fn test_mask_boundaries() {
        assert!(lane_active(0, 0, 1));
        assert!(!lane_active(0, 1, 1));
        assert!(lane_active(2048, 951, 3000));
        assert!(!lane_active(2048, 952, 3000));
        assert!(!lane_active(0, 0, 0));
    }

    #[test]
    fn test_active_lanes_of_last_block() {
        assert_eq!(active_lanes(0, 2048, 3000), 2048);
        assert_eq!(active_lanes(1, 2048, 3000), 952);
        assert_eq!(active_lanes(2, 2048, 3000), 0);
        assert_eq!(active_lanes(0, 2048, 0), 0);
        assert_eq!(active_lanes(1, 4, 8), 4);
    }

    #[test]
    fn test_partial_block_leaves_adjacent_memory_alone() {
        let n = 10;
        let x: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let y: Vec<f32> = (0..16).map(|i| 100.0 * i as f32).collect();
        let mut out = vec![SENTINEL; 16];

        // 3 blocks of 4 lanes, last block has two masked lanes
        run_grid(&x, &y, &mut out, n, 4, 1);

        for i in 0..n {
            assert_eq!(out[i], x[i] + y[i]);
        }
        assert!(out[n..].iter().all(|&v| v == SENTINEL));
    }

    #[test]
    fn test_strided_threads_cover_every_lane() {
        let n = 2 * 2048 + 17;
        let x: Vec<f32> = (0..n).map(|i| i as f32 * 0.5).collect();
        let y: Vec<f32> = (0..n).map(|i| 1.0 - i as f32).collect();
        let mut out = vec![SENTINEL; n];

        run_grid(&x, &y, &mut out, n, DEFAULT_BLOCK_SIZE, 128);

        for i in 0..n {
            assert_eq!(out[i], x[i] + y[i], "index {i}");
        }
    }

    #[test]
    fn test_f64_lanes() {
        let x = [0.1f64, 0.2, 0.3];
        let y = [1.0f64, 2.0, 3.0];
        let mut out = [0.0f64; 3];
        unsafe {
            add_lanes(x.as_ptr(), y.as_ptr(), out.as_mut_ptr(), 3, 0, 4, 0, 1);
        }
        assert_eq!(out, [0.1 + 1.0, 0.2 + 2.0, 0.3 + 3.0]);
    }
}
