//! Launch grid dimensions.

/// Largest number of blocks the x axis of a grid may hold.
pub const MAX_GRID_X: u32 = (1 << 31) - 1;

/// Dimensions of a grid, or the number of block instances a kernel launch spawns.
///
/// Vector addition only ever uses the x axis. Unlike a CUDA launch, an empty grid (`x == 0`)
/// is allowed here and means the launch has no work to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    /// Width of grid in blocks
    pub x: u32,
    /// Height of grid in blocks
    pub y: u32,
    /// Depth of grid in blocks
    pub z: u32,
}

impl GridSize {
    /// Create a one-dimensional grid of `x` blocks
    #[inline]
    pub fn x(x: u32) -> GridSize {
        GridSize { x, y: 1, z: 1 }
    }

    /// The grid that covers `n_elements` with blocks of `block_size` elements, or `None` if it
    /// would exceed [`MAX_GRID_X`] blocks or `block_size` is zero.
    pub fn covering(n_elements: usize, block_size: u32) -> Option<GridSize> {
        if block_size == 0 {
            return None;
        }
        let blocks = n_elements.div_ceil(block_size as usize);
        u32::try_from(blocks)
            .ok()
            .filter(|&blocks| blocks <= MAX_GRID_X)
            .map(GridSize::x)
    }

    /// Total number of block instances.
    #[inline]
    pub fn blocks(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks() == 0
    }
}

impl From<u32> for GridSize {
    fn from(x: u32) -> GridSize {
        GridSize::x(x)
    }
}

impl From<(u32, u32, u32)> for GridSize {
    fn from((x, y, z): (u32, u32, u32)) -> GridSize {
        GridSize { x, y, z }
    }
}

#[cfg(feature = "cuda")]
impl From<GridSize> for cust::function::GridSize {
    fn from(grid: GridSize) -> Self {
        cust::function::GridSize::xyz(grid.x, grid.y, grid.z)
    }
}
