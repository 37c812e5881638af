//! Buffer metadata consumed by launch validation, and the element types a kernel accepts.

use std::fmt;
use std::fmt::Debug;
use std::ops::Add;

/// Ordinal of an accelerator device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device {}", self.0)
    }
}

/// Where the memory behind a buffer lives.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Placement {
    Host,
    Accelerator(DeviceId),
}

impl Placement {
    /// The device for accelerator memory, `None` for host memory.
    pub fn device(self) -> Option<DeviceId> {
        match self {
            Placement::Host => None,
            Placement::Accelerator(device) => Some(device),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Host => f.write_str("host memory"),
            Placement::Accelerator(device) => write!(f, "{device}"),
        }
    }
}

/// Shape and placement of a one-dimensional buffer.
///
/// Validation only ever looks at this metadata, it never touches the memory itself.
pub trait BufferLayout {
    fn placement(&self) -> Placement;

    /// Number of logical elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance in elements between consecutive logical elements.
    fn stride(&self) -> usize {
        1
    }

    /// Buffers with fewer than two elements are contiguous whatever their stride.
    fn is_contiguous(&self) -> bool {
        self.len() <= 1 || self.stride() == 1
    }
}

impl<B: BufferLayout + ?Sized> BufferLayout for &B {
    fn placement(&self) -> Placement {
        (**self).placement()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn stride(&self) -> usize {
        (**self).stride()
    }
}

impl<B: BufferLayout + ?Sized> BufferLayout for &mut B {
    fn placement(&self) -> Placement {
        (**self).placement()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn stride(&self) -> usize {
        (**self).stride()
    }
}

#[cfg(feature = "cuda")]
mod scalar {
    /// Values that can be copied to and from device memory.
    pub trait DeviceScalar: cust::memory::DeviceCopy {}
    impl<T: cust::memory::DeviceCopy> DeviceScalar for T {}
}

#[cfg(not(feature = "cuda"))]
mod scalar {
    /// Values that can be copied to and from device memory.
    pub trait DeviceScalar {}
    impl<T> DeviceScalar for T {}
}

pub use scalar::DeviceScalar;

/// A floating point type with a vector addition kernel.
pub trait Element:
    DeviceScalar + Copy + Default + PartialEq + Debug + Send + Sync + Add<Output = Self> + 'static
{
    /// Name of the device entry point for this type.
    const KERNEL_NAME: &'static str;

    fn to_f64(self) -> f64;
}

impl Element for f32 {
    const KERNEL_NAME: &'static str = "vector_add_f32";

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const KERNEL_NAME: &'static str = "vector_add_f64";

    fn to_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod test_buffer {
    use super::*;

    struct Layout {
        len: usize,
        stride: usize,
    }

    impl BufferLayout for Layout {
        fn placement(&self) -> Placement {
            Placement::Accelerator(DeviceId(0))
        }

        fn len(&self) -> usize {
            self.len
        }

        fn stride(&self) -> usize {
            self.stride
        }
    }

    #[test]
    fn test_contiguity() {
        assert!(Layout { len: 8, stride: 1 }.is_contiguous());
        assert!(!Layout { len: 8, stride: 2 }.is_contiguous());
        assert!(Layout { len: 1, stride: 4 }.is_contiguous());
        assert!(Layout { len: 0, stride: 4 }.is_contiguous());
    }

    #[test]
    fn test_placement_device() {
        assert_eq!(Placement::Host.device(), None);
        assert_eq!(
            Placement::Accelerator(DeviceId(3)).device(),
            Some(DeviceId(3))
        );
        assert_eq!(Placement::Accelerator(DeviceId(3)).to_string(), "device 3");
    }
}
