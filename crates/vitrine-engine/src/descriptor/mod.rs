//! Shader-visible descriptor slots.
//!
//! A descriptor heap is a fixed table of binding points. Each slot is addressed
//! by a CPU handle (used to write the view) and a GPU handle (used by draw calls
//! and handed to the UI as an opaque display handle). Both are computed as
//! `start + index * increment`.

mod allocator;

pub use allocator::DescriptorSlotAllocator;

/// CPU-side address of a descriptor slot.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CpuDescriptorHandle(pub u64);

/// GPU-side address of a descriptor slot.
///
/// This is what the UI layer receives as the display handle of a loaded image.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpuDescriptorHandle(pub u64);

impl GpuDescriptorHandle {
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Both handles of one allocated slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DescriptorPair {
    pub index: u32,
    pub cpu: CpuDescriptorHandle,
    pub gpu: GpuDescriptorHandle,
}

/// Geometry of a descriptor heap as reported by the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DescriptorHeapInfo {
    pub capacity: u32,
    pub cpu_start: CpuDescriptorHandle,
    pub gpu_start: GpuDescriptorHandle,
    /// Distance in handle units between consecutive slots.
    pub increment: u64,
}
