use crate::descriptor::{DescriptorPair, DescriptorSlotAllocator, GpuDescriptorHandle};
use crate::device::RenderDevice;

/// A GPU-resident texture bound to exactly one descriptor slot.
///
/// Not `Clone`: the slot is returned through [`release`](Self::release) and
/// nowhere else. Dropping a texture that still holds its slot leaks the slot and
/// logs a warning.
pub struct GpuTexture<T> {
    resource: Option<T>,
    slot: Option<DescriptorPair>,
    width: u32,
    height: u32,
}

impl<T> GpuTexture<T> {
    pub(crate) fn new(resource: T, slot: DescriptorPair, width: u32, height: u32) -> Self {
        Self {
            resource: Some(resource),
            slot: Some(slot),
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Descriptor slot, or `None` once released.
    pub fn slot(&self) -> Option<DescriptorPair> {
        self.slot
    }

    /// Opaque handle the UI draws with. Null once released.
    pub fn display_handle(&self) -> GpuDescriptorHandle {
        self.slot.map(|s| s.gpu).unwrap_or_default()
    }

    pub fn resource(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.slot.is_none() && self.resource.is_none()
    }

    /// Unbinds the view, returns the slot and drops the GPU resource.
    ///
    /// Calling it again is a no-op. The caller must ensure the GPU no longer
    /// samples the texture.
    pub fn release<D>(&mut self, device: &D, allocator: &mut DescriptorSlotAllocator)
    where
        D: RenderDevice<Texture = T>,
    {
        if let Some(slot) = self.slot.take() {
            device.unbind_shader_view(slot);
            allocator.free(slot);
        }
        self.resource = None;
    }
}

impl<T> Drop for GpuTexture<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            log::warn!(
                "texture {}x{} dropped without release; descriptor slot {} leaked",
                self.width,
                self.height,
                slot.index
            );
        }
    }
}

impl<T> std::fmt::Debug for GpuTexture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PixelFormat, TextureDesc};
    use crate::testing::MockDevice;

    fn make(device: &MockDevice, allocator: &mut DescriptorSlotAllocator) -> GpuTexture<crate::testing::MockTexture> {
        let desc = TextureDesc {
            label: "t".into(),
            width: 8,
            height: 4,
            format: PixelFormat::Rgba8,
        };
        let tex = device.create_texture(&desc).unwrap();
        let slot = allocator.alloc();
        device.bind_shader_view(&tex, slot);
        GpuTexture::new(tex, slot, 8, 4)
    }

    #[test]
    fn release_returns_slot_and_resource() {
        let device = MockDevice::new(4);
        let mut allocator = DescriptorSlotAllocator::new(device.descriptor_heap());
        let mut tex = make(&device, &mut allocator);

        assert_eq!(allocator.free_count(), 3);
        assert_eq!(device.live_textures(), 1);
        assert!(!tex.display_handle().is_null());

        tex.release(&device, &mut allocator);

        assert!(tex.is_released());
        assert!(tex.display_handle().is_null());
        assert_eq!(allocator.free_count(), 4);
        assert_eq!(device.live_textures(), 0);
        assert!(device.bound_slots().is_empty());
    }

    #[test]
    fn release_twice_frees_once() {
        let device = MockDevice::new(4);
        let mut allocator = DescriptorSlotAllocator::new(device.descriptor_heap());
        let mut tex = make(&device, &mut allocator);
        tex.release(&device, &mut allocator);
        tex.release(&device, &mut allocator);
        assert_eq!(allocator.free_count(), 4);
    }

    #[test]
    fn dropping_without_release_leaks_the_slot() {
        let device = MockDevice::new(4);
        let mut allocator = DescriptorSlotAllocator::new(device.descriptor_heap());
        drop(make(&device, &mut allocator));
        assert_eq!(allocator.free_count(), 3);
    }
}
